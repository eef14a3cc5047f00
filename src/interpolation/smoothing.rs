//! Separable Gaussian smoothing that tolerates undefined (NaN) cells.
//!
//! Undefined cells are excluded from the kernel's weighted average (normalized
//! convolution) and stay undefined in the output. On a fully defined field the
//! result equals an ordinary Gaussian filter with reflect boundaries.

use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis, Zip};

use crate::utils::constants::GAUSSIAN_TRUNCATE;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianSmoother {
    sigma: f64,
    truncate: f64,
}

impl GaussianSmoother {
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            truncate: GAUSSIAN_TRUNCATE,
        }
    }

    pub fn radius(&self) -> usize {
        (self.truncate * self.sigma + 0.5).floor().max(0.0) as usize
    }

    /// Normalised 1-D kernel of length `2 * radius + 1`.
    pub fn kernel(&self) -> Vec<f64> {
        let radius = self.radius() as isize;
        let variance = self.sigma * self.sigma;
        let mut weights: Vec<f64> = (-radius..=radius)
            .map(|x| (-0.5 / variance * (x * x) as f64).exp())
            .collect();
        let total: f64 = weights.iter().sum();
        for w in &mut weights {
            *w /= total;
        }
        weights
    }

    pub fn smooth(&self, field: &Array2<f64>) -> Array2<f64> {
        if self.sigma.is_nan() || self.sigma <= 0.0 || field.is_empty() {
            return field.clone();
        }

        let kernel = self.kernel();
        let mask = field.mapv(|v| if v.is_nan() { 0.0 } else { 1.0 });
        let masked = field.mapv(|v| if v.is_nan() { 0.0 } else { v });

        let numerator = convolve_2d(&masked, &kernel);
        let denominator = convolve_2d(&mask, &kernel);

        Zip::from(field)
            .and(&numerator)
            .and(&denominator)
            .map_collect(|&orig, &num, &den| {
                if orig.is_nan() || den <= 0.0 {
                    f64::NAN
                } else {
                    num / den
                }
            })
    }
}

fn convolve_2d(input: &Array2<f64>, kernel: &[f64]) -> Array2<f64> {
    let along_rows = convolve_axis(input, Axis(1), kernel);
    convolve_axis(&along_rows, Axis(0), kernel)
}

fn convolve_axis(input: &Array2<f64>, axis: Axis, kernel: &[f64]) -> Array2<f64> {
    let mut output = Array2::<f64>::zeros(input.raw_dim());
    Zip::from(output.lanes_mut(axis))
        .and(input.lanes(axis))
        .par_for_each(|out, lane| convolve_lane(lane, out, kernel));
    output
}

fn convolve_lane(input: ArrayView1<f64>, mut output: ArrayViewMut1<f64>, kernel: &[f64]) {
    let n = input.len();
    let radius = (kernel.len() / 2) as isize;
    for i in 0..n {
        let mut acc = 0.0;
        for (k, w) in kernel.iter().enumerate() {
            let idx = reflect_index(i as isize + k as isize - radius, n);
            acc += w * input[idx];
        }
        output[i] = acc;
    }
}

/// Half-sample symmetric reflection: `d c b a | a b c d | d c b a`
fn reflect_index(i: isize, n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let n = n as isize;
    let period = 2 * n;
    let folded = i.rem_euclid(period);
    if folded >= n {
        (period - 1 - folded) as usize
    } else {
        folded as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(2, 4), 2);
        assert_eq!(reflect_index(-3, 1), 0);
    }

    #[test]
    fn test_kernel_shape_for_default_sigma() {
        let smoother = GaussianSmoother::new(0.5);
        assert_eq!(smoother.radius(), 2);

        let kernel = smoother.kernel();
        assert_eq!(kernel.len(), 5);
        assert!((kernel.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((kernel[0] - kernel[4]).abs() < 1e-15);
        assert!(kernel[2] > kernel[1]);
    }

    #[test]
    fn test_constant_field_is_preserved() {
        let field = Array2::from_elem((6, 5), 42.0);
        let smoothed = GaussianSmoother::new(0.5).smooth(&field);
        for v in smoothed.iter() {
            assert!((v - 42.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_impulse_spreads_symmetrically() {
        let mut field = Array2::<f64>::zeros((5, 5));
        field[[2, 2]] = 1.0;
        let smoothed = GaussianSmoother::new(0.5).smooth(&field);

        assert!(smoothed[[2, 2]] < 1.0);
        assert!(smoothed[[2, 1]] > 0.0);
        assert!((smoothed[[2, 1]] - smoothed[[1, 2]]).abs() < 1e-12);
        assert!((smoothed.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_undefined_cells_stay_undefined_and_do_not_leak() {
        let field = array![
            [10.0, 10.0, f64::NAN],
            [10.0, 10.0, f64::NAN],
            [10.0, 10.0, f64::NAN]
        ];
        let smoothed = GaussianSmoother::new(0.5).smooth(&field);

        for r in 0..3 {
            assert!(smoothed[[r, 2]].is_nan());
            assert!((smoothed[[r, 0]] - 10.0).abs() < 1e-9);
            assert!((smoothed[[r, 1]] - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_sigma_is_identity() {
        let field = array![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(GaussianSmoother::new(0.0).smooth(&field), field);
    }
}
