use airbox_processor::analysis::{AnalysisConfig, AnalysisOrchestrator};
use airbox_processor::interpolation::{DenseDiffusionInterpolator, DiffusionParams, GaussianSmoother};
use airbox_processor::models::{Metric, MetricValues, Reading, SiteValue, TimeGranularity};
use airbox_processor::processors::{GridBuilder, SiteAggregator, TimeAggregator};
use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;

// Hourly readings for a square of stations around Kaohsiung
fn create_test_readings(station_count: usize, hours: usize) -> Vec<Reading> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let side = (station_count as f64).sqrt().ceil() as usize;

    let mut readings = Vec::with_capacity(station_count * hours);
    for station in 0..station_count {
        let lat = 22.55 + (station / side) as f64 * 0.01;
        let lon = 120.25 + (station % side) as f64 * 0.01;
        for hour in 0..hours {
            let mut values = MetricValues::default();
            values.pm25 = Some(15.0 + (station % 7) as f64 + (hour % 24) as f64 * 0.5);
            values.temperature = Some(22.0 + (hour % 24) as f64 * 0.2);
            values.wind_speed = Some(1.0 + (station % 5) as f64);
            values.wind_direction = Some(((station * 37 + hour * 11) % 360) as f64);
            readings.push(Reading::new(
                start + Duration::hours(hour as i64),
                format!("S{:04}", station),
                lat,
                lon,
                values,
            ));
        }
    }
    readings
}

fn create_test_sites(count: usize) -> Vec<SiteValue> {
    (0..count)
        .map(|i| {
            SiteValue::new(
                format!("S{:04}", i),
                22.55 + (i % 10) as f64 * 0.01,
                120.25 + (i / 10) as f64 * 0.01,
                20.0 + (i % 9) as f64,
            )
            .with_wind(2.0, (i * 45 % 360) as f64)
        })
        .collect()
}

fn benchmark_interpolation(c: &mut Criterion) {
    let readings = create_test_readings(100, 1);
    let interpolator = DenseDiffusionInterpolator::new(DiffusionParams::default()).unwrap();
    let sites = create_test_sites(100);

    let mut group = c.benchmark_group("diffusion_by_resolution");
    for &resolution in &[50, 100, 200] {
        let grid = GridBuilder::new(resolution).build(&readings).unwrap();
        group.bench_with_input(
            BenchmarkId::new("wind_aware", resolution),
            &grid,
            |b, grid| b.iter(|| black_box(interpolator.interpolate(&sites, grid, true))),
        );
        group.bench_with_input(
            BenchmarkId::new("isotropic", resolution),
            &grid,
            |b, grid| b.iter(|| black_box(interpolator.interpolate(&sites, grid, false))),
        );
    }
    group.finish();
}

fn benchmark_smoothing(c: &mut Criterion) {
    let mut field = Array2::from_elem((200, 200), f64::NAN);
    for ((row, col), value) in field.indexed_iter_mut() {
        if (row + col) % 3 != 0 {
            *value = (row * col % 50) as f64;
        }
    }
    let smoother = GaussianSmoother::new(1.0);

    c.bench_function("gaussian_smoothing_200", |b| {
        b.iter(|| black_box(smoother.smooth(&field)))
    });
}

fn benchmark_time_aggregation(c: &mut Criterion) {
    let readings = create_test_readings(50, 24 * 60);

    let mut group = c.benchmark_group("time_aggregation");
    for granularity in [
        TimeGranularity::Hourly,
        TimeGranularity::Daily,
        TimeGranularity::Weekly,
        TimeGranularity::Monthly,
    ] {
        group.bench_function(granularity.key(), |b| {
            let aggregator = TimeAggregator::new(granularity);
            b.iter(|| black_box(aggregator.aggregate(&readings).len()))
        });
    }
    group.finish();
}

fn benchmark_site_aggregation(c: &mut Criterion) {
    let readings = create_test_readings(200, 24);
    let refs: Vec<&Reading> = readings.iter().collect();

    c.bench_function("site_aggregation_wind_field", |b| {
        b.iter(|| black_box(SiteAggregator::aggregate(&refs, Metric::WindField).len()))
    });
}

fn benchmark_full_analysis(c: &mut Criterion) {
    let readings = create_test_readings(60, 24 * 7);
    let config = AnalysisConfig::new(TimeGranularity::Daily)
        .with_metrics(vec![Metric::Pm25, Metric::WindField])
        .with_grid_resolution(60);
    let orchestrator = AnalysisOrchestrator::new(config).unwrap();

    let mut group = c.benchmark_group("analysis");
    group.sample_size(10);
    group.bench_function("week_daily_60x60", |b| {
        b.iter(|| {
            let report = orchestrator.run(&readings, |_| {}).unwrap();
            black_box(report.fields.len())
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_interpolation,
    benchmark_smoothing,
    benchmark_time_aggregation,
    benchmark_site_aggregation,
    benchmark_full_analysis
);
criterion_main!(benches);
