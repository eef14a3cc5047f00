use crate::models::{DiurnalPeriod, Reading};
use std::borrow::Cow;

/// Restricts a bucket's readings to the hours of a diurnal period.
pub struct DiurnalFilter;

impl DiurnalFilter {
    /// The `all` period borrows the input unchanged. An empty result is a skip, not an error.
    pub fn apply<'r, 'a>(
        readings: &'r [&'a Reading],
        period: &DiurnalPeriod,
    ) -> Cow<'r, [&'a Reading]> {
        if period.is_all() {
            return Cow::Borrowed(readings);
        }

        Cow::Owned(
            readings
                .iter()
                .copied()
                .filter(|r| period.contains_hour(r.hour()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricValues;
    use chrono::NaiveDate;

    fn at_hour(h: u32) -> Reading {
        let ts = NaiveDate::from_ymd_opt(2020, 5, 1)
            .unwrap()
            .and_hms_opt(h, 10, 0)
            .unwrap();
        Reading::new(ts, "S1", 22.7, 120.3, MetricValues::default())
    }

    #[test]
    fn test_all_period_is_identity() {
        let readings: Vec<Reading> = (0..24).map(at_hour).collect();
        let refs: Vec<&Reading> = readings.iter().collect();

        let filtered = DiurnalFilter::apply(&refs, &DiurnalPeriod::all());
        assert!(matches!(filtered, Cow::Borrowed(_)));
        assert_eq!(filtered.len(), 24);
    }

    #[test]
    fn test_named_period_filters_hours() {
        let readings: Vec<Reading> = (0..24).map(at_hour).collect();
        let refs: Vec<&Reading> = readings.iter().collect();

        let dawn = DiurnalPeriod::builtin("dawn").unwrap();
        let filtered = DiurnalFilter::apply(&refs, &dawn);
        let hours: Vec<u8> = filtered.iter().map(|r| r.hour()).collect();
        assert_eq!(hours, vec![5, 6]);
    }

    #[test]
    fn test_no_matching_hours_yields_empty() {
        let readings = vec![at_hour(12)];
        let refs: Vec<&Reading> = readings.iter().collect();

        let night = DiurnalPeriod::builtin("night").unwrap();
        assert!(DiurnalFilter::apply(&refs, &night).is_empty());
    }
}
