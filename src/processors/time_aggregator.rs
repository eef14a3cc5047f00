use crate::models::{BucketKey, Reading, TimeGranularity};
use std::collections::BTreeMap;

/// Readings sharing one time-bucket key.
#[derive(Debug, Clone)]
pub struct TimeBucket<'a> {
    pub key: BucketKey,
    pub label: String,
    pub readings: Vec<&'a Reading>,
}

impl TimeBucket<'_> {
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

pub struct TimeAggregator {
    granularity: TimeGranularity,
}

impl TimeAggregator {
    pub fn new(granularity: TimeGranularity) -> Self {
        Self { granularity }
    }

    /// Partition readings into buckets, in ascending key order. Reading order
    /// inside a bucket follows input order.
    pub fn aggregate<'a>(&self, readings: &'a [Reading]) -> Vec<TimeBucket<'a>> {
        let mut grouped: BTreeMap<BucketKey, Vec<&'a Reading>> = BTreeMap::new();
        for reading in readings {
            grouped
                .entry(BucketKey::for_timestamp(self.granularity, reading.timestamp))
                .or_default()
                .push(reading);
        }

        grouped
            .into_iter()
            .map(|(key, readings)| TimeBucket {
                label: key.label(),
                key,
                readings,
            })
            .collect()
    }
}
