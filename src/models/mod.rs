pub mod field;
pub mod metric;
pub mod period;
pub mod reading;
pub mod station;
pub mod time;

pub use field::{Grid, InterpolatedField, SiteValue};
pub use metric::Metric;
pub use period::DiurnalPeriod;
pub use reading::{MetricValues, RawReading, Reading, SourceField};
pub use station::Station;
pub use time::{BucketKey, Season, TimeGranularity, TimeWindow};
