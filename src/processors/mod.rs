pub mod diurnal_filter;
pub mod grid_builder;
pub mod reading_preparer;
pub mod site_aggregator;
pub mod time_aggregator;

pub use diurnal_filter::DiurnalFilter;
pub use grid_builder::{Extent, GridBuilder};
pub use reading_preparer::{PreparationReport, PreparedDataset, ReadingPreparer};
pub use site_aggregator::SiteAggregator;
pub use time_aggregator::{TimeAggregator, TimeBucket};
