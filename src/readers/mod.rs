pub mod reading_reader;
pub mod station_reader;

pub use reading_reader::{FileReadings, ReadingReader, ReadingSet};
pub use station_reader::StationReader;
