//! Gazetteer (city) parsing

pub mod feature_codes;
pub mod fields;
pub mod parser;

pub use feature_codes::read_feature_codes;
pub use fields::CITY_FIELDS;
pub use parser::{CityBatch, GazetteerCounts, GazetteerOutcome, GazetteerParser, GazetteerStats};
