//! Normalized record types produced by the parsers
//!
//! Records are plain owned values. Time offsets and times of day are
//! `chrono::TimeDelta`; biases are stored in whole seconds.

use chrono::{NaiveDate, TimeDelta};

/// Sentinel year for the `max` keyword
pub const YEAR_MAX: i16 = i16::MAX;

/// Sentinel year for the `min` keyword
pub const YEAR_MIN: i16 = 0;

/// A time zone (from a `Zone` block or a resolved `Link`)
#[derive(Debug, Clone, PartialEq)]
pub struct TimeZoneRecord {
    /// Run-scoped surrogate id, 1-based
    pub id: u32,
    pub name: String,
    /// Offset from UTC in seconds
    pub bias: i32,
    pub rule_name: Option<String>,
    /// Abbreviation format, e.g. `CE%sT`
    pub format: String,
    pub country_code: String,
    pub country_name: String,
    pub comment: Option<String>,
    pub coordinates: Option<String>,
}

/// A daylight-saving rule line
#[derive(Debug, Clone, PartialEq)]
pub struct RuleRecord {
    pub name: String,
    /// Saved time in seconds
    pub bias: i32,
    pub start_year: i16,
    pub end_year: i16,
    /// 1-12, or 0 when the month token was not recognized
    pub month: u8,
    /// Raw day specification, e.g. `lastSun` or `Sun>=8`
    pub day: String,
    pub at: TimeDelta,
    /// `w`, `s`, `u`, `g` or `z`
    pub at_type: char,
    pub letter: Option<String>,
}

/// An alias collected during the main pass and resolved afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub from: String,
    pub to: String,
}

/// A leap second line
#[derive(Debug, Clone, PartialEq)]
pub struct LeapRecord {
    pub year: i16,
    /// Raw month token
    pub month: String,
    pub day: i16,
    pub time: TimeDelta,
    /// `+` or `-`
    pub correction: Option<char>,
    /// `R` (rolling) or `S` (stationary)
    pub rs: Option<char>,
}

/// A gazetteer city line
#[derive(Debug, Clone, PartialEq)]
pub struct CityRecord {
    pub geoname_id: Option<i64>,
    pub name: Option<String>,
    pub ascii_name: Option<String>,
    pub alternate_names: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub feature_class: Option<char>,
    pub feature_code: Option<String>,
    pub country_code: Option<String>,
    pub country_code2: Option<String>,
    pub admin1_code: Option<String>,
    pub admin2_code: Option<String>,
    pub admin3_code: Option<String>,
    pub admin4_code: Option<String>,
    pub population: Option<i64>,
    pub elevation: Option<i32>,
    pub gtopo30: Option<i32>,
    /// Join key against the time zone name index
    pub timezone_name: Option<String>,
    /// Filled by the join
    pub timezone_id: Option<u32>,
    pub modification_date: NaiveDate,
}

/// A gazetteer feature code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureCodeRecord {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

/// Destination table of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    TimeZones,
    Rules,
    Leaps,
    Cities,
    FeatureCodes,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::TimeZones => "timezones",
            Table::Rules => "rules",
            Table::Leaps => "leaps",
            Table::Cities => "cities",
            Table::FeatureCodes => "feature_codes",
        }
    }
}

/// A batch of records bound for one table
#[derive(Debug, Clone)]
pub enum RecordBatch {
    TimeZones(Vec<TimeZoneRecord>),
    Rules(Vec<RuleRecord>),
    Leaps(Vec<LeapRecord>),
    Cities(Vec<CityRecord>),
    FeatureCodes(Vec<FeatureCodeRecord>),
}

impl RecordBatch {
    pub fn table(&self) -> Table {
        match self {
            RecordBatch::TimeZones(_) => Table::TimeZones,
            RecordBatch::Rules(_) => Table::Rules,
            RecordBatch::Leaps(_) => Table::Leaps,
            RecordBatch::Cities(_) => Table::Cities,
            RecordBatch::FeatureCodes(_) => Table::FeatureCodes,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RecordBatch::TimeZones(v) => v.len(),
            RecordBatch::Rules(v) => v.len(),
            RecordBatch::Leaps(v) => v.len(),
            RecordBatch::Cities(v) => v.len(),
            RecordBatch::FeatureCodes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_table_and_len() {
        let batch = RecordBatch::Rules(vec![RuleRecord {
            name: "EU".into(),
            bias: 3600,
            start_year: 1981,
            end_year: YEAR_MAX,
            month: 3,
            day: "lastSun".into(),
            at: TimeDelta::hours(1),
            at_type: 'u',
            letter: Some("S".into()),
        }]);

        assert_eq!(batch.table(), Table::Rules);
        assert_eq!(batch.table().as_str(), "rules");
        assert_eq!(batch.len(), 1);
        assert!(!batch.is_empty());
        assert!(RecordBatch::Cities(Vec::new()).is_empty());
    }
}
