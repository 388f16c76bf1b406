//! Column layout and column parsers for gazetteer city lines
//!
//! String columns map `""` to `None`. Latitude and longitude are strict;
//! population, elevation and gtopo30 are `None` when empty and strict
//! otherwise. The modification date is lenient and falls back to
//! [`default_modification_date`].

use crate::error::{FieldError, FieldResult};
use crate::queue::FieldBuffer;
use crate::records::CityRecord;
use crate::report::{Issue, IssueKind, IssueReporter, Location};
use chrono::NaiveDate;

/// Number of columns in a city line
pub const CITY_FIELDS: usize = 19;

pub const ID: usize = 0;
pub const NAME: usize = 1;
pub const ASCII_NAME: usize = 2;
pub const ALTERNATE_NAMES: usize = 3;
pub const LATITUDE: usize = 4;
pub const LONGITUDE: usize = 5;
pub const FEATURE_CLASS: usize = 6;
pub const FEATURE_CODE: usize = 7;
pub const COUNTRY_CODE: usize = 8;
pub const COUNTRY_CODE2: usize = 9;
pub const ADMIN1: usize = 10;
pub const ADMIN2: usize = 11;
pub const ADMIN3: usize = 12;
pub const ADMIN4: usize = 13;
pub const POPULATION: usize = 14;
pub const ELEVATION: usize = 15;
pub const GTOPO30: usize = 16;
pub const TIMEZONE: usize = 17;
pub const MODIFICATION_DATE: usize = 18;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn default_modification_date() -> NaiveDate {
    NaiveDate::default()
}

/// `""` becomes `None`
pub fn parse_text(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Strict decimal degrees
pub fn parse_coordinate(value: &str, field: &'static str) -> FieldResult<f64> {
    value.trim().parse::<f64>().map_err(|_| FieldError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

/// Empty is `None`; anything else must be a valid `i64`
pub fn parse_optional_i64(value: &str, field: &'static str) -> FieldResult<Option<i64>> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .trim()
        .parse::<i64>()
        .map(Some)
        .map_err(|_| FieldError::InvalidInteger {
            field,
            value: value.to_string(),
        })
}

/// Empty is `None`; anything else must be a valid `i32`
pub fn parse_optional_i32(value: &str, field: &'static str) -> FieldResult<Option<i32>> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .trim()
        .parse::<i32>()
        .map(Some)
        .map_err(|_| FieldError::InvalidInteger {
            field,
            value: value.to_string(),
        })
}

/// First character, or `None` when empty
pub fn parse_feature_class(value: &str) -> Option<char> {
    value.chars().next()
}

/// `yyyy-MM-dd`
pub fn parse_modification_date(value: &str) -> FieldResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| FieldError::InvalidDate(value.to_string()))
}

/// Parse one tokenized city line.
///
/// Strict failures are returned; lenient ones are reported to `reporter`
/// and replaced by a default. The time zone id is left for the join.
pub fn parse_city(
    fields: &FieldBuffer,
    reporter: &dyn IssueReporter,
    location: impl Fn() -> Location,
) -> FieldResult<CityRecord> {
    let geoname_id = match parse_optional_i64(fields.get(ID), "geonameid") {
        Ok(id) => id,
        Err(e) => {
            reporter.report(Issue::low(IssueKind::FieldGrammar, e.to_string()).at(location()));
            None
        }
    };

    let modification_date = match parse_modification_date(fields.get(MODIFICATION_DATE)) {
        Ok(date) => date,
        Err(e) => {
            reporter.report(Issue::low(IssueKind::FieldGrammar, e.to_string()).at(location()));
            default_modification_date()
        }
    };

    Ok(CityRecord {
        geoname_id,
        name: parse_text(fields.get(NAME)),
        ascii_name: parse_text(fields.get(ASCII_NAME)),
        alternate_names: parse_text(fields.get(ALTERNATE_NAMES)),
        latitude: parse_coordinate(fields.get(LATITUDE), "latitude")?,
        longitude: parse_coordinate(fields.get(LONGITUDE), "longitude")?,
        feature_class: parse_feature_class(fields.get(FEATURE_CLASS)),
        feature_code: parse_text(fields.get(FEATURE_CODE)),
        country_code: parse_text(fields.get(COUNTRY_CODE)),
        country_code2: parse_text(fields.get(COUNTRY_CODE2)),
        admin1_code: parse_text(fields.get(ADMIN1)),
        admin2_code: parse_text(fields.get(ADMIN2)),
        admin3_code: parse_text(fields.get(ADMIN3)),
        admin4_code: parse_text(fields.get(ADMIN4)),
        population: parse_optional_i64(fields.get(POPULATION), "population")?,
        elevation: parse_optional_i32(fields.get(ELEVATION), "elevation")?,
        gtopo30: parse_optional_i32(fields.get(GTOPO30), "gtopo30")?,
        timezone_name: parse_text(fields.get(TIMEZONE)),
        timezone_id: None,
        modification_date,
    })
}
