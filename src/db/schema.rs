//! SQLite schema for the ingested tables
//!
//! Every run starts from empty tables: they are dropped and recreated when
//! the database is opened. Indexes are created after the bulk insert.

use crate::error::SinkResult;
use chrono::TimeDelta;
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: u32 = 1;

const DROP_TABLES: &str = r#"
DROP TABLE IF EXISTS timezones;
DROP TABLE IF EXISTS rules;
DROP TABLE IF EXISTS leaps;
DROP TABLE IF EXISTS cities;
DROP TABLE IF EXISTS feature_codes;
DROP TABLE IF EXISTS ingest_info;
"#;

/// Time zones keep their run-scoped surrogate id as the primary key so that
/// `cities.timezone_id` joins against it directly.
const CREATE_TIMEZONES_TABLE: &str = r#"
CREATE TABLE timezones (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    bias INTEGER NOT NULL,            -- seconds from UTC
    rule_name TEXT,
    abbreviation_format TEXT NOT NULL,
    country_code TEXT NOT NULL,
    country_name TEXT NOT NULL,
    comments TEXT,
    coordinates TEXT
)
"#;

const CREATE_RULES_TABLE: &str = r#"
CREATE TABLE rules (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    bias INTEGER NOT NULL,            -- saved seconds
    start_year INTEGER NOT NULL,
    end_year INTEGER NOT NULL,
    month INTEGER NOT NULL,           -- 1-12, 0 when unrecognized
    date TEXT NOT NULL,               -- raw day spec
    time TEXT NOT NULL,               -- HH:MM:SS[.fff]
    time_type TEXT NOT NULL,
    letter TEXT
)
"#;

const CREATE_LEAPS_TABLE: &str = r#"
CREATE TABLE leaps (
    id INTEGER PRIMARY KEY,
    year INTEGER NOT NULL,
    month TEXT NOT NULL,
    day INTEGER NOT NULL,
    time TEXT NOT NULL,
    correction TEXT,
    rs TEXT
)
"#;

const CREATE_CITIES_TABLE: &str = r#"
CREATE TABLE cities (
    id INTEGER PRIMARY KEY,
    geoname_id INTEGER,
    name TEXT,
    ascii_name TEXT,
    alternate_names TEXT,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    feature_class TEXT,
    feature_code TEXT,
    country_code TEXT,
    country_code2 TEXT,
    admin1_code TEXT,
    admin2_code TEXT,
    admin3_code TEXT,
    admin4_code TEXT,
    population INTEGER,
    elevation INTEGER,
    gtopo30 INTEGER,
    timezone_id INTEGER NOT NULL,
    timezone_name TEXT NOT NULL,
    modification_date TEXT NOT NULL  -- YYYY-MM-DD
)
"#;

const CREATE_FEATURE_CODES_TABLE: &str = r#"
CREATE TABLE feature_codes (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT
)
"#;

const CREATE_INGEST_INFO_TABLE: &str = r#"
CREATE TABLE ingest_info (
    key TEXT PRIMARY KEY,
    value TEXT
)
"#;

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_rules_name ON rules(name)",
    "CREATE INDEX IF NOT EXISTS idx_timezones_country ON timezones(country_code)",
    "CREATE INDEX IF NOT EXISTS idx_cities_timezone ON cities(timezone_id)",
    "CREATE INDEX IF NOT EXISTS idx_cities_country ON cities(country_code)",
    "CREATE INDEX IF NOT EXISTS idx_cities_ascii_name ON cities(ascii_name)",
    "CREATE INDEX IF NOT EXISTS idx_feature_codes_code ON feature_codes(code)",
];

const WRITE_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = OFF;
PRAGMA cache_size = -64000;      -- 64MB cache
PRAGMA temp_store = MEMORY;
PRAGMA page_size = 4096;
PRAGMA auto_vacuum = NONE;
"#;

const READ_PRAGMAS: &str = r#"
PRAGMA synchronous = FULL;
"#;

/// Configure a connection for bulk writes and recreate every table
pub fn create_database(conn: &Connection) -> SinkResult<()> {
    conn.execute_batch(WRITE_PRAGMAS)?;
    conn.execute_batch(DROP_TABLES)?;

    conn.execute(CREATE_TIMEZONES_TABLE, [])?;
    conn.execute(CREATE_RULES_TABLE, [])?;
    conn.execute(CREATE_LEAPS_TABLE, [])?;
    conn.execute(CREATE_CITIES_TABLE, [])?;
    conn.execute(CREATE_FEATURE_CODES_TABLE, [])?;
    conn.execute(CREATE_INGEST_INFO_TABLE, [])?;

    Ok(())
}

/// Create indexes (after the bulk insert)
pub fn create_indexes(conn: &Connection) -> SinkResult<()> {
    for sql in CREATE_INDEXES {
        conn.execute(sql, [])?;
    }
    Ok(())
}

pub fn optimize_for_reads(conn: &Connection) -> SinkResult<()> {
    conn.execute_batch(READ_PRAGMAS)?;
    conn.execute("ANALYZE", [])?;
    Ok(())
}

/// Store run metadata
pub fn set_ingest_info(conn: &Connection, key: &str, value: &str) -> SinkResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO ingest_info (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

pub fn get_ingest_info(conn: &Connection, key: &str) -> SinkResult<Option<String>> {
    let result = conn.query_row(
        "SELECT value FROM ingest_info WHERE key = ?1",
        [key],
        |row| row.get(0),
    );

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Render a time of day or duration as `[-]HH:MM:SS`, with `.fff` appended
/// when there are milliseconds.
pub fn format_duration(value: TimeDelta) -> String {
    let sign = if value < TimeDelta::zero() { "-" } else { "" };
    let value = value.abs();
    let secs = value.num_seconds();
    let millis = value.subsec_nanos() / 1_000_000;

    let base = format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    );
    if millis > 0 {
        format!("{}.{:03}", base, millis)
    } else {
        base
    }
}

/// Metadata keys stored in `ingest_info`
pub mod keys {
    /// Tz database directory that was ingested
    pub const SOURCE_TZDB: &str = "source_tzdb";

    /// Gazetteer directory that was ingested
    pub const SOURCE_GAZETTEER: &str = "source_gazetteer";

    /// Timestamp when the run started (RFC 3339)
    pub const START_TIME: &str = "start_time";

    /// Timestamp when the run completed (RFC 3339)
    pub const END_TIME: &str = "end_time";

    pub const DURATION_SECS: &str = "duration_secs";

    /// Number of gazetteer workers used
    pub const WORKER_COUNT: &str = "worker_count";

    /// Year used by the until-year and rule filters
    pub const CURRENT_YEAR: &str = "current_year";

    pub const TIMEZONE_COUNT: &str = "timezone_count";
    pub const RULE_COUNT: &str = "rule_count";
    pub const LEAP_COUNT: &str = "leap_count";
    pub const CITY_COUNT: &str = "city_count";
    pub const FEATURE_CODE_COUNT: &str = "feature_code_count";

    /// Number of reported issues
    pub const ISSUE_COUNT: &str = "issue_count";

    pub const SCHEMA_VERSION: &str = "schema_version";

    /// Version of this tool
    pub const TOOL_VERSION: &str = "tool_version";

    /// Run status: "running", "completed"
    pub const STATUS: &str = "status";
}
