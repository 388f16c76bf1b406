//! Configuration types for tzdb-ingest
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::error::ConfigError;
use crate::queue::DEFAULT_TZ_FILES;
use chrono::Datelike;
use clap::Parser;
use regex::Regex;
use std::path::PathBuf;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Batch size limits
const MIN_BATCH_SIZE: usize = 100;
const MAX_BATCH_SIZE: usize = 100_000;

/// Largest year the rule tables can hold
const MAX_YEAR: i32 = i16::MAX as i32;

/// Load the tz rule database and a geonames gazetteer into SQLite
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tzdb-ingest",
    version,
    about = "Load the tz rule database and a geonames gazetteer into SQLite",
    long_about = "Parses a tz database directory (Zone, Rule, Link and Leap lines) and a\n\
                  geonames gazetteer directory (tab-separated city files), joins every city\n\
                  to its time zone and writes normalized tables to a SQLite database.\n\n\
                  Rules and zones that no longer apply in the given year are skipped.",
    after_help = "EXAMPLES:\n    \
        tzdb-ingest --tzdb ./tzdata --gazetteer ./geonames -o world.db\n    \
        tzdb-ingest --tzdb ./tzdata --year 2030 -o future.db\n    \
        tzdb-ingest --gazetteer ./geonames --tzdb ./tzdata --feature-codes ./featureCodes_en.txt -w 8\n    \
        tzdb-ingest --tzdb ./tzdata --tz-file europe --tz-file backward --dry-run"
)]
pub struct CliArgs {
    /// Tz database directory
    #[arg(long, value_name = "DIR")]
    pub tzdb: Option<PathBuf>,

    /// Gazetteer directory of city files
    #[arg(long, value_name = "DIR")]
    pub gazetteer: Option<PathBuf>,

    /// Gazetteer feature-code file (code, name, description)
    #[arg(long, value_name = "FILE")]
    pub feature_codes: Option<PathBuf>,

    /// Output SQLite database
    #[arg(short, long, default_value = "tzdb.db", value_name = "FILE")]
    pub output: PathBuf,

    /// Number of gazetteer worker threads
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Year used to filter rules and zones (defaults to the current year)
    #[arg(long, value_name = "YYYY")]
    pub year: Option<i32>,

    /// Rows per SQLite transaction
    #[arg(short = 'b', long, default_value = "5000", value_name = "NUM")]
    pub batch_size: usize,

    /// Accepted tz data file name (can be repeated; replaces the default set)
    #[arg(long = "tz-file", value_name = "NAME", action = clap::ArgAction::Append)]
    pub tz_files: Vec<String>,

    /// Skip file paths matching pattern (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Parse and join everything without writing a database
    #[arg(long)]
    pub dry_run: bool,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_workers() -> usize {
    num_cpus::get()
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Tz database directory
    pub tzdb_dir: Option<PathBuf>,

    /// Gazetteer directory
    pub gazetteer_dir: Option<PathBuf>,

    /// Feature-code reference file
    pub feature_codes_path: Option<PathBuf>,

    /// Output database path
    pub output_path: PathBuf,

    /// Number of gazetteer workers
    pub worker_count: usize,

    /// Year for the rule and until-year filters
    pub current_year: i32,

    /// SQLite rows per transaction
    pub batch_size: usize,

    /// Accepted tz data file names
    pub tz_files: Vec<String>,

    /// Compiled exclude patterns
    pub exclude_patterns: Vec<Regex>,

    /// Write to memory instead of SQLite
    pub dry_run: bool,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl IngestConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.tzdb.is_none() && args.gazetteer.is_none() {
            return Err(ConfigError::NoInputDirectory);
        }

        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        if args.batch_size < MIN_BATCH_SIZE || args.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::InvalidBatchSize {
                size: args.batch_size,
                min: MIN_BATCH_SIZE,
                max: MAX_BATCH_SIZE,
            });
        }

        let current_year = args.year.unwrap_or_else(|| chrono::Local::now().year());
        if current_year < 1 || current_year > MAX_YEAR {
            return Err(ConfigError::InvalidYear {
                year: current_year,
                max: MAX_YEAR,
            });
        }

        let exclude_patterns = args
            .exclude_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::InvalidExcludePattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if !args.dry_run {
            if let Some(parent) = args.output.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(ConfigError::InvalidOutputPath {
                        path: args.output.clone(),
                        reason: format!("Parent directory '{}' does not exist", parent.display()),
                    });
                }
            }
        }

        let tz_files = if args.tz_files.is_empty() {
            DEFAULT_TZ_FILES.iter().map(|s| s.to_string()).collect()
        } else {
            args.tz_files
        };

        Ok(Self {
            tzdb_dir: args.tzdb,
            gazetteer_dir: args.gazetteer,
            feature_codes_path: args.feature_codes,
            output_path: args.output,
            worker_count: args.workers,
            current_year,
            batch_size: args.batch_size,
            tz_files,
            exclude_patterns,
            dry_run: args.dry_run,
            show_progress: !args.quiet,
            verbose: args.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["tzdb-ingest"];
        argv.extend_from_slice(extra);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn test_requires_an_input_directory() {
        let err = IngestConfig::from_args(args(&["--dry-run"])).unwrap_err();
        assert!(matches!(err, ConfigError::NoInputDirectory));
    }

    #[test]
    fn test_defaults() {
        let config = IngestConfig::from_args(args(&["--tzdb", "/tz", "--year", "2024"])).unwrap();
        assert_eq!(config.tzdb_dir, Some(PathBuf::from("/tz")));
        assert_eq!(config.gazetteer_dir, None);
        assert_eq!(config.current_year, 2024);
        assert_eq!(config.batch_size, 5000);
        assert_eq!(config.output_path, PathBuf::from("tzdb.db"));
        assert_eq!(config.tz_files.len(), DEFAULT_TZ_FILES.len());
        assert!(config.show_progress);
    }

    #[test]
    fn test_tz_files_replace_defaults() {
        let config = IngestConfig::from_args(args(&[
            "--tzdb",
            "/tz",
            "--tz-file",
            "europe",
            "--tz-file",
            "backward",
        ]))
        .unwrap();
        assert_eq!(config.tz_files, vec!["europe", "backward"]);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            IngestConfig::from_args(args(&["--tzdb", "/tz", "-w", "0"])),
            Err(ConfigError::InvalidWorkerCount { count: 0, .. })
        ));
        assert!(matches!(
            IngestConfig::from_args(args(&["--tzdb", "/tz", "-b", "10"])),
            Err(ConfigError::InvalidBatchSize { size: 10, .. })
        ));
        assert!(matches!(
            IngestConfig::from_args(args(&["--tzdb", "/tz", "--year", "40000"])),
            Err(ConfigError::InvalidYear { year: 40000, .. })
        ));
        assert!(matches!(
            IngestConfig::from_args(args(&["--tzdb", "/tz", "--exclude", "("])),
            Err(ConfigError::InvalidExcludePattern { .. })
        ));
    }

    #[test]
    fn test_exclude_pattern() {
        let config = IngestConfig::from_args(args(&[
            "--gazetteer",
            "/geo",
            "--exclude",
            r"allCountries\.txt$",
        ]))
        .unwrap();

        assert_eq!(config.exclude_patterns.len(), 1);
        assert!(config.exclude_patterns[0].is_match("/geo/allCountries.txt"));
        assert!(!config.exclude_patterns[0].is_match("/geo/FR.txt"));
    }
}
