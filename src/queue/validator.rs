//! File classification and directory population
//!
//! A [`FileValidator`] sniffs a file's name, extension and first line to
//! accept or reject it. [`FileValidator::populate`] enumerates one directory
//! into a [`ValidatedFileQueue`] and always signals completion, because it
//! takes the producer by value.

use super::file_queue::{FileKind, FileQueueProducer, ValidatedFile};
use crate::error::ValidationError;
use crate::fs::FileSystem;
use crate::report::{Issue, IssueKind, IssueReporter, Location};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Tz data files accepted by default
pub const DEFAULT_TZ_FILES: &[&str] = &[
    "africa",
    "antarctica",
    "asia",
    "australasia",
    "europe",
    "northamerica",
    "southamerica",
];

/// Country-code reference file
pub const ISO3166_TAB: &str = "iso3166.tab";

/// Zone-name reference file
pub const ZONE_TAB: &str = "zone.tab";

/// Minimum tab-separated tokens on the first line of a gazetteer file
pub const MIN_GAZETTEER_TOKENS: usize = 11;

/// Which family of files a validator accepts
#[derive(Debug, Clone)]
enum Family {
    Tz { names: HashSet<String> },
    Gazetteer,
}

/// Classifies files and populates queues
#[derive(Debug, Clone)]
pub struct FileValidator {
    family: Family,
    excludes: Vec<Regex>,
}

/// Outcome of populating one directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateStats {
    pub accepted: u64,
    pub rejected: u64,
    pub excluded: u64,
    pub bytes: u64,
}

impl FileValidator {
    /// Validator for a tz database directory.
    ///
    /// `data_files` are the accepted data file names; the two reference
    /// files are always accepted.
    pub fn tz<I, S>(data_files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: HashSet<String> = data_files.into_iter().map(Into::into).collect();
        names.insert(ISO3166_TAB.to_string());
        names.insert(ZONE_TAB.to_string());
        Self {
            family: Family::Tz { names },
            excludes: Vec::new(),
        }
    }

    /// Validator for the default tz file set
    pub fn tz_default() -> Self {
        Self::tz(DEFAULT_TZ_FILES.iter().copied())
    }

    /// Validator for a gazetteer directory
    pub fn gazetteer() -> Self {
        Self {
            family: Family::Gazetteer,
            excludes: Vec::new(),
        }
    }

    /// Skip paths matching any of `patterns` during population
    pub fn with_excludes(mut self, patterns: Vec<Regex>) -> Self {
        self.excludes = patterns;
        self
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        self.excludes.iter().any(|re| re.is_match(&text))
    }

    /// Check that `dir` can be parsed at all
    pub fn validate_directory(
        &self,
        fs: &dyn FileSystem,
        dir: &Path,
    ) -> Result<(), ValidationError> {
        if !fs.is_dir(dir) {
            return Err(ValidationError::NotFound {
                path: dir.to_path_buf(),
            });
        }

        match &self.family {
            Family::Tz { .. } => {
                for required in [ISO3166_TAB, ZONE_TAB] {
                    if !fs.is_file(&dir.join(required)) {
                        return Err(ValidationError::InvalidDirectory {
                            path: dir.to_path_buf(),
                            reason: format!("missing reference file {}", required),
                        });
                    }
                }
                Ok(())
            }
            Family::Gazetteer => {
                let files = fs
                    .list_files(dir)
                    .map_err(|e| ValidationError::ReadFailed {
                        path: dir.to_path_buf(),
                        reason: e.to_string(),
                    })?;
                if files.iter().any(|f| self.validate(fs, f).is_ok()) {
                    Ok(())
                } else {
                    Err(ValidationError::InvalidDirectory {
                        path: dir.to_path_buf(),
                        reason: "no gazetteer files found".into(),
                    })
                }
            }
        }
    }

    /// Classify a single file
    pub fn validate(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
    ) -> Result<ValidatedFile, ValidationError> {
        let kind = match &self.family {
            Family::Tz { names } => validate_tz(fs, path, names)?,
            Family::Gazetteer => validate_gazetteer(fs, path)?,
        };

        let size = fs.file_size(path).map_err(|e| ValidationError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(ValidatedFile::new(path.to_path_buf(), kind, size))
    }

    /// Enumerate `dir`, pushing accepted files to `producer`.
    ///
    /// The producer is consumed, so the queue is marked complete when this
    /// returns, whether it succeeds or not.
    pub fn populate(
        &self,
        fs: &dyn FileSystem,
        dir: &Path,
        producer: FileQueueProducer,
        reporter: &dyn IssueReporter,
    ) -> Result<PopulateStats, ValidationError> {
        let mut stats = PopulateStats::default();

        let files = fs
            .list_files(dir)
            .map_err(|e| ValidationError::ReadFailed {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;

        for path in files {
            if self.is_excluded(&path) {
                debug!(file = %path.display(), "Excluded by pattern");
                stats.excluded += 1;
                continue;
            }

            match self.validate(fs, &path) {
                Ok(file) => {
                    debug!(file = %path.display(), kind = ?file.kind, "Accepted");
                    stats.accepted += 1;
                    stats.bytes += file.size;
                    producer.push(file);
                }
                Err(e) => {
                    stats.rejected += 1;
                    reporter.report(
                        Issue::low(IssueKind::FileRejected, e.to_string())
                            .at(Location::file(e.path())),
                    );
                }
            }
        }

        info!(
            dir = %dir.display(),
            accepted = stats.accepted,
            rejected = stats.rejected,
            "Directory populated"
        );

        producer.complete();
        Ok(stats)
    }
}

fn read_header(fs: &dyn FileSystem, path: &Path) -> Result<String, ValidationError> {
    match fs.read_first_line(path) {
        Ok(Some(line)) => Ok(line),
        Ok(None) => Err(ValidationError::InvalidHeader {
            path: path.to_path_buf(),
            reason: "file is empty".into(),
        }),
        Err(e) => Err(ValidationError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

fn validate_tz(
    fs: &dyn FileSystem,
    path: &Path,
    names: &HashSet<String>,
) -> Result<FileKind, ValidationError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    if !names.contains(&name) {
        return Err(ValidationError::UnacceptedName {
            path: path.to_path_buf(),
        });
    }

    let kind = match path.extension() {
        None => FileKind::Data,
        Some(ext) if ext == "tab" => FileKind::TabReference,
        Some(_) => {
            return Err(ValidationError::UnsupportedExtension {
                path: path.to_path_buf(),
            })
        }
    };

    let header = read_header(fs, path)?;
    if !header.starts_with('#') {
        return Err(ValidationError::InvalidHeader {
            path: path.to_path_buf(),
            reason: "expected a comment line".into(),
        });
    }

    Ok(kind)
}

fn validate_gazetteer(fs: &dyn FileSystem, path: &Path) -> Result<FileKind, ValidationError> {
    let is_txt = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("txt"))
        .unwrap_or(false);
    if !is_txt {
        return Err(ValidationError::UnsupportedExtension {
            path: path.to_path_buf(),
        });
    }

    let header = read_header(fs, path)?;
    let mut tokens = header.split('\t');
    let first = tokens.next().unwrap_or_default();
    if first.trim().parse::<i64>().is_err() {
        return Err(ValidationError::InvalidHeader {
            path: path.to_path_buf(),
            reason: format!("first column '{}' is not an id", first),
        });
    }

    let count = 1 + tokens.count();
    if count < MIN_GAZETTEER_TOKENS {
        return Err(ValidationError::InvalidHeader {
            path: path.to_path_buf(),
            reason: format!(
                "{} columns, expected at least {}",
                count, MIN_GAZETTEER_TOKENS
            ),
        });
    }

    Ok(FileKind::Data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use crate::queue::ValidatedFileQueue;
    use crate::report::CollectingReporter;
    use std::path::PathBuf;

    const CITY: &str = "2988507\tParis\tParis\t\t48.85341\t2.3488\tP\tPPLC\tFR\t\t11\t75\t751\t75056\t2138551\t\t42\tEurope/Paris\t2023-06-05\n";

    fn tz_fs() -> MemoryFs {
        MemoryFs::new()
            .with_file("/tz/iso3166.tab", "# <pre>\nFR\tFrance\n")
            .with_file("/tz/zone.tab", "# tz zone descriptions\nFR\t+4852+00220\tEurope/Paris\n")
            .with_file("/tz/europe", "# europe\nZone Europe/Paris 1:00 EU CE%sT\n")
            .with_file("/tz/leapseconds", "# leap\n")
            .with_file("/tz/asia", "no header\n")
            .with_file("/tz/europe.zi", "# compiled\n")
    }

    #[test]
    fn test_tz_classification() {
        let fs = tz_fs();
        let validator = FileValidator::tz_default();

        let europe = validator.validate(&fs, Path::new("/tz/europe")).unwrap();
        assert_eq!(europe.kind, FileKind::Data);

        let tab = validator.validate(&fs, Path::new("/tz/zone.tab")).unwrap();
        assert_eq!(tab.kind, FileKind::TabReference);

        assert!(matches!(
            validator.validate(&fs, Path::new("/tz/leapseconds")),
            Err(ValidationError::UnacceptedName { .. })
        ));
        assert!(matches!(
            validator.validate(&fs, Path::new("/tz/asia")),
            Err(ValidationError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_tz_directory_requires_reference_files() {
        let validator = FileValidator::tz_default();
        assert!(validator.validate_directory(&tz_fs(), Path::new("/tz")).is_ok());

        let fs = MemoryFs::new().with_file("/tz/europe", "# europe\n");
        assert!(matches!(
            validator.validate_directory(&fs, Path::new("/tz")),
            Err(ValidationError::InvalidDirectory { .. })
        ));
        assert!(matches!(
            validator.validate_directory(&fs, Path::new("/nope")),
            Err(ValidationError::NotFound { .. })
        ));
    }

    #[test]
    fn test_gazetteer_classification() {
        let fs = MemoryFs::new()
            .with_file("/geo/FR.txt", CITY)
            .with_file("/geo/readme.txt", "Readme for the dump\n")
            .with_file("/geo/short.txt", "1\ta\tb\n")
            .with_file("/geo/FR.csv", CITY);
        let validator = FileValidator::gazetteer();

        assert!(validator.validate(&fs, Path::new("/geo/FR.txt")).is_ok());
        assert!(validator.validate(&fs, Path::new("/geo/readme.txt")).is_err());
        assert!(validator.validate(&fs, Path::new("/geo/short.txt")).is_err());
        assert!(matches!(
            validator.validate(&fs, Path::new("/geo/FR.csv")),
            Err(ValidationError::UnsupportedExtension { .. })
        ));
        assert!(validator.validate_directory(&fs, Path::new("/geo")).is_ok());
    }

    #[test]
    fn test_populate_reports_rejections_and_completes() {
        let fs = tz_fs();
        let reporter = CollectingReporter::new();
        let (queue, producer) = ValidatedFileQueue::new();

        let stats = FileValidator::tz_default()
            .populate(&fs, Path::new("/tz"), producer, &reporter)
            .unwrap();

        assert_eq!(stats.accepted, 3);
        assert_eq!(stats.rejected, 3);
        assert_eq!(reporter.count(IssueKind::FileRejected), 3);
        assert!(queue.is_completed());

        let paths: Vec<PathBuf> = queue.consume().map(|f| f.path).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/tz/europe"),
                PathBuf::from("/tz/iso3166.tab"),
                PathBuf::from("/tz/zone.tab"),
            ]
        );
    }

    #[test]
    fn test_populate_failure_still_completes() {
        let fs = MemoryFs::new();
        let reporter = CollectingReporter::new();
        let (queue, producer) = ValidatedFileQueue::new();

        let result =
            FileValidator::gazetteer().populate(&fs, Path::new("/missing"), producer, &reporter);
        assert!(result.is_err());
        assert!(queue.is_completed());
        assert_eq!(queue.consume().count(), 0);
    }

    #[test]
    fn test_excludes() {
        let fs = tz_fs();
        let reporter = CollectingReporter::new();
        let (queue, producer) = ValidatedFileQueue::new();

        let stats = FileValidator::tz_default()
            .with_excludes(vec![Regex::new("europe").unwrap()])
            .populate(&fs, Path::new("/tz"), producer, &reporter)
            .unwrap();

        assert_eq!(stats.excluded, 2);
        assert_eq!(queue.consume().count(), 2);
    }
}
