//! Reference (`.tab`) files
//!
//! `iso3166.tab` maps two-letter country codes to names. `zone.tab` lists
//! zone names with their country code, coordinates and an optional comment.
//! Each non-comment line of `zone.tab` receives the next surrogate id, in
//! file order.

use crate::error::TzError;
use crate::fs::FileSystem;
use crate::report::{Issue, IssueKind, IssueReporter, Location};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use tracing::debug;

/// Reference data for one zone name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneInfo {
    pub id: u32,
    pub country_code: String,
    pub country_name: String,
    pub coordinates: String,
    pub comment: Option<String>,
}

/// Zone name to reference data, plus the last id handed out
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    zones: HashMap<String, ZoneInfo>,
    last_id: u32,
}

impl ReferenceIndex {
    pub fn get(&self, name: &str) -> Option<&ZoneInfo> {
        self.zones.get(name)
    }

    /// Highest id assigned from `zone.tab`
    pub fn last_id(&self) -> u32 {
        self.last_id
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

fn is_skippable(line: &str) -> bool {
    line.trim().is_empty() || line.starts_with('#')
}

fn read_lines(
    fs: &dyn FileSystem,
    path: &Path,
) -> Result<impl Iterator<Item = (u64, std::io::Result<String>)>, TzError> {
    let reader = fs.open(path).map_err(|e| TzError::ReferenceFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok((1u64..).zip(reader.lines()))
}

/// Parse `iso3166.tab` into a country code to name map
pub fn read_country_codes(
    fs: &dyn FileSystem,
    path: &Path,
    reporter: &dyn IssueReporter,
) -> Result<HashMap<String, String>, TzError> {
    let mut countries = HashMap::with_capacity(275);

    for (number, line) in read_lines(fs, path)? {
        let line = line.map_err(|e| TzError::ReferenceFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if is_skippable(&line) {
            continue;
        }

        match line.split_once('\t') {
            Some((code, name)) if !code.is_empty() => {
                countries.insert(code.trim().to_string(), name.trim().to_string());
            }
            _ => reporter.report(
                Issue::low(IssueKind::MalformedRecord, "country line without a name")
                    .at(Location::line(path, number)),
            ),
        }
    }

    debug!(file = %path.display(), countries = countries.len(), "Read country codes");
    Ok(countries)
}

/// Parse `zone.tab`, assigning ids 1, 2, 3... to its lines
pub fn read_zone_tab(
    fs: &dyn FileSystem,
    path: &Path,
    countries: &HashMap<String, String>,
    reporter: &dyn IssueReporter,
) -> Result<ReferenceIndex, TzError> {
    let mut index = ReferenceIndex {
        zones: HashMap::with_capacity(450),
        last_id: 0,
    };

    for (number, line) in read_lines(fs, path)? {
        let line = line.map_err(|e| TzError::ReferenceFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if is_skippable(&line) {
            continue;
        }

        let mut fields = line.split('\t');
        let (Some(code), Some(coordinates), Some(name)) = (fields.next(), fields.next(), fields.next())
        else {
            reporter.report(
                Issue::low(IssueKind::MalformedRecord, "zone line needs code, coordinates and name")
                    .at(Location::line(path, number)),
            );
            continue;
        };
        let comment = fields.next().filter(|c| !c.is_empty()).map(str::to_string);

        index.last_id += 1;
        let id = index.last_id;

        let country_name = match countries.get(code) {
            Some(name) => name.clone(),
            None => {
                reporter.report(
                    Issue::low(
                        IssueKind::MissingReference,
                        format!("no country name for code {} (zone id {})", code, id),
                    )
                    .at(Location::line(path, number)),
                );
                String::new()
            }
        };

        let info = ZoneInfo {
            id,
            country_code: code.to_string(),
            country_name,
            coordinates: coordinates.to_string(),
            comment,
        };

        if index.zones.insert(name.to_string(), info).is_some() {
            reporter.report(
                Issue::low(IssueKind::DuplicateName, format!("{} listed twice", name))
                    .at(Location::line(path, number)),
            );
        }
    }

    debug!(file = %path.display(), zones = index.len(), "Read zone table");
    Ok(index)
}
