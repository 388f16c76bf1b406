//! Sequential tz database parser
//!
//! One thread reads every data file in queue order. Lines are classified by
//! their first token (`Rule`, `Zone`, `Link`, `Leap`); anything else
//! continues the most recently opened `Zone` block. A `Zone` record is built
//! when its block closes: its name comes from the header line, and its
//! offset, rules, format and until fields come from the last line of the
//! block only.
//!
//! Links are collected during the pass and resolved afterwards, one hop,
//! in encounter order.

use super::fields::{
    or_report, parse_char, parse_duration, parse_end_year, parse_letter, parse_month,
    parse_offset, parse_rule_name, parse_save, parse_short, parse_start_year, parse_time_of_day,
    split_time_type, year_range_contains,
};
use super::index::{TzIndexBuilder, TzNameIndex};
use super::tab::{read_country_codes, read_zone_tab, ReferenceIndex};
use crate::error::{Result, TzError};
use crate::events::{EntryRef, EventBus};
use crate::fs::FileSystem;
use crate::queue::{FileKind, ValidatedFileQueue, ISO3166_TAB, ZONE_TAB};
use crate::records::{LeapRecord, LinkRecord, RuleRecord, TimeZoneRecord, YEAR_MIN};
use crate::report::{Issue, IssueKind, IssueReporter, Location};
use chrono::TimeDelta;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, trace};

pub const COMMENT_CHAR: char = '#';

const RULE: &str = "Rule";
const ZONE: &str = "Zone";
const LINK: &str = "Link";
const LEAP: &str = "Leap";

/// Counters for one parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TzParseStats {
    pub files: u64,
    pub lines: u64,
    pub zones: u64,
    pub zones_filtered: u64,
    pub rules: u64,
    pub rules_filtered: u64,
    pub leaps: u64,
    pub links: u64,
    pub links_resolved: u64,
    /// Records dropped for a missing reference, a duplicate name or a
    /// malformed line
    pub dropped: u64,
}

/// Everything produced by one parse
#[derive(Debug)]
pub struct TzParseOutput {
    /// Zones in header order, then resolved links in encounter order
    pub time_zones: Vec<TimeZoneRecord>,
    pub rules: Vec<RuleRecord>,
    pub leaps: Vec<LeapRecord>,
    pub index: TzNameIndex,
    pub stats: TzParseStats,
}

/// A `Zone` header and the fields of the latest line of its block
#[derive(Debug)]
struct ZoneBlock {
    name: String,
    location: Location,
    /// STDOFF RULES FORMAT [UNTIL...]
    fields: Vec<String>,
}

/// Mutable state for one run
struct ParseState {
    reference: ReferenceIndex,
    builder: TzIndexBuilder,
    next_id: u32,
    links: Vec<(LinkRecord, Location)>,
    time_zones: Vec<TimeZoneRecord>,
    rules: Vec<RuleRecord>,
    leaps: Vec<LeapRecord>,
    stats: TzParseStats,
}

/// Single-pass parser for a tz database directory
pub struct TzDatabaseParser {
    fs: Arc<dyn FileSystem>,
    reporter: Arc<dyn IssueReporter>,
    events: EventBus,
    current_year: i32,
}

impl TzDatabaseParser {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        reporter: Arc<dyn IssueReporter>,
        events: EventBus,
        current_year: i32,
    ) -> Self {
        Self {
            fs,
            reporter,
            events,
            current_year,
        }
    }

    /// Parse the directory `dir` whose accepted files arrive on `files`.
    ///
    /// Reference files are read first, directly from `dir`; the queue is
    /// then drained in order and `.tab` entries in it are skipped.
    pub fn parse(&self, dir: &Path, files: ValidatedFileQueue) -> Result<TzParseOutput> {
        let iso_path = dir.join(ISO3166_TAB);
        let zone_path = dir.join(ZONE_TAB);

        self.events.file_started(&iso_path)?;
        let countries =
            read_country_codes(self.fs.as_ref(), &iso_path, self.reporter.as_ref())?;
        self.events.file_finished(&iso_path)?;

        self.events.file_started(&zone_path)?;
        let reference = read_zone_tab(
            self.fs.as_ref(),
            &zone_path,
            &countries,
            self.reporter.as_ref(),
        )?;
        self.events.file_finished(&zone_path)?;

        let mut state = ParseState {
            next_id: reference.last_id(),
            reference,
            builder: TzIndexBuilder::new(),
            links: Vec::new(),
            time_zones: Vec::new(),
            rules: Vec::new(),
            leaps: Vec::new(),
            stats: TzParseStats::default(),
        };

        for file in files.consume() {
            if file.kind == FileKind::TabReference {
                continue;
            }
            self.parse_file(&file.path, &mut state)?;
        }

        self.resolve_links(&mut state)?;
        self.events.directory_finished(dir)?;

        info!(
            zones = state.stats.zones,
            rules = state.stats.rules,
            links = state.stats.links_resolved,
            leaps = state.stats.leaps,
            "Tz database parsed"
        );

        Ok(TzParseOutput {
            time_zones: state.time_zones,
            rules: state.rules,
            leaps: state.leaps,
            index: state.builder.freeze(),
            stats: state.stats,
        })
    }

    fn parse_file(&self, path: &Path, state: &mut ParseState) -> Result<()> {
        debug!(file = %path.display(), "Parsing tz file");
        self.events.file_started(path)?;

        let reader = self.fs.open(path).map_err(|e| TzError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut open: Option<ZoneBlock> = None;

        for (number, line) in (1u64..).zip(reader.lines()) {
            let line = line.map_err(|e| TzError::ReadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            state.stats.lines += 1;

            let content = strip_comment(&line);
            let tokens: Vec<&str> = content.split_whitespace().collect();
            let Some(&keyword) = tokens.first() else {
                continue;
            };
            let location = || Location::line(path, number);

            match keyword {
                RULE | ZONE | LINK | LEAP => {
                    if let Some(block) = open.take() {
                        self.close_zone(block, state)?;
                    }
                }
                _ => {
                    match open.as_mut() {
                        Some(block) => {
                            block.fields = tokens.iter().map(|t| t.to_string()).collect();
                        }
                        None => debug!(file = %path.display(), line = number, "Orphan continuation line"),
                    }
                    continue;
                }
            }

            match keyword {
                RULE => self.handle_rule(&tokens, location, state)?,
                ZONE => {
                    if tokens.len() < 5 {
                        self.malformed("Zone", location(), state);
                        continue;
                    }
                    open = Some(ZoneBlock {
                        name: tokens[1].to_string(),
                        location: location(),
                        fields: tokens[2..].iter().map(|t| t.to_string()).collect(),
                    });
                }
                LINK => self.handle_link(&tokens, location, state)?,
                _ => self.handle_leap(&tokens, location, state)?,
            }
        }

        if let Some(block) = open.take() {
            self.close_zone(block, state)?;
        }

        state.stats.files += 1;
        self.events.file_finished(path)?;
        Ok(())
    }

    fn malformed(&self, what: &str, location: Location, state: &mut ParseState) {
        state.stats.dropped += 1;
        self.reporter.report(
            Issue::low(
                IssueKind::MalformedRecord,
                format!("{} line has too few fields", what),
            )
            .at(location),
        );
    }

    fn close_zone(&self, block: ZoneBlock, state: &mut ParseState) -> Result<()> {
        let reporter = self.reporter.as_ref();
        let ZoneBlock {
            name,
            location,
            fields,
        } = block;

        if fields.len() < 3 {
            self.malformed("Zone continuation", location, state);
            return Ok(());
        }

        if let Some(until) = fields.get(3) {
            match until.parse::<i32>() {
                Ok(year) if year < self.current_year => {
                    trace!(zone = %name, until = year, "Zone ended before current year");
                    state.stats.zones_filtered += 1;
                    return Ok(());
                }
                Ok(_) => {}
                Err(_) => reporter.report(
                    Issue::low(
                        IssueKind::FieldGrammar,
                        format!("invalid until year '{}' for {}", until, name),
                    )
                    .at(location.clone()),
                ),
            }
        }

        let Some(info) = state.reference.get(&name) else {
            state.stats.dropped += 1;
            reporter.report(
                Issue::low(
                    IssueKind::MissingReference,
                    format!("zone {} is not listed in {}", name, ZONE_TAB),
                )
                .at(location),
            );
            return Ok(());
        };

        let bias = or_report(parse_offset(&fields[0]), 0, reporter, || location.clone());

        let record = TimeZoneRecord {
            id: info.id,
            name,
            bias,
            rule_name: parse_rule_name(&fields[1]),
            format: fields[2].clone(),
            country_code: info.country_code.clone(),
            country_name: info.country_name.clone(),
            comment: info.comment.clone(),
            coordinates: Some(info.coordinates.clone()),
        };

        if !state.builder.insert(record.clone()) {
            state.stats.dropped += 1;
            reporter.report(
                Issue::low(
                    IssueKind::DuplicateName,
                    format!("zone {} defined more than once", record.name),
                )
                .at(location),
            );
            return Ok(());
        }

        self.events.entry_parsed(EntryRef::TimeZone(&record))?;
        state.stats.zones += 1;
        state.time_zones.push(record);
        Ok(())
    }

    // Rule NAME FROM TO TYPE IN ON AT SAVE LETTER/S
    fn handle_rule(
        &self,
        tokens: &[&str],
        location: impl Fn() -> Location,
        state: &mut ParseState,
    ) -> Result<()> {
        if tokens.len() < 10 {
            self.malformed("Rule", location(), state);
            return Ok(());
        }
        let reporter = self.reporter.as_ref();

        let start_year = or_report(parse_start_year(tokens[2]), YEAR_MIN, reporter, &location);
        let end_year = or_report(
            parse_end_year(tokens[3], start_year),
            YEAR_MIN,
            reporter,
            &location,
        );

        if !year_range_contains(start_year, end_year, self.current_year) {
            state.stats.rules_filtered += 1;
            return Ok(());
        }

        let (at, at_type) = split_time_type(tokens[7]);

        let record = RuleRecord {
            name: tokens[1].to_string(),
            bias: or_report(parse_save(tokens[8]), 0, reporter, &location),
            start_year,
            end_year,
            month: or_report(parse_month(tokens[5]), 0, reporter, &location),
            day: tokens[6].to_string(),
            at: or_report(parse_time_of_day(at), TimeDelta::zero(), reporter, &location),
            at_type,
            letter: parse_letter(tokens[9]),
        };

        self.events.entry_parsed(EntryRef::Rule(&record))?;
        state.stats.rules += 1;
        state.rules.push(record);
        Ok(())
    }

    // Link TARGET LINK-NAME
    fn handle_link(
        &self,
        tokens: &[&str],
        location: impl Fn() -> Location,
        state: &mut ParseState,
    ) -> Result<()> {
        if tokens.len() < 3 {
            self.malformed("Link", location(), state);
            return Ok(());
        }

        let link = LinkRecord {
            from: tokens[1].to_string(),
            to: tokens[2].to_string(),
        };
        self.events.entry_parsed(EntryRef::Link(&link))?;
        state.stats.links += 1;
        state.links.push((link, location()));
        Ok(())
    }

    // Leap YEAR MONTH DAY HH:MM:SS CORR R/S
    fn handle_leap(
        &self,
        tokens: &[&str],
        location: impl Fn() -> Location,
        state: &mut ParseState,
    ) -> Result<()> {
        if tokens.len() < 7 {
            self.malformed("Leap", location(), state);
            return Ok(());
        }
        let reporter = self.reporter.as_ref();

        let record = LeapRecord {
            year: or_report(parse_short(tokens[1], "year"), 0, reporter, &location),
            month: tokens[2].to_string(),
            day: or_report(parse_short(tokens[3], "day"), 0, reporter, &location),
            time: or_report(
                parse_duration(tokens[4]),
                TimeDelta::zero(),
                reporter,
                &location,
            ),
            correction: or_report(
                parse_char(tokens[5], "correction").map(Some),
                None,
                reporter,
                &location,
            ),
            rs: or_report(parse_char(tokens[6], "rs").map(Some), None, reporter, &location),
        };

        self.events.entry_parsed(EntryRef::Leap(&record))?;
        state.stats.leaps += 1;
        state.leaps.push(record);
        Ok(())
    }

    /// One pass over the collected links, in encounter order
    fn resolve_links(&self, state: &mut ParseState) -> Result<()> {
        let links = std::mem::take(&mut state.links);

        for (link, location) in links {
            let Some(from) = state.builder.get(&link.from) else {
                state.stats.dropped += 1;
                self.reporter.report(
                    Issue::low(
                        IssueKind::UnresolvedLink,
                        format!("link {} -> {}: target not found", link.to, link.from),
                    )
                    .at(location),
                );
                continue;
            };

            state.next_id += 1;
            let record = TimeZoneRecord {
                id: state.next_id,
                name: link.to,
                ..from.clone()
            };

            if !state.builder.insert(record.clone()) {
                state.stats.dropped += 1;
                self.reporter.report(
                    Issue::low(
                        IssueKind::DuplicateName,
                        format!("link name {} already defined", record.name),
                    )
                    .at(location),
                );
                continue;
            }

            self.events.entry_parsed(EntryRef::TimeZone(&record))?;
            state.stats.links_resolved += 1;
            state.time_zones.push(record);
        }
        Ok(())
    }
}

/// Text before the first comment marker
pub fn strip_comment(line: &str) -> &str {
    match line.find(COMMENT_CHAR) {
        Some(pos) => &line[..pos],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventCounter, ParseEvent, ParseObserver};
    use crate::fs::MemoryFs;
    use crate::queue::FileValidator;
    use crate::report::CollectingReporter;
    use parking_lot::Mutex;

    const ISO: &str = "# <pre>\nFR\tFrance\nUS\tUnited States\nDE\tGermany\n";
    const ZONE_TAB_TEXT: &str = "# zones\n\
FR\t+4852+00220\tEurope/Paris\n\
DE\t+5230+01322\tEurope/Berlin\tmost of Germany\n\
US\t+404251-0740023\tAmerica/New_York\n";

    fn parse(files: &[(&str, &str)], year: i32) -> (TzParseOutput, Arc<CollectingReporter>) {
        let mut fs = MemoryFs::new()
            .with_file("/tz/iso3166.tab", ISO)
            .with_file("/tz/zone.tab", ZONE_TAB_TEXT);
        for (name, content) in files {
            fs = fs.with_file(format!("/tz/{}", name), *content);
        }
        let fs: Arc<dyn FileSystem> = Arc::new(fs);
        let reporter = Arc::new(CollectingReporter::new());

        let (queue, producer) = ValidatedFileQueue::new();
        FileValidator::tz_default()
            .populate(fs.as_ref(), Path::new("/tz"), producer, reporter.as_ref())
            .unwrap();

        let parser = TzDatabaseParser::new(fs, reporter.clone(), EventBus::new(), year);
        (parser.parse(Path::new("/tz"), queue).unwrap(), reporter)
    }

    #[test]
    fn test_strip_comment() {
        assert_eq!(
            strip_comment("Rule EU 1981 max - Mar lastSun 1:00u 1:00 S # x"),
            "Rule EU 1981 max - Mar lastSun 1:00u 1:00 S "
        );
        assert_eq!(strip_comment("# all comment"), "");
        assert_eq!(strip_comment("no comment"), "no comment");
    }

    #[test]
    fn test_zone_uses_last_continuation() {
        let europe = "# europe\n\
Zone Europe/Paris 0:09:21 - LMT 1891 Mar 16\n\
\t\t\t0:09:21 - PMT 1911 Mar 11\n\
\t\t\t1:00 EU CE%sT\n";
        let (out, _) = parse(&[("europe", europe)], 2024);

        assert_eq!(out.time_zones.len(), 1);
        let paris = &out.time_zones[0];
        assert_eq!(paris.name, "Europe/Paris");
        assert_eq!(paris.id, 1);
        assert_eq!(paris.bias, 3600);
        assert_eq!(paris.rule_name.as_deref(), Some("EU"));
        assert_eq!(paris.format, "CE%sT");
        assert_eq!(paris.country_name, "France");
        assert_eq!(paris.coordinates.as_deref(), Some("+4852+00220"));
    }

    #[test]
    fn test_zone_block_skips_comments_and_blank_lines() {
        let europe = "# europe\n\
Zone Europe/Berlin 0:53:28 - LMT 1893 Apr\n\
# a note inside the block\n\
\n\
\t\t\t1:00 Germany CE%sT 1980\n\
\t\t\t1:00 EU CE%sT # current\n\
Rule EU 1981 max - Mar lastSun 1:00u 1:00 S\n";
        let (out, _) = parse(&[("europe", europe)], 2024);

        let berlin = &out.time_zones[0];
        assert_eq!(berlin.rule_name.as_deref(), Some("EU"));
        assert_eq!(berlin.comment.as_deref(), Some("most of Germany"));
        assert_eq!(out.rules.len(), 1);
    }

    #[test]
    fn test_zone_until_filter() {
        let europe = "# europe\n\
Zone Europe/Paris 0:09:21 - LMT 1891 Mar 16\n\
\t\t\t1:00 - CET 1977\n\
Zone Europe/Berlin 1:00 EU CE%sT\n";
        let (out, _) = parse(&[("europe", europe)], 2024);

        assert_eq!(out.time_zones.len(), 1);
        assert_eq!(out.time_zones[0].name, "Europe/Berlin");
        assert_eq!(out.stats.zones_filtered, 1);
        assert!(out.index.get("Europe/Paris").is_none());
    }

    #[test]
    fn test_rule_year_filter() {
        let europe = "# europe\n\
Rule EU 1977 1980 - Apr Sun>=1 1:00u 1:00 S\n\
Rule EU 1981 max - Mar lastSun 1:00u 1:00 S\n\
Rule EU 1996 max - Oct lastSun 1:00u 0 -\n\
Rule EU 2024 only - Jan 1 24:00 0 -\n\
Rule EU 2030 max - Jan 1 2:00s 0 -\n";
        let (out, _) = parse(&[("europe", europe)], 2024);

        assert_eq!(out.rules.len(), 3);
        assert_eq!(out.stats.rules_filtered, 2);

        for rule in &out.rules {
            assert!(rule.start_year <= rule.end_year);
            assert!(year_range_contains(rule.start_year, rule.end_year, 2024));
        }

        let march = &out.rules[0];
        assert_eq!(march.month, 3);
        assert_eq!(march.day, "lastSun");
        assert_eq!(march.at, TimeDelta::hours(1));
        assert_eq!(march.at_type, 'u');
        assert_eq!(march.bias, 3600);
        assert_eq!(march.letter.as_deref(), Some("S"));
        assert_eq!(march.end_year, 32767);

        let october = &out.rules[1];
        assert_eq!(october.bias, 0);
        assert_eq!(october.letter, None);

        let only = &out.rules[2];
        assert_eq!(only.start_year, 2024);
        assert_eq!(only.end_year, 2024);
        assert_eq!(only.at, crate::tzdb::fields::end_of_day());
        assert_eq!(only.at_type, 'w');
    }

    #[test]
    fn test_bad_month_is_reported_not_fatal() {
        let europe = "# europe\nRule EU 1981 max - Xyz lastSun 1:00u 1:00 S\n";
        let (out, reporter) = parse(&[("europe", europe)], 2024);

        assert_eq!(out.rules.len(), 1);
        assert_eq!(out.rules[0].month, 0);
        assert_eq!(reporter.count(IssueKind::FieldGrammar), 1);
    }

    #[test]
    fn test_link_resolution() {
        let europe = "# europe\n\
Zone Europe/Paris 1:00 EU CE%sT\n\
Link Europe/Paris Europe/Monaco\n\
Link Europe/Nowhere Europe/Atlantis\n\
Link Europe/Monaco Europe/Chain\n\
Link Europe/Paris Europe/Paris\n";
        let (out, reporter) = parse(&[("europe", europe)], 2024);

        // zone.tab holds 3 lines, so the first link id is 4
        let monaco = out.index.get("Europe/Monaco").unwrap();
        let paris = out.index.get("Europe/Paris").unwrap();
        assert_eq!(monaco.id, 4);
        assert_eq!(monaco.bias, paris.bias);
        assert_eq!(monaco.rule_name, paris.rule_name);
        assert_eq!(monaco.format, paris.format);
        assert_eq!(monaco.country_code, paris.country_code);

        // One-hop resolution in encounter order: Monaco exists by then
        assert!(out.index.get("Europe/Chain").is_some());
        assert!(out.index.get("Europe/Atlantis").is_none());

        assert_eq!(reporter.count(IssueKind::UnresolvedLink), 1);
        assert_eq!(reporter.count(IssueKind::DuplicateName), 1);
        assert_eq!(out.stats.links, 4);
        assert_eq!(out.stats.links_resolved, 2);
        assert_eq!(out.time_zones.len(), 3);

        let ids: Vec<u32> = out.time_zones.iter().map(|z| z.id).collect();
        assert_eq!(ids, vec![1, 4, 5]);
    }

    #[test]
    fn test_link_to_later_link_is_not_followed() {
        let europe = "# europe\n\
Link Europe/Monaco Europe/Chain\n\
Link Europe/Paris Europe/Monaco\n\
Zone Europe/Paris 1:00 EU CE%sT\n";
        let (out, reporter) = parse(&[("europe", europe)], 2024);

        assert!(out.index.get("Europe/Monaco").is_some());
        assert!(out.index.get("Europe/Chain").is_none());
        assert_eq!(reporter.count(IssueKind::UnresolvedLink), 1);
    }

    #[test]
    fn test_zone_missing_from_reference() {
        let asia = "# asia\nZone Asia/Nowhere 5:00 - +05\n";
        let (out, reporter) = parse(&[("asia", asia)], 2024);

        assert!(out.time_zones.is_empty());
        assert_eq!(reporter.count(IssueKind::MissingReference), 1);
    }

    #[test]
    fn test_leap_lines() {
        let fs = MemoryFs::new()
            .with_file("/tz/iso3166.tab", ISO)
            .with_file("/tz/zone.tab", ZONE_TAB_TEXT)
            .with_file(
                "/tz/leapseconds",
                "# leap\nLeap\t1972\tJun\t30\t23:59:60\t+\tS\nLeap\tyyyy\tDec\t31\t23:59:60\t+\tS\n",
            );
        let fs: Arc<dyn FileSystem> = Arc::new(fs);
        let reporter = Arc::new(CollectingReporter::new());
        let (queue, producer) = ValidatedFileQueue::new();
        FileValidator::tz(["leapseconds"])
            .populate(fs.as_ref(), Path::new("/tz"), producer, reporter.as_ref())
            .unwrap();

        let parser = TzDatabaseParser::new(fs, reporter.clone(), EventBus::new(), 2024);
        let out = parser.parse(Path::new("/tz"), queue).unwrap();

        assert_eq!(out.leaps.len(), 2);
        let first = &out.leaps[0];
        assert_eq!(first.year, 1972);
        assert_eq!(first.month, "Jun");
        assert_eq!(first.day, 30);
        assert_eq!(first.correction, Some('+'));
        assert_eq!(first.rs, Some('S'));
        // 23:59:60 is not a valid duration; reported and defaulted
        assert_eq!(first.time, TimeDelta::zero());
        assert_eq!(out.leaps[1].year, 0);
        assert_eq!(reporter.count(IssueKind::FieldGrammar), 3);
    }

    struct Recorder(Mutex<Vec<String>>);

    impl ParseObserver for Recorder {
        fn on_event(&self, event: &ParseEvent<'_>) -> Result<()> {
            let text = match event {
                ParseEvent::FileStarted { path } => format!("start {}", path.display()),
                ParseEvent::FileFinished { path } => format!("finish {}", path.display()),
                ParseEvent::EntryParsed(EntryRef::TimeZone(z)) => format!("zone {}", z.name),
                ParseEvent::EntryParsed(EntryRef::Rule(r)) => format!("rule {}", r.name),
                ParseEvent::EntryParsed(EntryRef::Link(l)) => format!("link {}", l.to),
                ParseEvent::EntryParsed(_) => "other".to_string(),
                ParseEvent::DirectoryFinished { path } => format!("dir {}", path.display()),
            };
            self.0.lock().push(text);
            Ok(())
        }
    }

    #[test]
    fn test_event_sequence() {
        let fs: Arc<dyn FileSystem> = Arc::new(
            MemoryFs::new()
                .with_file("/tz/iso3166.tab", ISO)
                .with_file("/tz/zone.tab", ZONE_TAB_TEXT)
                .with_file(
                    "/tz/europe",
                    "# e\nZone Europe/Paris 1:00 EU CE%sT\nLink Europe/Paris Europe/Monaco\n",
                ),
        );
        let reporter = Arc::new(CollectingReporter::new());
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let counter = Arc::new(EventCounter::default());
        let mut bus = EventBus::new();
        bus.register(recorder.clone());
        bus.register(counter.clone());

        let (queue, producer) = ValidatedFileQueue::new();
        FileValidator::tz_default()
            .populate(fs.as_ref(), Path::new("/tz"), producer, reporter.as_ref())
            .unwrap();
        TzDatabaseParser::new(fs, reporter, bus, 2024)
            .parse(Path::new("/tz"), queue)
            .unwrap();

        let events = recorder.0.lock().clone();
        assert_eq!(
            events,
            vec![
                "start /tz/iso3166.tab",
                "finish /tz/iso3166.tab",
                "start /tz/zone.tab",
                "finish /tz/zone.tab",
                "start /tz/europe",
                "zone Europe/Paris",
                "link Europe/Monaco",
                "finish /tz/europe",
                "zone Europe/Monaco",
                "dir /tz",
            ]
        );
        assert_eq!(counter.entries(), 3);
    }
}
