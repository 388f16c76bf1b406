//! Field mini-parsers for the tz database grammar
//!
//! Every function here is pure. Callers decide whether a failure is
//! reported and defaulted or propagated; see [`or_report`].

use crate::error::{FieldError, FieldResult};
use crate::records::{YEAR_MAX, YEAR_MIN};
use crate::report::{Issue, IssueKind, IssueReporter, Location};
use chrono::TimeDelta;

/// Default time type when the AT field carries no suffix
pub const DEFAULT_TIME_TYPE: char = 'w';

/// `FROM` column of a Rule: a year, `max` or `min`
pub fn parse_start_year(token: &str) -> FieldResult<i16> {
    if token.starts_with("max") {
        Ok(YEAR_MAX)
    } else if token.starts_with("min") {
        Ok(YEAR_MIN)
    } else {
        token
            .parse::<i16>()
            .map_err(|_| FieldError::InvalidYear(token.to_string()))
    }
}

/// `TO` column of a Rule: as [`parse_start_year`], plus `only`
pub fn parse_end_year(token: &str, start_year: i16) -> FieldResult<i16> {
    if token.starts_with("only") {
        Ok(start_year)
    } else {
        parse_start_year(token)
    }
}

/// Whether `[start, end]` contains `year`
pub fn year_range_contains(start: i16, end: i16, year: i32) -> bool {
    !(i32::from(start) > year || i32::from(end) < year)
}

/// Month name, matched on its first three letters, case-insensitively
pub fn parse_month(token: &str) -> FieldResult<u8> {
    let prefix: String = token.chars().take(3).collect::<String>().to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return Err(FieldError::InvalidMonth(token.to_string())),
    };
    Ok(month)
}

/// Split a trailing type flag off a time token.
///
/// `2:00s` gives `("2:00", 's')`; without a flag the type is `w`.
pub fn split_time_type(token: &str) -> (&str, char) {
    match token.chars().last() {
        Some(last) if last.is_ascii_alphabetic() => {
            (&token[..token.len() - last.len_utf8()], last)
        }
        _ => (token, DEFAULT_TIME_TYPE),
    }
}

/// Signed duration in the form `[-]h[:mm[:ss]]`; `-` alone is zero
pub fn parse_duration(token: &str) -> FieldResult<TimeDelta> {
    let invalid = || FieldError::InvalidTime(token.to_string());

    if token == "-" {
        return Ok(TimeDelta::zero());
    }

    let (negative, body) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    if body.is_empty() {
        return Err(invalid());
    }

    let mut parts = body.split(':');
    let mut component = |max: i64| -> FieldResult<i64> {
        match parts.next() {
            None => Ok(0),
            Some(p) if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) => Err(invalid()),
            Some(p) => {
                let value: i64 = p.parse().map_err(|_| invalid())?;
                if value > max {
                    Err(invalid())
                } else {
                    Ok(value)
                }
            }
        }
    };

    let hours = component(i64::from(i16::MAX))?;
    let minutes = component(59)?;
    let seconds = component(59)?;
    if parts.next().is_some() {
        return Err(invalid());
    }

    let total = TimeDelta::hours(hours) + TimeDelta::minutes(minutes) + TimeDelta::seconds(seconds);
    Ok(if negative { -total } else { total })
}

/// Time of day; any token starting with `24` is the last instant of the day
pub fn parse_time_of_day(token: &str) -> FieldResult<TimeDelta> {
    if token.starts_with("24") {
        return Ok(end_of_day());
    }
    parse_duration(token)
}

/// 23:59:59.999
pub fn end_of_day() -> TimeDelta {
    TimeDelta::hours(23)
        + TimeDelta::minutes(59)
        + TimeDelta::seconds(59)
        + TimeDelta::milliseconds(999)
}

/// `GMTOFF` column of a Zone, in seconds
pub fn parse_offset(token: &str) -> FieldResult<i32> {
    parse_duration(token).map(|d| d.num_seconds() as i32)
}

/// `SAVE` column of a Rule, in seconds. A trailing `s`/`d` flag is ignored.
pub fn parse_save(token: &str) -> FieldResult<i32> {
    let (amount, _) = split_time_type(token);
    parse_offset(amount)
}

/// `RULES` column of a Zone; `-` means none
pub fn parse_rule_name(token: &str) -> Option<String> {
    if token == "-" {
        None
    } else {
        Some(token.to_string())
    }
}

/// `LETTER/S` column of a Rule; `-` means none
pub fn parse_letter(token: &str) -> Option<String> {
    parse_rule_name(token)
}

/// Small integer (leap year or day)
pub fn parse_short(token: &str, field: &'static str) -> FieldResult<i16> {
    token.parse::<i16>().map_err(|_| FieldError::InvalidInteger {
        field,
        value: token.to_string(),
    })
}

/// Single character token
pub fn parse_char(token: &str, field: &'static str) -> FieldResult<char> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(FieldError::InvalidChar {
            field,
            value: token.to_string(),
        }),
    }
}

/// Report a lenient field failure and substitute `default`
pub fn or_report<T>(
    result: FieldResult<T>,
    default: T,
    reporter: &dyn IssueReporter,
    location: impl FnOnce() -> Location,
) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            reporter.report(Issue::low(IssueKind::FieldGrammar, e.to_string()).at(location()));
            default
        }
    }
}
