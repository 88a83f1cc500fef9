//! `Date` field values.
//!
//! Accepts the obsolete forms of RFC 5322 4.3: two- and three-digit years,
//! named zones, military zones and comments anywhere between the parts.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};

use super::grammar;
use crate::error::{Error, Result};

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

fn invalid(value: &str, reason: &str) -> Error {
    Error::invalid_header("date", format!("{reason}: {value}"))
}

/// Replaces comments with a space.
fn strip_comments(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut depth = 0usize;
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' if depth > 0 => {
                chars.next();
            }
            '(' => {
                if depth == 0 {
                    out.push(' ');
                }
                depth += 1;
            }
            ')' if depth > 0 => depth -= 1,
            _ if depth > 0 => {}
            _ => out.push(c),
        }
    }
    out
}

/// Offset in minutes east of UTC for a named zone.
///
/// Military zones carry no reliable meaning and are read as `-0000`, as are
/// unknown names.
fn named_zone(name: &str) -> i32 {
    match name.to_ascii_uppercase().as_str() {
        "EDT" => -4 * 60,
        "EST" | "CDT" => -5 * 60,
        "CST" | "MDT" => -6 * 60,
        "MST" | "PDT" => -7 * 60,
        "PST" => -8 * 60,
        _ => 0,
    }
}

fn numeric_zone(zone: &str) -> Option<i32> {
    let (sign, digits) = match zone.as_bytes().first()? {
        b'+' => (1, &zone[1..]),
        b'-' => (-1, &zone[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    Some(sign * (hours * 60 + minutes))
}

/// Expands an obsolete short year.
fn full_year(digits: &str) -> Option<i32> {
    let year: i32 = digits.parse().ok()?;
    Some(match digits.len() {
        1 | 2 if year < 50 => year + 2000,
        1..=3 => year + 1900,
        _ => year,
    })
}

/// Parses a `date-time` value.
///
/// A leap second (`:60`) is clamped to `:59`.
///
/// # Errors
///
/// Returns [`Error::InvalidHeader`] if the value does not match the
/// `date-time` grammar or names a day that does not exist.
pub fn parse_date(value: &str) -> Result<DateTime<FixedOffset>> {
    if !grammar::matches(value, grammar::date_time) {
        return Err(invalid(value, "invalid date-time"));
    }
    let normalized = strip_comments(value)
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" :", ":")
        .replace(": ", ":");
    let mut words: Vec<&str> = normalized.split(' ').collect();
    if words
        .first()
        .is_some_and(|w| w.starts_with(|c: char| c.is_ascii_alphabetic()))
    {
        words.remove(0);
    }
    let [day, month, year, time, zone] = words[..] else {
        return Err(invalid(value, "unexpected date layout"));
    };

    let day: u32 = day.parse().map_err(|_| invalid(value, "invalid day"))?;
    let month = MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(month))
        .and_then(|m| u32::try_from(m + 1).ok())
        .ok_or_else(|| invalid(value, "invalid month"))?;
    let year = full_year(year).ok_or_else(|| invalid(value, "invalid year"))?;

    let mut units = time.split(':').map(str::parse::<u32>);
    let hour = units.next().and_then(|unit| unit.ok());
    let minute = units.next().and_then(|unit| unit.ok());
    let second = match units.next() {
        Some(unit) => unit.ok(),
        None => Some(0),
    };
    let (Some(hour), Some(minute), Some(second)) = (hour, minute, second) else {
        return Err(invalid(value, "invalid time of day"));
    };

    let offset_minutes = numeric_zone(zone).unwrap_or_else(|| named_zone(zone));
    let offset = FixedOffset::east_opt(offset_minutes * 60)
        .ok_or_else(|| invalid(value, "invalid zone"))?;
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| invalid(value, "no such day"))?;
    let time = NaiveTime::from_hms_opt(hour, minute, second.min(59))
        .ok_or_else(|| invalid(value, "invalid time of day"))?;
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| invalid(value, "ambiguous local time"))
}

/// Formats a timestamp for a `Date` field.
#[must_use]
pub fn format_date(date: &DateTime<FixedOffset>) -> String {
    date.to_rfc2822()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_modern_date() {
        let date = parse_date("Fri, 21 Nov 1997 09:55:06 -0600").unwrap();
        assert_eq!(date.year(), 1997);
        assert_eq!(date.month(), 11);
        assert_eq!(date.day(), 21);
        assert_eq!(date.hour(), 9);
        assert_eq!(date.offset().local_minus_utc(), -6 * 3600);
        assert_eq!(format_date(&date), "Fri, 21 Nov 1997 09:55:06 -0600");
    }

    #[test]
    fn test_obsolete_forms() {
        let date = parse_date("21 Nov 97 09:55 EST").unwrap();
        assert_eq!(date.year(), 1997);
        assert_eq!(date.second(), 0);
        assert_eq!(date.offset().local_minus_utc(), -5 * 3600);

        let date = parse_date("Thu,\r\n 13\r\n Feb\r\n 69\r\n 23:32\r\n -0330 (Newfoundland Time)")
            .unwrap();
        assert_eq!(date.year(), 1969);
        assert_eq!(date.offset().local_minus_utc(), -(3 * 3600 + 30 * 60));

        let date = parse_date("1 Jan 103 00:00:00 GMT").unwrap();
        assert_eq!(date.year(), 2003);
    }

    #[test]
    fn test_military_zone_is_utc() {
        let date = parse_date("1 Jan 2020 12:00:00 Z").unwrap();
        assert_eq!(date.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_leap_second_clamped() {
        let date = parse_date("31 Dec 2016 23:59:60 +0000").unwrap();
        assert_eq!(date.second(), 59);
    }

    #[test]
    fn test_invalid_dates() {
        assert!(parse_date("31 Feb 2020 00:00:00 +0000").is_err());
        assert!(parse_date("yesterday").is_err());
        assert!(parse_date("").is_err());
    }
}
