use chrono::{NaiveDate, NaiveDateTime};

use crate::config::*;

/// The display format of every date in an ordinance.
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%d.%m.%Y"];

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
];

/// Returns the value of the first alias present in the record.
///
/// Aliases are tried in order. Missing values are skipped, so an alias whose
/// cell is empty gives way to the next one.
pub fn resolve<'a>(record: &'a Record, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|alias| record.get(alias))
        .find(|v| !v.is_missing())
}

/// Same as [resolve], stringified. Absent values become the empty string.
pub fn resolve_text(record: &Record, aliases: &[&str]) -> String {
    resolve(record, aliases)
        .map(|v| v.to_string())
        .unwrap_or_default()
}

/// Renders a date-like value as `DD/MM/YYYY`.
///
/// Absent and blank values give an empty string. Values that cannot be read
/// as a date are returned as they are.
pub fn format_date(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Missing) => String::new(),
        Some(Value::Date(d)) => d.format(DISPLAY_DATE_FORMAT).to_string(),
        Some(Value::DateTime(dt)) => dt.date().format(DISPLAY_DATE_FORMAT).to_string(),
        Some(Value::Text(s)) if s.trim().is_empty() => String::new(),
        Some(Value::Text(s)) => match parse_date(s.trim()) {
            Some(d) => d.format(DISPLAY_DATE_FORMAT).to_string(),
            None => s.clone(),
        },
        Some(other) => other.to_string(),
    }
}

/// Reads a date written in one of the usual ISO or day-first forms.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}
