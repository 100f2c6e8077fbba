//! Shared date formatting for outbound payloads.
//!
//! Application records carry dates as ISO strings. Every mapper sends
//! them through [`format_date`] or [`format_date_time`] so the wire
//! always gets one format regardless of how the caller produced the value.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// FHIR search prefixes accepted in front of a date filter value
const SEARCH_PREFIXES: [&str; 9] = ["eq", "ne", "gt", "lt", "ge", "le", "sa", "eb", "ap"];

/// Normalize an ISO date or date-time string to `YYYY-MM-DD`.
///
/// Partial dates (`YYYY`, `YYYY-MM`) are valid FHIR dates and pass through
/// unchanged. Returns `None` for empty or unparsable input.
pub fn format_date(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, DATE_FORMAT) {
        return Some(date.format(DATE_FORMAT).to_string());
    }

    partial_date(input).or_else(|| {
        parse_date_time(input).map(|dt| dt.date_naive().format(DATE_FORMAT).to_string())
    })
}

/// Normalize an ISO date-time (or bare date) to RFC 3339 in UTC.
///
/// Naive inputs such as `2024-05-01T09:30` are taken as UTC; bare dates
/// become midnight. Partial dates pass through unchanged. Returns `None`
/// for empty or unparsable input.
pub fn format_date_time(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Some(partial) = partial_date(input) {
        return Some(partial);
    }

    parse_date_time(input)
        .or_else(|| {
            NaiveDate::parse_from_str(input, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Date search value: an optional comparison prefix followed by a date.
///
/// The date part is normalized when it parses and kept as given otherwise,
/// so a filter the caller set is never dropped. `None` only for empty input.
pub fn format_search_date(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let (prefix, value) = SEARCH_PREFIXES
        .iter()
        .find_map(|&prefix| {
            input
                .strip_prefix(prefix)
                .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
                .map(|rest| (prefix, rest))
        })
        .unwrap_or(("", input));

    let value = format_date(value).unwrap_or_else(|| value.to_string());
    Some(format!("{prefix}{value}"))
}

/// `YYYY` or `YYYY-MM`, returned as given
fn partial_date(input: &str) -> Option<String> {
    let is_year = |s: &str| s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit());

    match input.split_once('-') {
        None if is_year(input) => Some(input.to_string()),
        Some((year, month)) if is_year(year) && month.len() == 2 => {
            NaiveDate::parse_from_str(&format!("{input}-01"), DATE_FORMAT)
                .ok()
                .map(|_| input.to_string())
        }
        _ => None,
    }
}

fn parse_date_time(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Values that can stand in for an ISO date string in application records
pub trait DateLike {
    /// `YYYY-MM-DD`
    fn to_iso_date(&self) -> String;

    /// RFC 3339 date-time in UTC
    fn to_iso_date_time(&self) -> String;
}

impl DateLike for NaiveDate {
    fn to_iso_date(&self) -> String {
        self.format(DATE_FORMAT).to_string()
    }

    fn to_iso_date_time(&self) -> String {
        self.and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc().to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default()
    }
}

impl<Tz: TimeZone> DateLike for DateTime<Tz> {
    fn to_iso_date(&self) -> String {
        self.with_timezone(&Utc).format(DATE_FORMAT).to_string()
    }

    fn to_iso_date_time(&self) -> String {
        self.with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl DateLike for str {
    fn to_iso_date(&self) -> String {
        format_date(self).unwrap_or_default()
    }

    fn to_iso_date_time(&self) -> String {
        format_date_time(self).unwrap_or_default()
    }
}

impl DateLike for String {
    fn to_iso_date(&self) -> String {
        self.as_str().to_iso_date()
    }

    fn to_iso_date_time(&self) -> String {
        self.as_str().to_iso_date_time()
    }
}

impl<T: DateLike + ?Sized> DateLike for &T {
    fn to_iso_date(&self) -> String {
        (**self).to_iso_date()
    }

    fn to_iso_date_time(&self) -> String {
        (**self).to_iso_date_time()
    }
}

/// Inbound date: normalized when parsable, otherwise kept verbatim
pub(crate) fn app_date(value: Option<&str>) -> String {
    let value = value.unwrap_or("");
    format_date(value).unwrap_or_else(|| value.to_string())
}

/// Inbound date-time: normalized when parsable, otherwise kept verbatim
pub(crate) fn app_date_time(value: Option<&str>) -> String {
    let value = value.unwrap_or("");
    format_date_time(value).unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn format_date_accepts_dates_and_date_times() {
        assert_eq!(format_date("2024-03-05").as_deref(), Some("2024-03-05"));
        assert_eq!(
            format_date("2024-03-05T23:10:00Z").as_deref(),
            Some("2024-03-05")
        );
        assert_eq!(
            format_date("2024-03-05T10:00:00.123").as_deref(),
            Some("2024-03-05")
        );
    }

    #[test]
    fn format_date_rejects_garbage() {
        assert_eq!(format_date(""), None);
        assert_eq!(format_date("   "), None);
        assert_eq!(format_date("yesterday"), None);
        assert_eq!(format_date("2024-13"), None);
        assert_eq!(format_date("24-01"), None);
    }

    #[test]
    fn partial_dates_pass_through() {
        assert_eq!(format_date("1985").as_deref(), Some("1985"));
        assert_eq!(format_date("1985-07").as_deref(), Some("1985-07"));
        assert_eq!(format_date_time("2024").as_deref(), Some("2024"));
        assert_eq!(format_date_time("2024-06").as_deref(), Some("2024-06"));
    }

    #[test]
    fn search_dates_keep_prefix_and_partial_values() {
        assert_eq!(format_search_date("ge2024-01-01").as_deref(), Some("ge2024-01-01"));
        assert_eq!(format_search_date(" lt2024-06 ").as_deref(), Some("lt2024-06"));
        assert_eq!(
            format_search_date("2024-03-05T10:00:00Z").as_deref(),
            Some("2024-03-05")
        );
        assert_eq!(format_search_date("sometime").as_deref(), Some("sometime"));
        assert_eq!(format_search_date("  "), None);
    }

    #[test]
    fn format_date_time_normalizes_to_utc() {
        assert_eq!(
            format_date_time("2024-05-01T09:30:00+02:00").as_deref(),
            Some("2024-05-01T07:30:00Z")
        );
        assert_eq!(
            format_date_time("2024-05-01T09:30").as_deref(),
            Some("2024-05-01T09:30:00Z")
        );
        assert_eq!(
            format_date_time("2024-05-01").as_deref(),
            Some("2024-05-01T00:00:00Z")
        );
    }

    #[test]
    fn chrono_values_are_date_like() {
        let date = NaiveDate::from_ymd_opt(1990, 5, 15).unwrap();
        assert_eq!(date.to_iso_date(), "1990-05-15");

        let offset = FixedOffset::east_opt(8 * 3600).unwrap();
        let dt = offset.with_ymd_and_hms(2024, 1, 2, 3, 0, 0).unwrap();
        assert_eq!(dt.to_iso_date(), "2024-01-01");
        assert_eq!(dt.to_iso_date_time(), "2024-01-01T19:00:00Z");

        assert_eq!("1985-07".to_iso_date(), "1985-07");
        assert_eq!(String::from("2024-05-01").to_iso_date_time(), "2024-05-01T00:00:00Z");
    }

    #[test]
    fn inbound_dates_keep_unparsable_values() {
        assert_eq!(app_date(Some("2024-02-01T00:00:00Z")), "2024-02-01");
        assert_eq!(app_date(Some("2024")), "2024");
        assert_eq!(app_date(Some("not a date")), "not a date");
        assert_eq!(app_date(None), "");
    }
}
