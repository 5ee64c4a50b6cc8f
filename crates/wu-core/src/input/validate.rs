//! Validators: return the (normalised) input when it is acceptable,
//! `None` otherwise.

use std::fmt::Display;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::limits::{absolute_max, absolute_min, DateRules, TimeRules, YearRules};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[\w\-.']+@[\w-]+(?:\.[\w-]+)*(?:\.[a-z]+){1,2}$").unwrap()
});

static NORMALISE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:19|20)[0-9]{2}-(?:0[0-9]|1[0-2])-(?:[0-2][0-9]|3[01])$").unwrap());

static ISO_DATETIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^((?:19|20)[0-9]{2})-(0[0-9]|1[0-2])-([0-2][0-9]|3[01])[T ]([01][0-9]|2[0-3]):([0-5][0-9])(?::([0-5][0-9]))?(?:[+-](?:0[0-9]|1[01])(?::?[0-5][0-9])?|Z|[A-Z]{2,5})?$",
    )
    .unwrap()
});

static ISO_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]?[0-9]|2[0-3]):([0-5][0-9])(?::([0-5][0-9]))?$").unwrap());

static REF_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[a-z0-9]+_[1-9][0-9]+$").unwrap());

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https://[\w-]+(?:\.[\w-]+)*\.[a-z]+(?::[0-9]{1,5})?(?:[/?#]\S*)?$").unwrap()
});

/// Postcode ranges for street addresses.
const POSTCODES: &[(u32, u32)] = &[
    (800, 899),
    (2000, 4999),
    (5000, 5799),
    (6000, 6797),
    (7000, 7799),
];

/// Ranges used only by PO boxes and large organisations.
const PO_BOX_POSTCODES: &[(u32, u32)] = &[
    (200, 299),
    (900, 999),
    (1000, 1999),
    (5800, 5999),
    (6800, 6999),
    (7800, 9999),
];

/// Validate a four digit Australian postcode.
pub fn validate_au_postcode(code: &str, no_po_box: bool) -> Option<String> {
    if code.len() != 4 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u32 = code.parse().ok()?;
    let in_range = |ranges: &[(u32, u32)]| ranges.iter().any(|&(lo, hi)| (lo..=hi).contains(&n));

    if in_range(POSTCODES) || (!no_po_box && in_range(PO_BOX_POSTCODES)) {
        Some(code.to_string())
    } else {
        None
    }
}

/// Validate an email address. Domains containing "example" are refused.
pub fn validate_email(email: &str) -> Option<String> {
    let (_, domain) = email.split_once('@')?;
    if domain.to_lowercase().contains("example") || !EMAIL_RE.is_match(email) {
        return None;
    }
    Some(email.to_string())
}

/// Lower-case, collapse whitespace, trim.
pub fn normalise(input: &str) -> String {
    NORMALISE_RE.replace_all(input, " ").trim().to_lowercase()
}

/// Match a user selection against the available options, ignoring case and
/// spacing. Returns the option as written in `options`.
pub fn validate_selected<'a, S: AsRef<str>>(selected: &str, options: &'a [S]) -> Option<&'a str> {
    let wanted = normalise(selected);
    options
        .iter()
        .map(AsRef::as_ref)
        .find(|option| normalise(option) == wanted)
}

/// Validate an `<input type="date">` value. Output is `YYYY-MM-DD`.
pub fn validate_iso_date(input: &str, rules: &DateRules) -> Option<String> {
    let input = input.trim();
    if !ISO_DATE_RE.is_match(input) {
        return None;
    }
    let value = NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()?.and_hms_opt(0, 0, 0)?;

    rules
        .allows(value)
        .then(|| value.format("%Y-%m-%d").to_string())
}

/// Validate an ISO 8601 date-time (`T` or space separated, optional
/// seconds and zone suffix). Output is `YYYY-MM-DD HH:MM:SS` wall-clock
/// time as written; the zone suffix is accepted but not applied.
pub fn validate_iso_datetime(input: &str, rules: &DateRules) -> Option<String> {
    let caps = ISO_DATETIME_RE.captures(input.trim())?;
    let num = |idx: usize| caps.get(idx).map_or(Some(0), |m| m.as_str().parse::<u32>().ok());

    let year = i32::try_from(num(1)?).ok()?;
    let date = NaiveDate::from_ymd_opt(year, num(2)?, num(3)?)?;
    let (hour, minute, second) = (num(4)?, num(5)?, num(6)?);
    let value = NaiveDateTime::new(date, NaiveTime::from_hms_opt(hour, minute, second)?);

    let time_of_day = hour * 3600 + minute * 60;
    (rules.allows(value) && rules.allows_time_of_day(time_of_day))
        .then(|| value.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Validate an `<input type="time">` value. Output is zero padded
/// `HH:MM:SS`.
pub fn validate_iso_time(input: &str, rules: &TimeRules) -> Option<String> {
    let caps = ISO_TIME_RE.captures(input.trim())?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    let second: u32 = caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?;

    let output = format!("{:02}:{:02}:{:02}", hour, minute, second);
    if rules.is_unbounded() || rules.allows(hour * 3600 + minute * 60 + second) {
        Some(output)
    } else {
        None
    }
}

/// Payment gateway reference id: `prefix_123`.
pub fn validate_ref_id(ref_id: &str) -> Option<String> {
    let ref_id = ref_id.trim();
    REF_ID_RE.is_match(ref_id).then(|| ref_id.to_string())
}

/// Absolute `https://` URL.
pub fn validate_url(url: &str) -> Option<String> {
    URL_RE.is_match(url).then(|| url.to_string())
}

/// Validate a year (an integer or integer string) against the absolute
/// window and any inclusive limits in `rules`.
pub fn validate_year(year: impl Display, rules: &YearRules) -> Option<i32> {
    let year: i32 = year.to_string().trim().parse().ok()?;

    let min = rules.min.unwrap_or(i32::MIN).max(absolute_min().year());
    let max = rules.max.unwrap_or(i32::MAX).min(absolute_max().year());

    (min..=max).contains(&year).then_some(year)
}
