//! Limits applied by the validators: date windows, time-of-day windows,
//! allowed weekdays, year ranges, numeric bounds and text rules.

use chrono::{Datelike, Days, Local, Months, NaiveDate, NaiveDateTime, TimeZone, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use super::InputError;

/// Oldest date any limit may name, relative to now.
const ABSOLUTE_MIN_YEARS_BACK: u32 = 110;
/// Furthest future date any limit may name, relative to now.
const ABSOLUTE_MAX_YEARS_AHEAD: u32 = 50;

static RELATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([+-])\s*(\d+)\s*(day|week|month|year)s?$").unwrap()
});

static LIMIT_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([01][0-9]|2[0-3]):([0-5][0-9])(?::[0-5][0-9])?$").unwrap()
});

/// Earliest date/time accepted anywhere (now minus 110 years).
pub fn absolute_min() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.checked_sub_months(Months::new(ABSOLUTE_MIN_YEARS_BACK * 12))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Latest date/time accepted anywhere (now plus 50 years).
pub fn absolute_max() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.checked_add_months(Months::new(ABSOLUTE_MAX_YEARS_AHEAD * 12))
        .unwrap_or(NaiveDateTime::MAX)
}

fn invalid(name: &'static str, value: &str, reason: impl Into<String>) -> InputError {
    InputError::InvalidLimit {
        name,
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Parse a free-form date/time string.
///
/// Accepts `now`, `today`, relative offsets (`+2 weeks`, `-1 year`), unix
/// timestamps and ISO 8601 dates or date-times.
pub fn parse_date_time(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    let now = Local::now().naive_local();

    match input.to_ascii_lowercase().as_str() {
        "now" => return Some(now),
        "today" => return now.date().and_hms_opt(0, 0, 0),
        _ => {}
    }

    if let Some(caps) = RELATIVE_RE.captures(input) {
        let n: u32 = caps[2].parse().ok()?;
        let forward = &caps[1] == "+";
        let unit = caps[3].to_ascii_lowercase();
        return match unit.as_str() {
            "day" | "week" => {
                let days = Days::new(u64::from(n) * if unit == "day" { 1 } else { 7 });
                if forward {
                    now.checked_add_days(days)
                } else {
                    now.checked_sub_days(days)
                }
            }
            unit => {
                let months = Months::new(if unit == "year" { n.checked_mul(12)? } else { n });
                if forward {
                    now.checked_add_months(months)
                } else {
                    now.checked_sub_months(months)
                }
            }
        };
    }

    if let Ok(ts) = input.parse::<i64>() {
        return Local
            .timestamp_opt(ts, 0)
            .single()
            .map(|dt| dt.naive_local());
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a date limit, which must fall inside the absolute window.
pub fn parse_date_limit(name: &'static str, input: &str) -> Result<NaiveDateTime, InputError> {
    let value = parse_date_time(input)
        .ok_or_else(|| invalid(name, input, "expected a unix timestamp or a parsable date"))?;
    check_window(name, input, value)
}

fn check_window(
    name: &'static str,
    input: &str,
    value: NaiveDateTime,
) -> Result<NaiveDateTime, InputError> {
    let (min, max) = (absolute_min(), absolute_max());
    if value < min || value > max {
        return Err(invalid(
            name,
            input,
            format!(
                "must fall between {} and {}",
                min.format("%Y-%m-%d %H:%M:%S"),
                max.format("%Y-%m-%d %H:%M:%S")
            ),
        ));
    }
    Ok(value)
}

/// Parse a time-of-day limit into seconds after midnight.
///
/// Numbers below 24 are hours, numbers below 86400 are seconds, strings
/// are `HH:MM` or `HH:MM:SS`.
pub fn parse_time_limit(name: &'static str, input: &str) -> Result<u32, InputError> {
    let trimmed = input.trim();

    if let Ok(n) = trimmed.parse::<f64>() {
        if (0.0..24.0).contains(&n) {
            return Ok((n * 3600.0) as u32);
        }
        if (0.0..86400.0).contains(&n) {
            return Ok(n as u32);
        }
        return Err(invalid(name, input, "must be an hour of the day or seconds after midnight"));
    }

    if let Some(caps) = LIMIT_TIME_RE.captures(trimmed) {
        let h: u32 = caps[1].parse().unwrap_or(0);
        let m: u32 = caps[2].parse().unwrap_or(0);
        return Ok(h * 3600 + m * 60);
    }

    Err(invalid(name, input, "expected hours, seconds or an HH:MM time"))
}

/// Parse a comma separated list of weekday names (`mon,Wednesday, fri`).
/// Unknown names are skipped and duplicates removed.
pub fn parse_days(input: &str) -> Vec<Weekday> {
    let mut days = Vec::new();
    for part in input.split(',') {
        let short: String = part.trim().chars().take(3).collect::<String>().to_ascii_lowercase();
        let day = match short.as_str() {
            "mon" => Weekday::Mon,
            "tue" => Weekday::Tue,
            "wed" => Weekday::Wed,
            "thu" => Weekday::Thu,
            "fri" => Weekday::Fri,
            "sat" => Weekday::Sat,
            "sun" => Weekday::Sun,
            _ => continue,
        };
        if !days.contains(&day) {
            days.push(day);
        }
    }
    days
}

/// Parse a year limit: a plain year or anything `parse_date_time` accepts.
pub fn parse_year_limit(name: &'static str, input: &str) -> Result<i32, InputError> {
    let trimmed = input.trim();
    let year = match trimmed.parse::<i32>() {
        Ok(y) => y,
        Err(_) => parse_date_time(trimmed)
            .map(|dt| dt.year())
            .ok_or_else(|| invalid(name, input, "expected a year or a parsable date"))?,
    };
    check_year(name, year)
}

fn check_year(name: &'static str, year: i32) -> Result<i32, InputError> {
    let (min, max) = (absolute_min().year(), absolute_max().year());
    if year < min || year > max {
        return Err(invalid(
            name,
            &year.to_string(),
            format!("must be between {} and {} (inclusive)", min, max),
        ));
    }
    Ok(year)
}

/// Clamp a caller supplied length limit into `min..=max`.
pub fn char_limit(input: Option<usize>, default: usize, min: usize, max: usize) -> usize {
    input.map(|n| n.clamp(min, max)).unwrap_or(default)
}

/// Limits for `validate_iso_date` and `validate_iso_datetime`.
///
/// `min`/`max` and `min_time`/`max_time` are exclusive bounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateRules {
    pub min: Option<NaiveDateTime>,
    pub max: Option<NaiveDateTime>,
    pub min_time: Option<u32>,
    pub max_time: Option<u32>,
    pub days: Option<Vec<Weekday>>,
}

impl DateRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, limit: &str) -> Result<Self, InputError> {
        self.min = Some(parse_date_limit("min", limit)?);
        Ok(self)
    }

    pub fn max(mut self, limit: &str) -> Result<Self, InputError> {
        self.max = Some(parse_date_limit("max", limit)?);
        Ok(self)
    }

    pub fn min_time(mut self, limit: &str) -> Result<Self, InputError> {
        self.min_time = Some(parse_time_limit("mintime", limit)?);
        Ok(self)
    }

    pub fn max_time(mut self, limit: &str) -> Result<Self, InputError> {
        self.max_time = Some(parse_time_limit("maxtime", limit)?);
        Ok(self)
    }

    /// An empty list means "any day".
    pub fn days(mut self, list: &str) -> Self {
        self.days = if list.trim().is_empty() {
            None
        } else {
            Some(parse_days(list))
        };
        self
    }

    pub(crate) fn allows(&self, value: NaiveDateTime) -> bool {
        self.min.map_or(true, |min| min < value)
            && self.max.map_or(true, |max| max > value)
            && self.days.as_ref().map_or(true, |d| d.contains(&value.weekday()))
    }

    pub(crate) fn allows_time_of_day(&self, seconds: u32) -> bool {
        self.min_time.map_or(true, |min| min < seconds)
            && self.max_time.map_or(true, |max| max > seconds)
    }
}

/// Exclusive time-of-day window for `validate_iso_time`, in seconds after midnight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRules {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl TimeRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, limit: &str) -> Result<Self, InputError> {
        self.min = Some(parse_time_limit("min", limit)?);
        Ok(self)
    }

    pub fn max(mut self, limit: &str) -> Result<Self, InputError> {
        self.max = Some(parse_time_limit("max", limit)?);
        Ok(self)
    }

    pub(crate) fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub(crate) fn allows(&self, seconds: u32) -> bool {
        self.min.map_or(true, |min| min < seconds) && self.max.map_or(true, |max| max > seconds)
    }
}

/// Inclusive year range for `validate_year`, always inside the absolute window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YearRules {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

impl YearRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, limit: &str) -> Result<Self, InputError> {
        self.min = Some(parse_year_limit("min", limit)?);
        Ok(self)
    }

    pub fn max(mut self, limit: &str) -> Result<Self, InputError> {
        self.max = Some(parse_year_limit("max", limit)?);
        Ok(self)
    }

    pub fn min_year(mut self, year: i32) -> Result<Self, InputError> {
        self.min = Some(check_year("min", year)?);
        Ok(self)
    }

    pub fn max_year(mut self, year: i32) -> Result<Self, InputError> {
        self.max = Some(check_year("max", year)?);
        Ok(self)
    }
}

/// Inclusive bounds and rounding for `sanitise_numeric`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumericRules {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub precision: Option<i32>,
}

impl NumericRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn precision(mut self, places: i32) -> Self {
        self.precision = Some(places);
        self
    }
}

/// Which characters `sanitise_text` keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CharSet {
    /// Word characters, spaces and basic punctuation: `\w&, -.?:!'()/`
    #[default]
    Default,
    /// The default set plus these characters (ranges like `a-z` allowed).
    Extra(String),
    /// Only these characters.
    Only(String),
    /// A caller supplied regex matching characters to replace.
    Raw(String),
}

pub const TEXT_MIN_LEN: usize = 32;
pub const TEXT_MAX_LEN: usize = 2048;
pub const TEXT_DEFAULT_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRules {
    pub max: usize,
    pub chars: CharSet,
    pub dedupe: bool,
    pub ignore_case: bool,
}

impl Default for TextRules {
    fn default() -> Self {
        Self {
            max: TEXT_DEFAULT_LEN,
            chars: CharSet::Default,
            dedupe: false,
            ignore_case: true,
        }
    }
}

impl TextRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum length in characters, clamped to 32..=2048.
    pub fn max(mut self, max: usize) -> Self {
        self.max = char_limit(Some(max), TEXT_DEFAULT_LEN, TEXT_MIN_LEN, TEXT_MAX_LEN);
        self
    }

    pub fn allow(mut self, extra: &str) -> Self {
        self.chars = CharSet::Extra(extra.to_string());
        self
    }

    pub fn allow_only(mut self, chars: &str) -> Self {
        self.chars = CharSet::Only(chars.to_string());
        self
    }

    pub fn allow_raw(mut self, pattern: &str) -> Self {
        self.chars = CharSet::Raw(pattern.to_string());
        self
    }

    pub fn dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.ignore_case = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_limit_forms() {
        assert_eq!(parse_time_limit("min", "9").unwrap(), 9 * 3600);
        assert_eq!(parse_time_limit("min", "3600").unwrap(), 3600);
        assert_eq!(parse_time_limit("min", "17:30").unwrap(), 17 * 3600 + 30 * 60);
        assert_eq!(parse_time_limit("min", "08:15:45").unwrap(), 8 * 3600 + 15 * 60);
        assert!(parse_time_limit("min", "90000").is_err());
        assert!(parse_time_limit("min", "lunch").is_err());
        assert!(parse_time_limit("min", "25:00").is_err());
    }

    #[test]
    fn test_parse_days() {
        assert_eq!(
            parse_days("mon, Wednesday,fri,monday,xyz"),
            vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]
        );
        assert!(parse_days("").is_empty());
    }

    #[test]
    fn test_date_limit_window() {
        assert!(parse_date_limit("min", "2000-01-01").is_ok());
        assert!(parse_date_limit("min", "1800-01-01").is_err());
        assert!(parse_date_limit("max", "+10 years").is_ok());
        assert!(parse_date_limit("max", "+60 years").is_err());
        assert!(parse_date_limit("max", "next tuesday").is_err());
    }

    #[test]
    fn test_parse_date_time_forms() {
        let dt = parse_date_time("2021-03-04 05:06:07").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2021-03-04 05:06:07");
        let d = parse_date_time("2021-03-04").unwrap();
        assert_eq!(d.format("%H:%M").to_string(), "00:00");
        assert!(parse_date_time("-3 days").unwrap() < Local::now().naive_local());
        assert!(parse_date_time("+1 week").unwrap() > Local::now().naive_local());
    }

    #[test]
    fn test_year_limit() {
        assert_eq!(parse_year_limit("min", "1990").unwrap(), 1990);
        assert_eq!(parse_year_limit("min", "2004-06-01").unwrap(), 2004);
        assert!(parse_year_limit("min", "1700").is_err());
        assert!(YearRules::new().min_year(3000).is_err());
    }

    #[test]
    fn test_char_limit() {
        assert_eq!(char_limit(None, 64, 1, 64), 64);
        assert_eq!(char_limit(Some(0), 64, 1, 64), 1);
        assert_eq!(char_limit(Some(500), 64, 1, 64), 64);
        assert_eq!(char_limit(Some(20), 64, 1, 64), 20);
    }

    #[test]
    fn test_text_rules_clamp() {
        assert_eq!(TextRules::new().max(5).max, 32);
        assert_eq!(TextRules::new().max(9000).max, 2048);
        assert_eq!(TextRules::new().max(300).max, 300);
    }

    #[test]
    fn test_date_rules_exclusive() {
        let rules = DateRules::new().min("2020-01-01").unwrap();
        let on_min = parse_date_time("2020-01-01").unwrap();
        let after = parse_date_time("2020-01-02").unwrap();
        assert!(!rules.allows(on_min));
        assert!(rules.allows(after));
    }
}
