use std::fmt::Display;

use chrono::{DateTime, Datelike, Local, TimeZone};

/// Join items as "a, b & c". `amp` joins the last two items.
pub fn human_list<S: AsRef<str>>(items: &[S], amp: &str) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [head @ .., last] => {
            let head: Vec<&str> = head.iter().map(AsRef::as_ref).collect();
            format!("{} {} {}", head.join(", "), amp, last.as_ref())
        }
    }
}

/// Long, human friendly date for a unix timestamp in local time.
///
/// `"Mon, 17th June 2019, 9:30 am"`, or with `time_first`
/// `"9:30am on Monday the 17th of June, 2019"`. `html` wraps the ordinal
/// suffix in `<sup>` (time-first form only).
pub fn human_date(timestamp: i64, time_first: bool, html: bool) -> Option<String> {
    let dt = DateTime::from_timestamp(timestamp, 0)?.with_timezone(&Local);
    Some(format_human_date(&dt, time_first, html))
}

pub fn format_human_date<Tz: TimeZone>(dt: &DateTime<Tz>, time_first: bool, html: bool) -> String
where
    Tz::Offset: Display,
{
    let day = dt.day();
    let suffix = ordinal_suffix(day);

    if !time_first {
        return format!("{}, {}{} {}", dt.format("%a"), day, suffix, dt.format("%B %Y, %-I:%M %P"));
    }

    let nth = if html {
        format!("{}<sup>{}</sup>", day, suffix)
    } else {
        format!("{}{}", day, suffix)
    };
    format!(
        "{} on {} the {} of {}",
        dt.format("%-I:%M%P"),
        dt.format("%A"),
        nth,
        dt.format("%B, %Y")
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_human_list() {
        assert_eq!(human_list(&["apples"], "&"), "apples");
        assert_eq!(human_list(&["apples", "pears"], "and"), "apples and pears");
        assert_eq!(human_list(&["a", "b", "c"], "&"), "a, b & c");
        assert_eq!(human_list::<&str>(&[], "&"), "");
    }

    #[test]
    fn test_format_human_date() {
        let dt = Utc.with_ymd_and_hms(2019, 6, 17, 21, 5, 0).unwrap();
        assert_eq!(format_human_date(&dt, false, false), "Mon, 17th June 2019, 9:05 pm");
        assert_eq!(
            format_human_date(&dt, true, false),
            "9:05pm on Monday the 17th of June, 2019"
        );
        assert_eq!(
            format_human_date(&dt, true, true),
            "9:05pm on Monday the 17<sup>th</sup> of June, 2019"
        );
    }

    #[test]
    fn test_ordinals() {
        assert_eq!(ordinal_suffix(1), "st");
        assert_eq!(ordinal_suffix(2), "nd");
        assert_eq!(ordinal_suffix(3), "rd");
        assert_eq!(ordinal_suffix(11), "th");
        assert_eq!(ordinal_suffix(22), "nd");
        assert_eq!(ordinal_suffix(31), "st");
    }

    #[test]
    fn test_human_date_out_of_range() {
        assert!(human_date(i64::MAX, false, false).is_none());
        assert!(human_date(0, true, false).is_some());
    }
}
