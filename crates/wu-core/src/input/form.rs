//! Pull a single field out of submitted form data and run it through the
//! matching sanitiser or validator.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use super::limits::{DateRules, NumericRules, TextRules, TimeRules, YearRules};
use super::sanitise::{
    sanitise_any_phone, sanitise_html, sanitise_int, sanitise_landline, sanitise_mobile,
    sanitise_name, sanitise_numeric, sanitise_os_phone, sanitise_text, sanitise_title, PhoneKind,
};
use super::validate::{
    validate_au_postcode, validate_email, validate_iso_date, validate_iso_datetime,
    validate_iso_time, validate_ref_id, validate_selected, validate_url, validate_year,
};
use super::InputError;

/// How a form value is checked.
pub enum Mode<'a> {
    AnyPhone(&'a [PhoneKind]),
    AuPostcode { no_po_box: bool },
    /// `1`, `true`, `yes`, `on` or the field's own name count as true.
    Bool,
    Callback(&'a dyn Fn(&str) -> FormValue),
    /// Present means checked; the value is ignored.
    Checkbox,
    Date(&'a DateRules),
    DateTime(&'a DateRules),
    Email,
    FixedPhone,
    Html,
    Int(NumericRules),
    Mobile,
    Name(Option<usize>),
    Numeric(NumericRules),
    RefId,
    OsPhone,
    Select(&'a [&'a str]),
    Text(&'a TextRules),
    Time(&'a TimeRules),
    Title(Option<usize>),
    Url,
    Year(&'a YearRules),
    /// Trimmed, otherwise untouched.
    Raw,
}

impl fmt::Debug for Mode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::AnyPhone(_) => "AnyPhone",
            Mode::AuPostcode { .. } => "AuPostcode",
            Mode::Bool => "Bool",
            Mode::Callback(_) => "Callback",
            Mode::Checkbox => "Checkbox",
            Mode::Date(_) => "Date",
            Mode::DateTime(_) => "DateTime",
            Mode::Email => "Email",
            Mode::FixedPhone => "FixedPhone",
            Mode::Html => "Html",
            Mode::Int(_) => "Int",
            Mode::Mobile => "Mobile",
            Mode::Name(_) => "Name",
            Mode::Numeric(_) => "Numeric",
            Mode::RefId => "RefId",
            Mode::OsPhone => "OsPhone",
            Mode::Select(_) => "Select",
            Mode::Text(_) => "Text",
            Mode::Time(_) => "Time",
            Mode::Title(_) => "Title",
            Mode::Url => "Url",
            Mode::Year(_) => "Year",
            Mode::Raw => "Raw",
        };
        f.write_str(name)
    }
}

/// Result of checking one form field.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    /// The key was not submitted.
    Missing,
    /// Submitted but rejected by the validator.
    Invalid,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl FormValue {
    pub fn is_valid(&self) -> bool {
        !matches!(self, FormValue::Missing | FormValue::Invalid)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FormValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FormValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FormValue::Float(n) => Some(*n),
            FormValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// `true` only for `Bool(true)`; a missing checkbox is unchecked.
    pub fn is_true(&self) -> bool {
        matches!(self, FormValue::Bool(true))
    }

    /// The text value, or `default` for anything else.
    pub fn text_or(self, default: &str) -> String {
        match self {
            FormValue::Text(s) => s,
            _ => default.to_string(),
        }
    }
}

impl From<Option<String>> for FormValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(FormValue::Invalid, FormValue::Text)
    }
}

impl fmt::Display for FormValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormValue::Missing | FormValue::Invalid => Ok(()),
            FormValue::Text(s) => f.write_str(s),
            FormValue::Int(n) => write!(f, "{}", n),
            FormValue::Float(n) => write!(f, "{}", n),
            FormValue::Bool(b) => write!(f, "{}", u8::from(*b)),
        }
    }
}

/// Look `key` up in submitted form data and check it according to `mode`.
///
/// `Err` is only returned for mistakes in the arguments (for example an
/// empty list of phone kinds or a broken text pattern).
pub fn get_valid_from_array(
    key: &str,
    input: &HashMap<String, String>,
    mode: Mode<'_>,
) -> Result<FormValue, InputError> {
    let Some(raw) = input.get(key) else {
        return Ok(FormValue::Missing);
    };
    let value = raw.trim();
    debug!(key = %key, mode = ?mode, "Checking form value");

    let checked: FormValue = match mode {
        Mode::AnyPhone(kinds) => sanitise_any_phone(value, kinds)?.into(),
        Mode::AuPostcode { no_po_box } => validate_au_postcode(value, no_po_box).into(),
        Mode::Bool => {
            let lower = value.to_lowercase();
            FormValue::Bool(matches!(lower.as_str(), "1" | "true" | "yes" | "on") || value == key)
        }
        Mode::Callback(callback) => callback(value),
        Mode::Checkbox => FormValue::Bool(true),
        Mode::Date(rules) => validate_iso_date(value, rules).into(),
        Mode::DateTime(rules) => validate_iso_datetime(value, rules).into(),
        Mode::Email => validate_email(value).into(),
        Mode::FixedPhone => sanitise_landline(value).into(),
        Mode::Html => FormValue::Text(sanitise_html(value, None)),
        Mode::Int(rules) => sanitise_int(value, rules).map_or(FormValue::Invalid, FormValue::Int),
        Mode::Mobile => sanitise_mobile(value).into(),
        Mode::Name(max) => FormValue::Text(sanitise_name(value, max)),
        Mode::Numeric(rules) => {
            sanitise_numeric(value, rules).map_or(FormValue::Invalid, FormValue::Float)
        }
        Mode::RefId => validate_ref_id(value).into(),
        Mode::OsPhone => sanitise_os_phone(value).into(),
        Mode::Select(options) => validate_selected(value, options)
            .map(str::to_string)
            .into(),
        Mode::Text(rules) => FormValue::Text(sanitise_text(value, rules)?),
        Mode::Time(rules) => validate_iso_time(value, rules).into(),
        Mode::Title(max) => FormValue::Text(sanitise_title(value, max)),
        Mode::Url => validate_url(value).into(),
        Mode::Year(rules) => validate_year(value, rules)
            .map_or(FormValue::Invalid, |y| FormValue::Int(i64::from(y))),
        Mode::Raw => FormValue::Text(value.to_string()),
    };

    Ok(checked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_key() {
        let input = form(&[("name", "Jo")]);
        let value = get_valid_from_array("email", &input, Mode::Email).unwrap();
        assert_eq!(value, FormValue::Missing);
        assert_eq!(value.text_or("nobody"), "nobody");
    }

    #[test]
    fn test_invalid_and_valid_email() {
        let input = form(&[("good", " jo@uni.edu.au "), ("bad", "jo@example.org")]);
        assert_eq!(
            get_valid_from_array("good", &input, Mode::Email).unwrap(),
            FormValue::Text("jo@uni.edu.au".into())
        );
        assert_eq!(
            get_valid_from_array("bad", &input, Mode::Email).unwrap(),
            FormValue::Invalid
        );
    }

    #[test]
    fn test_bool_and_checkbox() {
        let input = form(&[("agree", "Yes"), ("subscribe", "subscribe"), ("spam", "no")]);
        assert!(get_valid_from_array("agree", &input, Mode::Bool).unwrap().is_true());
        assert!(get_valid_from_array("subscribe", &input, Mode::Bool).unwrap().is_true());
        assert!(!get_valid_from_array("spam", &input, Mode::Bool).unwrap().is_true());
        assert!(get_valid_from_array("spam", &input, Mode::Checkbox).unwrap().is_true());
        assert!(!get_valid_from_array("other", &input, Mode::Checkbox).unwrap().is_true());
    }

    #[test]
    fn test_numeric_modes() {
        let input = form(&[("qty", "12 items"), ("price", "$19.955")]);
        assert_eq!(
            get_valid_from_array("qty", &input, Mode::Int(NumericRules::new().max(10.0))).unwrap(),
            FormValue::Invalid
        );
        assert_eq!(
            get_valid_from_array("price", &input, Mode::Numeric(NumericRules::new().precision(1)))
                .unwrap(),
            FormValue::Float(20.0)
        );
    }

    #[test]
    fn test_select_and_year() {
        let input = form(&[("campus", "north sydney"), ("year", "2019")]);
        let campuses = ["Brisbane", "North Sydney"];
        assert_eq!(
            get_valid_from_array("campus", &input, Mode::Select(&campuses)).unwrap(),
            FormValue::Text("North Sydney".into())
        );
        assert_eq!(
            get_valid_from_array("year", &input, Mode::Year(&YearRules::new())).unwrap(),
            FormValue::Int(2019)
        );
    }

    #[test]
    fn test_callback() {
        let input = form(&[("code", "abc")]);
        let upper = |v: &str| FormValue::Text(v.to_uppercase());
        assert_eq!(
            get_valid_from_array("code", &input, Mode::Callback(&upper)).unwrap(),
            FormValue::Text("ABC".into())
        );
    }

    #[test]
    fn test_developer_errors_surface() {
        let input = form(&[("phone", "0412345678"), ("bio", "hello")]);
        assert!(get_valid_from_array("phone", &input, Mode::AnyPhone(&[])).is_err());
        let rules = TextRules::new().allow_raw("(");
        assert!(get_valid_from_array("bio", &input, Mode::Text(&rules)).is_err());
    }

    #[test]
    fn test_raw_is_trimmed() {
        let input = form(&[("note", "  <b>as is</b> ")]);
        assert_eq!(
            get_valid_from_array("note", &input, Mode::Raw).unwrap(),
            FormValue::Text("<b>as is</b>".into())
        );
    }
}
