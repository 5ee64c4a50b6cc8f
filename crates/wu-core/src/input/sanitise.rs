//! Sanitisers: strip what is not allowed and hand back what is left.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::limits::{char_limit, CharSet, NumericRules, TextRules};
use super::InputError;

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

/// Elements removed together with everything between their tags.
const BAD_TAGS: &[&str] = &[
    "applet", "datalist", "details", "dir", "embed", "fieldset", "form", "frame", "frameset",
    "iframe", "input", "legend", "link", "map", "math", "meta", "object", "optgroup", "option",
    "script", "select", "style", "textarea", "video",
];

/// Presentational and event attributes.
const BAD_ATTRS: &[&str] = &[
    "align", "alink", "background", "bgcolor", "border", "clear", r"data[a-z0-9-]+", "height",
    "hspace", "language", "link", "nowrap", r"on[a-z]+", "style", "text", "type", "vlink",
    "vspace", "width",
];

static HTML_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(?:&nbsp;|\s)+").unwrap());

static BAD_TAG_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    BAD_TAGS
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).unwrap())
        .collect()
});

static SELF_CLOSING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(?:link|meta|input)\b[^>]*>").unwrap());

static DEPRECATED_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)</?(?:center|font)\b[^>]*>").unwrap());

static BAD_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?i)\s(?:{})=(?:"[^">]+"|'[^>']+'|[^\s>]+)"#,
        BAD_ATTRS.join("|")
    ))
    .unwrap()
});

static PARAGRAPH_BR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:<br ?/?>)?\s*(</?p>)\s*(?:<br ?/?>)?").unwrap());

static CUSTOM_ELEMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<([a-z]+(?:-[a-z0-9]+)+)[^>]*>").unwrap());

static EMPTY_ELEMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([a-z]+)[^>]*>\s*</([a-z]+)[^>]*>").unwrap());

static HTML_COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static ANY_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?([a-zA-Z][a-zA-Z0-9-]*)[^>]*>").unwrap());

/// Remove potentially dangerous elements and attributes from an HTML fragment.
///
/// When `allowed_tags` is given every tag not in the list is stripped as
/// well (the text between the tags is kept). Entries may be written as
/// `p` or `<p>`.
pub fn sanitise_html(html: &str, allowed_tags: Option<&[&str]>) -> String {
    let mut output = HTML_SPACE_RE.replace_all(html, " ").into_owned();

    for re in BAD_TAG_RES.iter() {
        output = re.replace_all(&output, "").into_owned();
    }
    output = SELF_CLOSING_RE.replace_all(&output, "").into_owned();
    output = DEPRECATED_TAG_RE.replace_all(&output, "").into_owned();
    output = BAD_ATTR_RE.replace_all(&output, "").into_owned();
    output = PARAGRAPH_BR_RE.replace_all(&output, "$1").into_owned();
    output = strip_custom_elements(&output);
    output = EMPTY_ELEMENT_RE
        .replace_all(&output, |caps: &Captures| {
            if caps[1] == caps[2] {
                String::new()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned();

    match allowed_tags {
        Some(allowed) => strip_tags(&output, allowed),
        None => output,
    }
}

/// Remove `<x-y>…</x-y>` custom elements and their content.
fn strip_custom_elements(html: &str) -> String {
    let mut output = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(caps) = CUSTOM_ELEMENT_RE.captures(rest) {
        let open = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or_default();
        let closing = format!("</{}", caps[1].to_ascii_lowercase());
        let after_open = &rest[open.1..];

        let close_at = after_open
            .to_ascii_lowercase()
            .find(&closing)
            .and_then(|idx| after_open[idx..].find('>').map(|gt| idx + gt + 1));

        match close_at {
            Some(end) => {
                output.push_str(&rest[..open.0]);
                rest = &after_open[end..];
            }
            None => {
                output.push_str(&rest[..open.1]);
                rest = after_open;
            }
        }
    }

    output.push_str(rest);
    output
}

fn strip_tags(html: &str, allowed: &[&str]) -> String {
    let allowed: Vec<String> = allowed
        .iter()
        .map(|t| t.trim_matches(|c| c == '<' || c == '>' || c == '/').to_ascii_lowercase())
        .collect();

    let without_comments = HTML_COMMENT_RE.replace_all(html, "");
    ANY_TAG_RE
        .replace_all(&without_comments, |caps: &Captures| {
            if allowed.contains(&caps[1].to_ascii_lowercase()) {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Plain text
// ---------------------------------------------------------------------------

static NAME_BAD_CHARS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w \-.']+").unwrap());
static NAME_NUMBERS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)*").unwrap());
static NAME_REPEATS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([ \-.'])+").unwrap());

static STUDENT_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Z0-9]+").unwrap());

static TITLE_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static TITLE_BAD_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w&,.?:! \-'()]+").unwrap());

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const TEXT_DEFAULT_CHARS: &str = r"\w&, \-.?:!'()/";
const TITLE_PUNCTUATION: &[char] = &['&', ',', '.', '?', ':', '!', ' ', '-', '_', '\'', '(', ')'];
const CLASS_ESCAPES: &[char] = &['d', 'D', 's', 'S', 'w', 'W', 't', 'r', 'n'];

static CLASS_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z]-[a-zA-Z]|[0-9]-[0-9]").unwrap());

fn truncate_chars(input: &str, max: usize) -> &str {
    match input.char_indices().nth(max) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

/// Trim, cut to `max` characters, trim again.
fn trim_to(input: &str, max: usize) -> String {
    truncate_chars(input.trim(), max).trim().to_string()
}

/// Keep only letters, spaces, hyphens, full stops and apostrophes.
///
/// Numbers are removed, runs of punctuation are collapsed to the last
/// character of the run. `max` is clamped to 1..=64 (default 64).
pub fn sanitise_name(name: &str, max: Option<usize>) -> String {
    let max = char_limit(max, 64, 1, 64);
    let output = NAME_BAD_CHARS_RE.replace_all(name, " ");
    let output = NAME_NUMBERS_RE.replace_all(&output, " ");
    let output = NAME_REPEATS_RE.replace_all(&output, "$1");
    trim_to(&output, max)
}

/// Upper-case letters and digits only, at most 24 characters.
pub fn sanitise_student_id(student_id: &str) -> String {
    let upper = student_id.to_uppercase();
    let output = STUDENT_ID_RE.replace_all(&upper, "");
    truncate_chars(&output, 24).to_string()
}

/// Replace each run of disallowed characters in free text with one space.
///
/// Errors only when the rules produce an invalid pattern.
pub fn sanitise_text(text: &str, rules: &TextRules) -> Result<String, InputError> {
    let flags = if rules.ignore_case { "(?i)" } else { "" };
    let pattern = match &rules.chars {
        CharSet::Default => format!("{flags}[^{TEXT_DEFAULT_CHARS}]+"),
        CharSet::Extra(extra) => {
            format!("{flags}[^{TEXT_DEFAULT_CHARS}{}]+", escape_char_class(extra))
        }
        CharSet::Only(only) => format!("{flags}[^{}]+", escape_char_class(only)),
        CharSet::Raw(raw) => raw.clone(),
    };
    let re = Regex::new(&pattern)?;

    let mut output = re.replace_all(text, " ").into_owned();
    if rules.dedupe {
        output = WHITESPACE_RE.replace_all(&output, " ").into_owned();
    }

    Ok(trim_to(&output, rules.max))
}

/// Make caller supplied characters safe inside a regex character class.
///
/// Letter and digit ranges (`a-z`, `0-9`) and the escapes `\d \s \w \t \r
/// \n` (and their negations) survive; everything else is literal.
fn escape_char_class(input: &str) -> String {
    let mut output = String::new();
    for range in CLASS_RANGE_RE.find_iter(input) {
        output.push_str(range.as_str());
    }
    let rest = CLASS_RANGE_RE.replace_all(input, "");

    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek().is_some_and(|n| CLASS_ESCAPES.contains(n)) => {
                output.push('\\');
                if let Some(n) = chars.next() {
                    output.push(n);
                }
            }
            '\\' | ']' | '[' | '^' | '-' | '/' | '&' | '~' => {
                output.push('\\');
                output.push(c);
            }
            _ => output.push(c),
        }
    }
    output
}

/// Clean up a title: collapse whitespace, drop odd characters, collapse
/// repeated punctuation. `max` is clamped to 1..=64 (default 64).
pub fn sanitise_title(title: &str, max: Option<usize>) -> String {
    let max = char_limit(max, 64, 1, 64);
    let output = TITLE_SPACE_RE.replace_all(title, " ");
    let output = TITLE_BAD_CHARS_RE.replace_all(&output, "");

    let mut deduped = String::with_capacity(output.len());
    let mut prev: Option<char> = None;
    for c in output.chars() {
        if prev == Some(c) && TITLE_PUNCTUATION.contains(&c) {
            continue;
        }
        deduped.push(c);
        prev = Some(c);
    }

    trim_to(&deduped, max)
}

// ---------------------------------------------------------------------------
// Phone numbers
// ---------------------------------------------------------------------------

static PHONE_CHARS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^+0-9]+").unwrap());
static MOBILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\+61|0)(4\d{2})(\d{3})(\d{3})$").unwrap());
static LANDLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\+61|0)([2378])(\d{4})(\d{4})$").unwrap());
static OS_PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\+\d{2})(\d{4,12})$").unwrap());

/// Australian mobile number formatted as `04xx xxx xxx`.
pub fn sanitise_mobile(number: &str) -> Option<String> {
    let digits = PHONE_CHARS_RE.replace_all(number, "");
    MOBILE_RE
        .captures(&digits)
        .map(|c| format!("0{} {} {}", &c[1], &c[2], &c[3]))
}

/// Australian fixed line number formatted as `0X XXXX XXXX`.
pub fn sanitise_landline(number: &str) -> Option<String> {
    let digits = PHONE_CHARS_RE.replace_all(number, "");
    LANDLINE_RE
        .captures(&digits)
        .map(|c| format!("0{} {} {}", &c[1], &c[2], &c[3]))
}

/// International number: `+CC` followed by groups of four digits,
/// counted from the right.
pub fn sanitise_os_phone(number: &str) -> Option<String> {
    let digits = PHONE_CHARS_RE.replace_all(number, "");
    let caps = OS_PHONE_RE.captures(&digits)?;
    let local = &caps[2];

    let mut groups = Vec::new();
    let head = local.len() % 4;
    if head > 0 {
        groups.push(&local[..head]);
    }
    let mut idx = head;
    while idx < local.len() {
        groups.push(&local[idx..idx + 4]);
        idx += 4;
    }

    Some(format!("{} {}", &caps[1], groups.join(" ")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneKind {
    Mobile,
    Fixed,
    Os,
}

impl PhoneKind {
    pub const ALL: [PhoneKind; 3] = [PhoneKind::Mobile, PhoneKind::Fixed, PhoneKind::Os];

    /// Accepts `mobile`/`cell…`, `fixed`/`land…` and `os`/`int…`.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        if name == "mobile" || name.starts_with("cell") {
            Some(PhoneKind::Mobile)
        } else if name == "fixed" || name.starts_with("land") {
            Some(PhoneKind::Fixed)
        } else if name == "os" || name.starts_with("int") {
            Some(PhoneKind::Os)
        } else {
            None
        }
    }

    /// Parse a list of kind names; at least one must be recognised.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Self>, InputError> {
        let mut kinds = Vec::new();
        for kind in names.iter().filter_map(|n| Self::parse(n.as_ref())) {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        if kinds.is_empty() {
            return Err(InputError::NoPhoneKinds(
                names.iter().map(|n| n.as_ref().to_string()).collect(),
            ));
        }
        Ok(kinds)
    }
}

/// Try each allowed kind in the order mobile, fixed, overseas.
///
/// An empty `kinds` slice is a programming error.
pub fn sanitise_any_phone(number: &str, kinds: &[PhoneKind]) -> Result<Option<String>, InputError> {
    if kinds.is_empty() {
        return Err(InputError::NoPhoneKinds(Vec::new()));
    }

    for kind in PhoneKind::ALL {
        if !kinds.contains(&kind) {
            continue;
        }
        let found = match kind {
            PhoneKind::Mobile => sanitise_mobile(number),
            PhoneKind::Fixed => sanitise_landline(number),
            PhoneKind::Os => sanitise_os_phone(number),
        };
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Numbers
// ---------------------------------------------------------------------------

static NON_NUMERIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.\-]+").unwrap());
static LEADING_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[0-9]+(?:\.[0-9]+)?").unwrap());

/// Pull a number out of noisy input.
///
/// Everything but digits, `.` and `-` is dropped and the leading number
/// kept. `None` when nothing numeric is left or the value falls outside
/// the inclusive min/max.
pub fn sanitise_numeric(number: &str, rules: NumericRules) -> Option<f64> {
    let stripped = NON_NUMERIC_RE.replace_all(number, "");
    let value: f64 = match LEADING_NUMBER_RE.find(&stripped) {
        Some(m) => m.as_str().parse().ok()?,
        None => stripped.parse().ok()?,
    };

    if rules.min.is_some_and(|min| value < min) || rules.max.is_some_and(|max| value > max) {
        return None;
    }

    Some(match rules.precision {
        Some(places) => round_to(value, places),
        None => value,
    })
}

/// Like `sanitise_numeric`, rounded to a whole number.
pub fn sanitise_int(number: &str, rules: NumericRules) -> Option<i64> {
    sanitise_numeric(number, rules.precision(0)).map(|n| n as i64)
}

/// Round half away from zero to `places` decimal places.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
