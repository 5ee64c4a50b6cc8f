//! camelCase / snake_case / kebab-case conversions.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Insert `sep` before each word that starts with an upper-case letter or
/// digit followed by lower-case letters or digits, then lower-case the lot.
///
/// `upper` upper-cases the result, but only when a separator was inserted.
pub fn camel_to_separated(input: &str, upper: bool, sep: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut output = String::with_capacity(input.len() + 4);
    let mut split = false;

    for (idx, &c) in chars.iter().enumerate() {
        let starts_word = idx > 0
            && is_lower_or_digit(chars[idx - 1])
            && (c.is_ascii_uppercase() || c.is_ascii_digit())
            && chars.get(idx + 1).copied().is_some_and(is_lower_or_digit);
        if starts_word {
            output.push_str(sep);
            split = true;
        }
        output.push(c.to_ascii_lowercase());
    }

    if upper && (split || output != input) {
        output.to_ascii_uppercase()
    } else {
        output
    }
}

fn is_lower_or_digit(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

pub fn camel_to_snake(input: &str, upper: bool) -> String {
    camel_to_separated(input, upper, "_")
}

pub fn camel_to_kebab(input: &str, upper: bool) -> String {
    camel_to_separated(input, upper, "-")
}

/// `snake_case` or `kebab-case` to space separated words.
pub fn snake_to_text(input: &str) -> String {
    input.replace(['_', '-'], " ")
}

/// Split on the first separator found (space, `_` or `-`) and join the
/// parts from index `start` as camelCase. Input without a separator is
/// returned unchanged.
pub fn snake_to_camel(input: &str, start: usize) -> String {
    let Some(sep) = input.chars().find(|c| matches!(c, ' ' | '_' | '-')) else {
        return input.to_string();
    };

    let mut parts = input.split(sep).skip(start);
    let mut output = parts.next().map(str::to_lowercase).unwrap_or_default();
    for part in parts {
        let lower = part.to_lowercase();
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            output.extend(first.to_uppercase());
            output.push_str(chars.as_str());
        }
    }
    output
}

/// Replace runs of whitespace with `sep`.
pub fn text_to_snake(input: &str, sep: &str, upper: bool) -> String {
    let output = WHITESPACE_RE.replace_all(input, NoExpand(sep));
    if upper {
        output.to_uppercase()
    } else {
        output.into_owned()
    }
}
