use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, line_ending, space0},
    combinator::opt,
    multi::many0,
    IResult,
};

/// A parsed settings file, one entry per line in file order.
#[derive(Debug, Clone, Default)]
pub struct SettingsFile {
    pub entries: Vec<SettingsLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsLine {
    /// `[section]` header. Keys below it are addressed as `section.key`.
    Section(String),
    /// A key = value pair
    KeyValue { key: String, value: String },
    /// A comment line (including the # or ; prefix)
    Comment(String),
    /// An empty/blank line
    Blank,
}

impl SettingsFile {
    /// Iterate over `(qualified_key, value)` pairs in file order.
    pub fn pairs(&self) -> impl Iterator<Item = (String, &str)> + '_ {
        let mut section: Option<&str> = None;
        self.entries.iter().filter_map(move |line| match line {
            SettingsLine::Section(name) => {
                section = Some(name.as_str());
                None
            }
            SettingsLine::KeyValue { key, value } => {
                let qualified = match section {
                    Some(s) => format!("{}.{}", s, key),
                    None => key.clone(),
                };
                Some((qualified, value.as_str()))
            }
            _ => None,
        })
    }
}

// nom parsers

fn is_not_newline(c: char) -> bool {
    c != '\n' && c != '\r'
}

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

fn comment_line(input: &str) -> IResult<&str, SettingsLine> {
    let (input, _) = space0(input)?;
    let (input, marker) = alt((char('#'), char(';')))(input)?;
    let (input, rest) = take_while(is_not_newline)(input)?;
    let (input, _) = opt(line_ending)(input)?;
    Ok((input, SettingsLine::Comment(format!("{}{}", marker, rest))))
}

fn blank_line(input: &str) -> IResult<&str, SettingsLine> {
    let (input, _) = space0(input)?;
    let (input, _) = line_ending(input)?;
    Ok((input, SettingsLine::Blank))
}

fn section_line(input: &str) -> IResult<&str, SettingsLine> {
    let (input, _) = space0(input)?;
    let (input, _) = char('[')(input)?;
    let (input, _) = space0(input)?;
    let (input, name) = take_while1(is_key_char)(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = char(']')(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = opt(line_ending)(input)?;
    Ok((input, SettingsLine::Section(name.to_string())))
}

fn key_value_line(input: &str) -> IResult<&str, SettingsLine> {
    let (input, _) = space0(input)?;
    let (input, key) = take_while1(is_key_char)(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = char('=')(input)?;
    let (input, _) = space0(input)?;
    let (input, val) = take_while(is_not_newline)(input)?;
    let (input, _) = opt(line_ending)(input)?;
    Ok((
        input,
        SettingsLine::KeyValue {
            key: key.to_string(),
            value: unquote(val.trim_end()).to_string(),
        },
    ))
}

/// Strip one matching pair of surrounding double quotes.
fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn settings_line(input: &str) -> IResult<&str, SettingsLine> {
    alt((comment_line, blank_line, section_line, key_value_line))(input)
}

pub fn parse_settings(input: &str) -> Result<SettingsFile, String> {
    let (remaining, entries) =
        many0(settings_line)(input).map_err(|e| format!("Parse error: {}", e))?;

    if !remaining.trim().is_empty() {
        return Err(format!(
            "Unparsed content remaining: {:?}",
            &remaining[..remaining.len().min(100)]
        ));
    }

    Ok(SettingsFile { entries })
}
