//! Random test data: words, names, addresses, phone numbers and the like.

pub mod data;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;
use tracing::info;

use data::{ALPHA, COMMON_TITLES, COUNTRIES, HOME, STATES, STREETS, TITLES, TLDS};

#[derive(Debug, Error)]
pub enum RandomError {
    #[error("Failed to read word list {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Word list {0} must contain both capitalised names and lower-case words")]
    EmptyWordList(PathBuf),
    #[error("Unknown string kind {0:?}; expected one of words, names, streets, titles, countries, tld, states, alpha")]
    UnknownKind(String),
    #[error("Cannot pick from an empty list")]
    EmptyChoices,
}

/// Which list `get_str` draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrKind {
    #[default]
    Words,
    Names,
    Streets,
    Titles,
    Countries,
    Tld,
    States,
    Alpha,
}

impl FromStr for StrKind {
    type Err = RandomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "word" | "words" => Ok(StrKind::Words),
            "name" | "names" => Ok(StrKind::Names),
            "street" | "streets" => Ok(StrKind::Streets),
            "title" | "titles" => Ok(StrKind::Titles),
            "country" | "countrys" | "countries" => Ok(StrKind::Countries),
            "tld" | "tlds" | "topdomain" | "top-domain" => Ok(StrKind::Tld),
            "state" | "states" => Ok(StrKind::States),
            "alpha" => Ok(StrKind::Alpha),
            other => Err(RandomError::UnknownKind(other.to_string())),
        }
    }
}

/// Random string source backed by a word list.
///
/// Lines starting with an upper-case ASCII letter are names, every other
/// non-empty line is a word.
#[derive(Debug, Clone)]
pub struct RandomStr {
    words: Vec<String>,
    names: Vec<String>,
}

impl RandomStr {
    pub fn load(path: &Path) -> Result<Self, RandomError> {
        let raw = fs::read_to_string(path).map_err(|source| RandomError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let me = Self::from_lines(raw.lines())
            .ok_or_else(|| RandomError::EmptyWordList(path.to_path_buf()))?;
        info!(
            path = %path.display(),
            words = me.words.len(),
            names = me.names.len(),
            "Loaded word list"
        );
        Ok(me)
    }

    /// Build from lines of text. `None` when either names or words are missing.
    pub fn from_lines<'a, I: IntoIterator<Item = &'a str>>(lines: I) -> Option<Self> {
        let mut words = Vec::new();
        let mut names = Vec::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with(|c: char| c.is_ascii_uppercase()) {
                names.push(line.to_string());
            } else {
                words.push(line.to_string());
            }
        }
        if words.is_empty() || names.is_empty() {
            return None;
        }
        Some(Self { words, names })
    }

    pub fn get_str(&self, kind: StrKind) -> &str {
        let mut rng = rand::thread_rng();
        let picked = match kind {
            StrKind::Words => self.words.choose(&mut rng).map(String::as_str),
            StrKind::Names => self.names.choose(&mut rng).map(String::as_str),
            StrKind::Streets => STREETS.choose(&mut rng).copied(),
            StrKind::Titles => TITLES.choose(&mut rng).copied(),
            StrKind::Countries => COUNTRIES.choose(&mut rng).copied(),
            StrKind::Tld => TLDS.choose(&mut rng).copied(),
            StrKind::States => STATES.choose(&mut rng).copied(),
            StrKind::Alpha => ALPHA.choose(&mut rng).copied(),
        };
        // Every list is non-empty: the fixed ones by construction, the
        // word list by `from_lines`.
        picked.unwrap_or_default()
    }

    /// Pick one of the caller's strings.
    pub fn get_custom_str<'a, S: AsRef<str>>(&self, strings: &'a [S]) -> Result<&'a str, RandomError> {
        strings
            .choose(&mut rand::thread_rng())
            .map(AsRef::as_ref)
            .ok_or(RandomError::EmptyChoices)
    }

    /// Street address such as `"42 Lantern Cres"`.
    pub fn get_address(&self) -> String {
        let number = rand::thread_rng().gen_range(0..=999);
        format!(
            "{} {} {}",
            number,
            capitalise(self.get_str(StrKind::Words)),
            self.get_str(StrKind::Streets)
        )
    }

    /// Random country; with probability about `(skew + 1) / 11` the home country.
    pub fn get_country(&self, skew: u32) -> String {
        if rand::thread_rng().gen_range(0..=10) <= skew {
            return HOME.to_string();
        }
        self.get_str(StrKind::Countries).to_string()
    }

    /// `word.tld`, plus a two letter country code when the skew allows.
    pub fn get_domain(&self, skew: u32) -> String {
        let mut output = format!("{}.{}", self.get_str(StrKind::Words), self.get_str(StrKind::Tld));
        if rand::thread_rng().gen_range(0..=10) <= skew {
            output.push('.');
            output.push_str(self.get_str(StrKind::Alpha));
            output.push_str(self.get_str(StrKind::Alpha));
        }
        output
    }

    pub fn get_email(&self) -> String {
        let sep = ['.', '_', '-']
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or('.');
        format!(
            "{}{}{}@{}",
            self.get_str(StrKind::Names),
            sep,
            self.get_str(StrKind::Names),
            self.get_domain(8)
        )
    }

    /// International number: `+CC` then between `min_digits` and
    /// `max_digits` digits (at most 15).
    pub fn get_int_phone(&self, max_digits: u32, min_digits: u32) -> String {
        let max_digits = max_digits.clamp(1, 15);
        let min_digits = min_digits.clamp(1, max_digits);
        let mut rng = rand::thread_rng();

        let digits = rng.gen_range(min_digits..=max_digits);
        let upper = 10u64.pow(digits);
        let number = rng.gen_range(upper / 10..upper);
        let country: u32 = rng.gen_range(10..=99);

        format!("+{}{:0width$}", country, number, width = digits as usize)
    }

    /// Ten digit Australian number; a mobile (`04…`) or a fixed line.
    pub fn get_phone(&self, mobile: bool) -> String {
        let mut rng = rand::thread_rng();
        let prefix = if mobile {
            "04"
        } else {
            ["02", "03", "07", "08"].choose(&mut rng).copied().unwrap_or("02")
        };
        format!("{}{:08}", prefix, rng.gen_range(10_000..=999_999))
    }

    pub fn get_post_code(&self) -> String {
        format!("{:04}", rand::thread_rng().gen_range(800..=9999))
    }

    /// Honorific; `common` limits the choice to n/a, Mr, Ms, Mx and Dr.
    pub fn get_title(&self, common: bool) -> &'static str {
        let titles = if common { &TITLES[..COMMON_TITLES] } else { TITLES };
        titles
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or_default()
    }

    /// `max` space separated words, or a random count between `min` and
    /// `max` when `min` is given.
    pub fn get_words(&self, max: usize, min: Option<usize>) -> String {
        let count = match min {
            None => max,
            Some(min) => {
                let (lo, hi) = if min > max { (max, min) } else { (min, max) };
                rand::thread_rng().gen_range(lo..=hi)
            }
        };
        (0..count)
            .map(|_| self.get_str(StrKind::Words))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn capitalise(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::sanitise::{sanitise_landline, sanitise_mobile};
    use tempfile::TempDir;

    fn sample() -> RandomStr {
        RandomStr::from_lines(["apple", "banana", "cherry", "Alice", "Bob", "", "  durian  "]).unwrap()
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!("Name".parse::<StrKind>().unwrap(), StrKind::Names);
        assert_eq!("countrys".parse::<StrKind>().unwrap(), StrKind::Countries);
        assert_eq!("top-domain".parse::<StrKind>().unwrap(), StrKind::Tld);
        assert_eq!("".parse::<StrKind>().unwrap(), StrKind::Words);
        assert!(matches!(
            "planets".parse::<StrKind>(),
            Err(RandomError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_split_names_and_words() {
        let r = sample();
        assert_eq!(r.names, vec!["Alice", "Bob"]);
        assert_eq!(r.words, vec!["apple", "banana", "cherry", "durian"]);
        for _ in 0..20 {
            assert!(r.words.iter().any(|w| w == r.get_str(StrKind::Words)));
            assert!(ALPHA.contains(&r.get_str(StrKind::Alpha)));
        }
    }

    #[test]
    fn test_word_list_needs_both_kinds() {
        assert!(RandomStr::from_lines(["only", "words"]).is_none());
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("words.txt");
        fs::write(&path, "Names\nOnly\n").unwrap();
        assert!(matches!(RandomStr::load(&path), Err(RandomError::EmptyWordList(_))));
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("words.txt");
        fs::write(&path, "Carol\nhouse\ngarden\n").unwrap();
        let r = RandomStr::load(&path).unwrap();
        assert_eq!(r.get_str(StrKind::Names), "Carol");
    }

    #[test]
    fn test_custom_str() {
        let r = sample();
        let options = ["x", "y"];
        assert!(options.contains(&r.get_custom_str(&options).unwrap()));
        let empty: [&str; 0] = [];
        assert!(r.get_custom_str(&empty).is_err());
    }

    #[test]
    fn test_address_shape() {
        let r = sample();
        let address = r.get_address();
        let parts: Vec<&str> = address.split(' ').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].parse::<u32>().unwrap() <= 999);
        assert!(parts[1].starts_with(|c: char| c.is_uppercase()));
        assert!(STREETS.contains(&parts[2]));
    }

    #[test]
    fn test_country_skew() {
        let r = sample();
        assert_eq!(r.get_country(10), HOME);
        let country = r.get_country(0);
        assert!(COUNTRIES.contains(&country.as_str()));
    }

    #[test]
    fn test_domain_and_email() {
        let r = sample();
        let plain = r.get_domain(0);
        let parts: Vec<&str> = plain.split('.').collect();
        assert!(parts.len() == 2 || parts.len() == 3);

        let always = r.get_domain(10);
        assert_eq!(always.split('.').count(), 3);

        let email = r.get_email();
        let (local, domain) = email.split_once('@').unwrap();
        assert!(local.starts_with("Alice") || local.starts_with("Bob"));
        assert!(domain.contains('.'));
    }

    #[test]
    fn test_phones_are_valid() {
        let r = sample();
        for _ in 0..50 {
            assert!(sanitise_mobile(&r.get_phone(true)).is_some());
            assert!(sanitise_landline(&r.get_phone(false)).is_some());
        }
    }

    #[test]
    fn test_int_phone_length() {
        let r = sample();
        for _ in 0..20 {
            let phone = r.get_int_phone(9, 8);
            assert!(phone.starts_with('+'));
            let len = phone.len() - 3;
            assert!((8..=9).contains(&len), "{}", phone);
        }
        assert_eq!(r.get_int_phone(4, 10).len(), 3 + 4);
    }

    #[test]
    fn test_post_code_range() {
        let r = sample();
        for _ in 0..50 {
            let code = r.get_post_code();
            assert_eq!(code.len(), 4);
            assert!((800..=9999).contains(&code.parse::<u32>().unwrap()));
        }
    }

    #[test]
    fn test_titles_and_words() {
        let r = sample();
        assert!(TITLES[..COMMON_TITLES].contains(&r.get_title(true)));
        assert_eq!(r.get_words(4, None).split(' ').count(), 4);
        let n = r.get_words(2, Some(5)).split(' ').count();
        assert!((2..=5).contains(&n));
        assert_eq!(r.get_words(0, None), "");
    }
}
