use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::parser::{parse_settings, SettingsFile};

/// Default location of the settings file.
pub const SETTINGS_PATH: &str = "/etc/web-utils/wu.conf";

/// Prefix for environment variables overriding file values.
/// `WU_DATABASE_DSN` overrides `database.dsn`.
pub const ENV_PREFIX: &str = "WU_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse settings: {0}")]
    Parse(String),
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseSettings {
    pub dsn: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CryptoSettings {
    pub key_file: PathBuf,
    pub nonce_table: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSettings {
    pub dir: Option<PathBuf>,
    pub open: String,
    pub close: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MailSettings {
    pub sendmail: PathBuf,
    pub from: Option<String>,
}

/// Typed view over the settings file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub crypto: CryptoSettings,
    pub template: TemplateSettings,
    pub words_file: Option<PathBuf>,
    pub mail: MailSettings,
    /// GST charged on displayed prices, as a percentage.
    pub gst_percent: f64,
    /// Whether `text::html_comment` emits anything.
    pub show_comments: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseSettings {
                dsn: "mysql:host=localhost;dbname=web".to_string(),
                user: None,
                password: None,
            },
            crypto: CryptoSettings {
                key_file: PathBuf::from("/etc/web-utils/crypto.key"),
                nonce_table: "nonce_list".to_string(),
            },
            template: TemplateSettings {
                dir: None,
                open: "{{".to_string(),
                close: "}}".to_string(),
            },
            words_file: None,
            mail: MailSettings {
                sendmail: PathBuf::from("/usr/sbin/sendmail"),
                from: None,
            },
            gst_percent: 10.0,
            show_comments: false,
        }
    }
}

impl Settings {
    /// Load settings from `path`, then apply `WU_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file = parse_settings(&raw).map_err(ConfigError::Parse)?;

        let mut settings = Self::from_file(&file)?;
        settings.apply_env(std::env::vars())?;

        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Defaults plus environment overrides, for when no settings file exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        settings.apply_env(std::env::vars())?;
        Ok(settings)
    }

    pub fn from_file(file: &SettingsFile) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        for (key, value) in file.pairs() {
            settings.set(&key, value)?;
        }
        Ok(settings)
    }

    /// Apply `WU_SECTION_KEY=value` overrides. Unknown keys are ignored.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(rest) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let rest = rest.to_ascii_lowercase();
            let key = match rest.split_once('_') {
                Some((section, key)) if is_section(section) => format!("{}.{}", section, key),
                _ => rest,
            };
            debug!(key = %key, "Settings override from environment");
            self.set(&key, &value)?;
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "database.dsn" => self.database.dsn = value.to_string(),
            "database.user" => self.database.user = non_empty(value),
            "database.password" => self.database.password = non_empty(value),
            "crypto.key_file" => self.crypto.key_file = PathBuf::from(value),
            "crypto.nonce_table" => self.crypto.nonce_table = value.to_string(),
            "template.dir" => self.template.dir = non_empty(value).map(PathBuf::from),
            "template.open" => self.template.open = value.to_string(),
            "template.close" => self.template.close = value.to_string(),
            "random.words_file" => self.words_file = non_empty(value).map(PathBuf::from),
            "mail.sendmail" => self.mail.sendmail = PathBuf::from(value),
            "mail.from" => self.mail.from = non_empty(value),
            "money.gst_percent" | "gst_percent" => {
                self.gst_percent = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "expected a number",
                })?;
            }
            "debug.show_comments" | "show_comments" => {
                self.show_comments = parse_bool(value).ok_or_else(|| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "expected true/false",
                })?;
            }
            _ => debug!(key = %key, "Ignoring unknown setting"),
        }
        Ok(())
    }
}

fn is_section(name: &str) -> bool {
    matches!(
        name,
        "database" | "crypto" | "template" | "random" | "mail" | "money" | "debug"
    )
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.crypto.nonce_table, "nonce_list");
        assert_eq!(settings.template.open, "{{");
        assert_eq!(settings.gst_percent, 10.0);
        assert!(!settings.show_comments);
    }

    #[test]
    fn test_from_file() {
        let file = parse_settings(
            "[database]\ndsn = mysql:host=db;dbname=shop\nuser = shop\n\n[crypto]\nnonce_table = nonces\n\n[money]\ngst_percent = 15\n",
        )
        .unwrap();
        let settings = Settings::from_file(&file).unwrap();
        assert_eq!(settings.database.dsn, "mysql:host=db;dbname=shop");
        assert_eq!(settings.database.user.as_deref(), Some("shop"));
        assert_eq!(settings.crypto.nonce_table, "nonces");
        assert_eq!(settings.gst_percent, 15.0);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = parse_settings("[mail]\nsendmail = /usr/sbin/sendmail\n").unwrap();
        let mut settings = Settings::from_file(&file).unwrap();
        settings
            .apply_env(vec![
                ("WU_MAIL_SENDMAIL".to_string(), "/usr/local/bin/msmtp".to_string()),
                ("WU_DEBUG_SHOW_COMMENTS".to_string(), "yes".to_string()),
                ("PATH".to_string(), "/bin".to_string()),
            ])
            .unwrap();
        assert_eq!(settings.mail.sendmail, PathBuf::from("/usr/local/bin/msmtp"));
        assert!(settings.show_comments);
    }

    #[test]
    fn test_env_key_with_underscores() {
        let mut settings = Settings::default();
        settings
            .apply_env(vec![("WU_CRYPTO_NONCE_TABLE".to_string(), "nonce_v2".to_string())])
            .unwrap();
        assert_eq!(settings.crypto.nonce_table, "nonce_v2");
    }

    #[test]
    fn test_invalid_number_rejected() {
        let file = parse_settings("[money]\ngst_percent = ten\n").unwrap();
        let err = Settings::from_file(&file).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load(Path::new("/nonexistent/wu.conf")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
