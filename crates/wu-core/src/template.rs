//! Minimal `{{key}}` template renderer with a per-engine template cache.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::settings::TemplateSettings;
use crate::text::camel_to_snake;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template directory does not exist: {0}")]
    DirNotFound(PathBuf),
    #[error("Template wrapper must be 1-4 characters on each side, got {open:?} / {close:?}")]
    InvalidWrapper { open: String, close: String },
    #[error("Invalid template name: {0}")]
    InvalidName(String),
    #[error("Could not find template file \"{name}\" ({path})")]
    NotFound { name: String, path: PathBuf },
    #[error("Failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Template data must be a map or a struct with named fields")]
    NotAnObject,
    #[error("Failed to serialize template data: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug)]
struct CompiledTemplate {
    source: String,
}

#[derive(Debug)]
pub struct TemplateEngine {
    dir: PathBuf,
    token_re: Regex,
    cache: Mutex<HashMap<String, Arc<CompiledTemplate>>>,
}

impl TemplateEngine {
    /// Create an engine reading templates from `dir`, which must exist.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(TemplateError::DirNotFound(dir.to_path_buf()));
        }
        let dir = dir.canonicalize().map_err(|source| TemplateError::Read {
            path: dir.to_path_buf(),
            source,
        })?;

        Ok(Self {
            dir,
            token_re: wrapper_regex("{{", "}}")?,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Engine configured from the `[template]` settings section.
    pub fn from_settings(settings: &TemplateSettings) -> Result<Self, TemplateError> {
        let dir = settings
            .dir
            .clone()
            .ok_or_else(|| TemplateError::DirNotFound(PathBuf::new()))?;
        let mut engine = Self::new(dir)?;
        if settings.open != "{{" || settings.close != "}}" {
            engine.set_wrapper(&settings.open, &settings.close)?;
        }
        Ok(engine)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Change the token delimiters. Cached templates are dropped.
    pub fn set_wrapper(&mut self, open: &str, close: &str) -> Result<(), TemplateError> {
        self.token_re = wrapper_regex(open, close)?;
        self.cache_mut().clear();
        debug!(open = %open, close = %close, "Template wrapper changed");
        Ok(())
    }

    /// Render template `name` with values from `data`.
    ///
    /// `data` must serialize to a JSON object. Tokens with no matching key,
    /// or whose value is an array, object or null, become empty strings.
    /// With `camel_to_snake` a `{{userName}}` token falls back to the
    /// `user_name` key.
    pub fn render<T: Serialize + ?Sized>(
        &self,
        name: &str,
        data: &T,
        camel_to_snake: bool,
    ) -> Result<String, TemplateError> {
        let Value::Object(map) = serde_json::to_value(data)? else {
            return Err(TemplateError::NotAnObject);
        };
        let template = self.load(name)?;

        // Single pass: substituted values are never scanned for tokens.
        let output = self
            .token_re
            .replace_all(&template.source, |caps: &Captures<'_>| {
                lookup(&map, caps[1].trim(), camel_to_snake)
            });
        Ok(output.into_owned())
    }

    fn load(&self, name: &str) -> Result<Arc<CompiledTemplate>, TemplateError> {
        if let Some(found) = self.cache_mut().get(name) {
            return Ok(Arc::clone(found));
        }

        let path = self.resolve(name)?;
        let source = fs::read_to_string(&path).map_err(|source| TemplateError::Read {
            path: path.clone(),
            source,
        })?;

        let tokens = self.token_re.find_iter(&source).count();
        info!(template = %name, tokens, "Loaded template");

        let compiled = Arc::new(CompiledTemplate { source });
        self.cache_mut()
            .insert(name.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, TemplateError> {
        let relative = Path::new(name);
        let safe = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(TemplateError::InvalidName(name.to_string()));
        }

        let path = self.dir.join(relative);
        if !path.is_file() {
            return Err(TemplateError::NotFound {
                name: name.to_string(),
                path,
            });
        }
        Ok(path)
    }

    fn cache_mut(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<CompiledTemplate>>> {
        // A poisoned cache only ever holds fully built entries.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn wrapper_regex(open: &str, close: &str) -> Result<Regex, TemplateError> {
    let ok = |s: &str| (1..=4).contains(&s.chars().count());
    if !ok(open) || !ok(close) {
        return Err(TemplateError::InvalidWrapper {
            open: open.to_string(),
            close: close.to_string(),
        });
    }
    let pattern = format!("{}(.*?){}", regex::escape(open), regex::escape(close));
    Regex::new(&pattern).map_err(|_| TemplateError::InvalidWrapper {
        open: open.to_string(),
        close: close.to_string(),
    })
}

fn lookup(map: &serde_json::Map<String, Value>, key: &str, camel_to_snake_keys: bool) -> String {
    let value = map.get(key).or_else(|| {
        if camel_to_snake_keys {
            map.get(&camel_to_snake(key, false))
        } else {
            None
        }
    });

    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(true)) => "1".to_string(),
        _ => String::new(),
    }
}
