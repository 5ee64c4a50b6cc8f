//! Web application helpers: settings, form input sanitisation and
//! validation, text conversion, templates, random test data and mail.

pub mod config;
pub mod fs;
pub mod input;
pub mod mail;
pub mod random;
pub mod template;
pub mod text;

pub use config::{ConfigError, Settings};
pub use template::{TemplateEngine, TemplateError};
