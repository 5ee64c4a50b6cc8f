//! Settings for the helpers: a `key = value` file with `[section]` headers,
//! overridable through `WU_*` environment variables.

pub mod parser;
pub mod settings;

pub use settings::{ConfigError, Settings};
