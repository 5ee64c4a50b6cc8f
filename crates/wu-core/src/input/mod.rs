//! Sanitisation and validation of user supplied form values.
//!
//! Functions here never fail because a *user* typed something odd: a value
//! that cannot be cleaned up comes back as `None` and the caller decides on
//! the fallback. `Err(InputError)` is reserved for mistakes made by the
//! calling code, such as an unparsable limit or a broken custom pattern.

pub mod form;
pub mod limits;
pub mod sanitise;
pub mod validate;

use thiserror::Error;

pub use form::{get_valid_from_array, FormValue, Mode};
pub use limits::{CharSet, DateRules, NumericRules, TextRules, TimeRules, YearRules};
pub use sanitise::PhoneKind;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Invalid {name} limit {value:?}: {reason}")]
    InvalidLimit {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("Invalid character pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("Phone kinds must include at least one of `mobile`, `fixed`, `os`; got {0:?}")]
    NoPhoneKinds(Vec<String>),
}
