//! MySQL access helpers: a pool wrapper with named-parameter statements and
//! the queries behind the nonce table.

pub mod models;
pub mod pool;
pub mod queries;
pub mod statement;

pub use models::{ExecOutcome, NonceRecord};
pub use pool::{DataSource, DbError, EnhancedDb, DEFAULT_INT_PARAM, DEFAULT_STR_PARAM};
pub use statement::{ParamDebug, SqlValue, Statement, StatementDebug};
