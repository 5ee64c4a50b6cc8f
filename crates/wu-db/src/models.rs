use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// What an executed statement changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// Id generated by an insert into an `AUTO_INCREMENT` table, else 0.
    pub last_insert_id: u64,
}

/// One row of the nonce table.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct NonceRecord {
    pub id: u32,
    pub nonce: Vec<u8>,
    pub single_use: bool,
    pub created: DateTime<Utc>,
}
