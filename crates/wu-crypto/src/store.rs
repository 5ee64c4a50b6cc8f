use std::sync::Arc;

use async_trait::async_trait;
use wu_db::queries::{
    check_table_name, delete_nonce, get_nonce, insert_nonce, probe_nonce_table,
};
use wu_db::{DbError, EnhancedDb, NonceRecord};

/// Where nonces are kept between encryption and decryption.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Check the store is reachable and laid out as expected.
    async fn probe(&self) -> Result<(), DbError>;

    /// Persist a nonce, returning the id it can be fetched by.
    async fn insert(&self, nonce: &[u8], single_use: bool) -> Result<u64, DbError>;

    async fn fetch(&self, id: u64) -> Result<Option<NonceRecord>, DbError>;

    /// Returns the number of entries removed.
    async fn remove(&self, id: u64) -> Result<u64, DbError>;
}

/// Nonces held in a MySQL table (see [`wu_db::queries::create_nonce_table`]).
#[derive(Clone)]
pub struct NonceTable {
    db: Arc<EnhancedDb>,
    table: String,
}

impl NonceTable {
    pub fn new(db: Arc<EnhancedDb>, table: &str) -> Result<Self, DbError> {
        let table = check_table_name(table)?.to_string();
        Ok(Self { db, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn db(&self) -> &EnhancedDb {
        &self.db
    }
}

#[async_trait]
impl NonceStore for NonceTable {
    async fn probe(&self) -> Result<(), DbError> {
        probe_nonce_table(&self.db, &self.table).await
    }

    async fn insert(&self, nonce: &[u8], single_use: bool) -> Result<u64, DbError> {
        insert_nonce(&self.db, &self.table, nonce, single_use).await
    }

    async fn fetch(&self, id: u64) -> Result<Option<NonceRecord>, DbError> {
        get_nonce(&self.db, &self.table, id).await
    }

    async fn remove(&self, id: u64) -> Result<u64, DbError> {
        delete_nonce(&self.db, &self.table, id).await
    }
}
