use std::path::PathBuf;

use thiserror::Error;
use wu_core::fs::AtomicWriteError;
use wu_db::DbError;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Nonce table error: {0}")]
    Db(#[from] DbError),
    #[error("Invalid key length: expected 32 bytes (or 64 hex characters), got {0}")]
    InvalidKeyLength(usize),
    #[error("Failed to read key file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("Stored nonce {id} is {len} bytes, expected 24")]
    NonceLength { id: u64, len: usize },
    #[error("Encryption failed")]
    Seal,
    #[error("Decryption failed: message or auth data does not match")]
    Open,
    #[error("Key directory {0} does not exist or is not writable")]
    KeyDir(PathBuf),
    #[error("Invalid key file name: {0:?}")]
    KeyFileName(String),
    #[error("Key file {0} exists and is not writable")]
    KeyNotWritable(PathBuf),
    #[error("Failed to write key: {0}")]
    Write(#[from] AtomicWriteError),
    #[error("CryptoNow has not been initialised yet")]
    NotInitialised,
}
