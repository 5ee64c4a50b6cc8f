//! XChaCha20-Poly1305 encryption with nonces tracked in a database table.

pub mod crypto;
pub mod error;
pub mod global;
pub mod key;
pub mod store;

pub use crypto::{Crypto, EncryptedMessage, DEFAULT_NONCE_TABLE, NONCE_LEN};
pub use error::CryptoError;
pub use global::CryptoNow;
pub use key::{generate_key, Key, KEY_LEN};
pub use store::{NonceStore, NonceTable};
