use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use chacha20poly1305::Key as CipherKey;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::CryptoError;
use crate::key::Key;
use crate::store::{NonceStore, NonceTable};

pub const DEFAULT_NONCE_TABLE: &str = "nonce_list";
pub const NONCE_LEN: usize = 24;

/// Output of [`Crypto::encrypt`]: the nonce id and the hex encoded
/// ciphertext (tag included).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptedMessage {
    pub id: u64,
    pub msg: String,
}

/// Authenticated encryption with nonces kept in a [`NonceStore`].
pub struct Crypto<S = NonceTable> {
    key: Key,
    store: S,
}

impl<S: NonceStore> Crypto<S> {
    /// Fails if the nonce store cannot be used.
    pub async fn new(key: Key, store: S) -> Result<Self, CryptoError> {
        store.probe().await?;
        Ok(Self { key, store })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(CipherKey::from_slice(self.key.as_bytes()))
    }

    /// Encrypt `msg` under a fresh nonce. `auth` is authenticated but not
    /// encrypted and must be given again to decrypt.
    pub async fn encrypt(
        &self,
        msg: &[u8],
        auth: &[u8],
        single_use: bool,
    ) -> Result<EncryptedMessage, CryptoError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let id = self.store.insert(&nonce, single_use).await?;

        let sealed = self
            .cipher()
            .encrypt(XNonce::from_slice(&nonce), Payload { msg, aad: auth })
            .map_err(|_| CryptoError::Seal)?;

        debug!(id, single_use, bytes = msg.len(), "Encrypted message");
        Ok(EncryptedMessage {
            id,
            msg: hex::encode(sealed),
        })
    }

    /// Decrypt a message produced by [`Crypto::encrypt`].
    ///
    /// Returns `Ok(None)` if `nonce_id` is unknown, which includes single-use
    /// nonces that have already been spent. A single-use nonce is removed
    /// after the attempt whether or not it succeeds. If both decryption and
    /// removal fail, the decryption error is returned.
    pub async fn decrypt(
        &self,
        msg_hex: &str,
        nonce_id: u64,
        auth: &[u8],
    ) -> Result<Option<Vec<u8>>, CryptoError> {
        let Some(record) = self.store.fetch(nonce_id).await? else {
            debug!(id = nonce_id, "Nonce not found");
            return Ok(None);
        };

        let opened = self.open(msg_hex, nonce_id, &record.nonce, auth);

        if record.single_use {
            match self.store.remove(nonce_id).await {
                Ok(_) => debug!(id = nonce_id, "Removed single use nonce"),
                // Keep the decryption error.
                Err(e) if opened.is_err() => {
                    warn!(id = nonce_id, error = %e, "Failed to remove single use nonce")
                }
                Err(e) => return Err(e.into()),
            }
        }

        if opened.is_err() {
            warn!(id = nonce_id, "Failed to decrypt message");
        }
        opened.map(Some)
    }

    fn open(
        &self,
        msg_hex: &str,
        nonce_id: u64,
        nonce: &[u8],
        auth: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        if nonce.len() != NONCE_LEN {
            return Err(CryptoError::NonceLength {
                id: nonce_id,
                len: nonce.len(),
            });
        }
        let sealed = hex::decode(msg_hex.trim())?;
        self.cipher()
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: &sealed,
                    aad: auth,
                },
            )
            .map_err(|_| CryptoError::Open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use wu_db::{DbError, NonceRecord};

    /// In-memory nonce store.
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<HashMap<u64, NonceRecord>>,
        broken: bool,
        stuck: bool,
        full: bool,
    }

    impl MemoryStore {
        fn broken() -> Self {
            Self {
                broken: true,
                ..Self::default()
            }
        }

        /// Every insert collides with an existing nonce.
        fn full() -> Self {
            Self {
                full: true,
                ..Self::default()
            }
        }

        /// Rows can be read but never removed.
        fn stuck() -> Self {
            Self {
                stuck: true,
                ..Self::default()
            }
        }

        fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NonceStore for MemoryStore {
        async fn probe(&self) -> Result<(), DbError> {
            if self.broken {
                return Err(DbError::Query("Table 'nonce_list' doesn't exist".into()));
            }
            Ok(())
        }

        async fn insert(&self, nonce: &[u8], single_use: bool) -> Result<u64, DbError> {
            let mut rows = self.rows.lock().unwrap();
            if self.full || rows.values().any(|r| r.nonce == nonce) {
                return Err(DbError::Duplicate("nonce".into()));
            }
            let id = rows.len() as u32 + 1;
            rows.insert(
                u64::from(id),
                NonceRecord {
                    id,
                    nonce: nonce.to_vec(),
                    single_use,
                    created: chrono::Utc::now(),
                },
            );
            Ok(u64::from(id))
        }

        async fn fetch(&self, id: u64) -> Result<Option<NonceRecord>, DbError> {
            Ok(self.rows.lock().unwrap().get(&id).cloned())
        }

        async fn remove(&self, id: u64) -> Result<u64, DbError> {
            if self.stuck {
                return Err(DbError::Query("Lock wait timeout exceeded".into()));
            }
            Ok(u64::from(self.rows.lock().unwrap().remove(&id).is_some()))
        }
    }

    async fn crypto() -> Crypto<MemoryStore> {
        Crypto::new(Key::generate(), MemoryStore::default()).await.unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_single_use() {
        let crypto = crypto().await;
        let sealed = crypto
            .encrypt(b"student 4412 result: HD", b"enrolment", true)
            .await
            .unwrap();
        assert_eq!(sealed.id, 1);
        assert_eq!(sealed.msg.len(), (23 + 16) * 2);
        assert!(sealed.msg.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));

        let plain = crypto.decrypt(&sealed.msg, sealed.id, b"enrolment").await.unwrap();
        assert_eq!(plain.as_deref(), Some(&b"student 4412 result: HD"[..]));

        // Spent.
        assert_eq!(crypto.decrypt(&sealed.msg, sealed.id, b"enrolment").await.unwrap(), None);
        assert_eq!(crypto.store().len(), 0);
    }

    #[tokio::test]
    async fn test_reusable_nonce_survives() {
        let crypto = crypto().await;
        let sealed = crypto.encrypt(b"remember me", b"", false).await.unwrap();
        for _ in 0..2 {
            let plain = crypto.decrypt(&sealed.msg, sealed.id, b"").await.unwrap();
            assert_eq!(plain.as_deref(), Some(&b"remember me"[..]));
        }
        assert_eq!(crypto.store().len(), 1);
    }

    #[tokio::test]
    async fn test_wrong_auth_fails_and_spends_nonce() {
        let crypto = crypto().await;
        let sealed = crypto.encrypt(b"secret", b"user=1", true).await.unwrap();
        assert!(matches!(
            crypto.decrypt(&sealed.msg, sealed.id, b"user=2").await,
            Err(CryptoError::Open)
        ));
        assert_eq!(crypto.decrypt(&sealed.msg, sealed.id, b"user=1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_tampered_message_fails() {
        let crypto = crypto().await;
        let sealed = crypto.encrypt(b"secret", b"", false).await.unwrap();
        let mut tampered = sealed.msg.clone();
        let last = if tampered.ends_with('0') { "1" } else { "0" };
        tampered.replace_range(tampered.len() - 1.., last);
        assert!(matches!(
            crypto.decrypt(&tampered, sealed.id, b"").await,
            Err(CryptoError::Open)
        ));
        assert!(matches!(
            crypto.decrypt("not hex", sealed.id, b"").await,
            Err(CryptoError::Hex(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_nonce_id() {
        let crypto = crypto().await;
        assert_eq!(crypto.decrypt("00", 99, b"").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_nonces_are_unique() {
        let crypto = crypto().await;
        let a = crypto.encrypt(b"same", b"", false).await.unwrap();
        let b = crypto.encrypt(b"same", b"", false).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.msg, b.msg);
    }

    #[tokio::test]
    async fn test_unusable_store_rejected() {
        let result = Crypto::new(Key::generate(), MemoryStore::broken()).await;
        assert!(matches!(result, Err(CryptoError::Db(DbError::Query(_)))));
    }

    #[tokio::test]
    async fn test_duplicate_nonce_fails_encrypt() {
        let crypto = crypto().await;
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        crypto.store().insert(&nonce, true).await.unwrap();
        assert!(matches!(
            crypto.store().insert(&nonce, false).await,
            Err(DbError::Duplicate(_))
        ));

        let crypto = Crypto::new(Key::generate(), MemoryStore::full()).await.unwrap();
        assert!(matches!(
            crypto.encrypt(b"secret", b"", true).await,
            Err(CryptoError::Db(DbError::Duplicate(_)))
        ));
    }

    #[tokio::test]
    async fn test_open_error_kept_when_removal_fails() {
        let crypto = Crypto::new(Key::generate(), MemoryStore::stuck()).await.unwrap();
        let sealed = crypto.encrypt(b"secret", b"user=1", true).await.unwrap();
        assert!(matches!(
            crypto.decrypt(&sealed.msg, sealed.id, b"user=2").await,
            Err(CryptoError::Open)
        ));
    }

    #[tokio::test]
    async fn test_removal_failure_reported_after_success() {
        let crypto = Crypto::new(Key::generate(), MemoryStore::stuck()).await.unwrap();
        let sealed = crypto.encrypt(b"secret", b"", true).await.unwrap();
        assert!(matches!(
            crypto.decrypt(&sealed.msg, sealed.id, b"").await,
            Err(CryptoError::Db(DbError::Query(_)))
        ));
    }
}
