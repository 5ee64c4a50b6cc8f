//! Process-wide [`Crypto`] instance for code that cannot easily have one
//! passed in.

use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::crypto::{Crypto, EncryptedMessage};
use crate::error::CryptoError;

static INSTANCE: OnceCell<Crypto> = OnceCell::new();

pub struct CryptoNow;

impl CryptoNow {
    /// Install the shared instance. Returns `true` on the first call only;
    /// later calls leave the existing instance in place.
    pub fn init(crypto: Crypto) -> bool {
        let installed = INSTANCE.set(crypto).is_ok();
        if installed {
            info!("CryptoNow initialised");
        } else {
            warn!("CryptoNow already initialised, ignoring");
        }
        installed
    }

    pub fn is_initialised() -> bool {
        INSTANCE.get().is_some()
    }

    pub async fn encrypt(
        msg: &[u8],
        auth: &[u8],
        single_use: bool,
    ) -> Result<EncryptedMessage, CryptoError> {
        Self::instance()?.encrypt(msg, auth, single_use).await
    }

    pub async fn decrypt(
        msg_hex: &str,
        nonce_id: u64,
        auth: &[u8],
    ) -> Result<Option<Vec<u8>>, CryptoError> {
        Self::instance()?.decrypt(msg_hex, nonce_id, auth).await
    }

    fn instance() -> Result<&'static Crypto, CryptoError> {
        INSTANCE.get().ok_or(CryptoError::NotInitialised)
    }
}
