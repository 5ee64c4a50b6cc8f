use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::info;
use wu_core::fs::atomic_write_secret;
use zeroize::{Zeroize, Zeroizing};

use crate::error::CryptoError;

pub const KEY_LEN: usize = 32;

/// XChaCha20-Poly1305 key. Wiped from memory on drop.
pub struct Key([u8; KEY_LEN]);

impl Key {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let raw: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength(bytes.len()))?;
        Ok(Self(raw))
    }

    pub fn generate() -> Self {
        let mut raw = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut raw);
        Self(raw)
    }

    /// Load a key file holding either the 32 raw bytes or 64 hex characters.
    pub fn load(path: &Path) -> Result<Self, CryptoError> {
        let content = Zeroizing::new(fs::read(path).map_err(|source| CryptoError::KeyFile {
            path: path.to_path_buf(),
            source,
        })?);

        if content.len() == KEY_LEN {
            return Self::from_bytes(&content);
        }

        let text = content.trim_ascii();
        if text.len() == KEY_LEN * 2 {
            let decoded = Zeroizing::new(hex::decode(text)?);
            return Self::from_bytes(&decoded);
        }

        Err(CryptoError::InvalidKeyLength(content.len()))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key(***)")
    }
}

/// Write a fresh random key to `dir/file_name` with mode 0600.
///
/// `dir` must be an existing, writable directory. An existing key file is
/// replaced only if it is writable.
pub fn generate_key(dir: &Path, file_name: &str) -> Result<PathBuf, CryptoError> {
    let writable_dir = fs::metadata(dir)
        .map(|m| m.is_dir() && !m.permissions().readonly())
        .unwrap_or(false);
    if !writable_dir {
        return Err(CryptoError::KeyDir(dir.to_path_buf()));
    }

    if file_name.is_empty() || Path::new(file_name).file_name() != Some(OsStr::new(file_name)) {
        return Err(CryptoError::KeyFileName(file_name.to_string()));
    }

    let path = dir.join(file_name);
    if let Ok(meta) = fs::metadata(&path) {
        if !meta.is_file() || meta.permissions().readonly() {
            return Err(CryptoError::KeyNotWritable(path));
        }
    }

    let key = Key::generate();
    atomic_write_secret(&path, key.as_bytes())?;
    info!(path = %path.display(), "Generated encryption key");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn test_generate_key_writes_secret_file() {
        let dir = TempDir::new().unwrap();
        let path = generate_key(dir.path(), "crypto.key").unwrap();
        let meta = fs::metadata(&path).unwrap();
        assert_eq!(meta.len(), KEY_LEN as u64);
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
        assert!(Key::load(&path).is_ok());
    }

    #[test]
    fn test_generate_key_twice_gives_new_key() {
        let dir = TempDir::new().unwrap();
        let path = generate_key(dir.path(), "crypto.key").unwrap();
        let first = fs::read(&path).unwrap();
        generate_key(dir.path(), "crypto.key").unwrap();
        assert_ne!(first, fs::read(&path).unwrap());
    }

    #[test]
    fn test_generate_key_rejects_bad_targets() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            generate_key(&dir.path().join("missing"), "k"),
            Err(CryptoError::KeyDir(_))
        ));
        assert!(matches!(
            generate_key(dir.path(), "../k"),
            Err(CryptoError::KeyFileName(_))
        ));

        let locked = dir.path().join("locked.key");
        fs::write(&locked, b"old").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o444)).unwrap();
        assert!(matches!(
            generate_key(dir.path(), "locked.key"),
            Err(CryptoError::KeyNotWritable(_))
        ));
        assert_eq!(fs::read(&locked).unwrap(), b"old");
    }

    #[test]
    fn test_load_hex_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hex.key");
        fs::write(&path, format!("{}\n", "ab".repeat(KEY_LEN))).unwrap();
        let key = Key::load(&path).unwrap();
        assert_eq!(key.as_bytes(), &[0xab; KEY_LEN]);
    }

    #[test]
    fn test_load_rejects_wrong_length() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.key");
        fs::write(&path, b"too short").unwrap();
        assert!(matches!(Key::load(&path), Err(CryptoError::InvalidKeyLength(9))));
        assert!(matches!(
            Key::load(&dir.path().join("absent")),
            Err(CryptoError::KeyFile { .. })
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        assert_eq!(format!("{:?}", Key::generate()), "Key(***)");
    }
}
