use std::fmt;
use std::fs::File;
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ssh2::{OpenFlags, OpenType, Session, Sftp};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_FILE_MODE: i32 = 0o664;
pub const DEFAULT_DIR_MODE: i32 = 0o775;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SftpError {
    #[error("Invalid SFTP configuration: {0}")]
    InvalidConfig(String),
    #[error("Could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("{method} authentication failed ({user}@{host})")]
    AuthFailed {
        method: &'static str,
        user: String,
        host: String,
    },
    #[error("No SFTP connection: it was never made or has been closed")]
    NotConnected,
    #[error("Remote path must be a non-empty string")]
    EmptyRemotePath,
    #[error("Local file {path}: {source}")]
    LocalFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Clone)]
pub enum SftpAuth {
    Password(String),
    /// Both key files must exist. The passphrase unlocks the private key.
    KeyPair {
        public_key: PathBuf,
        private_key: PathBuf,
        passphrase: Option<String>,
    },
}

impl fmt::Debug for SftpAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SftpAuth::Password(_) => f.write_str("Password(***)"),
            SftpAuth::KeyPair {
                public_key,
                private_key,
                ..
            } => f
                .debug_struct("KeyPair")
                .field("public_key", public_key)
                .field("private_key", private_key)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SftpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub auth: SftpAuth,
}

impl SftpConfig {
    pub fn with_password(host: &str, user: &str, password: &str) -> Self {
        Self {
            host: host.to_string(),
            port: DEFAULT_PORT,
            user: user.to_string(),
            auth: SftpAuth::Password(password.to_string()),
        }
    }

    pub fn with_key_pair(
        host: &str,
        user: &str,
        public_key: impl Into<PathBuf>,
        private_key: impl Into<PathBuf>,
        passphrase: Option<&str>,
    ) -> Self {
        Self {
            host: host.to_string(),
            port: DEFAULT_PORT,
            user: user.to_string(),
            auth: SftpAuth::KeyPair {
                public_key: public_key.into(),
                private_key: private_key.into(),
                passphrase: passphrase.map(str::to_string),
            },
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn validate(&self) -> Result<(), SftpError> {
        if self.host.trim().is_empty() {
            return Err(SftpError::InvalidConfig("host must not be empty".into()));
        }
        if self.user.trim().is_empty() {
            return Err(SftpError::InvalidConfig("user must not be empty".into()));
        }
        match &self.auth {
            SftpAuth::Password(password) if password.is_empty() => Err(SftpError::InvalidConfig(
                "password must not be empty when using password authentication".into(),
            )),
            SftpAuth::KeyPair {
                public_key,
                private_key,
                ..
            } if !public_key.is_file() || !private_key.is_file() => {
                Err(SftpError::InvalidConfig(format!(
                    "key files {} and {} must both exist",
                    public_key.display(),
                    private_key.display()
                )))
            }
            _ => Ok(()),
        }
    }
}

struct Connection {
    session: Session,
    sftp: Sftp,
}

pub struct SftpClient {
    conn: Option<Connection>,
    host: String,
    user: String,
}

impl SftpClient {
    /// Open an SSH session, authenticate and start the SFTP subsystem.
    pub fn connect(config: SftpConfig) -> Result<Self, SftpError> {
        config.validate()?;
        let addr = format!("{}:{}", config.host.trim(), config.port);

        let socket = addr
            .to_socket_addrs()
            .and_then(|mut addrs| {
                addrs.next().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, "host did not resolve")
                })
            })
            .and_then(|sa| TcpStream::connect_timeout(&sa, CONNECT_TIMEOUT))
            .map_err(|source| SftpError::Connect {
                addr: addr.clone(),
                source,
            })?;

        let mut session = Session::new()?;
        session.set_tcp_stream(socket);
        session.handshake()?;

        let method = match &config.auth {
            SftpAuth::Password(password) => {
                session.userauth_password(&config.user, password).ok();
                "Username/password"
            }
            SftpAuth::KeyPair {
                public_key,
                private_key,
                passphrase,
            } => {
                session
                    .userauth_pubkey_file(
                        &config.user,
                        Some(public_key.as_path()),
                        private_key,
                        passphrase.as_deref(),
                    )
                    .ok();
                "SSH key"
            }
        };

        if !session.authenticated() {
            warn!(user = %config.user, host = %config.host, method, "SFTP authentication failed");
            return Err(SftpError::AuthFailed {
                method,
                user: config.user,
                host: config.host,
            });
        }

        let sftp = session.sftp()?;
        info!(user = %config.user, addr = %addr, "SFTP connected");

        Ok(Self {
            conn: Some(Connection { session, sftp }),
            host: config.host,
            user: config.user,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn sftp(&self) -> Result<&Sftp, SftpError> {
        self.conn
            .as_ref()
            .map(|c| &c.sftp)
            .ok_or(SftpError::NotConnected)
    }

    /// Copy a local file to `remote`, creating or truncating it with `mode`.
    /// Returns the number of bytes sent.
    pub fn upload(&self, local: &Path, remote: &str, mode: i32) -> Result<u64, SftpError> {
        let sftp = self.sftp()?;
        let remote = remote_path(remote)?;

        let mut source = File::open(local).map_err(|source| SftpError::LocalFile {
            path: local.to_path_buf(),
            source,
        })?;
        if !source.metadata()?.is_file() {
            return Err(SftpError::LocalFile {
                path: local.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }

        let mut target = sftp.open_mode(
            remote,
            OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
            mode,
            OpenType::File,
        )?;
        let bytes = io::copy(&mut source, &mut target)?;
        debug!(local = %local.display(), remote = %remote.display(), bytes, "Uploaded file");
        Ok(bytes)
    }

    /// Copy `remote` to `local`. If `local` is a directory the remote file
    /// name is kept. Returns the path written.
    pub fn download(&self, remote: &str, local: &Path) -> Result<PathBuf, SftpError> {
        let sftp = self.sftp()?;
        let remote = remote_path(remote)?;

        let target_path = match remote.file_name() {
            Some(name) if local.is_dir() => local.join(name),
            _ => local.to_path_buf(),
        };

        let mut source = sftp.open(remote)?;
        let mut target = File::create(&target_path).map_err(|source| SftpError::LocalFile {
            path: target_path.clone(),
            source,
        })?;
        let bytes = io::copy(&mut source, &mut target)?;
        target.sync_all()?;
        debug!(remote = %remote.display(), local = %target_path.display(), bytes, "Downloaded file");
        Ok(target_path)
    }

    pub fn delete(&self, remote: &str) -> Result<(), SftpError> {
        let remote = remote_path(remote)?;
        self.sftp()?.unlink(remote)?;
        debug!(remote = %remote.display(), "Deleted remote file");
        Ok(())
    }

    pub fn mkdir(&self, remote: &str, mode: i32) -> Result<(), SftpError> {
        let remote = remote_path(remote)?;
        self.sftp()?.mkdir(remote, mode)?;
        debug!(remote = %remote.display(), mode = %format!("{:o}", mode), "Created remote directory");
        Ok(())
    }

    /// Close the session. Calling it again is a no-op.
    pub fn disconnect(&mut self) -> Result<(), SftpError> {
        if let Some(conn) = self.conn.take() {
            drop(conn.sftp);
            conn.session.disconnect(None, "Bye", None)?;
            info!(user = %self.user, host = %self.host, "SFTP disconnected");
        }
        Ok(())
    }
}

impl Drop for SftpClient {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            debug!(error = %e, "Ignoring error while closing SFTP session");
        }
    }
}

fn remote_path(remote: &str) -> Result<&Path, SftpError> {
    let trimmed = remote.trim();
    if trimmed.is_empty() {
        return Err(SftpError::EmptyRemotePath);
    }
    Ok(Path::new(trimmed))
}
