//! Thin SFTP client for pushing files to, and pulling them from, a remote host.

pub mod client;

pub use client::{SftpAuth, SftpClient, SftpConfig, SftpError, DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};
