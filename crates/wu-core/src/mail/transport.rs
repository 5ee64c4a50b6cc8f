use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use super::MailError;
use crate::config::settings::MailSettings;

/// Something that can deliver a fully rendered message.
pub trait MailTransport {
    fn deliver(&self, message: &str) -> Result<(), MailError>;
}

/// Pipes messages to a `sendmail -t -i` compatible binary. Recipients are
/// read from the message headers.
#[derive(Debug, Clone)]
pub struct Sendmail {
    path: PathBuf,
    from: Option<String>,
}

impl Sendmail {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            from: None,
        }
    }

    pub fn from_settings(settings: &MailSettings) -> Self {
        Self {
            path: settings.sendmail.clone(),
            from: settings.from.clone(),
        }
    }

    /// Envelope sender passed with `-f`.
    pub fn with_from(mut self, from: &str) -> Self {
        self.from = Some(from.to_string());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.arg("-t").arg("-i");
        if let Some(from) = &self.from {
            cmd.arg("-f").arg(from);
        }
        cmd
    }
}

impl MailTransport for Sendmail {
    fn deliver(&self, message: &str) -> Result<(), MailError> {
        debug!(sendmail = %self.path.display(), bytes = message.len(), "Piping mail to sendmail");

        let mut child = self
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MailError::TransportNotFound(self.path.clone())
                } else {
                    MailError::Io(e)
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // An early exit closes the pipe; the exit status below explains why.
            if let Err(e) = stdin.write_all(message.as_bytes()) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(e.into());
                }
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(MailError::SendFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_args() {
        let cmd = Sendmail::new("/usr/sbin/sendmail").with_from("bounce@uni.edu.au").command();
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, vec!["-t", "-i", "-f", "bounce@uni.edu.au"]);
    }

    #[test]
    fn test_from_settings() {
        let settings = MailSettings {
            sendmail: PathBuf::from("/usr/local/bin/msmtp"),
            from: None,
        };
        let transport = Sendmail::from_settings(&settings);
        assert_eq!(transport.path(), Path::new("/usr/local/bin/msmtp"));
    }

    #[test]
    fn test_missing_binary() {
        let err = Sendmail::new("/nonexistent/sendmail").deliver("To: a@b.com\n\nhi").unwrap_err();
        assert!(matches!(err, MailError::TransportNotFound(_)));
    }

    #[test]
    fn test_failing_binary_reports_error() {
        let err = Sendmail::new("false").deliver("To: a@b.com\n\nhi").unwrap_err();
        assert!(matches!(err, MailError::SendFailed(_)));
    }
}
