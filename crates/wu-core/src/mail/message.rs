use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, info};
use uuid::Uuid;

use super::transport::MailTransport;
use super::MailError;

/// Line length for base64 bodies (RFC 2045).
const BASE64_LINE: usize = 76;

#[derive(Debug, Clone)]
struct Attachment {
    content_type: String,
    name: String,
    data: Vec<u8>,
}

/// A `multipart/mixed` message with an HTML body and optional attachments.
#[derive(Debug, Clone)]
pub struct SimpleMail {
    to: String,
    subject: String,
    headers: Vec<String>,
    boundary: String,
    html: String,
    attachments: Vec<Attachment>,
}

impl SimpleMail {
    /// `headers` holds extra header lines (`From: …`, `Reply-To: …`), one
    /// per line.
    pub fn new(to: &str, subject: &str, html: &str, headers: &str) -> Result<Self, MailError> {
        check_header_value("to", to)?;
        check_header_value("subject", subject)?;

        let mut extra = Vec::new();
        for line in headers.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match line.split_once(':') {
                Some((name, _))
                    if !name.is_empty()
                        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') =>
                {
                    extra.push(line.to_string());
                }
                _ => return Err(MailError::InvalidHeader(line.to_string())),
            }
        }

        Ok(Self {
            to: to.to_string(),
            subject: subject.to_string(),
            headers: extra,
            boundary: format!("==Multipart_Boundary_x{}x", Uuid::new_v4().simple()),
            html: html.to_string(),
            attachments: Vec::new(),
        })
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Attach `data` as `name`, base64 encoded.
    pub fn attach(&mut self, content_type: &str, name: &str, data: &[u8]) -> Result<(), MailError> {
        check_header_value("content type", content_type)?;
        check_header_value("attachment name", name)?;
        debug!(name = %name, bytes = data.len(), "Attaching to mail");
        self.attachments.push(Attachment {
            content_type: content_type.to_string(),
            name: name.replace('"', ""),
            data: data.to_vec(),
        });
        Ok(())
    }

    /// Attach a file as `application/octet-stream`, named after the file
    /// unless `name` is given.
    pub fn attach_file(&mut self, path: &Path, name: Option<&str>) -> Result<(), MailError> {
        let data = fs::read(path).map_err(|source| MailError::Attachment {
            path: path.to_path_buf(),
            source,
        })?;
        let name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string()),
        };
        self.attach("application/octet-stream", &name, &data)
    }

    /// The complete message, headers included, ready for `sendmail -t`.
    pub fn render(&self) -> String {
        let b = &self.boundary;
        let mut out = String::new();

        out.push_str(&format!("To: {}\n", self.to));
        out.push_str(&format!("Subject: {}\n", encode_header(&self.subject)));
        for header in &self.headers {
            out.push_str(header);
            out.push('\n');
        }
        out.push_str("MIME-Version: 1.0\n");
        out.push_str(&format!("Content-Type: multipart/mixed;\n boundary=\"{}\"\n\n", b));

        out.push_str("This is a multi-part message in MIME format.\n\n");
        out.push_str(&format!("--{}\n", b));
        out.push_str("Content-Type: text/html; charset=\"utf-8\"\n");
        out.push_str("Content-Transfer-Encoding: 8bit\n\n");
        out.push_str(&self.html);
        out.push_str("\n\n");

        for attachment in &self.attachments {
            out.push_str(&format!("--{}\n", b));
            out.push_str(&format!(
                "Content-Type: {};\n name=\"{}\"\n",
                attachment.content_type, attachment.name
            ));
            out.push_str(&format!(
                "Content-Disposition: attachment;\n filename=\"{}\"\n",
                attachment.name
            ));
            out.push_str("Content-Transfer-Encoding: base64\n\n");
            out.push_str(&wrap_base64(&attachment.data));
            out.push('\n');
        }

        out.push_str(&format!("--{}--\n", b));
        out
    }

    pub fn send<T: MailTransport + ?Sized>(&self, transport: &T) -> Result<(), MailError> {
        transport.deliver(&self.render())?;
        info!(
            to = %self.to,
            attachments = self.attachments.len(),
            "Mail handed to transport"
        );
        Ok(())
    }
}

fn check_header_value(field: &'static str, value: &str) -> Result<(), MailError> {
    if value.contains(['\r', '\n']) {
        return Err(MailError::HeaderInjection { field });
    }
    Ok(())
}

/// RFC 2047 encoded-word for non-ASCII header values.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", BASE64.encode(value.as_bytes()))
    }
}

fn wrap_base64(data: &[u8]) -> String {
    let encoded = BASE64.encode(data);
    encoded
        .as_bytes()
        .chunks(BASE64_LINE)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}
