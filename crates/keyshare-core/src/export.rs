// ABOUTME: Export negotiation: picks armored or SSH encoding and shapes it for a destination.
// ABOUTME: Returns ready-to-transmit payloads and suggested filenames; performs no I/O.

use crate::armor;
use crate::error::{ExportError, Result};
use crate::fingerprint;
use crate::key::KeyMaterial;
use crate::ssh;
use crate::store::KeyStore;

/// MIME type for OpenPGP key files.
pub const MIME_TYPE_KEYS: &str = "application/pgp-keys";
/// MIME type for fingerprints and OpenSSH public key lines.
pub const MIME_TYPE_TEXT: &str = "text/plain";

/// Target representation of the exported key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Armored,
    Ssh,
}

impl ExportFormat {
    /// Canonical filename extension, including the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Armored => ".asc",
            ExportFormat::Ssh => ".pub",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Armored => MIME_TYPE_KEYS,
            ExportFormat::Ssh => MIME_TYPE_TEXT,
        }
    }
}

/// Where the caller intends to put the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    Clipboard,
    ShareFile,
}

/// A single export request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub destination: Destination,
}

impl ExportRequest {
    pub fn new(format: ExportFormat, destination: Destination) -> Self {
        Self {
            format,
            destination,
        }
    }
}

/// Encoded key, before destination shaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportPayload {
    /// Armored certified key block.
    Armored(String),
    /// SSH wire-format public key bytes.
    Ssh(Vec<u8>),
}

impl ExportPayload {
    pub fn format(&self) -> ExportFormat {
        match self {
            ExportPayload::Armored(_) => ExportFormat::Armored,
            ExportPayload::Ssh(_) => ExportFormat::Ssh,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ExportPayload::Armored(text) => text.as_bytes(),
            ExportPayload::Ssh(wire) => wire,
        }
    }

    /// Text rendering for clipboard placement. SSH payloads become an
    /// OpenSSH public key line with the optional comment.
    ///
    /// # Errors
    /// Returns `EncodingFailure` if the SSH wire bytes are unreadable.
    pub fn to_text(&self, comment: Option<&str>) -> Result<String> {
        match self {
            ExportPayload::Armored(text) => Ok(text.clone()),
            ExportPayload::Ssh(wire) => ssh::to_openssh_line(wire, comment),
        }
    }
}

/// Payload ready to be written to a file and handed to another process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedFile {
    pub filename: String,
    pub contents: Vec<u8>,
    pub mime_type: &'static str,
}

/// Outcome of an export, owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportResult {
    Clipboard(ExportPayload),
    File(NamedFile),
}

/// Knobs that do not change which formats are valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// `Comment:` header for armored output.
    pub armor_comment: Option<String>,
    /// Use the display name as the comment of OpenSSH `.pub` files.
    pub ssh_comment_from_name: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            armor_comment: None,
            ssh_comment_from_name: true,
        }
    }
}

/// Replace path separators and control characters so a display name can be
/// used as a filename. Returns `None` when nothing usable remains.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        None
    } else {
        Some(cleaned)
    }
}

/// Filename for a share-file export: the display name when present and
/// non-empty, otherwise the hex fingerprint, plus the format's extension.
pub fn suggested_filename(key: &KeyMaterial, format: ExportFormat) -> String {
    let stem = key
        .display_name()
        .and_then(sanitize_filename)
        .unwrap_or_else(|| key.fingerprint_hex());
    format!("{stem}{}", format.extension())
}

/// Selects the export format, validates it against the key's capabilities and
/// shapes the result for its destination.
///
/// Stateless apart from the borrowed store; safe to share across threads when
/// the store is.
pub struct ExportNegotiator<'a, S: KeyStore + ?Sized> {
    store: &'a S,
    options: ExportOptions,
}

impl<'a, S: KeyStore + ?Sized> ExportNegotiator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            options: ExportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve the key by master key ID and export it.
    ///
    /// # Errors
    /// Returns `KeyNotFound` if the store has no such key, plus every error
    /// of [`ExportNegotiator::export_key`].
    pub fn export(&self, master_key_id: i64, request: &ExportRequest) -> Result<ExportResult> {
        let key = self.store.resolve_by_master_key_id(master_key_id)?;
        self.export_key(&key, request)
    }

    /// Export already-resolved key material.
    ///
    /// # Errors
    /// Returns `CapabilityUnavailable` for SSH requests on keys without an
    /// SSH-convertible authentication subkey (no encoding is attempted),
    /// `KeyNotFound` when the store lacks a required structure, and encoding
    /// errors from the SSH encoder or armored exporter.
    pub fn export_key(&self, key: &KeyMaterial, request: &ExportRequest) -> Result<ExportResult> {
        let payload = match request.format {
            ExportFormat::Armored => ExportPayload::Armored(armor::export(
                key,
                self.store,
                self.options.armor_comment.as_deref(),
            )?),
            ExportFormat::Ssh => ExportPayload::Ssh(self.ssh_wire(key)?),
        };

        tracing::debug!(
            master_key_id = key.master_key_id(),
            format = ?request.format,
            destination = ?request.destination,
            bytes = payload.as_bytes().len(),
            "key export ready"
        );

        match request.destination {
            Destination::Clipboard => Ok(ExportResult::Clipboard(payload)),
            Destination::ShareFile => {
                let mut contents = match &payload {
                    ExportPayload::Armored(text) => text.clone().into_bytes(),
                    ExportPayload::Ssh(wire) => {
                        let comment = if self.options.ssh_comment_from_name {
                            key.display_name()
                        } else {
                            None
                        };
                        ssh::to_openssh_line(wire, comment)?.into_bytes()
                    }
                };
                contents.push(b'\n');
                Ok(ExportResult::File(NamedFile {
                    filename: suggested_filename(key, request.format),
                    contents,
                    mime_type: request.format.mime_type(),
                }))
            }
        }
    }

    fn ssh_wire(&self, key: &KeyMaterial) -> Result<Vec<u8>> {
        if !key.has_auth_capability() {
            tracing::warn!(
                master_key_id = key.master_key_id(),
                "ssh export requested for key without authentication subkey"
            );
            return Err(ExportError::CapabilityUnavailable(
                "key has no authentication subkey".to_string(),
            ));
        }

        let subkey = self.store.resolve_authentication_subkey(key.master_key_id())?;
        if !ssh::is_supported(&subkey) {
            tracing::warn!(
                master_key_id = key.master_key_id(),
                algorithm = subkey.algorithm_name(),
                "authentication subkey has no ssh mapping"
            );
            return Err(ExportError::CapabilityUnavailable(format!(
                "{} authentication subkey cannot be converted to ssh",
                subkey.algorithm_name()
            )));
        }

        ssh::encode(&subkey)
    }
}

/// Fingerprint text ready for a sharing collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintShare {
    pub text: String,
    pub mime_type: &'static str,
}

/// Shape a key's fingerprint for a destination: the bare hex fingerprint for
/// the clipboard, a `scheme:hex` URI when sharing.
///
/// # Errors
/// Returns `InvalidLength` or `InvalidScheme` from the fingerprint codec.
pub fn share_fingerprint(
    key: &KeyMaterial,
    destination: Destination,
    scheme: &str,
) -> Result<FingerprintShare> {
    let hex = fingerprint::to_hex(key.fingerprint())?;
    let text = match destination {
        Destination::Clipboard => hex,
        Destination::ShareFile => fingerprint::to_uri(&hex, scheme)?.to_string(),
    };
    Ok(FingerprintShare {
        text,
        mime_type: MIME_TYPE_TEXT,
    })
}
