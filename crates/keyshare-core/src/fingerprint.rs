// ABOUTME: Fingerprint formatting: binary to hex, display grouping, scheme URIs.
// ABOUTME: Also formats and parses 64-bit key IDs.

use crate::error::{ExportError, Result};
use url::Url;

/// URI scheme used for optical (QR) transfer of a fingerprint.
pub const FINGERPRINT_SCHEME: &str = "openpgp4fpr";

/// Fingerprint sizes in bytes: v4 (SHA-1) and v6 (SHA-256).
pub const SUPPORTED_LENGTHS: [usize; 2] = [20, 32];

/// Separator inserted between display groups.
pub const DISPLAY_SEPARATOR: char = ' ';

const GROUP_WIDTH: usize = 4;

/// Encode a fingerprint as lowercase hex without separators.
///
/// # Errors
/// Returns `InvalidLength` if the fingerprint is not 20 or 32 bytes.
pub fn to_hex(fingerprint: &[u8]) -> Result<String> {
    if !SUPPORTED_LENGTHS.contains(&fingerprint.len()) {
        return Err(ExportError::InvalidLength(fingerprint.len()));
    }
    Ok(hex::encode(fingerprint))
}

/// Parse a hex fingerprint back into bytes. Case-insensitive.
///
/// # Errors
/// Returns `InvalidHex` for non-hex input and `InvalidLength` when the decoded
/// size is not supported.
pub fn from_hex(hex_fingerprint: &str) -> Result<Vec<u8>> {
    let bytes = hex::decode(hex_fingerprint)
        .map_err(|e| ExportError::InvalidHex(format!("{hex_fingerprint:?}: {e}")))?;
    if !SUPPORTED_LENGTHS.contains(&bytes.len()) {
        return Err(ExportError::InvalidLength(bytes.len()));
    }
    Ok(bytes)
}

/// Insert a separator every four characters for human reading.
pub fn to_display_groups(hex_fingerprint: &str) -> String {
    let mut out = String::with_capacity(hex_fingerprint.len() + hex_fingerprint.len() / GROUP_WIDTH);
    for (i, c) in hex_fingerprint.chars().enumerate() {
        if i > 0 && i % GROUP_WIDTH == 0 {
            out.push(DISPLAY_SEPARATOR);
        }
        out.push(c);
    }
    out
}

/// Build an opaque `scheme:hex` URI for QR encoding.
///
/// The opaque part is always lowercase with no separators.
///
/// # Errors
/// Returns `InvalidScheme` if the scheme is empty, malformed, or a special
/// scheme (such as `http`) that cannot carry an opaque part, and `InvalidHex`
/// if the fingerprint is not hex.
pub fn to_uri(hex_fingerprint: &str, scheme: &str) -> Result<Url> {
    if scheme.is_empty() {
        return Err(ExportError::InvalidScheme(scheme.to_string()));
    }
    if hex_fingerprint.is_empty() || !hex_fingerprint.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ExportError::InvalidHex(hex_fingerprint.to_string()));
    }

    let uri = Url::parse(&format!("{scheme}:{}", hex_fingerprint.to_ascii_lowercase()))
        .map_err(|_| ExportError::InvalidScheme(scheme.to_string()))?;
    if !uri.cannot_be_a_base() {
        return Err(ExportError::InvalidScheme(scheme.to_string()));
    }
    Ok(uri)
}

/// Format a key ID as `0x` followed by 16 lowercase hex digits.
pub fn format_key_id(key_id: i64) -> String {
    format!("{key_id:#018x}")
}

/// Parse a key ID written as 16 hex digits, with or without `0x`.
///
/// # Errors
/// Returns `InvalidHex` for anything else.
pub fn parse_key_id(input: &str) -> Result<i64> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.len() != 16 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ExportError::InvalidHex(format!(
            "{input:?}: key id must be 16 hex digits"
        )));
    }
    u64::from_str_radix(digits, 16)
        .map(|id| id as i64)
        .map_err(|e| ExportError::InvalidHex(format!("{input:?}: {e}")))
}
