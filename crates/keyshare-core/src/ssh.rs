// ABOUTME: SSH public key wire encoding for RSA, DSA, Ed25519 and ECDSA blobs.
// ABOUTME: Length-prefixed fields, sign-padded mpints, plus the OpenSSH text form.

use crate::error::{ExportError, Result};
use crate::key::KeyBlob;
use crate::packet::strip_leading_zeros;
use base64::Engine;

/// Append an SSH string: 4-byte big-endian length followed by the bytes.
fn put_string(wire: &mut Vec<u8>, bytes: &[u8]) {
    wire.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    wire.extend_from_slice(bytes);
}

/// Append an SSH mpint holding a non-negative magnitude.
///
/// Leading zero bytes are stripped; a single zero byte is re-inserted when the
/// high bit of the first significant byte is set so the value stays positive.
fn put_mpint(wire: &mut Vec<u8>, name: &str, magnitude: &[u8]) -> Result<()> {
    let magnitude = strip_leading_zeros(magnitude);
    let Some(&first) = magnitude.first() else {
        return Err(ExportError::MalformedKeyMaterial(format!("{name} is empty")));
    };
    if first & 0x80 != 0 {
        wire.extend_from_slice(&((magnitude.len() + 1) as u32).to_be_bytes());
        wire.push(0x00);
        wire.extend_from_slice(magnitude);
    } else {
        put_string(wire, magnitude);
    }
    Ok(())
}

/// SSH algorithm identifier for a blob.
///
/// # Errors
/// Returns `UnsupportedAlgorithm` for encryption-only algorithms.
pub fn algorithm_id(blob: &KeyBlob) -> Result<String> {
    match blob {
        KeyBlob::Rsa { .. } => Ok("ssh-rsa".to_string()),
        KeyBlob::Dsa { .. } => Ok("ssh-dss".to_string()),
        KeyBlob::Ed25519 { .. } => Ok("ssh-ed25519".to_string()),
        KeyBlob::Ecdsa { curve, .. } => Ok(format!("ecdsa-sha2-{}", curve.ssh_name())),
        KeyBlob::Elgamal { .. } | KeyBlob::Ecdh { .. } => Err(
            ExportError::UnsupportedAlgorithm(blob.algorithm_name().to_string()),
        ),
    }
}

/// Whether the blob has an SSH mapping at all.
pub fn is_supported(blob: &KeyBlob) -> bool {
    algorithm_id(blob).is_ok()
}

/// Encode a public key in SSH wire format.
///
/// The result is raw bytes; see [`to_openssh_line`] for the text form.
///
/// # Errors
/// Returns `UnsupportedAlgorithm` if the algorithm has no SSH mapping and
/// `MalformedKeyMaterial` if a required field is empty or has the wrong shape.
pub fn encode(blob: &KeyBlob) -> Result<Vec<u8>> {
    let algorithm = algorithm_id(blob)?;
    let mut wire = Vec::new();
    put_string(&mut wire, algorithm.as_bytes());

    match blob {
        KeyBlob::Rsa { n, e } => {
            put_mpint(&mut wire, "rsa exponent", e)?;
            put_mpint(&mut wire, "rsa modulus", n)?;
        }
        KeyBlob::Dsa { p, q, g, y } => {
            put_mpint(&mut wire, "dsa p", p)?;
            put_mpint(&mut wire, "dsa q", q)?;
            put_mpint(&mut wire, "dsa g", g)?;
            put_mpint(&mut wire, "dsa y", y)?;
        }
        KeyBlob::Ed25519 { point } => put_string(&mut wire, point),
        KeyBlob::Ecdsa { curve, point } => {
            if point.len() != curve.uncompressed_point_len() || point.first() != Some(&0x04) {
                return Err(ExportError::MalformedKeyMaterial(format!(
                    "{} point must be {} bytes, uncompressed",
                    curve.ssh_name(),
                    curve.uncompressed_point_len()
                )));
            }
            put_string(&mut wire, curve.ssh_name().as_bytes());
            put_string(&mut wire, point);
        }
        KeyBlob::Elgamal { .. } | KeyBlob::Ecdh { .. } => {
            return Err(ExportError::UnsupportedAlgorithm(
                blob.algorithm_name().to_string(),
            ));
        }
    }

    Ok(wire)
}

/// Read the algorithm identifier (first SSH string) from wire bytes.
///
/// # Errors
/// Returns `EncodingFailure` if the bytes do not start with a valid string.
pub fn algorithm_of(wire: &[u8]) -> Result<&str> {
    let truncated = || ExportError::EncodingFailure("truncated ssh wire data".to_string());
    let len_bytes: [u8; 4] = wire
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(truncated)?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    let name = wire.get(4..4 + len).ok_or_else(truncated)?;
    std::str::from_utf8(name)
        .map_err(|_| ExportError::EncodingFailure("ssh algorithm id is not utf-8".to_string()))
}

/// Render wire bytes as an OpenSSH public key line: `<algorithm> <base64>[ <comment>]`.
///
/// # Errors
/// Returns `EncodingFailure` if the algorithm identifier cannot be read.
pub fn to_openssh_line(wire: &[u8], comment: Option<&str>) -> Result<String> {
    let algorithm = algorithm_of(wire)?;
    let mut line = format!(
        "{algorithm} {}",
        base64::engine::general_purpose::STANDARD.encode(wire)
    );
    if let Some(comment) = comment.map(str::trim).filter(|c| !c.is_empty()) {
        line.push(' ');
        line.extend(comment.chars().map(|c| if c.is_control() { ' ' } else { c }));
    }
    Ok(line)
}
