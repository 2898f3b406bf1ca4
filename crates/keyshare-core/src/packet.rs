// ABOUTME: OpenPGP public-key packet serialization and packet framing.
// ABOUTME: Builds key packet bodies for fingerprinting and walks packet headers.

use crate::error::{ExportError, Result};
use crate::key::{KeyBlob, KeyVersion};
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Packet tags used by transferable public keys.
pub mod tag {
    pub const SIGNATURE: u8 = 2;
    pub const SECRET_KEY: u8 = 5;
    pub const PUBLIC_KEY: u8 = 6;
    pub const SECRET_SUBKEY: u8 = 7;
    pub const TRUST: u8 = 12;
    pub const USER_ID: u8 = 13;
    pub const PUBLIC_SUBKEY: u8 = 14;
    pub const USER_ATTRIBUTE: u8 = 17;
}

/// Public-key algorithm identifiers.
pub mod algo {
    pub const RSA: u8 = 1;
    pub const ELGAMAL: u8 = 16;
    pub const DSA: u8 = 17;
    pub const ECDH: u8 = 18;
    pub const ECDSA: u8 = 19;
    pub const EDDSA_LEGACY: u8 = 22;
    pub const ED25519: u8 = 27;
}

const ED25519_LEGACY_OID: &[u8] = &[0x2b, 0x06, 0x01, 0x04, 0x01, 0xda, 0x47, 0x0f, 0x01];

/// Strip leading zero bytes from a big-endian magnitude.
pub(crate) fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// Write an OpenPGP MPI: 2-byte bit count followed by the minimal magnitude.
fn write_mpi(out: &mut Vec<u8>, name: &str, value: &[u8]) -> Result<()> {
    let value = strip_leading_zeros(value);
    let Some(&first) = value.first() else {
        return Err(ExportError::MalformedKeyMaterial(format!("{name} is empty")));
    };
    let bits = value.len() * 8 - first.leading_zeros() as usize;
    let bits = u16::try_from(bits)
        .map_err(|_| ExportError::MalformedKeyMaterial(format!("{name} is too large")))?;
    out.extend_from_slice(&bits.to_be_bytes());
    out.extend_from_slice(value);
    Ok(())
}

/// Write a curve OID prefixed by its one-byte length.
fn write_oid(out: &mut Vec<u8>, oid: &[u8]) -> Result<()> {
    let len = u8::try_from(oid.len())
        .ok()
        .filter(|&len| len != 0 && len != 0xff)
        .ok_or_else(|| ExportError::MalformedKeyMaterial("curve oid length".to_string()))?;
    out.push(len);
    out.extend_from_slice(oid);
    Ok(())
}

/// Algorithm octet and public key material for a blob.
fn key_material(version: KeyVersion, blob: &KeyBlob) -> Result<(u8, Vec<u8>)> {
    let mut out = Vec::new();
    let algorithm = match blob {
        KeyBlob::Rsa { n, e } => {
            write_mpi(&mut out, "rsa modulus", n)?;
            write_mpi(&mut out, "rsa exponent", e)?;
            algo::RSA
        }
        KeyBlob::Dsa { p, q, g, y } => {
            write_mpi(&mut out, "dsa p", p)?;
            write_mpi(&mut out, "dsa q", q)?;
            write_mpi(&mut out, "dsa g", g)?;
            write_mpi(&mut out, "dsa y", y)?;
            algo::DSA
        }
        KeyBlob::Elgamal { p, g, y } => {
            write_mpi(&mut out, "elgamal p", p)?;
            write_mpi(&mut out, "elgamal g", g)?;
            write_mpi(&mut out, "elgamal y", y)?;
            algo::ELGAMAL
        }
        KeyBlob::Ed25519 { point } => match version {
            KeyVersion::V4 => {
                write_oid(&mut out, ED25519_LEGACY_OID)?;
                let mut prefixed = Vec::with_capacity(33);
                prefixed.push(0x40);
                prefixed.extend_from_slice(point);
                write_mpi(&mut out, "ed25519 point", &prefixed)?;
                algo::EDDSA_LEGACY
            }
            KeyVersion::V6 => {
                out.extend_from_slice(point);
                algo::ED25519
            }
        },
        KeyBlob::Ecdsa { curve, point } => {
            write_oid(&mut out, curve.oid())?;
            write_mpi(&mut out, "ecdsa point", point)?;
            algo::ECDSA
        }
        KeyBlob::Ecdh {
            oid,
            point,
            kdf_hash,
            kdf_cipher,
        } => {
            write_oid(&mut out, oid)?;
            write_mpi(&mut out, "ecdh point", point)?;
            out.extend_from_slice(&[0x03, 0x01, *kdf_hash, *kdf_cipher]);
            algo::ECDH
        }
    };
    Ok((algorithm, out))
}

/// Serialize the body of a public-key (or public-subkey) packet.
///
/// # Errors
/// Returns `MalformedKeyMaterial` if a required parameter is empty.
pub fn public_key_body(version: KeyVersion, created: u32, blob: &KeyBlob) -> Result<Vec<u8>> {
    let (algorithm, material) = key_material(version, blob)?;
    let mut body = Vec::with_capacity(material.len() + 10);
    body.push(version.octet());
    body.extend_from_slice(&created.to_be_bytes());
    body.push(algorithm);
    if version == KeyVersion::V6 {
        let len = u32::try_from(material.len())
            .map_err(|_| ExportError::MalformedKeyMaterial("key material too large".to_string()))?;
        body.extend_from_slice(&len.to_be_bytes());
    }
    body.extend_from_slice(&material);
    Ok(body)
}

/// Fingerprint of a serialized key packet body, dispatched on its version octet.
///
/// # Errors
/// Returns `EncodingFailure` for unknown versions or oversized v4 bodies.
pub fn fingerprint_of_body(body: &[u8]) -> Result<Vec<u8>> {
    match body.first() {
        Some(4) => {
            let len = u16::try_from(body.len()).map_err(|_| {
                ExportError::EncodingFailure("v4 key packet exceeds 65535 bytes".to_string())
            })?;
            let mut hasher = Sha1::new();
            hasher.update([0x99u8]);
            hasher.update(len.to_be_bytes());
            hasher.update(body);
            Ok(hasher.finalize().to_vec())
        }
        Some(6) => {
            let len = u32::try_from(body.len()).map_err(|_| {
                ExportError::EncodingFailure("v6 key packet too large".to_string())
            })?;
            let mut hasher = Sha256::new();
            hasher.update([0x9bu8]);
            hasher.update(len.to_be_bytes());
            hasher.update(body);
            Ok(hasher.finalize().to_vec())
        }
        Some(other) => Err(ExportError::EncodingFailure(format!(
            "unsupported key packet version {other}"
        ))),
        None => Err(ExportError::EncodingFailure("empty key packet".to_string())),
    }
}

/// Derive the fingerprint of a key from its parameters.
pub fn fingerprint(version: KeyVersion, created: u32, blob: &KeyBlob) -> Result<Vec<u8>> {
    fingerprint_of_body(&public_key_body(version, created, blob)?)
}

/// Key ID implied by a fingerprint: low 8 bytes for v4, high 8 bytes for v6.
///
/// Fingerprints shorter than 8 bytes yield 0.
pub fn key_id(version: KeyVersion, fingerprint: &[u8]) -> i64 {
    let window = match version {
        KeyVersion::V4 => fingerprint.len().checked_sub(8).map(|start| &fingerprint[start..]),
        KeyVersion::V6 => fingerprint.get(..8),
    };
    window
        .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
        .map(i64::from_be_bytes)
        .unwrap_or(0)
}

/// Append a new-format packet header and body.
pub fn write_packet(out: &mut Vec<u8>, tag: u8, body: &[u8]) {
    out.push(0xc0 | (tag & 0x3f));
    let len = body.len();
    if len < 192 {
        out.push(len as u8);
    } else if len < 8384 {
        let adjusted = len - 192;
        out.push(((adjusted >> 8) + 192) as u8);
        out.push((adjusted & 0xff) as u8);
    } else {
        out.push(0xff);
        out.extend_from_slice(&(len as u32).to_be_bytes());
    }
    out.extend_from_slice(body);
}

/// A single framed packet borrowed from a larger buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    pub tag: u8,
    pub body: &'a [u8],
}

fn take<'a>(data: &'a [u8], count: usize) -> Result<(&'a [u8], &'a [u8])> {
    if data.len() < count {
        return Err(ExportError::EncodingFailure("truncated packet".to_string()));
    }
    Ok(data.split_at(count))
}

fn be_len(bytes: &[u8]) -> usize {
    bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize)
}

/// Read one packet from the front of `data`, returning it and the remainder.
///
/// Accepts old- and new-format headers. Partial and indeterminate lengths are
/// rejected since key packets never use them.
///
/// # Errors
/// Returns `EncodingFailure` for malformed or truncated framing.
pub fn read_packet(data: &[u8]) -> Result<(Packet<'_>, &[u8])> {
    let (header, rest) = take(data, 1)?;
    let header = header[0];
    if header & 0x80 == 0 {
        return Err(ExportError::EncodingFailure(format!(
            "invalid packet header {header:#04x}"
        )));
    }

    let (tag, len, rest) = if header & 0x40 != 0 {
        let tag = header & 0x3f;
        let (first, rest) = take(rest, 1)?;
        match first[0] {
            octet @ 0..=191 => (tag, octet as usize, rest),
            octet @ 192..=223 => {
                let (second, rest) = take(rest, 1)?;
                (tag, ((octet as usize - 192) << 8) + second[0] as usize + 192, rest)
            }
            255 => {
                let (len, rest) = take(rest, 4)?;
                (tag, be_len(len), rest)
            }
            _ => {
                return Err(ExportError::EncodingFailure(
                    "partial body length in key packet".to_string(),
                ))
            }
        }
    } else {
        let tag = (header >> 2) & 0x0f;
        let width = match header & 0x03 {
            0 => 1,
            1 => 2,
            2 => 4,
            _ => {
                return Err(ExportError::EncodingFailure(
                    "indeterminate packet length".to_string(),
                ))
            }
        };
        let (len, rest) = take(rest, width)?;
        (tag, be_len(len), rest)
    };

    let (body, rest) = take(rest, len)?;
    Ok((Packet { tag, body }, rest))
}
