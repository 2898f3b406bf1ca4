// ABOUTME: ASCII armor for certified public keys: base64 body, CRC-24 trailer, 64-column lines.
// ABOUTME: Verifies the certified structure against the key before wrapping it.

use crate::error::{ExportError, Result};
use crate::key::KeyMaterial;
use crate::packet::{self, tag};
use crate::store::KeyStore;
use base64::Engine;

pub const BEGIN_PUBLIC_KEY_BLOCK: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----";
pub const END_PUBLIC_KEY_BLOCK: &str = "-----END PGP PUBLIC KEY BLOCK-----";

const LINE_WIDTH: usize = 64;
const CRC24_INIT: u32 = 0x00b7_04ce;
const CRC24_POLY: u32 = 0x0186_4cfb;

/// CRC-24 as used by OpenPGP armor checksums.
pub fn crc24(data: &[u8]) -> u32 {
    let mut crc = CRC24_INIT;
    for &byte in data {
        crc ^= u32::from(byte) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24_POLY;
            }
        }
    }
    crc & 0x00ff_ffff
}

/// Wrap binary packets in a public key armor block.
///
/// Headers are written as `Name: value`; line breaks inside values are
/// replaced by spaces. The block ends with the END line and no trailing newline.
pub fn armor(data: &[u8], headers: &[(&str, &str)]) -> String {
    let engine = &base64::engine::general_purpose::STANDARD;
    let body = engine.encode(data);
    let checksum = engine.encode(&crc24(data).to_be_bytes()[1..]);

    let mut out = String::with_capacity(body.len() + body.len() / LINE_WIDTH + 128);
    out.push_str(BEGIN_PUBLIC_KEY_BLOCK);
    out.push('\n');
    for (name, value) in headers {
        out.push_str(name);
        out.push_str(": ");
        out.extend(value.chars().map(|c| if c == '\r' || c == '\n' { ' ' } else { c }));
        out.push('\n');
    }
    out.push('\n');

    // base64 output is pure ASCII, so byte chunks are valid line boundaries
    for line in body.as_bytes().chunks(LINE_WIDTH) {
        out.push_str(std::str::from_utf8(line).unwrap_or_default());
        out.push('\n');
    }
    out.push('=');
    out.push_str(&checksum);
    out.push('\n');
    out.push_str(END_PUBLIC_KEY_BLOCK);
    out
}

/// Decode a public key armor block, checking the CRC-24 line when present.
///
/// # Errors
/// Returns `EncodingFailure` for missing delimiters, bad base64, or a
/// checksum mismatch.
pub fn dearmor(text: &str) -> Result<Vec<u8>> {
    let mut lines = text.lines().map(str::trim_end);

    lines
        .by_ref()
        .find(|line| *line == BEGIN_PUBLIC_KEY_BLOCK)
        .ok_or_else(|| ExportError::EncodingFailure("missing armor header line".to_string()))?;

    // armor headers run until the first blank line
    for line in lines.by_ref() {
        if line.is_empty() {
            break;
        }
        if !line.contains(": ") {
            return Err(ExportError::EncodingFailure(format!(
                "invalid armor header {line:?}"
            )));
        }
    }

    let mut body = String::new();
    let mut checksum = None;
    let mut terminated = false;
    for line in lines {
        if line == END_PUBLIC_KEY_BLOCK {
            terminated = true;
            break;
        }
        if let Some(crc) = line.strip_prefix('=') {
            checksum = Some(crc.to_string());
        } else {
            body.push_str(line.trim_start());
        }
    }
    if !terminated {
        return Err(ExportError::EncodingFailure("missing armor tail line".to_string()));
    }

    let engine = &base64::engine::general_purpose::STANDARD;
    let data = engine
        .decode(body.as_bytes())
        .map_err(|e| ExportError::EncodingFailure(format!("invalid armor body: {e}")))?;

    if let Some(checksum) = checksum {
        let expected = engine
            .decode(checksum.as_bytes())
            .map_err(|e| ExportError::EncodingFailure(format!("invalid armor checksum: {e}")))?;
        if expected.as_slice() != &crc24(&data).to_be_bytes()[1..] {
            return Err(ExportError::EncodingFailure(
                "armor checksum mismatch".to_string(),
            ));
        }
    }

    Ok(data)
}

/// Check that a certified key structure is well framed and belongs to `key`.
///
/// # Errors
/// Returns `EncodingFailure` if the structure is empty, does not start with a
/// public-key packet, has broken framing, carries a different fingerprint, or
/// holds a packet that has no place in a transferable public key.
pub fn verify_certified_key(key: &KeyMaterial, data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Err(ExportError::EncodingFailure("empty certified key".to_string()));
    }

    let (primary, mut rest) = packet::read_packet(data)?;
    if primary.tag != tag::PUBLIC_KEY {
        return Err(ExportError::EncodingFailure(format!(
            "certified key starts with packet tag {} instead of a public key",
            primary.tag
        )));
    }
    if packet::fingerprint_of_body(primary.body)? != key.fingerprint() {
        return Err(ExportError::EncodingFailure(format!(
            "certified key does not belong to {}",
            key.fingerprint_hex()
        )));
    }

    while !rest.is_empty() {
        let (next, remainder) = packet::read_packet(rest)?;
        match next.tag {
            tag::PUBLIC_SUBKEY
            | tag::USER_ID
            | tag::USER_ATTRIBUTE
            | tag::SIGNATURE
            | tag::TRUST => {}
            other => {
                return Err(ExportError::EncodingFailure(format!(
                    "packet tag {other} is not allowed in a public key"
                )))
            }
        }
        rest = remainder;
    }
    Ok(())
}

/// Export the full certified public key of `key` as an armored block.
///
/// The certified structure (user IDs, subkeys, self-signatures) comes from the
/// store; this function only verifies and wraps it.
///
/// # Errors
/// Returns `KeyNotFound` if the store cannot resolve the key and
/// `EncodingFailure` if the structure is inconsistent.
pub fn export<S>(key: &KeyMaterial, store: &S, comment: Option<&str>) -> Result<String>
where
    S: KeyStore + ?Sized,
{
    let certified = store.resolve_full_certified_key(key.master_key_id())?;
    verify_certified_key(key, certified.as_bytes())?;

    let headers: Vec<(&str, &str)> = comment.map(|c| ("Comment", c)).into_iter().collect();
    Ok(armor(certified.as_bytes(), &headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{KeyBlob, KeyVersion};
    use crate::store::{FullKeyStructure, MemoryKeyStore};
    use insta::assert_snapshot;

    fn test_key() -> (KeyMaterial, Vec<u8>) {
        let blob = KeyBlob::Ed25519 { point: [0x5a; 32] };
        let key = KeyMaterial::derive(9, KeyVersion::V4, 1_600_000_000, blob.clone())
            .expect("should derive");
        let mut packets = Vec::new();
        packet::write_packet(
            &mut packets,
            tag::PUBLIC_KEY,
            &packet::public_key_body(KeyVersion::V4, 1_600_000_000, &blob).expect("body"),
        );
        packet::write_packet(&mut packets, tag::USER_ID, b"Test <test@example.org>");
        (key, packets)
    }

    #[test]
    fn test_crc24_check_value() {
        assert_eq!(crc24(b"123456789"), 0x21cf02);
        assert_eq!(crc24(b""), CRC24_INIT);
    }

    #[test]
    fn test_armor_small_payload() {
        assert_snapshot!(armor(b"hello", &[]), @r"
        -----BEGIN PGP PUBLIC KEY BLOCK-----

        aGVsbG8=
        =R/WK
        -----END PGP PUBLIC KEY BLOCK-----
        ");
    }

    #[test]
    fn test_armor_wraps_at_64_columns() {
        let data = vec![0xa5; 200];
        let armored = armor(&data, &[]);
        let body: Vec<&str> = armored
            .lines()
            .skip(2)
            .take_while(|line| !line.starts_with('='))
            .collect();
        assert!(body.len() > 1);
        assert!(body[..body.len() - 1].iter().all(|line| line.len() == 64));
        assert!(body.last().expect("last line").len() <= 64);
    }

    #[test]
    fn test_armor_frame_and_checksum_line() {
        let armored = armor(&[1, 2, 3, 4, 5, 6, 7], &[("Comment", "alice\nkey")]);
        assert!(armored.starts_with(BEGIN_PUBLIC_KEY_BLOCK));
        assert!(armored.ends_with(END_PUBLIC_KEY_BLOCK));
        assert!(armored.contains("\nComment: alice key\n\n"));

        let checksum_line = armored
            .lines()
            .find(|line| line.starts_with('='))
            .expect("checksum line");
        assert_eq!(checksum_line.len(), 5);
    }

    #[test]
    fn test_dearmor_inverts_armor() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let armored = armor(&data, &[("Comment", "round trip")]);
        assert_eq!(dearmor(&armored).expect("should dearmor"), data);
    }

    #[test]
    fn test_dearmor_accepts_crlf_and_missing_checksum() {
        let text = format!("{BEGIN_PUBLIC_KEY_BLOCK}\r\n\r\naGVsbG8=\r\n{END_PUBLIC_KEY_BLOCK}\r\n");
        assert_eq!(dearmor(&text).expect("should dearmor"), b"hello");
    }

    #[test]
    fn test_dearmor_rejects_bad_checksum() {
        let armored = armor(b"hello", &[]).replace("=R/WK", "=AAAA");
        let err = dearmor(&armored).expect_err("checksum mismatch");
        assert!(matches!(err, ExportError::EncodingFailure(msg) if msg.contains("checksum")));
    }

    #[test]
    fn test_dearmor_rejects_missing_delimiters() {
        assert!(dearmor("aGVsbG8=").is_err());
        let unterminated = format!("{BEGIN_PUBLIC_KEY_BLOCK}\n\naGVsbG8=\n");
        assert!(dearmor(&unterminated).is_err());
    }

    #[test]
    fn test_verify_certified_key_accepts_matching_structure() {
        let (key, packets) = test_key();
        verify_certified_key(&key, &packets).expect("structure belongs to key");
    }

    #[test]
    fn test_verify_certified_key_rejects_other_key() {
        let (_, packets) = test_key();
        let other = KeyMaterial::derive(
            10,
            KeyVersion::V4,
            1_600_000_000,
            KeyBlob::Ed25519 { point: [0x5b; 32] },
        )
        .expect("should derive");
        let err = verify_certified_key(&other, &packets).expect_err("wrong key");
        assert!(matches!(err, ExportError::EncodingFailure(_)));
    }

    #[test]
    fn test_verify_certified_key_rejects_truncated_trailer() {
        let (key, mut packets) = test_key();
        packets.extend_from_slice(&[0xcd, 0x10, 0x01]);
        let err = verify_certified_key(&key, &packets).expect_err("truncated packet");
        assert!(matches!(err, ExportError::EncodingFailure(_)));
    }

    #[test]
    fn test_verify_certified_key_accepts_subkeys_signatures_and_trust() {
        let (key, mut packets) = test_key();
        packet::write_packet(&mut packets, tag::SIGNATURE, &[0x04, 0x13]);
        packet::write_packet(&mut packets, tag::TRUST, &[0x00, 0x00]);
        packet::write_packet(&mut packets, tag::USER_ATTRIBUTE, &[0x01]);
        packet::write_packet(&mut packets, tag::PUBLIC_SUBKEY, &[0x04; 8]);
        packet::write_packet(&mut packets, tag::SIGNATURE, &[0x04, 0x18]);
        verify_certified_key(&key, &packets).expect("all packets belong in a public key");
    }

    #[test]
    fn test_verify_certified_key_rejects_secret_packets() {
        for secret_tag in [tag::SECRET_SUBKEY, tag::SECRET_KEY] {
            let (key, mut packets) = test_key();
            packet::write_packet(&mut packets, secret_tag, b"SECRET MATERIAL");
            let err = verify_certified_key(&key, &packets).expect_err("secret packet");
            let expected = format!("tag {secret_tag} ");
            assert!(
                matches!(&err, ExportError::EncodingFailure(msg) if msg.contains(&expected)),
                "unexpected error: {err:?}"
            );
        }
    }

    #[test]
    fn test_verify_certified_key_rejects_second_primary() {
        let (key, packets) = test_key();
        let mut doubled = packets.clone();
        doubled.extend_from_slice(&packets);
        let err = verify_certified_key(&key, &doubled).expect_err("two primaries");
        assert!(matches!(err, ExportError::EncodingFailure(_)));
    }

    #[test]
    fn test_verify_certified_key_rejects_empty_and_wrong_first_packet() {
        let (key, _) = test_key();
        assert!(verify_certified_key(&key, &[]).is_err());

        let mut user_id_first = Vec::new();
        packet::write_packet(&mut user_id_first, tag::USER_ID, b"x");
        assert!(verify_certified_key(&key, &user_id_first).is_err());
    }

    #[test]
    fn test_export_wraps_store_structure() {
        let (key, packets) = test_key();
        let mut store = MemoryKeyStore::new();
        store.insert(key.clone());
        store.insert_certified(key.master_key_id(), FullKeyStructure::new(packets.clone()));

        let armored = export(&key, &store, Some("keyshare")).expect("should export");
        assert!(armored.starts_with(BEGIN_PUBLIC_KEY_BLOCK));
        assert!(armored.ends_with(END_PUBLIC_KEY_BLOCK));
        assert_eq!(dearmor(&armored).expect("should dearmor"), packets);
    }

    #[test]
    fn test_export_refuses_secret_key_packets() {
        let (key, mut packets) = test_key();
        packet::write_packet(&mut packets, tag::SECRET_SUBKEY, b"SECRET SUBKEY MATERIAL");
        packet::write_packet(&mut packets, tag::SECRET_KEY, b"SECRET KEY");
        let mut store = MemoryKeyStore::new();
        store.insert(key.clone());
        store.insert_certified(key.master_key_id(), FullKeyStructure::new(packets));

        let err = export(&key, &store, None).expect_err("secret packets must not be armored");
        assert!(matches!(err, ExportError::EncodingFailure(_)));
    }

    #[test]
    fn test_export_missing_structure_is_key_not_found() {
        let (key, _) = test_key();
        let store = MemoryKeyStore::new();
        let err = export(&key, &store, None).expect_err("nothing stored");
        assert!(matches!(err, ExportError::KeyNotFound(9)));
    }
}
