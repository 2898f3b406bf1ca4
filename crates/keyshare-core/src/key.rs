// ABOUTME: In-memory public key model and its capability flags.
// ABOUTME: KeyMaterial refuses fingerprints that disagree with the key blob.

use crate::error::{ExportError, Result};
use crate::packet;

/// OpenPGP key packet version; determines fingerprint size and hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyVersion {
    /// SHA-1 fingerprints, 20 bytes.
    V4,
    /// SHA-256 fingerprints, 32 bytes.
    V6,
}

impl KeyVersion {
    /// Length in bytes of a fingerprint for this version.
    pub fn fingerprint_len(self) -> usize {
        match self {
            KeyVersion::V4 => 20,
            KeyVersion::V6 => 32,
        }
    }

    /// Version octet as written in the key packet.
    pub fn octet(self) -> u8 {
        match self {
            KeyVersion::V4 => 4,
            KeyVersion::V6 => 6,
        }
    }
}

/// Named NIST curves usable for ECDSA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcdsaCurve {
    NistP256,
    NistP384,
    NistP521,
}

impl EcdsaCurve {
    /// Curve identifier used by SSH (`nistp256`, ...).
    pub fn ssh_name(self) -> &'static str {
        match self {
            EcdsaCurve::NistP256 => "nistp256",
            EcdsaCurve::NistP384 => "nistp384",
            EcdsaCurve::NistP521 => "nistp521",
        }
    }

    /// DER-encoded object identifier body (without tag and length).
    pub fn oid(self) -> &'static [u8] {
        match self {
            EcdsaCurve::NistP256 => &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07],
            EcdsaCurve::NistP384 => &[0x2b, 0x81, 0x04, 0x00, 0x22],
            EcdsaCurve::NistP521 => &[0x2b, 0x81, 0x04, 0x00, 0x23],
        }
    }

    /// Size of one affine coordinate in bytes.
    pub fn field_len(self) -> usize {
        match self {
            EcdsaCurve::NistP256 => 32,
            EcdsaCurve::NistP384 => 48,
            EcdsaCurve::NistP521 => 66,
        }
    }

    /// Length of an uncompressed SEC1 point (`0x04 || X || Y`).
    pub fn uncompressed_point_len(self) -> usize {
        1 + 2 * self.field_len()
    }
}

/// Algorithm-tagged public key parameters.
///
/// Integer fields are unsigned big-endian magnitudes. Leading zero bytes are
/// tolerated and stripped by the encoders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyBlob {
    Rsa {
        n: Vec<u8>,
        e: Vec<u8>,
    },
    Dsa {
        p: Vec<u8>,
        q: Vec<u8>,
        g: Vec<u8>,
        y: Vec<u8>,
    },
    /// Encryption-only, no SSH mapping.
    Elgamal {
        p: Vec<u8>,
        g: Vec<u8>,
        y: Vec<u8>,
    },
    Ed25519 {
        point: [u8; 32],
    },
    Ecdsa {
        curve: EcdsaCurve,
        point: Vec<u8>,
    },
    /// Encryption-only, no SSH mapping.
    Ecdh {
        oid: Vec<u8>,
        point: Vec<u8>,
        kdf_hash: u8,
        kdf_cipher: u8,
    },
}

impl KeyBlob {
    /// Short human-readable algorithm name.
    pub fn algorithm_name(&self) -> &'static str {
        match self {
            KeyBlob::Rsa { .. } => "rsa",
            KeyBlob::Dsa { .. } => "dsa",
            KeyBlob::Elgamal { .. } => "elgamal",
            KeyBlob::Ed25519 { .. } => "ed25519",
            KeyBlob::Ecdsa { .. } => "ecdsa",
            KeyBlob::Ecdh { .. } => "ecdh",
        }
    }
}

impl TryFrom<&ssh_key::public::KeyData> for KeyBlob {
    type Error = ExportError;

    fn try_from(data: &ssh_key::public::KeyData) -> Result<Self> {
        use ssh_key::public::KeyData;

        fn positive(name: &str, value: &ssh_key::Mpint) -> Result<Vec<u8>> {
            value
                .as_positive_bytes()
                .map(<[u8]>::to_vec)
                .ok_or_else(|| ExportError::MalformedKeyMaterial(format!("{name} is not positive")))
        }

        match data {
            KeyData::Rsa(rsa) => Ok(KeyBlob::Rsa {
                n: positive("rsa modulus", &rsa.n)?,
                e: positive("rsa exponent", &rsa.e)?,
            }),
            KeyData::Dsa(dsa) => Ok(KeyBlob::Dsa {
                p: positive("dsa p", &dsa.p)?,
                q: positive("dsa q", &dsa.q)?,
                g: positive("dsa g", &dsa.g)?,
                y: positive("dsa y", &dsa.y)?,
            }),
            KeyData::Ed25519(ed) => Ok(KeyBlob::Ed25519 { point: ed.0 }),
            KeyData::Ecdsa(ecdsa) => {
                let curve = match ecdsa.curve() {
                    ssh_key::EcdsaCurve::NistP256 => EcdsaCurve::NistP256,
                    ssh_key::EcdsaCurve::NistP384 => EcdsaCurve::NistP384,
                    ssh_key::EcdsaCurve::NistP521 => EcdsaCurve::NistP521,
                    #[allow(unreachable_patterns)]
                    other => {
                        return Err(ExportError::UnsupportedAlgorithm(format!("{other:?}")))
                    }
                };
                Ok(KeyBlob::Ecdsa {
                    curve,
                    point: ecdsa.as_sec1_bytes().to_vec(),
                })
            }
            other => Err(ExportError::UnsupportedAlgorithm(format!(
                "{:?}",
                other.algorithm()
            ))),
        }
    }
}

/// Canonical in-memory representation of a public key.
///
/// Immutable once built. The fingerprint is always consistent with the blob:
/// [`KeyMaterial::new`] re-derives it and rejects a disagreeing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    master_key_id: i64,
    version: KeyVersion,
    created: u32,
    fingerprint: Vec<u8>,
    has_auth_capability: bool,
    display_name: Option<String>,
    public_key_blob: KeyBlob,
}

impl KeyMaterial {
    /// Build key material, computing the fingerprint from the blob.
    ///
    /// # Errors
    /// Returns `MalformedKeyMaterial` if the blob cannot be serialized.
    pub fn derive(
        master_key_id: i64,
        version: KeyVersion,
        created: u32,
        public_key_blob: KeyBlob,
    ) -> Result<Self> {
        let fingerprint = packet::fingerprint(version, created, &public_key_blob)?;
        Ok(Self {
            master_key_id,
            version,
            created,
            fingerprint,
            has_auth_capability: false,
            display_name: None,
            public_key_blob,
        })
    }

    /// Build key material from a stored fingerprint.
    ///
    /// # Errors
    /// Returns `InvalidLength` if the fingerprint size does not match the
    /// version, or `FingerprintMismatch` if it disagrees with the blob.
    pub fn new(
        master_key_id: i64,
        version: KeyVersion,
        created: u32,
        public_key_blob: KeyBlob,
        fingerprint: Vec<u8>,
    ) -> Result<Self> {
        if fingerprint.len() != version.fingerprint_len() {
            return Err(ExportError::InvalidLength(fingerprint.len()));
        }
        let key = Self {
            fingerprint,
            ..Self::derive(master_key_id, version, created, public_key_blob)?
        };
        key.verify_fingerprint()?;
        Ok(key)
    }

    /// Mark whether an authentication-capable subkey exists.
    pub fn with_auth_capability(mut self, has_auth_capability: bool) -> Self {
        self.has_auth_capability = has_auth_capability;
        self
    }

    /// Attach a display name, used only for filename suggestion.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Re-derive the fingerprint from the blob and compare with the stored one.
    ///
    /// # Errors
    /// Returns `FingerprintMismatch` if they differ.
    pub fn verify_fingerprint(&self) -> Result<()> {
        let derived = packet::fingerprint(self.version, self.created, &self.public_key_blob)?;
        if derived != self.fingerprint {
            tracing::warn!(
                master_key_id = self.master_key_id,
                "stored fingerprint disagrees with key blob"
            );
            return Err(ExportError::FingerprintMismatch {
                stored: hex::encode(&self.fingerprint),
                derived: hex::encode(derived),
            });
        }
        Ok(())
    }

    pub fn master_key_id(&self) -> i64 {
        self.master_key_id
    }

    pub fn version(&self) -> KeyVersion {
        self.version
    }

    /// Creation time, seconds since the Unix epoch.
    pub fn created(&self) -> u32 {
        self.created
    }

    pub fn fingerprint(&self) -> &[u8] {
        &self.fingerprint
    }

    pub fn has_auth_capability(&self) -> bool {
        self.has_auth_capability
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn public_key_blob(&self) -> &KeyBlob {
        &self.public_key_blob
    }

    /// Key ID implied by the fingerprint (may differ from `master_key_id`
    /// for stores that assign their own identifiers).
    pub fn derived_key_id(&self) -> i64 {
        packet::key_id(self.version, &self.fingerprint)
    }

    /// Lowercase hex fingerprint, derived on every call.
    pub fn fingerprint_hex(&self) -> String {
        hex::encode(&self.fingerprint)
    }
}
