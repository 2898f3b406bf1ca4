// ABOUTME: TOML keyring file backing the CLI's key store.
// ABOUTME: Entries carry OpenSSH public keys and point at certified key files.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use keyshare_core::{
    armor, fingerprint, ExportError, FullKeyStructure, KeyBlob, KeyMaterial, KeyStore,
    KeyVersion, MemoryKeyStore,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// On-disk keyring layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyringFile {
    #[serde(rename = "key")]
    pub keys: Vec<KeyEntry>,
}

/// One `[[key]]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEntry {
    /// Display name, usually the primary user ID
    pub name: Option<String>,
    /// Key creation time
    pub created: DateTime<Utc>,
    /// Key packet version (4 or 6)
    #[serde(default = "default_version")]
    pub version: u8,
    /// Store identifier; defaults to the key ID derived from the fingerprint
    pub id: Option<String>,
    /// Primary key as an OpenSSH public key line
    pub primary: String,
    /// Authentication subkey as an OpenSSH public key line
    pub auth: Option<String>,
    /// Certified key file (armored or binary), relative to the keyring
    pub certified: Option<PathBuf>,
    /// Expected fingerprint, checked on load
    pub fingerprint: Option<String>,
}

fn default_version() -> u8 {
    4
}

/// Key store loaded from a keyring file.
#[derive(Debug, Default)]
pub struct Keyring {
    store: MemoryKeyStore,
    certified: HashMap<i64, PathBuf>,
}

impl Keyring {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read keyring from {}", path.display()))?;
        let file: KeyringFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse keyring from {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_file(file, base)
    }

    /// Build a keyring from parsed entries; relative paths resolve against `base`.
    pub fn from_file(file: KeyringFile, base: &Path) -> Result<Self> {
        let mut keyring = Self::default();
        for (index, entry) in file.keys.into_iter().enumerate() {
            keyring
                .add(entry, base)
                .with_context(|| format!("Invalid keyring entry #{}", index + 1))?;
        }
        Ok(keyring)
    }

    fn add(&mut self, entry: KeyEntry, base: &Path) -> Result<()> {
        let version = match entry.version {
            4 => KeyVersion::V4,
            6 => KeyVersion::V6,
            other => bail!("unsupported key version {other}"),
        };
        let created = u32::try_from(entry.created.timestamp())
            .context("creation time is outside the OpenPGP range")?;
        let blob = parse_openssh(&entry.primary).context("invalid primary key")?;

        let derived = KeyMaterial::derive(0, version, created, blob.clone())?;
        let master_key_id = match &entry.id {
            Some(id) => fingerprint::parse_key_id(id)?,
            None => derived.derived_key_id(),
        };
        if self.store.resolve_by_master_key_id(master_key_id).is_ok() {
            bail!("duplicate key id {}", fingerprint::format_key_id(master_key_id));
        }

        let mut key = match &entry.fingerprint {
            Some(expected) => KeyMaterial::new(
                master_key_id,
                version,
                created,
                blob,
                fingerprint::from_hex(expected)?,
            )?,
            None => KeyMaterial::derive(master_key_id, version, created, blob)?,
        };
        if let Some(name) = entry.name {
            key = key.with_display_name(name);
        }
        if let Some(auth) = &entry.auth {
            let subkey = parse_openssh(auth).context("invalid auth subkey")?;
            self.store.insert_auth_subkey(master_key_id, subkey);
            key = key.with_auth_capability(true);
        }
        if let Some(certified) = entry.certified {
            self.certified.insert(master_key_id, base.join(certified));
        }

        tracing::debug!(
            key_id = %fingerprint::format_key_id(master_key_id),
            fingerprint = %key.fingerprint_hex(),
            "loaded keyring entry"
        );
        self.store.insert(key);
        Ok(())
    }

    /// Keys ordered by ID
    pub fn keys(&self) -> Vec<&KeyMaterial> {
        self.store.keys()
    }
}

fn parse_openssh(line: &str) -> Result<KeyBlob> {
    let key = ssh_key::PublicKey::from_openssh(line.trim()).context("not an OpenSSH public key")?;
    Ok(KeyBlob::try_from(key.key_data())?)
}

impl KeyStore for Keyring {
    fn resolve_by_master_key_id(&self, master_key_id: i64) -> keyshare_core::Result<KeyMaterial> {
        self.store.resolve_by_master_key_id(master_key_id)
    }

    fn resolve_full_certified_key(
        &self,
        master_key_id: i64,
    ) -> keyshare_core::Result<FullKeyStructure> {
        let path = self
            .certified
            .get(&master_key_id)
            .ok_or(ExportError::KeyNotFound(master_key_id))?;
        let data = std::fs::read(path).map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "cannot read certified key");
            match e.kind() {
                std::io::ErrorKind::NotFound => ExportError::KeyNotFound(master_key_id),
                _ => ExportError::EncodingFailure(format!(
                    "cannot read certified key {}: {e}",
                    path.display()
                )),
            }
        })?;

        let packets = match std::str::from_utf8(&data) {
            Ok(text) if text.trim_start().starts_with(armor::BEGIN_PUBLIC_KEY_BLOCK) => {
                armor::dearmor(text)?
            }
            _ => data,
        };
        Ok(FullKeyStructure::new(packets))
    }

    fn resolve_authentication_subkey(&self, master_key_id: i64) -> keyshare_core::Result<KeyBlob> {
        self.store.resolve_authentication_subkey(master_key_id)
    }
}
