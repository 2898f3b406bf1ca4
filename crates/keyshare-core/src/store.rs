// ABOUTME: Key store collaborator interface and an in-memory implementation.
// ABOUTME: The export core only reads keys through this trait.

use crate::error::{ExportError, Result};
use crate::key::{KeyBlob, KeyMaterial};
use std::collections::HashMap;

/// Serialized transferable public key: primary key, user IDs, subkeys and
/// their certifications, as OpenPGP packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullKeyStructure(Vec<u8>);

impl FullKeyStructure {
    pub fn new(packets: Vec<u8>) -> Self {
        Self(packets)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Source of parsed key material, keyed by master key ID.
///
/// Every lookup that cannot be satisfied returns `ExportError::KeyNotFound`.
pub trait KeyStore {
    fn resolve_by_master_key_id(&self, master_key_id: i64) -> Result<KeyMaterial>;

    fn resolve_full_certified_key(&self, master_key_id: i64) -> Result<FullKeyStructure>;

    fn resolve_authentication_subkey(&self, master_key_id: i64) -> Result<KeyBlob>;
}

/// Key store backed by hash maps; used by tests and small callers.
#[derive(Debug, Default, Clone)]
pub struct MemoryKeyStore {
    keys: HashMap<i64, KeyMaterial>,
    certified: HashMap<i64, FullKeyStructure>,
    auth_subkeys: HashMap<i64, KeyBlob>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace key material under its master key ID.
    pub fn insert(&mut self, key: KeyMaterial) {
        self.keys.insert(key.master_key_id(), key);
    }

    pub fn insert_certified(&mut self, master_key_id: i64, structure: FullKeyStructure) {
        self.certified.insert(master_key_id, structure);
    }

    pub fn insert_auth_subkey(&mut self, master_key_id: i64, blob: KeyBlob) {
        self.auth_subkeys.insert(master_key_id, blob);
    }

    /// All stored keys, ordered by master key ID.
    pub fn keys(&self) -> Vec<&KeyMaterial> {
        let mut keys: Vec<_> = self.keys.values().collect();
        keys.sort_by_key(|key| key.master_key_id());
        keys
    }
}

impl KeyStore for MemoryKeyStore {
    fn resolve_by_master_key_id(&self, master_key_id: i64) -> Result<KeyMaterial> {
        self.keys
            .get(&master_key_id)
            .cloned()
            .ok_or(ExportError::KeyNotFound(master_key_id))
    }

    fn resolve_full_certified_key(&self, master_key_id: i64) -> Result<FullKeyStructure> {
        self.certified
            .get(&master_key_id)
            .cloned()
            .ok_or(ExportError::KeyNotFound(master_key_id))
    }

    fn resolve_authentication_subkey(&self, master_key_id: i64) -> Result<KeyBlob> {
        self.auth_subkeys
            .get(&master_key_id)
            .cloned()
            .ok_or(ExportError::KeyNotFound(master_key_id))
    }
}
