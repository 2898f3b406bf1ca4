// ABOUTME: Public key export core: fingerprints, SSH wire encoding, ASCII armor.
// ABOUTME: Negotiates the export format and shapes payloads for clipboard or share files.

//! # keyshare-core
//!
//! Turns stored public key material into shareable forms.
//!
//! ## Features
//!
//! - **Fingerprints**: lowercase hex, grouped display text and `openpgp4fpr:` URIs
//! - **SSH export**: wire-format public keys for RSA, DSA, Ed25519 and ECDSA
//!   authentication subkeys, plus OpenSSH `.pub` lines
//! - **Armored export**: certified public keys as `PGP PUBLIC KEY BLOCK`s
//! - **Negotiation**: one entry point that checks capabilities and shapes the
//!   result for the clipboard or a named share file
//!
//! ## Example
//!
//! ```
//! use keyshare_core::{
//!     Destination, ExportFormat, ExportNegotiator, ExportRequest, ExportResult, KeyBlob,
//!     KeyMaterial, KeyVersion, MemoryKeyStore,
//! };
//!
//! let key = KeyMaterial::derive(42, KeyVersion::V4, 0, KeyBlob::Ed25519 { point: [7; 32] })
//!     .expect("key should derive")
//!     .with_auth_capability(true);
//!
//! let mut store = MemoryKeyStore::new();
//! store.insert(key);
//! store.insert_auth_subkey(42, KeyBlob::Ed25519 { point: [9; 32] });
//!
//! let request = ExportRequest::new(ExportFormat::Ssh, Destination::Clipboard);
//! let result = ExportNegotiator::new(&store)
//!     .export(42, &request)
//!     .expect("export should succeed");
//! assert!(matches!(result, ExportResult::Clipboard(_)));
//! ```

pub mod armor;
pub mod config;
mod error;
pub mod export;
pub mod fingerprint;
mod key;
pub mod packet;
pub mod qr;
pub mod share;
pub mod ssh;
mod store;

pub use config::Config;
pub use error::{ConfigError, ExportError, Result};
pub use export::{
    share_fingerprint, suggested_filename, Destination, ExportFormat, ExportNegotiator,
    ExportOptions, ExportPayload, ExportRequest, ExportResult, FingerprintShare, NamedFile,
};
pub use key::{EcdsaCurve, KeyBlob, KeyMaterial, KeyVersion};
pub use qr::{render_fingerprint_qr, Bitmap, QrRenderer};
pub use share::{write_share_file, ShareDir};
pub use store::{FullKeyStructure, KeyStore, MemoryKeyStore};
