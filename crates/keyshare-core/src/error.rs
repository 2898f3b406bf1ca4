// ABOUTME: Error types for key export operations using thiserror.
// ABOUTME: One variant per failure kind; configuration I/O has its own enum.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while formatting or exporting a public key.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Fingerprint byte length is not one of the supported sizes.
    #[error("invalid fingerprint length: {0} bytes (expected 20 or 32)")]
    InvalidLength(usize),

    /// URI scheme is empty or not a valid scheme.
    #[error("invalid URI scheme: {0:?}")]
    InvalidScheme(String),

    /// Input is not valid hex of the expected shape.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Key algorithm has no mapping to the requested format.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// A required key field is absent or empty.
    #[error("malformed key material: {0}")]
    MalformedKeyMaterial(String),

    /// Stored fingerprint disagrees with the one derived from the key blob.
    #[error("fingerprint mismatch: stored {stored}, derived {derived}")]
    FingerprintMismatch { stored: String, derived: String },

    /// Key store could not resolve the identifier.
    #[error("key not found: {0:#018x}")]
    KeyNotFound(i64),

    /// Serialized key structure is internally inconsistent.
    #[error("encoding failure: {0}")]
    EncodingFailure(String),

    /// Requested export format is not available for this key.
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// Failed to write a share file to disk.
    #[error("failed to write share file {path}: {source}")]
    WriteShareFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// QR render collaborator failed.
    #[error("failed to render QR code: {0}")]
    RenderFailure(String),
}

/// Result type alias using ExportError.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Errors from loading or saving the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
