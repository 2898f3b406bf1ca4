// ABOUTME: CLI library components for the keyshare command.
// ABOUTME: Keyring loading and subcommand implementations used by the binary.

//! # keyshare-cli
//!
//! Command-line front end for sharing public keys:
//!
//! ```text
//! keyshare
//! ├── list                                  # Keys in the keyring
//! ├── fingerprint <key-id> [--share|--groups]
//! ├── qr-uri <key-id>                       # openpgp4fpr: URI for QR codes
//! └── export <key-id> --format armored|ssh --to clipboard|file [--out-dir DIR]
//! ```
//!
//! "clipboard" output goes to stdout. "file" output is written to `--out-dir`
//! or `share.dir` when given, else to a fresh directory under the system temp
//! dir, and its path printed.

pub mod commands;
pub mod keyring;

pub use keyring::Keyring;
