// ABOUTME: Implementations of the keyshare subcommands over a key store.
// ABOUTME: Each command returns the text to print so it can be tested without a terminal.

use anyhow::{Context, Result};
use keyshare_core::{
    fingerprint, share_fingerprint, write_share_file, Destination, ExportFormat,
    ExportNegotiator, ExportOptions, ExportRequest, ExportResult, KeyMaterial, KeyStore, ShareDir,
};
use std::path::{Path, PathBuf};

/// What an export produced
#[derive(Debug, PartialEq, Eq)]
pub enum ExportOutput {
    /// Text for stdout
    Text(String),
    /// A share file was written
    Written(PathBuf),
}

/// One line per key: key ID, grouped fingerprint, SSH capability, name.
pub fn list(keys: &[&KeyMaterial]) -> String {
    let mut out = String::new();
    for key in keys {
        out.push_str(&format!(
            "{}  {}  {}  {}\n",
            fingerprint::format_key_id(key.master_key_id()),
            fingerprint::to_display_groups(&key.fingerprint_hex()),
            if key.has_auth_capability() { "ssh" } else { "-  " },
            key.display_name().unwrap_or("")
        ));
    }
    out
}

/// Fingerprint text: plain hex, grouped hex, or a `scheme:hex` share URI.
pub fn show_fingerprint<S: KeyStore + ?Sized>(
    store: &S,
    master_key_id: i64,
    share: bool,
    groups: bool,
    scheme: &str,
) -> Result<String> {
    let key = store.resolve_by_master_key_id(master_key_id)?;
    let destination = if share {
        Destination::ShareFile
    } else {
        Destination::Clipboard
    };
    let shared = share_fingerprint(&key, destination, scheme)?;
    if groups && !share {
        return Ok(fingerprint::to_display_groups(&shared.text));
    }
    Ok(shared.text)
}

/// URI that a QR renderer would encode for this key.
pub fn qr_uri<S: KeyStore + ?Sized>(store: &S, master_key_id: i64, scheme: &str) -> Result<String> {
    let key = store.resolve_by_master_key_id(master_key_id)?;
    Ok(fingerprint::to_uri(&key.fingerprint_hex(), scheme)?.to_string())
}

/// Run an export and either render it as text or write the share file into `out_dir`.
pub fn export<S: KeyStore + ?Sized>(
    store: &S,
    master_key_id: i64,
    request: ExportRequest,
    options: ExportOptions,
    out_dir: &Path,
) -> Result<ExportOutput> {
    let key = store.resolve_by_master_key_id(master_key_id)?;
    let comment_from_name = options.ssh_comment_from_name;
    let result = ExportNegotiator::new(store)
        .with_options(options)
        .export_key(&key, &request)
        .with_context(|| {
            format!(
                "Failed to export {} as {:?}",
                fingerprint::format_key_id(master_key_id),
                request.format
            )
        })?;

    match result {
        ExportResult::Clipboard(payload) => {
            let comment = match payload.format() {
                ExportFormat::Ssh if comment_from_name => key.display_name(),
                _ => None,
            };
            Ok(ExportOutput::Text(payload.to_text(comment)?))
        }
        ExportResult::File(file) => {
            let path = write_share_file(out_dir, &file)?;
            tracing::info!(path = %path.display(), mime_type = file.mime_type, "share file written");
            Ok(ExportOutput::Written(path))
        }
    }
}

/// Run an export with share files going to a fresh directory under the
/// system temp dir. The directory is kept only when a file was written.
pub fn export_to_share_dir<S: KeyStore + ?Sized>(
    store: &S,
    master_key_id: i64,
    request: ExportRequest,
    options: ExportOptions,
) -> Result<ExportOutput> {
    if request.destination != Destination::ShareFile {
        return export(store, master_key_id, request, options, Path::new("."));
    }

    let share = ShareDir::new()?;
    let output = export(store, master_key_id, request, options, share.path())?;
    let kept = share.keep();
    tracing::debug!(dir = %kept.display(), "keeping share directory");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyshare_core::{armor, packet, FullKeyStructure, KeyBlob, KeyVersion, MemoryKeyStore};

    const CREATED: u32 = 1_700_000_000;

    fn store() -> (MemoryKeyStore, KeyMaterial) {
        let blob = KeyBlob::Ed25519 { point: [0x21; 32] };
        let key = KeyMaterial::derive(7, KeyVersion::V4, CREATED, blob.clone())
            .expect("should derive")
            .with_display_name("Dana")
            .with_auth_capability(true);

        let mut certified = Vec::new();
        packet::write_packet(
            &mut certified,
            packet::tag::PUBLIC_KEY,
            &packet::public_key_body(KeyVersion::V4, CREATED, &blob).expect("body"),
        );

        let mut store = MemoryKeyStore::new();
        store.insert(key.clone());
        store.insert_certified(7, FullKeyStructure::new(certified));
        store.insert_auth_subkey(7, KeyBlob::Ed25519 { point: [0x22; 32] });
        (store, key)
    }

    #[test]
    fn test_list_shows_id_fingerprint_and_name() {
        let (store, key) = store();
        let out = list(&store.keys());
        assert!(out.starts_with("0x0000000000000007  "));
        assert!(out.contains(&fingerprint::to_display_groups(&key.fingerprint_hex())));
        assert!(out.trim_end().ends_with("ssh  Dana"));
    }

    #[test]
    fn test_fingerprint_variants() {
        let (store, key) = store();
        let hex = key.fingerprint_hex();
        assert_eq!(
            show_fingerprint(&store, 7, false, false, "openpgp4fpr").expect("plain"),
            hex
        );
        assert_eq!(
            show_fingerprint(&store, 7, false, true, "openpgp4fpr").expect("grouped"),
            fingerprint::to_display_groups(&hex)
        );
        assert_eq!(
            show_fingerprint(&store, 7, true, false, "openpgp4fpr").expect("share"),
            format!("openpgp4fpr:{hex}")
        );
    }

    #[test]
    fn test_qr_uri_unknown_key() {
        let (store, _) = store();
        let err = qr_uri(&store, 8, "openpgp4fpr").expect_err("unknown key");
        assert!(err.to_string().contains("key not found"));
    }

    #[test]
    fn test_export_ssh_to_stdout_uses_name_comment() {
        let (store, _) = store();
        let dir = tempfile::tempdir().expect("should create temp dir");
        let out = export(
            &store,
            7,
            ExportRequest::new(ExportFormat::Ssh, Destination::Clipboard),
            ExportOptions::default(),
            dir.path(),
        )
        .expect("should export");
        let ExportOutput::Text(line) = out else {
            panic!("expected text output");
        };
        assert!(line.starts_with("ssh-ed25519 "));
        assert!(line.ends_with(" Dana"));
    }

    #[test]
    fn test_export_armored_file() {
        let (store, _) = store();
        let dir = tempfile::tempdir().expect("should create temp dir");
        let out = export(
            &store,
            7,
            ExportRequest::new(ExportFormat::Armored, Destination::ShareFile),
            ExportOptions::default(),
            dir.path(),
        )
        .expect("should export");
        assert_eq!(out, ExportOutput::Written(dir.path().join("Dana.asc")));

        let text = std::fs::read_to_string(dir.path().join("Dana.asc")).expect("should read");
        assert!(text.starts_with(armor::BEGIN_PUBLIC_KEY_BLOCK));
    }

    #[test]
    fn test_export_ssh_without_auth_reports_capability() {
        let mut store = MemoryKeyStore::new();
        store.insert(
            KeyMaterial::derive(9, KeyVersion::V4, CREATED, KeyBlob::Ed25519 { point: [1; 32] })
                .expect("should derive"),
        );
        let dir = tempfile::tempdir().expect("should create temp dir");
        let err = export(
            &store,
            9,
            ExportRequest::new(ExportFormat::Ssh, Destination::Clipboard),
            ExportOptions::default(),
            dir.path(),
        )
        .expect_err("no auth subkey");
        assert!(format!("{err:#}").contains("capability unavailable"));
    }

    #[test]
    fn test_export_to_share_dir_keeps_written_file() {
        let (store, _) = store();
        let out = export_to_share_dir(
            &store,
            7,
            ExportRequest::new(ExportFormat::Ssh, Destination::ShareFile),
            ExportOptions::default(),
        )
        .expect("should export");
        let ExportOutput::Written(path) = out else {
            panic!("expected a written file");
        };

        let share_dir = path.parent().expect("file has a parent").to_path_buf();
        let dir_name = share_dir
            .file_name()
            .and_then(|name| name.to_str())
            .expect("utf-8 name");
        assert!(dir_name.starts_with("keyshare-"));
        assert!(share_dir.starts_with(std::env::temp_dir()));
        let contents = std::fs::read_to_string(&path).expect("file outlives the call");
        assert!(contents.starts_with("ssh-ed25519 "));

        std::fs::remove_dir_all(share_dir).expect("should clean up");
    }

    #[test]
    fn test_export_to_share_dir_clipboard_prints_text() {
        let (store, _) = store();
        let out = export_to_share_dir(
            &store,
            7,
            ExportRequest::new(ExportFormat::Armored, Destination::Clipboard),
            ExportOptions::default(),
        )
        .expect("should export");
        let ExportOutput::Text(text) = out else {
            panic!("expected text output");
        };
        assert!(text.starts_with(armor::BEGIN_PUBLIC_KEY_BLOCK));
    }
}
