// ABOUTME: Configuration loading and saving for keyshare
// ABOUTME: TOML file under the XDG config directory, every field defaulted

use crate::error::ConfigError;
use crate::export::ExportOptions;
use crate::fingerprint::FINGERPRINT_SCHEME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fingerprint: FingerprintConfig,
    pub keyring: KeyringConfig,
    pub share: ShareConfig,
    pub armor: ArmorConfig,
    pub ssh: SshConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// URI scheme for QR transfer
    pub scheme: String,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            scheme: FINGERPRINT_SCHEME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyringConfig {
    /// Keyring file (defaults to keyring.toml next to the config)
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Directory that receives share files; a fresh dir under the system temp dir when unset
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmorConfig {
    /// Value of the `Comment:` armor header
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Use the key's display name as the comment in `.pub` files
    pub comment_from_name: bool,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            comment_from_name: true,
        }
    }
}

impl Config {
    /// XDG config directory for keyshare (~/.config/keyshare)
    pub fn config_dir() -> PathBuf {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|p| p.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("."))
            })
            .join("keyshare")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load from the default location, falling back to defaults when no file exists.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the config, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, content).map_err(write_err)
    }

    /// Keyring path, using `<config_dir>/keyring.toml` if not configured
    pub fn keyring_path(&self) -> PathBuf {
        self.keyring
            .path
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("keyring.toml"))
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            armor_comment: self.armor.comment.clone(),
            ssh_comment_from_name: self.ssh.comment_from_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.fingerprint.scheme, "openpgp4fpr");
        assert!(config.ssh.comment_from_name);
        assert_eq!(config.share.dir, None);
        assert_eq!(config.export_options(), ExportOptions::default());
    }

    #[test]
    fn test_empty_file_parses_to_defaults() {
        let config: Config = toml::from_str("").expect("should parse empty config");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
[armor]
comment = "from keyshare"

[ssh]
comment_from_name = false
"#,
        )
        .expect("should parse");
        assert_eq!(config.armor.comment.as_deref(), Some("from keyshare"));
        assert!(!config.ssh.comment_from_name);
        assert_eq!(config.fingerprint.scheme, "openpgp4fpr");

        let options = config.export_options();
        assert_eq!(options.armor_comment.as_deref(), Some("from keyshare"));
        assert!(!options.ssh_comment_from_name);
    }

    #[test]
    fn test_keyring_path_override() {
        let mut config = Config::default();
        assert!(config.keyring_path().ends_with("keyshare/keyring.toml"));

        config.keyring.path = Some(PathBuf::from("/srv/keys.toml"));
        assert_eq!(config.keyring_path(), PathBuf::from("/srv/keys.toml"));
    }

    #[test]
    fn test_config_dir_ends_with_keyshare() {
        assert!(Config::config_dir().ends_with("keyshare"));
        assert!(Config::config_path().ends_with("keyshare/config.toml"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.share.dir = Some(PathBuf::from("/tmp/share"));
        config.armor.comment = Some("hello".to_string());
        config.save(&path).expect("should save");

        assert_eq!(Config::load(&path).expect("should load"), config);
    }

    #[test]
    fn test_serialized_defaults_parse_back() {
        let toml = toml::to_string_pretty(&Config::default()).expect("should serialize");
        assert!(toml.contains("[fingerprint]"));
        assert!(toml.contains("comment_from_name = true"));
        let parsed: Config = toml::from_str(&toml).expect("should parse");
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let err = Config::load(dir.path().join("absent.toml")).expect_err("no file");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ssh]\ncomment_from_name = \"maybe\"\n").expect("should write");
        let err = Config::load(&path).expect_err("bad type");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
