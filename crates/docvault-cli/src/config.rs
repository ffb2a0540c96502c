use std::path::{Path, PathBuf};

use anyhow::Context;
use docvault_store::StoreConfig;
use docvault_verify::VerifyConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::Cli;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "docvault.toml";

/// Everything a command needs, merged from the config file and flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub store: StoreConfig,
    pub index_path: PathBuf,
    pub verify: VerifyConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            index_path: PathBuf::from("index.xml"),
            verify: VerifyConfig::default(),
        }
    }
}

impl CliConfig {
    /// Read `path`, or the default file if it exists, or fall back to defaults.
    ///
    /// An explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply the global flags on top of file values.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(store) = &cli.store {
            self.store.path = store.clone();
        }
        if let Some(backend) = cli.backend {
            self.store.backend = backend.into();
        }
        if let Some(index) = &cli.index {
            self.index_path = index.clone();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use docvault_store::BackendKind;
    use docvault_verify::{MessageKind, Severity};

    // ---- Loading ----

    #[test]
    fn defaults() {
        let c = CliConfig::default();
        assert_eq!(c.index_path, PathBuf::from("index.xml"));
        assert_eq!(c.store.backend, BackendKind::Directory);
        assert_eq!(c.verify, VerifyConfig::default());
    }

    #[test]
    fn parses_nested_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docvault.toml");
        std::fs::write(
            &path,
            "index_path = \"site/index.xml\"\n\
             [store]\nbackend = \"archive\"\npath = \"site/objects.tar\"\n\
             [verify]\nenabled = [\"DeadLink\"]\nmin_severity = \"warning\"\n",
        )
        .unwrap();

        let c = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(c.index_path, PathBuf::from("site/index.xml"));
        assert_eq!(c.store.backend, BackendKind::Archive);
        assert_eq!(c.store.path, PathBuf::from("site/objects.tar"));
        assert_eq!(c.verify.enabled, vec![MessageKind::DeadLink]);
        assert_eq!(c.verify.min_severity, Severity::Warning);
        assert!(!c.verify.aggregate);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CliConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "index_path = [").unwrap();
        assert!(CliConfig::load(Some(&path)).is_err());
    }

    // ---- Overrides ----

    #[test]
    fn flags_override_file_values() {
        let cli = Cli::try_parse_from([
            "docvault",
            "ls",
            "--store",
            "elsewhere",
            "--backend",
            "memory",
            "--index",
            "other.xml",
        ])
        .unwrap();
        let c = CliConfig::default().with_overrides(&cli);
        assert_eq!(c.store.path, PathBuf::from("elsewhere"));
        assert_eq!(c.store.backend, BackendKind::Memory);
        assert_eq!(c.index_path, PathBuf::from("other.xml"));
    }

    #[test]
    fn absent_flags_keep_file_values() {
        let cli = Cli::try_parse_from(["docvault", "ls"]).unwrap();
        let c = CliConfig::default().with_overrides(&cli);
        assert_eq!(c, CliConfig::default());
    }
}
