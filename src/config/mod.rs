//! Project configuration from the optional `kiln.toml`.
//!
//! ```text
//! config/
//! ├── section/   # [serve] [styles] [scripts] [images]
//! ├── error.rs   # ConfigError, ConfigDiagnostics
//! └── mod.rs     # ProjectConfig (this file)
//! ```
//!
//! The directory layout is fixed (see `core::Layout`); only tool settings are
//! configurable. A missing `kiln.toml` means all defaults.

mod error;
pub mod section;

pub use error::{ConfigDiagnostics, ConfigError};
pub use section::{BrowserTargets, ImagesConfig, ScriptsConfig, ServeConfig, StylesConfig};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::cli::{Cli, ServeArgs};
use crate::core::Layout;
use crate::utils::fs::normalize_path;
use crate::{debug, log};

/// Config file name, looked up in the project root.
pub const CONFIG_FILE: &str = "kiln.toml";

/// Root configuration structure representing `kiln.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Absolute project root (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default)]
    pub styles: StylesConfig,

    #[serde(default)]
    pub scripts: ScriptsConfig,

    #[serde(default)]
    pub images: ImagesConfig,
}

impl ProjectConfig {
    /// Load configuration for the command line: resolve the root, read
    /// `kiln.toml` when present, apply serve flags, validate.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = match &cli.root {
            Some(root) => normalize_path(root),
            None => std::env::current_dir().context("Failed to get current working directory")?,
        };
        if !root.is_dir() {
            return Err(ConfigError::Root(root).into());
        }

        let config_path = root.join(CONFIG_FILE);
        let mut config = if config_path.is_file() {
            Self::from_path(&config_path)?
        } else {
            debug!("config"; "no {} in {}, using defaults", CONFIG_FILE, root.display());
            Self::default()
        };
        config.root = root;

        if let Some(args) = cli.command().serve_args() {
            config.apply_serve_args(args);
        }

        config.validate()?;
        Ok(config)
    }

    /// Defaults rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load from a file, warning about unknown fields.
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String]) {
        log!("config"; "ignoring unknown fields in {}:", CONFIG_FILE);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// CLI flags override `[serve]`.
    pub fn apply_serve_args(&mut self, args: &ServeArgs) {
        Self::update_option(&mut self.serve.interface, args.interface.as_ref());
        Self::update_option(&mut self.serve.port, args.port.as_ref());
        if args.no_open {
            self.serve.open = false;
        }
    }

    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Validate every section, collecting all errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();
        self.serve.validate(&mut diag);
        self.styles.validate(&mut diag);
        self.scripts.validate(&mut diag);
        self.images.validate(&mut diag);
        diag.into_result().map_err(ConfigError::Diagnostics)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.root)
    }
}

/// Parse config and panic on unknown fields (catches typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ProjectConfig {
    let (parsed, ignored) = ProjectConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_invalid_toml() {
        assert!(ProjectConfig::parse_with_ignored("[serve\nport = 1").is_err());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let (config, ignored) =
            ProjectConfig::parse_with_ignored("[serve]\nport = 4000\n[bundle]\nsplit = true")
                .unwrap();
        assert_eq!(config.serve.port, 4000);
        assert!(ignored.iter().any(|f| f.contains("bundle")));
    }

    #[test]
    fn test_load_without_config_file() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["kiln", "--root", root, "build"]).unwrap();

        let config = ProjectConfig::load(&cli).unwrap();
        assert_eq!(config.serve.port, 3000);
        assert_eq!(config.layout().output_dir(), config.root().join("dist"));
    }

    #[test]
    fn test_load_applies_serve_flags() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[serve]\nport = 4000\nopen = true").unwrap();
        let root = dir.path().to_str().unwrap();
        let cli =
            Cli::try_parse_from(["kiln", "--root", root, "serve", "-p", "5000", "--no-open"])
                .unwrap();

        let config = ProjectConfig::load(&cli).unwrap();
        assert_eq!(config.serve.port, 5000);
        assert!(!config.serve.open);
    }

    #[test]
    fn test_load_rejects_missing_root() {
        let cli = Cli::try_parse_from(["kiln", "--root", "/nonexistent/kiln/root", "build"])
            .unwrap();
        assert!(ProjectConfig::load(&cli).is_err());
    }

    #[test]
    fn test_load_reports_invalid_values() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[images]\njpeg_quality = 101").unwrap();
        let root = dir.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["kiln", "--root", root, "images"]).unwrap();

        let err = ProjectConfig::load(&cli).unwrap_err();
        assert!(err.to_string().contains("images.jpeg_quality"));
    }
}
