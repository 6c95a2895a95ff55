//! Configuration management
//!
//! Settings live in `settings.json` inside the treehouse directory:
//! ```json
//! {
//!   "import": { "sampleSize": 5, "maxFileBytes": 10485760, "historyLimit": 20 },
//!   "app": { ... }
//! }
//! ```
//! Keys this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::result::Error;

pub const DEFAULT_SAMPLE_SIZE: usize = 5;
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Environment override for `import.sampleSize`
pub const SAMPLE_SIZE_ENV: &str = "TREEHOUSE_SAMPLE_SIZE";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    import: ImportSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSettings {
    /// Rows returned in a preview sample
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Largest CSV file the CLI will read
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    /// Default row count for `import history`
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_sample_size() -> usize {
    DEFAULT_SAMPLE_SIZE
}

fn default_max_file_bytes() -> u64 {
    DEFAULT_MAX_FILE_BYTES
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Treehouse configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub import: ImportSettings,
}

impl Config {
    /// Load config from the treehouse directory
    ///
    /// A missing file gives defaults. `TREEHOUSE_SAMPLE_SIZE` overrides the
    /// preview sample size.
    pub fn load(treehouse_dir: &Path) -> Result<Self> {
        let raw = read_settings(treehouse_dir)?;
        let mut import = raw.import;

        if let Ok(value) = std::env::var(SAMPLE_SIZE_ENV) {
            import.sample_size = parse_sample_size(&value)?;
        }

        Ok(Self { import })
    }

    /// Save config, preserving settings this crate doesn't manage
    pub fn save(&self, treehouse_dir: &Path) -> Result<()> {
        let mut settings = read_settings(treehouse_dir)?;
        settings.import = self.import.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(treehouse_dir.join("settings.json"), content)
            .context("Failed to write settings.json")?;
        Ok(())
    }
}

fn read_settings(treehouse_dir: &Path) -> Result<SettingsFile> {
    let settings_path = treehouse_dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }

    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    match serde_json::from_str(&content) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            warn!(path = %settings_path.display(), error = %e, "Ignoring malformed settings file");
            Ok(SettingsFile::default())
        }
    }
}

fn parse_sample_size(value: &str) -> Result<usize> {
    let size = value.trim().parse::<usize>().map_err(|_| {
        Error::Config(format!(
            "{} must be a non-negative integer, got {:?}",
            SAMPLE_SIZE_ENV, value
        ))
    })?;
    Ok(size)
}
