//! Device configuration.
//!
//! Layered with the `config` crate: built-in defaults, then
//! `~/.config/tombola/config.json`, then `TOMBOLA__*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{arbiter::DEFAULT_BUSY_WAIT, debounce::DEFAULT_DEBOUNCE};

/// Directory under the user's config dir holding `config.json`.
pub const CONFIG_DIR: &str = "tombola";
/// Configuration file name.
pub const CONFIG_FILE: &str = "config.json";

/// Receipt printer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// Serial device or file that receives ESC/POS bytes. Screen only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<PathBuf>,
    /// First line of every receipt.
    pub header: String,
    /// Closing line of draw receipts.
    pub footer: String,
    /// Paper width in normal-size columns.
    pub width: usize,
    /// Blank lines fed after each receipt.
    pub feed_lines: u8,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            device: None,
            header: "TOMBOLA INTELIGENTE".to_string(),
            footer: "¡Felicidades!".to_string(),
            width: 27,
            feed_lines: 3,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the persisted lists.
    pub data_root: PathBuf,
    /// Refractory window for the buttons, in milliseconds.
    pub debounce_ms: u64,
    /// How long network callers wait for a busy device, in milliseconds.
    pub busy_wait_ms: u64,
    /// Names drawn in group mode.
    pub group_size: usize,
    /// Printer settings.
    pub printer: PrinterConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_root: Self::default_data_root(),
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            busy_wait_ms: DEFAULT_BUSY_WAIT.as_millis() as u64,
            group_size: crate::draw::DEFAULT_GROUP_SIZE,
            printer: PrinterConfig::default(),
        }
    }
}

impl AppConfig {
    /// Location of the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR)
            .join(CONFIG_FILE)
    }

    /// Default directory for the list files.
    pub fn default_data_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR)
    }

    /// Load from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load using `path` as the file layer. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = Self::default();
        let printer = &defaults.printer;
        let settings = Config::builder()
            .set_default(
                "data_root",
                defaults.data_root.to_string_lossy().to_string(),
            )?
            .set_default("debounce_ms", defaults.debounce_ms as i64)?
            .set_default("busy_wait_ms", defaults.busy_wait_ms as i64)?
            .set_default("group_size", defaults.group_size as i64)?
            .set_default("printer.header", printer.header.clone())?
            .set_default("printer.footer", printer.footer.clone())?
            .set_default("printer.width", printer.width as i64)?
            .set_default("printer.feed_lines", i64::from(printer.feed_lines))?
            .add_source(File::from(path).format(FileFormat::Json).required(false))
            .add_source(
                Environment::with_prefix("TOMBOLA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Refractory window for the buttons.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Bounded wait for network callers.
    pub fn busy_wait(&self) -> Duration {
        Duration::from_millis(self.busy_wait_ms)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.group_size >= 1, "group_size must be at least 1");
        ensure!(
            self.printer.width >= 8,
            "printer.width must be at least 8 columns"
        );
        Ok(())
    }
}

/// Write the default configuration unless a file already exists.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = AppConfig::config_path();
    ensure_default_config_at(&path)?;
    Ok(path)
}

/// Write the default configuration to `path` unless it exists. Returns whether it wrote.
pub fn ensure_default_config_at(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let serialized = serde_json::to_string_pretty(&AppConfig::default())
        .context("failed to serialize default configuration")?;
    fs::write(path, serialized).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(true)
}
