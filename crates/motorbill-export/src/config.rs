//! # Configuration
//!
//! Workshop letterhead, page geometry and export settings.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MOTORBILL_OUTPUT_DIR=/srv/quotes                                   │
//! │     MOTORBILL_SUPERSAMPLE=3                                            │
//! │     MOTORBILL_ASSET_TIMEOUT_MS=2000                                    │
//! │     MOTORBILL_WORKSHOP_NAME="Sri Murugan Motors"                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or                                                │
//! │     ~/.config/motorbill/motorbill.toml (Linux)                         │
//! │     ~/Library/Application Support/com.motorbill.motorbill/ (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [workshop]
//! name = "Sri Murugan Motors"
//! tagline = "Multi-brand car service and body shop"
//! proprietor = "K. Murugan, Proprietor"
//! address = ["14 Avinashi Road", "Coimbatore 641018"]
//! contact = "+91 422 123 4567"
//!
//! [page]
//! width_px = 794
//! margin_px = 32
//! supersample = 2
//!
//! [export]
//! output_dir = "."
//! asset_timeout_ms = 5000
//! registration_placeholder = "NOREG"
//! ```

use motorbill_core::WorkshopProfile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};

/// A4 width at 96 px/inch (210 mm).
pub const A4_WIDTH_PX: u32 = 794;

/// A4 height at 96 px/inch (297 mm).
pub const A4_HEIGHT_PX: u32 = 1123;

// =============================================================================
// Page Settings
// =============================================================================

/// Physical page geometry used by the layout composer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSettings {
    /// Page width in CSS pixels. The snapshot is laid out at exactly this width.
    #[serde(default = "default_width")]
    pub width_px: u32,

    /// Content margin on every side.
    #[serde(default = "default_margin")]
    pub margin_px: u32,

    /// Rasterization scale factor (1-4).
    #[serde(default = "default_supersample")]
    pub supersample: u32,
}

fn default_width() -> u32 {
    A4_WIDTH_PX
}

fn default_margin() -> u32 {
    32
}

fn default_supersample() -> u32 {
    2
}

impl Default for PageSettings {
    fn default() -> Self {
        PageSettings {
            width_px: default_width(),
            margin_px: default_margin(),
            supersample: default_supersample(),
        }
    }
}

impl PageSettings {
    /// Minimum page height keeping the A4 aspect ratio of `width_px`.
    pub fn min_height_px(&self) -> u32 {
        (u64::from(self.width_px) * u64::from(A4_HEIGHT_PX) / u64::from(A4_WIDTH_PX)) as u32
    }
}

// =============================================================================
// Export Settings
// =============================================================================

/// Where and how exported documents are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Directory the PDF lands in.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Upper bound on waiting for assets to report ready.
    #[serde(default = "default_asset_timeout")]
    pub asset_timeout_ms: u64,

    /// Stands in for the registration in the filename when none was entered.
    #[serde(default = "default_placeholder")]
    pub registration_placeholder: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_asset_timeout() -> u64 {
    5_000
}

fn default_placeholder() -> String {
    "NOREG".to_string()
}

impl Default for ExportSettings {
    fn default() -> Self {
        ExportSettings {
            output_dir: default_output_dir(),
            asset_timeout_ms: default_asset_timeout(),
            registration_placeholder: default_placeholder(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorbillConfig {
    #[serde(default)]
    pub workshop: WorkshopProfile,

    #[serde(default)]
    pub page: PageSettings,

    #[serde(default)]
    pub export: ExportSettings,
}

impl MotorbillConfig {
    /// Loads configuration: defaults → file → environment → validation.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, path: &std::path::Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(1..=4).contains(&self.page.supersample) {
            return Err(ConfigError::Invalid(format!(
                "page.supersample must be between 1 and 4, got {}",
                self.page.supersample
            )));
        }

        if self.page.width_px < 320 {
            return Err(ConfigError::Invalid(format!(
                "page.width_px must be at least 320, got {}",
                self.page.width_px
            )));
        }

        if self.page.margin_px.saturating_mul(4) >= self.page.width_px {
            return Err(ConfigError::Invalid(
                "page.margin_px leaves no room for content".into(),
            ));
        }

        if self.export.asset_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "export.asset_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.export.registration_placeholder.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "export.registration_placeholder must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Applies `MOTORBILL_*` overrides read through `lookup`.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("MOTORBILL_OUTPUT_DIR") {
            debug!(output_dir = %dir, "Overriding output dir from environment");
            self.export.output_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup("MOTORBILL_SUPERSAMPLE") {
            match raw.parse() {
                Ok(value) => self.page.supersample = value,
                Err(_) => warn!(value = %raw, "Ignoring non-numeric MOTORBILL_SUPERSAMPLE"),
            }
        }

        if let Some(raw) = lookup("MOTORBILL_ASSET_TIMEOUT_MS") {
            match raw.parse() {
                Ok(value) => self.export.asset_timeout_ms = value,
                Err(_) => warn!(value = %raw, "Ignoring non-numeric MOTORBILL_ASSET_TIMEOUT_MS"),
            }
        }

        if let Some(name) = lookup("MOTORBILL_WORKSHOP_NAME") {
            self.workshop.name = name;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "motorbill", "motorbill")
            .map(|dirs| dirs.config_dir().join("motorbill.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = MotorbillConfig::default();
        assert_eq!(config.page.width_px, 794);
        assert_eq!(config.page.supersample, 2);
        assert_eq!(config.export.asset_timeout_ms, 5000);
        assert_eq!(config.export.registration_placeholder, "NOREG");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_min_height_is_a4() {
        assert_eq!(PageSettings::default().min_height_px(), A4_HEIGHT_PX);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: MotorbillConfig = toml::from_str(
            r#"
            [workshop]
            name = "Sri Murugan Motors"

            [page]
            supersample = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.workshop.name, "Sri Murugan Motors");
        assert_eq!(config.workshop.tagline, WorkshopProfile::default().tagline);
        assert_eq!(config.page.supersample, 3);
        assert_eq!(config.page.width_px, 794);
        assert_eq!(config.export.asset_timeout_ms, 5000);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MOTORBILL_OUTPUT_DIR", "/tmp/quotes"),
            ("MOTORBILL_SUPERSAMPLE", "not-a-number"),
            ("MOTORBILL_ASSET_TIMEOUT_MS", "250"),
        ]
        .into_iter()
        .collect();

        let mut config = MotorbillConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.export.output_dir, PathBuf::from("/tmp/quotes"));
        assert_eq!(config.page.supersample, 2);
        assert_eq!(config.export.asset_timeout_ms, 250);
    }

    #[test]
    fn test_config_validation() {
        let mut config = MotorbillConfig::default();
        config.page.supersample = 0;
        assert!(config.validate().is_err());

        config.page.supersample = 2;
        config.page.margin_px = 400;
        assert!(config.validate().is_err());

        config.page.margin_px = u32::MAX;
        assert!(config.validate().is_err());

        config.page.margin_px = 32;
        config.export.asset_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("motorbill.toml");

        let mut config = MotorbillConfig::default();
        config.workshop.contact = "+91 422 123 4567".into();
        config.save(&path).unwrap();

        let loaded = MotorbillConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.workshop.contact, "+91 422 123 4567");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motorbill.toml");
        std::fs::write(&path, "[page\nwidth_px = ").unwrap();
        assert!(matches!(
            MotorbillConfig::load(Some(path)),
            Err(ConfigError::Parse(_))
        ));
    }
}
