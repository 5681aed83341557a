//! `gmpricing.toml`: OCR settings, engine order and output defaults.
//!
//! Looked up at `--config` when given, otherwise in the platform config
//! directory. A missing default file means built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use gmpricing_import::DEFAULT_ORDER;
use serde::{Deserialize, Serialize};

use crate::cli::OutputFormat;

pub const CONFIG_FILE: &str = "gmpricing.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ocr: OcrConfig,
    pub extraction: ExtractionConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub enabled: bool,
    pub language: String,
    /// Tesseract page segmentation mode.
    pub psm: u8,
    /// Render resolution for scanned PDFs.
    pub dpi: u32,
    /// Tessdata directory for the in-process backend.
    pub data_path: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self { enabled: true, language: "eng".into(), psm: 6, dpi: 300, data_path: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Engine priority order; earlier engines win ties.
    pub engines: Vec<String>,
    pub disabled: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self { engines: DEFAULT_ORDER.iter().map(|s| s.to_string()).collect(), disabled: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { directory: PathBuf::from("output"), format: OutputFormat::Table }
    }
}

impl Config {
    /// Explicit path must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ocr.language.trim().is_empty() {
            bail!("ocr.language must not be empty");
        }
        if self.ocr.psm > 13 {
            bail!("ocr.psm must be between 0 and 13, got {}", self.ocr.psm);
        }
        if !(72..=1200).contains(&self.ocr.dpi) {
            bail!("ocr.dpi must be between 72 and 1200, got {}", self.ocr.dpi);
        }
        for name in self.extraction.engines.iter().chain(&self.extraction.disabled) {
            if !DEFAULT_ORDER.contains(&name.as_str()) {
                bail!("unknown extraction engine '{name}' (known: {})", DEFAULT_ORDER.join(", "));
            }
        }
        Ok(())
    }
}

pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("ae", "gmpricing", "gmpricing")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}
