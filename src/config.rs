//! Monitor configuration.
//!
//! Read from an optional JSON file (every field optional),
//! then overridden from the environment:
//!
//! | variable | field |
//! |---|---|
//! | `THERMAL_CONFIG` | path of the config file |
//! | `THERMAL_REGIONS_PATH` | `regions_path` |
//! | `THERMAL_PROFILE` | `profile` (name or `<scale>/<offset>`) |
//! | `THERMAL_DEFAULT_SLOT` | `default_slot` |

use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use serde_derive::*;

use crate::{
    frame::{DEFAULT_HEIGHT, DEFAULT_WIDTH},
    region::DEFAULT_SLOT,
    temperature::CalibrationProfile,
};

const DEFAULT_REGIONS_PATH: &str = "thermal_regions.json";
const DEFAULT_SLOT_KEYS: &str = "1234";

#[derive(Debug, Deserialize, Default)]
struct MonitorConfigFile {
    regions_path: Option<PathBuf>,
    #[serde(default, deserialize_with = "crate::temperature::serde_helpers::profile_name")]
    profile: Option<CalibrationProfile>,
    default_slot: Option<String>,
    slot_keys: Option<String>,
    frame: Option<FrameConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct FrameConfigFile {
    width: Option<usize>,
    height: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub regions_path: PathBuf,
    pub profile: CalibrationProfile,
    pub default_slot: String,
    /// Keys that select a slot, one character per slot.
    pub slot_keys: String,
    pub frame_width: usize,
    /// Total height of a raw frame (both halves).
    pub frame_height: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::from_file(MonitorConfigFile::default())
    }
}

impl MonitorConfig {
    /// Loads the config file at `path`, or at
    /// `$THERMAL_CONFIG` when `path` is `None`, applies the
    /// environment overrides and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_owned)
            .or_else(|| std::env::var_os("THERMAL_CONFIG").map(PathBuf::from));
        let file = match path {
            Some(path) => read_config_file(&path)?,
            None => MonitorConfigFile::default(),
        };
        let mut cfg = Self::from_file(file);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MonitorConfigFile) -> Self {
        let frame = file.frame.unwrap_or_default();
        MonitorConfig {
            regions_path: file
                .regions_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REGIONS_PATH)),
            profile: file.profile.unwrap_or_default(),
            default_slot: file
                .default_slot
                .unwrap_or_else(|| DEFAULT_SLOT.to_string()),
            slot_keys: file
                .slot_keys
                .unwrap_or_else(|| DEFAULT_SLOT_KEYS.to_string()),
            frame_width: frame.width.unwrap_or(DEFAULT_WIDTH),
            frame_height: frame.height.unwrap_or(DEFAULT_HEIGHT),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("THERMAL_REGIONS_PATH") {
            if !path.trim().is_empty() {
                self.regions_path = PathBuf::from(path);
            }
        }
        if let Ok(profile) = std::env::var("THERMAL_PROFILE") {
            if !profile.trim().is_empty() {
                self.profile = profile
                    .parse::<CalibrationProfile>()
                    .context("invalid THERMAL_PROFILE")?;
            }
        }
        if let Ok(slot) = std::env::var("THERMAL_DEFAULT_SLOT") {
            if !slot.trim().is_empty() {
                self.default_slot = slot.trim().to_string();
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.slot_keys.is_empty(), "slot_keys must not be empty");
        let mut slot = self.default_slot.chars();
        match (slot.next(), slot.next()) {
            (Some(key), None) if self.slot_keys.contains(key) => (),
            _ => bail!(
                "default_slot `{}` must be one of the slot keys `{}`",
                self.default_slot,
                self.slot_keys
            ),
        }
        ensure!(
            self.frame_width > 0 && self.frame_height > 0,
            "frame dimensions must be positive, got {}x{}",
            self.frame_width,
            self.frame_height
        );
        ensure!(
            self.frame_height % 2 == 0,
            "frame height must be even, got {}",
            self.frame_height
        );
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<MonitorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let cfg = serde_json::from_str(&raw)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(cfg)
}
