//! Configuration management for rollcall.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory name under the platform config directory.
const CONFIG_DIR_NAME: &str = "rollcall";

/// Format accepted for `schedule.sweep_time`.
const SWEEP_TIME_FORMAT: &str = "%H:%M";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ROLLCALL_`, `__` separates sections)
/// 2. TOML config file at `~/.config/rollcall/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Roster configuration.
    pub roster: RosterConfig,
    /// Daily log configuration.
    pub log: LogConfig,
    /// Camera and scan loop configuration.
    pub camera: CameraConfig,
    /// Absence sweep schedule.
    pub schedule: ScheduleConfig,
    /// QR code generator configuration.
    pub codegen: CodegenConfig,
}

/// Roster-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Path to the roster CSV (`ID,Name`).
    pub path: PathBuf,
}

/// Daily log configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Directory holding `daily_attendance_<date>.csv` files.
    pub dir: PathBuf,
}

/// Camera and scan loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Index of the video device (`/dev/video<index>` on Linux).
    pub index: u32,
    /// Requested frame width.
    pub width: u32,
    /// Requested frame height.
    pub height: u32,
    /// Requested pixel format as a four character code.
    pub format: String,
    /// Pause after a failed frame read, in milliseconds.
    pub frame_retry_ms: u64,
    /// Ignore the same payload for this long after it was handled.
    pub rescan_cooldown_ms: u64,
    /// Line typed on stdin that stops scanning.
    pub quit_key: String,
    /// Where to write the latest annotated frame, if anywhere.
    pub preview_path: Option<PathBuf>,
}

/// Absence sweep schedule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Time of day (`HH:MM`, 24-hour) at which absences are marked.
    pub sweep_time: String,
    /// Scheduler polling interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Sweep immediately when started after `sweep_time`.
    pub catch_up_on_start: bool,
}

/// QR code generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    /// Directory that receives `qr_<ID>.png` files.
    pub output_dir: PathBuf,
    /// Size of one QR module in pixels.
    pub module_size: u32,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("students.csv"),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            format: "MJPG".to_string(),
            frame_retry_ms: 100,
            rescan_cooldown_ms: 3_000,
            quit_key: "q".to_string(),
            preview_path: None,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sweep_time: "09:30".to_string(),
            tick_interval_ms: 1_000,
            catch_up_on_start: false,
        }
    }
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("qr_codes"),
            module_size: 10,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("ROLLCALL_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.sweep_time()?;

        if self.schedule.tick_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "tick_interval_ms must be greater than 0".to_string(),
            });
        }

        if self.camera.frame_retry_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "frame_retry_ms must be greater than 0".to_string(),
            });
        }

        if self.camera.format.len() != 4 || !self.camera.format.is_ascii() {
            return Err(Error::ConfigValidation {
                message: format!(
                    "camera format must be a four character code, got '{}'",
                    self.camera.format
                ),
            });
        }

        if self.camera.quit_key.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "quit_key must not be empty".to_string(),
            });
        }

        if self.codegen.module_size == 0 {
            return Err(Error::ConfigValidation {
                message: "module_size must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the configured sweep time.
    ///
    /// # Errors
    ///
    /// Returns an error if `schedule.sweep_time` is not a valid `HH:MM` time.
    pub fn sweep_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.schedule.sweep_time.trim(), SWEEP_TIME_FORMAT).map_err(
            |e| Error::ConfigValidation {
                message: format!(
                    "invalid sweep_time '{}' (expected HH:MM): {e}",
                    self.schedule.sweep_time
                ),
            },
        )
    }

    /// Path to the roster file.
    #[must_use]
    pub fn roster_path(&self) -> &Path {
        &self.roster.path
    }

    /// Directory holding the daily logs.
    #[must_use]
    pub fn log_dir(&self) -> &Path {
        &self.log.dir
    }

    /// Index of the video device.
    #[must_use]
    pub fn camera_index(&self) -> u32 {
        self.camera.index
    }

    /// Get the frame retry pause as a Duration.
    #[must_use]
    pub fn frame_retry(&self) -> Duration {
        Duration::from_millis(self.camera.frame_retry_ms)
    }

    /// Get the rescan cooldown as a Duration.
    #[must_use]
    pub fn rescan_cooldown(&self) -> Duration {
        Duration::from_millis(self.camera.rescan_cooldown_ms)
    }

    /// Get the scheduler tick interval as a Duration.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.schedule.tick_interval_ms)
    }
}
