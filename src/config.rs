//! Configuration management
//!
//! Service endpoints, capture hints, perception backend, polling cadence and
//! the practice confidence threshold, stored as TOML in the platform config
//! directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::capture::device::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::capture::synthetic::DEFAULT_FRAME_RATE;
use crate::capture::{CaptureConstraints, FacingMode};
use crate::inference::DEFAULT_POLL_INTERVAL_MS;
use crate::perception::DEFAULT_FRAME_INTERVAL_MS;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Recognition and policy service endpoints
    #[serde(default)]
    pub server: ServerConfig,
    /// Camera request hints
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Landmark model selection
    #[serde(default)]
    pub perception: PerceptionConfig,
    /// Recognition polling
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub practice: PracticeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL serving `/api/verify-sign`
    #[serde(default = "default_service_url")]
    pub recognition_url: String,
    /// Base URL serving `/alphabet/next` and `/alphabet/feedback`
    #[serde(default = "default_service_url")]
    pub policy_url: String,
    /// Upper bound on every request to either service
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_service_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            recognition_url: default_service_url(),
            policy_url: default_service_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub facing_mode: FacingMode,
    /// Mirror the preview (display only)
    #[serde(default = "default_true")]
    pub mirrored: bool,
    /// Frame rate of the synthetic camera
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

fn default_true() -> bool {
    true
}

fn default_frame_rate() -> u32 {
    DEFAULT_FRAME_RATE
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            facing_mode: FacingMode::default(),
            mirrored: default_true(),
            frame_rate: default_frame_rate(),
        }
    }
}

impl CaptureConfig {
    pub fn constraints(&self) -> CaptureConstraints {
        CaptureConstraints {
            width: self.width,
            height: self.height,
            facing_mode: self.facing_mode,
            mirrored: self.mirrored,
        }
    }
}

/// Where landmarks come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerceptionBackend {
    /// JSON Lines landmark recording
    #[default]
    Replay,
    /// ONNX hand landmark model (needs the `onnx` feature)
    Onnx,
}

impl fmt::Display for PerceptionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerceptionBackend::Replay => write!(f, "replay"),
            PerceptionBackend::Onnx => write!(f, "onnx"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceptionConfig {
    #[serde(default)]
    pub backend: PerceptionBackend,
    /// Model asset (recording or `.onnx` file)
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: u64,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("assets/hand_landmarks.jsonl")
}

fn default_frame_interval() -> u64 {
    DEFAULT_FRAME_INTERVAL_MS
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            backend: PerceptionBackend::default(),
            model_path: default_model_path(),
            frame_interval_ms: default_frame_interval(),
        }
    }
}

impl PerceptionConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Milliseconds between recognition requests; 0 disables polling
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Send the current target as the `expected` hint
    #[serde(default = "default_true")]
    pub send_expected_hint: bool,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            send_expected_hint: default_true(),
        }
    }
}

impl InferenceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeConfig {
    /// A prediction counts only above this confidence (0-100)
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

fn default_confidence_threshold() -> f32 {
    crate::practice::DEFAULT_CONFIDENCE_THRESHOLD
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

/// Keys accepted by [`Config::set`]
pub const SETTABLE_KEYS: &[&str] = &[
    "server.recognition_url",
    "server.policy_url",
    "server.request_timeout_secs",
    "capture.width",
    "capture.height",
    "capture.facing_mode",
    "capture.mirrored",
    "capture.frame_rate",
    "perception.backend",
    "perception.model_path",
    "perception.frame_interval_ms",
    "inference.poll_interval_ms",
    "inference.send_expected_hint",
    "practice.confidence_threshold",
];

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value '{}' for {}", value, key))
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .context("Failed to read config file")?;
            let config: Config = toml::from_str(&contents)
                .context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent()
            .context("Config path has no parent")?;

        std::fs::create_dir_all(parent)
            .context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Set a single `section.key` value from its string form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "server.recognition_url" => self.server.recognition_url = value.trim().to_string(),
            "server.policy_url" => self.server.policy_url = value.trim().to_string(),
            "server.request_timeout_secs" => self.server.request_timeout_secs = parse(key, value)?,
            "capture.width" => self.capture.width = parse(key, value)?,
            "capture.height" => self.capture.height = parse(key, value)?,
            "capture.facing_mode" => {
                self.capture.facing_mode = match value.trim().to_lowercase().as_str() {
                    "user" => FacingMode::User,
                    "environment" => FacingMode::Environment,
                    other => anyhow::bail!("Invalid facing mode '{}': expected user or environment", other),
                }
            }
            "capture.mirrored" => self.capture.mirrored = parse(key, value)?,
            "capture.frame_rate" => self.capture.frame_rate = parse(key, value)?,
            "perception.backend" => {
                self.perception.backend = match value.trim().to_lowercase().as_str() {
                    "replay" => PerceptionBackend::Replay,
                    "onnx" => PerceptionBackend::Onnx,
                    other => anyhow::bail!("Invalid backend '{}': expected replay or onnx", other),
                }
            }
            "perception.model_path" => self.perception.model_path = PathBuf::from(value.trim()),
            "perception.frame_interval_ms" => self.perception.frame_interval_ms = parse(key, value)?,
            "inference.poll_interval_ms" => self.inference.poll_interval_ms = parse(key, value)?,
            "inference.send_expected_hint" => self.inference.send_expected_hint = parse(key, value)?,
            "practice.confidence_threshold" => {
                let threshold: f32 = parse(key, value)?;
                if !(0.0..=100.0).contains(&threshold) {
                    anyhow::bail!("Confidence threshold must be between 0 and 100");
                }
                self.practice.confidence_threshold = threshold;
            }
            _ => anyhow::bail!("Unknown key '{}'. Available keys: {}", key, SETTABLE_KEYS.join(", ")),
        }
        Ok(())
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "hands-in", "hands-in")
        .context("Failed to get project directories")
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}

/// Show current configuration
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Configuration ({})", config_path()?.display());
    println!();
    println!("Services:");
    println!("  recognition:     {}", config.server.recognition_url);
    println!("  policy:          {}", config.server.policy_url);
    println!("  timeout:         {}s", config.server.request_timeout_secs);
    println!("Capture:");
    println!("  resolution:      {}x{}", config.capture.width, config.capture.height);
    println!("  facing mode:     {:?}", config.capture.facing_mode);
    println!("  mirrored:        {}", config.capture.mirrored);
    println!("  frame rate:      {} fps", config.capture.frame_rate);
    println!("Perception:");
    println!("  backend:         {}", config.perception.backend);
    println!("  model:           {}", config.perception.model_path.display());
    println!("  frame interval:  {} ms", config.perception.frame_interval_ms);
    println!("Inference:");
    if config.inference.poll_interval_ms == 0 {
        println!("  polling:         disabled");
    } else {
        println!("  polling:         every {} ms", config.inference.poll_interval_ms);
    }
    println!("  expected hint:   {}", config.inference.send_expected_hint);
    println!("Practice:");
    println!("  confidence:      > {}", config.practice.confidence_threshold);

    println!("\nUse 'hands-in config --set <key> <value>' to change a value");
    println!("   Available keys: {}", SETTABLE_KEYS.join(", "));

    Ok(())
}

/// Set one value and persist it
pub fn set_value(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;
    println!("{} set to {}", key, value);
    Ok(())
}

/// Reset configuration to defaults
pub fn reset_config() -> Result<()> {
    let config = Config::default();
    config.save()?;
    println!("Configuration reset to defaults.");
    Ok(())
}
