//! Configuration module for the AIUI session client
//!
//! This module loads client configuration from .env files, YAML files and
//! environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Example
//! ```rust,no_run
//! use aiui_session::config::ClientConfig;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ClientConfig::from_env()?;
//!
//! // Load from YAML file with environment variables as the base
//! let config = ClientConfig::from_file(Path::new("aiui.yaml"))?;
//!
//! println!("Connecting to {}", config.base_url);
//! # Ok(())
//! # }
//! ```

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::core::aiui::{
    AIUI_V3_URL, AiuiConfig, AiuiCredentials, DEFAULT_FRAME_INTERVAL, DEFAULT_FRAME_SIZE,
    DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_SCENE, DEFAULT_SN, DEFAULT_VCN,
};

mod yaml;

pub use yaml::YamlConfig;

/// Text sent when no text is configured.
pub const DEFAULT_TEXT: &str = "你是谁";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// What a session uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    #[default]
    Text,
    Audio,
}

impl FromStr for DataMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(DataMode::Text),
            "audio" => Ok(DataMode::Audio),
            _ => Err(ConfigError::InvalidValue {
                key: "AIUI_DATA_MODE".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataMode::Text => write!(f, "text"),
            DataMode::Audio => write!(f, "audio"),
        }
    }
}

/// Client configuration
///
/// Everything needed to run one session from the command line: endpoint,
/// credentials, session header values, the upload and the output location.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub credentials: AiuiCredentials,

    // Session header values
    pub sn: String,
    pub scene: String,
    pub vcn: String,

    // Upload
    pub data_mode: DataMode,
    pub text: String,
    pub audio_path: Option<PathBuf>,
    pub frame_size: usize,
    pub frame_interval: Duration,

    // Connection limits
    pub handshake_timeout: Duration,
    pub idle_timeout: Option<Duration>,

    /// Directory receiving synthesized audio
    pub output_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: AIUI_V3_URL.to_string(),
            credentials: AiuiCredentials::default(),
            sn: DEFAULT_SN.to_string(),
            scene: DEFAULT_SCENE.to_string(),
            vcn: DEFAULT_VCN.to_string(),
            data_mode: DataMode::Text,
            text: DEFAULT_TEXT.to_string(),
            audio_path: None,
            frame_size: DEFAULT_FRAME_SIZE,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            idle_timeout: None,
            output_dir: PathBuf::from("."),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// The .env file is loaded in main.rs, so its values are visible here as
    /// ordinary environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file on top of the environment.
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;

        let mut config = Self::default();
        config.apply_env()?;
        config.apply_yaml(yaml_config);
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_var("AIUI_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = env_var("AIUI_APP_ID") {
            self.credentials.app_id = v;
        }
        if let Some(v) = env_var("AIUI_API_KEY") {
            self.credentials.api_key = v;
        }
        if let Some(v) = env_var("AIUI_API_SECRET") {
            self.credentials.api_secret = v;
        }
        if let Some(v) = env_var("AIUI_SN") {
            self.sn = v;
        }
        if let Some(v) = env_var("AIUI_SCENE") {
            self.scene = v;
        }
        if let Some(v) = env_var("AIUI_VCN") {
            self.vcn = v;
        }
        if let Some(v) = env_parse::<DataMode>("AIUI_DATA_MODE")? {
            self.data_mode = v;
        }
        if let Some(v) = env_var("AIUI_TEXT") {
            self.text = v;
        }
        if let Some(v) = env_var("AIUI_AUDIO_PATH") {
            self.audio_path = Some(PathBuf::from(v));
        }
        if let Some(v) = env_parse::<usize>("AIUI_FRAME_SIZE")? {
            self.frame_size = v;
        }
        if let Some(v) = env_parse::<u64>("AIUI_FRAME_INTERVAL_MS")? {
            self.frame_interval = Duration::from_millis(v);
        }
        if let Some(v) = env_parse::<u64>("AIUI_HANDSHAKE_TIMEOUT_SECS")? {
            self.handshake_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_parse::<u64>("AIUI_IDLE_TIMEOUT_SECS")? {
            self.idle_timeout = Some(Duration::from_secs(v));
        }
        if let Some(v) = env_var("AIUI_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        Ok(())
    }

    fn apply_yaml(&mut self, yaml: YamlConfig) {
        if let Some(service) = yaml.service {
            if let Some(v) = service.base_url {
                self.base_url = v;
            }
            if let Some(v) = service.handshake_timeout_secs {
                self.handshake_timeout = Duration::from_secs(v);
            }
            if let Some(v) = service.idle_timeout_secs {
                self.idle_timeout = Some(Duration::from_secs(v));
            }
        }

        if let Some(credentials) = yaml.credentials {
            if let Some(v) = credentials.app_id {
                self.credentials.app_id = v;
            }
            if let Some(v) = credentials.api_key {
                self.credentials.api_key = v;
            }
            if let Some(v) = credentials.api_secret {
                self.credentials.api_secret = v;
            }
        }

        if let Some(session) = yaml.session {
            if let Some(v) = session.sn {
                self.sn = v;
            }
            if let Some(v) = session.scene {
                self.scene = v;
            }
            if let Some(v) = session.vcn {
                self.vcn = v;
            }
        }

        if let Some(request) = yaml.request {
            if let Some(v) = request.data_mode {
                self.data_mode = v;
            }
            if let Some(v) = request.text {
                self.text = v;
            }
            if let Some(v) = request.audio_path {
                self.audio_path = Some(PathBuf::from(v));
            }
            if let Some(v) = request.frame_size {
                self.frame_size = v;
            }
            if let Some(v) = request.frame_interval_ms {
                self.frame_interval = Duration::from_millis(v);
            }
        }

        if let Some(v) = yaml.output.and_then(|o| o.dir) {
            self.output_dir = PathBuf::from(v);
        }
    }

    /// Check the loaded values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "frame_size".to_string(),
                value: "0".to_string(),
            });
        }
        if self.idle_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidValue {
                key: "idle_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Check that the selected upload can be built.
    ///
    /// Run after command line overrides have been applied.
    pub fn validate_request(&self) -> Result<(), ConfigError> {
        if self.data_mode == DataMode::Audio && self.audio_path.is_none() {
            return Err(ConfigError::Invalid(
                "audio mode requires AIUI_AUDIO_PATH or request.audio_path".to_string(),
            ));
        }
        Ok(())
    }

    /// Session configuration for the core client.
    pub fn aiui_config(&self) -> AiuiConfig {
        AiuiConfig::new(self.credentials.clone())
            .with_base_url(self.base_url.clone())
            .with_sn(self.sn.clone())
            .with_scene(self.scene.clone())
            .with_vcn(self.vcn.clone())
            .with_frame_size(self.frame_size)
            .with_frame_interval(self.frame_interval)
            .with_handshake_timeout(self.handshake_timeout)
            .with_idle_timeout(self.idle_timeout)
    }
}

/// Read a non-empty environment variable.
fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse an environment variable.
fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env_var(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        None => Ok(None),
    }
}
