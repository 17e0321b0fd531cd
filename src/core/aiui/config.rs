//! AIUI session configuration.
//!
//! This module defines the immutable configuration value consumed by the
//! signer, frame builder and send driver. It is constructed once, validated,
//! and then shared read-only by every part of a session.

use std::fmt;
use std::time::Duration;

use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::base::{AiuiError, AiuiResult};

// =============================================================================
// Constants
// =============================================================================

/// Default AIUI v3 WebSocket endpoint.
pub const AIUI_V3_URL: &str = "wss://aiui.xf-yun.com/v3/aiint/sos";

/// Default device serial number.
pub const DEFAULT_SN: &str = "test-sn";

/// Default scene.
pub const DEFAULT_SCENE: &str = "main_box";

/// Default TTS voice.
pub const DEFAULT_VCN: &str = "x5_lingxiaoyue_flow";

/// Default audio chunk size: 40 ms of 16 kHz 16-bit mono PCM.
pub const DEFAULT_FRAME_SIZE: usize = 1280;

/// Default pacing interval between audio chunks.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(40);

/// Default WebSocket handshake timeout.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Credentials
// =============================================================================

/// Long-lived application credentials.
///
/// Secret material is wiped from memory when the value is dropped and never
/// shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AiuiCredentials {
    /// Application id
    pub app_id: String,
    /// API key
    pub api_key: String,
    /// API secret used to sign the handshake
    pub api_secret: String,
}

impl AiuiCredentials {
    pub fn new(
        app_id: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }
}

impl fmt::Debug for AiuiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiuiCredentials")
            .field("app_id", &self.app_id)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Session Configuration
// =============================================================================

/// Configuration for a single AIUI session.
#[derive(Debug, Clone)]
pub struct AiuiConfig {
    /// WebSocket endpoint (without authorization query)
    pub base_url: String,

    /// Application credentials
    pub credentials: AiuiCredentials,

    /// Device serial number / stream id (`sn`)
    pub sn: String,

    /// Target scene
    pub scene: String,

    /// TTS voice identifier (`vcn`)
    pub vcn: String,

    /// Audio chunk size in bytes
    pub frame_size: usize,

    /// Pause after each audio chunk
    pub frame_interval: Duration,

    /// Upper bound for the WebSocket upgrade
    pub handshake_timeout: Duration,

    /// Maximum wait for a single inbound frame; `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

impl Default for AiuiConfig {
    fn default() -> Self {
        Self {
            base_url: AIUI_V3_URL.to_string(),
            credentials: AiuiCredentials::default(),
            sn: DEFAULT_SN.to_string(),
            scene: DEFAULT_SCENE.to_string(),
            vcn: DEFAULT_VCN.to_string(),
            frame_size: DEFAULT_FRAME_SIZE,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            idle_timeout: None,
        }
    }
}

impl AiuiConfig {
    /// Create a configuration with default session parameters.
    pub fn new(credentials: AiuiCredentials) -> Self {
        Self {
            credentials,
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_sn(mut self, sn: impl Into<String>) -> Self {
        self.sn = sn.into();
        self
    }

    pub fn with_scene(mut self, scene: impl Into<String>) -> Self {
        self.scene = scene.into();
        self
    }

    pub fn with_vcn(mut self, vcn: impl Into<String>) -> Self {
        self.vcn = vcn.into();
        self
    }

    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Validate the configuration before a session is started.
    pub fn validate(&self) -> AiuiResult<()> {
        if self.credentials.app_id.is_empty() {
            return Err(AiuiError::InvalidConfiguration(
                "app_id is required".to_string(),
            ));
        }
        if self.credentials.api_key.is_empty() || self.credentials.api_secret.is_empty() {
            return Err(AiuiError::InvalidConfiguration(
                "api_key and api_secret are required".to_string(),
            ));
        }

        let url = Url::parse(&self.base_url).map_err(|e| {
            AiuiError::InvalidConfiguration(format!("invalid base_url '{}': {e}", self.base_url))
        })?;
        if url.scheme() != "wss" && url.scheme() != "ws" {
            return Err(AiuiError::InvalidConfiguration(format!(
                "base_url must use ws:// or wss://, got {}://",
                url.scheme()
            )));
        }

        if self.frame_size == 0 {
            return Err(AiuiError::InvalidConfiguration(
                "frame_size must be greater than zero".to_string(),
            ));
        }
        if self.idle_timeout == Some(Duration::ZERO) {
            return Err(AiuiError::InvalidConfiguration(
                "idle_timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> AiuiCredentials {
        AiuiCredentials::new("appid", "key", "secret")
    }

    #[test]
    fn test_default_config() {
        let config = AiuiConfig::default();
        assert_eq!(config.base_url, AIUI_V3_URL);
        assert_eq!(config.sn, "test-sn");
        assert_eq!(config.scene, "main_box");
        assert_eq!(config.vcn, "x5_lingxiaoyue_flow");
        assert_eq!(config.frame_size, 1280);
        assert_eq!(config.frame_interval, Duration::from_millis(40));
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert!(config.idle_timeout.is_none());
    }

    #[test]
    fn test_validate_ok() {
        assert!(AiuiConfig::new(credentials()).validate().is_ok());
    }

    #[test]
    fn test_validate_missing_credentials() {
        let config = AiuiConfig::default();
        match config.validate() {
            Err(AiuiError::InvalidConfiguration(msg)) => assert!(msg.contains("app_id")),
            other => panic!("Expected InvalidConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_http_scheme() {
        let config = AiuiConfig::new(credentials()).with_base_url("https://aiui.xf-yun.com/v3");
        assert!(matches!(
            config.validate(),
            Err(AiuiError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_frame_size() {
        let config = AiuiConfig::new(credentials()).with_frame_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_idle_timeout() {
        let config = AiuiConfig::new(credentials()).with_idle_timeout(Some(Duration::ZERO));
        assert!(matches!(
            config.validate(),
            Err(AiuiError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let creds = AiuiCredentials::new("appid", "key-1234", "s3cr3t-value");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("appid"));
        assert!(!rendered.contains("key-1234"));
        assert!(!rendered.contains("s3cr3t-value"));
    }
}
