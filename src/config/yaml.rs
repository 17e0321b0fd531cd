use serde::Deserialize;
use std::path::Path;

use super::{ConfigError, DataMode};

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values found here
/// override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// service:
///   base_url: "wss://aiui.xf-yun.com/v3/aiint/sos"
///   handshake_timeout_secs: 5
///   idle_timeout_secs: 30
///
/// credentials:
///   app_id: "your-app-id"
///   api_key: "your-api-key"
///   api_secret: "your-api-secret"
///
/// session:
///   sn: "device-001"
///   scene: "main_box"
///   vcn: "x5_lingxiaoyue_flow"
///
/// request:
///   data_mode: "audio"
///   text: "你是谁"
///   audio_path: "./input.pcm"
///   frame_size: 1280
///   frame_interval_ms: 40
///
/// output:
///   dir: "./out"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub service: Option<ServiceYaml>,
    pub credentials: Option<CredentialsYaml>,
    pub session: Option<SessionYaml>,
    pub request: Option<RequestYaml>,
    pub output: Option<OutputYaml>,
}

/// Service endpoint and connection limits from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServiceYaml {
    pub base_url: Option<String>,
    pub handshake_timeout_secs: Option<u64>,
    /// Per-frame receive timeout; unset waits forever
    pub idle_timeout_secs: Option<u64>,
}

/// Application credentials from YAML
#[derive(Clone, Deserialize, Default)]
#[serde(default)]
pub struct CredentialsYaml {
    pub app_id: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

impl std::fmt::Debug for CredentialsYaml {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsYaml")
            .field("app_id", &self.app_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Session header values from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionYaml {
    pub sn: Option<String>,
    pub scene: Option<String>,
    pub vcn: Option<String>,
}

/// Upload settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RequestYaml {
    pub data_mode: Option<DataMode>,
    pub text: Option<String>,
    pub audio_path: Option<String>,
    pub frame_size: Option<usize>,
    pub frame_interval_ms: Option<u64>,
}

/// Output settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OutputYaml {
    /// Directory receiving `<sid>.<ext>` audio files
    pub dir: Option<String>,
}

impl YamlConfig {
    /// Load and parse a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: YamlConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
service:
  base_url: "ws://127.0.0.1:9000/v3/aiint/sos"
  handshake_timeout_secs: 3
  idle_timeout_secs: 30

credentials:
  app_id: "app"
  api_key: "key"
  api_secret: "secret"

session:
  sn: "device-001"
  scene: "IFLYTEK.test"
  vcn: "x4_yezi"

request:
  data_mode: "audio"
  text: "明天天气"
  audio_path: "/tmp/in.pcm"
  frame_size: 640
  frame_interval_ms: 20

output:
  dir: "/tmp/out"
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let service = config.service.unwrap();
        assert_eq!(
            service.base_url,
            Some("ws://127.0.0.1:9000/v3/aiint/sos".to_string())
        );
        assert_eq!(service.handshake_timeout_secs, Some(3));
        assert_eq!(service.idle_timeout_secs, Some(30));

        let credentials = config.credentials.unwrap();
        assert_eq!(credentials.app_id, Some("app".to_string()));
        assert_eq!(credentials.api_secret, Some("secret".to_string()));

        let session = config.session.unwrap();
        assert_eq!(session.sn, Some("device-001".to_string()));
        assert_eq!(session.scene, Some("IFLYTEK.test".to_string()));
        assert_eq!(session.vcn, Some("x4_yezi".to_string()));

        let request = config.request.unwrap();
        assert_eq!(request.data_mode, Some(DataMode::Audio));
        assert_eq!(request.text, Some("明天天气".to_string()));
        assert_eq!(request.audio_path, Some("/tmp/in.pcm".to_string()));
        assert_eq!(request.frame_size, Some(640));
        assert_eq!(request.frame_interval_ms, Some(20));

        assert_eq!(config.output.unwrap().dir, Some("/tmp/out".to_string()));
    }

    #[test]
    fn test_yaml_config_partial() {
        let yaml = r#"
session:
  scene: "main_box"
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.service.is_none());
        assert!(config.credentials.is_none());
        assert_eq!(config.session.unwrap().scene, Some("main_box".to_string()));
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.request.is_none());
        assert!(config.output.is_none());
    }

    #[test]
    fn test_yaml_rejects_unknown_mode() {
        let result: Result<YamlConfig, _> = serde_yaml::from_str("request:\n  data_mode: video\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let yaml = "credentials:\n  app_id: app\n  api_key: k-9876\n  api_secret: top-secret\n";
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        let rendered = format!("{:?}", config.credentials.unwrap());
        assert!(!rendered.contains("k-9876"));
        assert!(!rendered.contains("top-secret"));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "output:\n  dir: \"/tmp/audio\"\n").unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();
        assert_eq!(config.output.unwrap().dir, Some("/tmp/audio".to_string()));
    }

    #[test]
    fn test_from_file_missing() {
        let result = YamlConfig::from_file(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_from_file_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");
        fs::write(&config_path, "invalid: yaml: [content").unwrap();

        let result = YamlConfig::from_file(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
