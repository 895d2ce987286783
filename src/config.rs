use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;

use serde::Deserialize;
use thiserror::Error;

use crate::asr::AsrSettings;
use crate::avatar::AvatarSettings;
use crate::llm::ChatSettings;

// ============================================================================
// Config (root)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub avatar: AvatarSettings,
    #[serde(default)]
    pub llm: ChatSettings,
    #[serde(default)]
    pub asr: AsrSettings,
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Ok(serde_saphyr::from_str(&contents)?)
    }
}

// ============================================================================
// ConfigError
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_saphyr::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.avatar.app_id.is_empty());
        assert_eq!(
            config.avatar.gateway_server,
            crate::avatar::DEFAULT_GATEWAY_SERVER
        );
        assert!(config.llm.model.is_empty());
        assert!(config.llm.base_url.is_none());
        assert_eq!(config.asr.engine, "zh_CN");
        assert_eq!(config.asr.sample_rate, 16_000);
    }

    #[tokio::test]
    async fn test_load_missing_file_returns_defaults() {
        let tmp_dir = TempDir::new().unwrap();
        let missing_path = tmp_dir.path().join("missing-config.yaml");
        let config = Config::load(missing_path.to_str().unwrap()).await.unwrap();
        assert!(config.llm.model.is_empty());
        assert_eq!(config.asr.silence_hold_secs, 2);
    }

    #[tokio::test]
    async fn test_load_valid_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
avatar:
  app_id: "app-123456789"
  app_secret: "secret-aaaaaaaaaaaaaaaaaaaa"
llm:
  model: "deepseek-chat"
  api_key: "sk-test"
  system_prompt: "be terse"
asr:
  engine: "en_US"
  sample_rate: 8000
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(config.avatar.app_id, "app-123456789");
        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.llm.system_prompt.as_deref(), Some("be terse"));
        assert_eq!(config.asr.engine, "en_US");
        assert_eq!(config.asr.sample_rate, 8000);
    }

    #[tokio::test]
    async fn test_load_partial_yaml_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
llm:
  model: "gpt-4o"
"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert!(config.llm.api_key.is_empty()); // default
        assert_eq!(config.asr.engine, "zh_CN"); // default
        assert_eq!(
            config.avatar.gateway_server,
            crate::avatar::DEFAULT_GATEWAY_SERVER
        ); // default
    }

    #[tokio::test]
    async fn test_load_invalid_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(file.path().to_str().unwrap()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_config_error_display() {
        let io_error = ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "test",
        ));
        assert!(io_error.to_string().contains("failed to read config file"));
    }
}
