//! Configuration for Switchyard
//!
//! A single YAML or JSON document declares the providers (with their
//! transformer chains), the scenario routing table, the state document
//! location and log output. `${VAR}` placeholders are replaced from the
//! environment before parsing, and the result is validated before use.
//!
//! ```yaml
//! version: "0.1"
//! providers:
//!   - name: deepseek
//!     models: [deepseek-chat, deepseek-reasoner]
//!     transformers:
//!       - [maxtoken, { max_tokens: 8192 }]
//!     model_transformers:
//!       deepseek-reasoner: [deepseek-thinking]
//! router:
//!   default: deepseek,deepseek-chat
//!   think: deepseek,deepseek-reasoner
//!   longContextThreshold: 60000
//! state:
//!   path: ${HOME}/.switchyard/routing-state.json
//! ```

mod env;
mod error;
mod schema;
mod validator;

pub use env::{interpolate_env_vars, referenced_env_vars};
pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{
    ClassifierConfig, LoggingConfig, ProviderConfig, RoutingConfig, StateConfig, SwitchyardConfig,
    TransformerSpec, STATE_PATH_ENV,
};
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;
use tracing::debug;

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Pick a format from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<SwitchyardConfig> {
    load_file(path.as_ref(), ConfigFormat::Yaml, &ConfigValidator::new())
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<SwitchyardConfig> {
    load_file(path.as_ref(), ConfigFormat::Json, &ConfigValidator::new())
}

/// Load a configuration, choosing the format by extension
pub fn load_from_path<P: AsRef<Path>>(path: P) -> ConfigResult<SwitchyardConfig> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
        path: path.to_string_lossy().to_string(),
    })?;
    load_file(path, format, &ConfigValidator::new())
}

/// Load a file with a caller-supplied validator (custom transformer registry)
pub fn load_with_validator<P: AsRef<Path>>(
    path: P,
    validator: &ConfigValidator,
) -> ConfigResult<SwitchyardConfig> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
        path: path.to_string_lossy().to_string(),
    })?;
    load_file(path, format, validator)
}

/// Parse and validate configuration text. `origin` names the source in errors.
pub fn load_from_str(
    content: &str,
    format: ConfigFormat,
    origin: &str,
    validator: &ConfigValidator,
) -> ConfigResult<SwitchyardConfig> {
    // Interpolate environment variables before parsing
    let interpolated = interpolate_env_vars(content)?;

    let config: SwitchyardConfig = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: origin.to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?,
        ConfigFormat::Json => serde_json::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: origin.to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?,
    };

    validator.validate(&config)?;
    debug!(
        origin,
        providers = config.providers.len(),
        "Configuration loaded"
    );
    Ok(config)
}

fn load_file(path: &Path, format: ConfigFormat, validator: &ConfigValidator) -> ConfigResult<SwitchyardConfig> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    load_from_str(&content, format, &path.to_string_lossy(), validator)
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
version: "0.1"
providers:
  - name: openai
    models: [gpt-4, gpt-4-128k]
  - name: deepseek
    models: [deepseek-chat, deepseek-reasoner]
    transformers:
      - [maxtoken, { max_tokens: 8192 }]
    model_transformers:
      deepseek-reasoner: [deepseek-thinking]
router:
  default: openai,gpt-4
  longContext: openai,gpt-4-128k
  think: deepseek,deepseek-reasoner
  longContextThreshold: 60000
"#;

    fn parse(content: &str, format: ConfigFormat) -> ConfigResult<SwitchyardConfig> {
        load_from_str(content, format, "inline", &ConfigValidator::new())
    }

    #[test]
    fn test_load_valid_yaml() {
        let config = parse(YAML, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.router.long_context.as_deref(), Some("openai,gpt-4-128k"));
        assert_eq!(config.providers[1].transformers[0].name(), "maxtoken");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_unknown_scenario_key_rejected() {
        let yaml = YAML.replace("  think:", "  thinking:");
        match parse(&yaml, ConfigFormat::Yaml) {
            Err(ConfigError::ParseError { message, .. }) => assert!(message.contains("thinking")),
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_json_parse_error_has_position() {
        match parse("{\n  \"version\": \"0.1\",\n  oops\n}", ConfigFormat::Json) {
            Err(ConfigError::ParseError { line, column, .. }) => {
                assert_eq!(line, Some(3));
                assert!(column.is_some());
            }
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path(Path::new("a.YAML")), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), None);
    }
}
