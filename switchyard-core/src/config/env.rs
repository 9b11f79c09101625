//! Environment variable interpolation for configuration files

use super::error::ConfigError;
use regex::Regex;
use std::env;
use std::sync::LazyLock;

/// `${NAME}` placeholders; names are upper-case identifiers
pub(crate) static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid"));

/// Replace every `${NAME}` in `content` with the variable's value.
///
/// Fails on the first referenced variable that is not set.
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut missing = None;

    let result = ENV_VAR_PATTERN.replace_all(content, |caps: &regex::Captures<'_>| {
        match env::var(&caps[1]) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| caps[1].to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(var) => Err(ConfigError::EnvVarNotFound { var }),
        None => Ok(result.into_owned()),
    }
}

/// Names of every `${NAME}` referenced in `text`, in order of appearance
pub fn referenced_env_vars(text: &str) -> Vec<String> {
    ENV_VAR_PATTERN
        .captures_iter(text)
        .map(|cap| cap[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_env_vars() {
        env::set_var("SWITCHYARD_TEST_DEFAULT_ROUTE", "openai,gpt-4");

        let content = "default: ${SWITCHYARD_TEST_DEFAULT_ROUTE}";
        let result = interpolate_env_vars(content).unwrap();
        assert_eq!(result, "default: openai,gpt-4");

        env::remove_var("SWITCHYARD_TEST_DEFAULT_ROUTE");
    }

    #[test]
    fn test_missing_env_var() {
        let content = "default: ${SWITCHYARD_TEST_MISSING_VAR}";
        let result = interpolate_env_vars(content);

        match result {
            Err(ConfigError::EnvVarNotFound { var }) => {
                assert_eq!(var, "SWITCHYARD_TEST_MISSING_VAR")
            }
            other => panic!("Expected EnvVarNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_env_var() {
        env::set_var("SWITCHYARD_TEST_PROVIDER", "deepseek");

        let content = "a: ${SWITCHYARD_TEST_PROVIDER}, b: ${SWITCHYARD_TEST_PROVIDER}";
        let result = interpolate_env_vars(content).unwrap();
        assert_eq!(result, "a: deepseek, b: deepseek");

        env::remove_var("SWITCHYARD_TEST_PROVIDER");
    }

    #[test]
    fn test_referenced_env_vars() {
        let vars = referenced_env_vars("x: ${ONE}, y: ${TWO}, z: $THREE");
        assert_eq!(vars, vec!["ONE".to_string(), "TWO".to_string()]);
    }
}
