// Compiler configuration, loaded from TOML, JSON or the environment

use crate::logging::{LogConfig, LogFormat, LogLevel};
use crate::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

const ENV_PREFIX: &str = "ARMATURE_REST_";

/// Logging section of [`RestConfig`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    pub env_filter: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            env_filter: None,
        }
    }
}

impl LogSettings {
    pub fn to_log_config(&self) -> LogConfig {
        let config = LogConfig::new().level(self.level).format(self.format);
        match &self.env_filter {
            Some(filter) => config.with_env_filter(filter.clone()),
            None => config,
        }
    }
}

/// Settings applied by [`RouteCompiler`](crate::compiler::RouteCompiler).
///
/// ```toml
/// default_consumes = ["application/json"]
/// strict_body_arguments = false
///
/// [log]
/// level = "debug"
/// format = "pretty"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RestConfig {
    pub log: LogSettings,
    /// Used by routes that resolve no consumed content types
    pub default_consumes: Vec<String>,
    /// Used by routes that resolve no produced content types
    pub default_produces: Vec<String>,
    /// Reject unannotated parameters on GET and HEAD routes
    pub strict_body_arguments: bool,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            log: LogSettings::default(),
            default_consumes: Vec::new(),
            default_produces: Vec::new(),
            strict_body_arguments: true,
        }
    }
}

impl RestConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Config(format!("Failed to parse JSON: {}", e)))
    }

    /// Load from a `.toml` or `.json` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::Config(format!("No file extension found: {}", path.display())))?;

        let parse: fn(&str) -> Result<Self> = match ext.to_lowercase().as_str() {
            "toml" => Self::from_toml_str,
            "json" => Self::from_json_str,
            other => return Err(Error::Config(format!("Unsupported format: {}", other))),
        };

        parse(&fs::read_to_string(path)?)
    }

    /// Defaults overridden by `ARMATURE_REST_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the
    /// `ARMATURE_REST_*` variable names
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let mut config = Self::default();

        if let Some(level) = var("LOG_LEVEL") {
            config.log.level = LogLevel::from_str(&level)
                .ok_or_else(|| Error::Config(format!("Invalid log level: {}", level)))?;
        }
        if let Some(format) = var("LOG_FORMAT") {
            config.log.format = LogFormat::from_str(&format)
                .ok_or_else(|| Error::Config(format!("Invalid log format: {}", format)))?;
        }
        if let Some(types) = var("DEFAULT_CONSUMES") {
            config.default_consumes = split_list(&types);
        }
        if let Some(types) = var("DEFAULT_PRODUCES") {
            config.default_produces = split_list(&types);
        }
        if let Some(strict) = var("STRICT_BODY") {
            config.strict_body_arguments = parse_bool(&strict)?;
        }

        Ok(config)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("Invalid boolean: {}", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = RestConfig::default();
        assert!(config.strict_body_arguments);
        assert!(config.default_consumes.is_empty());
        assert_eq!(config.log.level, LogLevel::Info);
    }

    #[test]
    fn test_from_toml() {
        let config = RestConfig::from_toml_str(
            r#"
            default_produces = ["application/json"]
            strict_body_arguments = false

            [log]
            level = "debug"
            format = "compact"
            "#,
        )
        .unwrap();

        assert_eq!(config.default_produces, vec!["application/json"]);
        assert!(!config.strict_body_arguments);
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Compact);
    }

    #[test]
    fn test_from_json() {
        let config = RestConfig::from_json_str(r#"{"default_consumes": ["text/plain"]}"#).unwrap();
        assert_eq!(config.default_consumes, vec!["text/plain"]);
        assert!(config.strict_body_arguments);
    }

    #[test]
    fn test_invalid_toml() {
        let result = RestConfig::from_toml_str("strict_body_arguments = \"maybe\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("ARMATURE_REST_LOG_LEVEL", "warn"),
            ("ARMATURE_REST_DEFAULT_CONSUMES", "application/json, text/plain"),
            ("ARMATURE_REST_STRICT_BODY", "off"),
        ]
        .into_iter()
        .collect();

        let config = RestConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.log.level, LogLevel::Warn);
        assert_eq!(config.default_consumes, vec!["application/json", "text/plain"]);
        assert!(!config.strict_body_arguments);
        assert!(config.default_produces.is_empty());
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let result = RestConfig::from_lookup(|name| {
            (name == "ARMATURE_REST_STRICT_BODY").then(|| "sometimes".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_unsupported_extension() {
        let result = RestConfig::load("rest.yaml");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
