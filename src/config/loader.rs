//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::observability::Level;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {key}: {message}")]
    Env { key: &'static str, message: String },
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: defaults, then the optional TOML file, then process environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides read through `lookup`.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup("BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(port) = lookup("PORT") {
        let port: u16 = port.trim().parse().map_err(|_| ConfigError::Env {
            key: "PORT",
            message: format!("`{port}` is not a port number"),
        })?;
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{host}:{port}");
    }

    if let Some(name) = lookup("OTEL_SERVICE_NAME").or_else(|| lookup("SERVICE_NAME")) {
        config.service.name = name;
    }

    if let Some(endpoint) = lookup("LOG_SINK_ENDPOINT") {
        config.log_sink.endpoint = Some(endpoint);
    }
    if let Some(token) = lookup("LOG_SINK_TOKEN") {
        config.log_sink.token = Some(token);
    }

    if let Some(endpoint) = lookup("OTEL_EXPORTER_OTLP_ENDPOINT") {
        config.tracing.otlp_endpoint = Some(endpoint);
    }

    if let Some(format) = lookup("LOG_FORMAT") {
        config.observability.log_format = format.parse().map_err(|message| ConfigError::Env {
            key: "LOG_FORMAT",
            message,
        })?;
    }
    if let Some(level) = lookup("EVENT_LEVEL") {
        config.observability.event_level = level
            .parse::<Level>()
            .map_err(|e| ConfigError::Env {
                key: "EVENT_LEVEL",
                message: e.to_string(),
            })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("PORT", "8088"),
                ("SERVICE_NAME", "demo-api"),
                ("LOG_SINK_ENDPOINT", "https://in.logs.example.com"),
                ("LOG_SINK_TOKEN", "t0k3n"),
                ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector:4318"),
                ("LOG_FORMAT", "json"),
                ("EVENT_LEVEL", "warn"),
            ]),
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:8088");
        assert_eq!(config.service.name, "demo-api");
        assert_eq!(config.log_sink.endpoint.as_deref(), Some("https://in.logs.example.com"));
        assert_eq!(config.log_sink.token.as_deref(), Some("t0k3n"));
        assert_eq!(config.tracing.otlp_endpoint.as_deref(), Some("http://collector:4318"));
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.event_level, Level::Warn);
    }

    #[test]
    fn otel_service_name_wins() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[("SERVICE_NAME", "a"), ("OTEL_SERVICE_NAME", "b")]),
        )
        .unwrap();
        assert_eq!(config.service.name, "b");
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut config = AppConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "PORT", .. }));
    }

    #[test]
    fn parses_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
[listener]
bind_address = "127.0.0.1:4000"

[observability]
event_level = "info"
log_format = "json"

[log_sink]
batch_size = 10
"#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:4000");
        assert_eq!(config.observability.event_level, Level::Info);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.log_sink.batch_size, 10);
        assert_eq!(config.log_sink.timeout_secs, 5);
        assert_eq!(config.service.name, "tracelog-demo");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config(Some(Path::new("/nonexistent/tracelog.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
