//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs
//! - Validate value ranges (timeouts > 0, batch size > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::AppConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),
    #[error("service.name must not be empty")]
    EmptyServiceName,
    #[error("log_sink.endpoint `{0}` is not an http(s) URL")]
    SinkEndpoint(String),
    #[error("log_sink.token is required when log_sink.endpoint is set")]
    MissingSinkToken,
    #[error("log_sink.batch_size must be greater than zero")]
    BatchSize,
    #[error("log_sink.timeout_secs must be greater than zero")]
    SinkTimeout,
    #[error("tracing.otlp_endpoint `{0}` is not an http(s) URL")]
    OtlpEndpoint(String),
    #[error("timeouts.request_secs must be greater than zero")]
    RequestTimeout,
    #[error("limits.max_body_bytes must be greater than zero")]
    BodyLimit,
    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Check every semantic rule and collect all violations.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::EmptyServiceName);
    }

    if let Some(endpoint) = &config.log_sink.endpoint {
        if !is_http_url(endpoint) {
            errors.push(ValidationError::SinkEndpoint(endpoint.clone()));
        }
        if config.log_sink.token.as_deref().map_or(true, |t| t.trim().is_empty()) {
            errors.push(ValidationError::MissingSinkToken);
        }
    }
    if config.log_sink.batch_size == 0 {
        errors.push(ValidationError::BatchSize);
    }
    if config.log_sink.timeout_secs == 0 {
        errors.push(ValidationError::SinkTimeout);
    }

    if let Some(endpoint) = &config.tracing.otlp_endpoint {
        if !is_http_url(endpoint) {
            errors.push(ValidationError::OtlpEndpoint(endpoint.clone()));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::BodyLimit);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_violation() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "nope".into();
        config.log_sink.endpoint = Some("ftp://logs".into());
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::BindAddress("nope".into()),
                ValidationError::SinkEndpoint("ftp://logs".into()),
                ValidationError::MissingSinkToken,
                ValidationError::RequestTimeout,
            ]
        );
    }

    #[test]
    fn sink_with_token_is_accepted() {
        let mut config = AppConfig::default();
        config.log_sink.endpoint = Some("https://in.logs.example.com".into());
        config.log_sink.token = Some("secret".into());
        config.tracing.otlp_endpoint = Some("http://localhost:4318".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = AppConfig::default();
        config.observability.metrics_address = "bad".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::MetricsAddress("bad".into())])
        );
    }
}
