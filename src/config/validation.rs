//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that redirect literals produce usable URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::{EdgeConfig, StorageBackend};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if !matches!(config.listener.default_scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::new(
            "listener.default_scheme",
            "must be 'http' or 'https'",
        ));
    }
    if Url::parse(&format!("http://{}/", config.listener.default_host)).is_err() {
        errors.push(ValidationError::new(
            "listener.default_host",
            format!("'{}' is not a valid host", config.listener.default_host),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be > 0"));
    }

    let capture = &config.capture;
    for (field, prefix) in [
        ("capture.api_prefix", &capture.api_prefix),
        ("capture.document_prefix", &capture.document_prefix),
        ("capture.document_load_prefix", &capture.document_load_prefix),
    ] {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::new(field, "must start with '/'"));
        }
    }
    if capture.max_response_chars == 0 {
        errors.push(ValidationError::new("capture.max_response_chars", "must be > 0"));
    }
    if capture.connecting_ip_header.is_empty() {
        errors.push(ValidationError::new(
            "capture.connecting_ip_header",
            "must not be empty",
        ));
    }
    if capture.reserved_header_prefixes.iter().any(String::is_empty) {
        errors.push(ValidationError::new(
            "capture.reserved_header_prefixes",
            "an empty prefix would capture every header",
        ));
    }

    let redirect = &config.redirect;
    for (field, value) in [
        ("redirect.external_root", &redirect.external_root),
        ("redirect.explorer_base", &redirect.explorer_base),
    ] {
        match Url::parse(value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ValidationError::new(
                field,
                format!("'{}' is not an absolute http(s) URL", value),
            )),
        }
    }
    if redirect.external_root.ends_with('/') {
        errors.push(ValidationError::new(
            "redirect.external_root",
            "must not end with '/' (the request path is appended)",
        ));
    }
    if redirect.address.is_empty() {
        errors.push(ValidationError::new("redirect.address", "must not be empty"));
    }
    if redirect.address_prefix.is_empty() {
        errors.push(ValidationError::new(
            "redirect.address_prefix",
            "must not be empty",
        ));
    }
    if redirect.canonical_host.is_empty() {
        errors.push(ValidationError::new(
            "redirect.canonical_host",
            "must not be empty",
        ));
    }

    let storage = &config.storage;
    if storage.key_prefix.is_empty()
        || storage.key_prefix.starts_with('/')
        || storage.key_prefix.ends_with('/')
        || storage.key_prefix.split('/').any(|c| c == ".." || c == ".")
    {
        errors.push(ValidationError::new(
            "storage.key_prefix",
            "must be a relative path without leading/trailing '/' or dot segments",
        ));
    }
    if storage.backend == StorageBackend::Fs && storage.root_dir.is_empty() {
        errors.push(ValidationError::new(
            "storage.root_dir",
            "required for the fs backend",
        ));
    }

    if let Some(upstream) = &config.downstream.upstream {
        match Url::parse(upstream) {
            Ok(url) if url.scheme() == "http" && url.host_str().is_some() => {}
            _ => errors.push(ValidationError::new(
                "downstream.upstream",
                format!("'{}' is not an absolute http URL", upstream),
            )),
        }
    }

    let observability = &config.observability;
    if !matches!(observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            "must be 'pretty' or 'json'",
        ));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&EdgeConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = EdgeConfig::default();
        config.listener.bind_address = "nope".into();
        config.redirect.external_root = "https://www.blockchain.com/".into();
        config.storage.key_prefix = "../escape".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["listener.bind_address", "redirect.external_root", "storage.key_prefix"]
        );
    }

    #[test]
    fn test_upstream_must_be_http() {
        let mut config = EdgeConfig::default();
        config.downstream.upstream = Some("ftp://files.example".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "downstream.upstream");

        config.downstream.upstream = Some("http://127.0.0.1:3000".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_storage_none_needs_no_root() {
        let mut config = EdgeConfig::default();
        config.storage.backend = StorageBackend::None;
        config.storage.root_dir = String::new();
        assert!(validate_config(&config).is_ok());
    }
}
