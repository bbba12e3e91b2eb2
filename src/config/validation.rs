//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check the origin is a usable absolute base URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MirrorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::MirrorConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `upstream.origin`.
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

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &MirrorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {:?}", config.listener.bind_address),
        ));
    }

    match Url::parse(&config.upstream.origin) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                errors.push(ValidationError::new(
                    "upstream.origin",
                    format!("unsupported scheme {:?}", url.scheme()),
                ));
            }
            if url.cannot_be_a_base() || url.host_str().is_none() {
                errors.push(ValidationError::new("upstream.origin", "must have a host"));
            }
            if url.query().is_some() || url.fragment().is_some() {
                errors.push(ValidationError::new(
                    "upstream.origin",
                    "must not carry a query or fragment",
                ));
            }
        }
        Err(e) => errors.push(ValidationError::new("upstream.origin", e.to_string())),
    }

    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.connect_timeout_secs", "must be > 0"));
    }
    if config.upstream.request_timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.request_timeout_secs", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    if config.mirror.root.trim().is_empty() {
        errors.push(ValidationError::new("mirror.root", "must not be empty"));
    }

    let index = &config.mirror.index_document;
    if index.is_empty() || index == "." || index == ".." || index.contains(['/', '\\', '\0']) {
        errors.push(ValidationError::new(
            "mirror.index_document",
            "must be a single file name",
        ));
    }

    let prefix = &config.mirror.static_prefix;
    if !prefix.starts_with('/')
        || prefix.ends_with('/')
        || prefix.contains("//")
        || prefix.contains(['{', '}', '*'])
    {
        errors.push(ValidationError::new(
            "mirror.static_prefix",
            "must look like \"/static\" (leading slash, no trailing slash)",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "not a socket address: {:?}",
                config.observability.metrics_address
            ),
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
        assert_eq!(validate_config(&MirrorConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = MirrorConfig::default();
        config.listener.bind_address = "nope".into();
        config.upstream.origin = "ftp://example.com".into();
        config.mirror.index_document = "../index.html".into();
        config.timeouts.request_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "upstream.origin",
                "timeouts.request_secs",
                "mirror.index_document",
            ]
        );
    }

    #[test]
    fn test_origin_rules() {
        let mut config = MirrorConfig::default();
        config.upstream.origin = "https://example.com/?x=1".into();
        assert!(validate_config(&config).is_err());

        config.upstream.origin = "not a url".into();
        assert!(validate_config(&config).is_err());

        config.upstream.origin = "http://127.0.0.1:9000/assets".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_static_prefix_rules() {
        let mut config = MirrorConfig::default();
        for bad in ["static", "/", "/static/", "//static", "/{static}"] {
            config.mirror.static_prefix = bad.into();
            assert!(validate_config(&config).is_err(), "{bad} should be rejected");
        }
        config.mirror.static_prefix = "/assets".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = MirrorConfig::default();
        config.observability.metrics_address = "bogus".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
