//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs parse
//! - Validate value ranges (timeouts > 0, compression quality)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::EdgeConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: invalid URL {value:?}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("storage.base_url must end with '/'")]
    BaseUrlWithoutTrailingSlash,

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("cache.compression_quality must be between 0 and 11, got {0}")]
    CompressionQuality(u32),

    #[error("observability.log_format must be \"pretty\" or \"json\", got {0:?}")]
    LogFormat(String),

    #[error("{field} must not be empty")]
    Empty { field: &'static str },
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_concurrent_requests == 0 {
        errors.push(ValidationError::Zero { field: "listener.max_concurrent_requests" });
    }

    match Url::parse(&config.storage.base_url) {
        Ok(_) if !config.storage.base_url.ends_with('/') => {
            errors.push(ValidationError::BaseUrlWithoutTrailingSlash);
        }
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::InvalidUrl {
            field: "storage.base_url",
            value: config.storage.base_url.clone(),
        }),
    }
    if config.storage.compressed_suffix.is_empty() {
        errors.push(ValidationError::Empty { field: "storage.compressed_suffix" });
    }
    if config.storage.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "storage.request_timeout_secs" });
    }

    if config.stores.experiments_key.is_empty() {
        errors.push(ValidationError::Empty { field: "stores.experiments_key" });
    }

    if config.cache.max_entries == 0 {
        errors.push(ValidationError::Zero { field: "cache.max_entries" });
    }
    if config.cache.compression_quality > 11 {
        errors.push(ValidationError::CompressionQuality(config.cache.compression_quality));
    }

    if Url::parse(&config.site.redirect_url).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field: "site.redirect_url",
            value: config.site.redirect_url.clone(),
        });
    }
    if Url::parse(&config.site.favicon_url).is_err() {
        errors.push(ValidationError::InvalidUrl {
            field: "site.favicon_url",
            value: config.site.favicon_url.clone(),
        });
    }
    if let Some(origin) = &config.site.public_origin {
        if Url::parse(origin).is_err() {
            errors.push(ValidationError::InvalidUrl {
                field: "site.public_origin",
                value: origin.clone(),
            });
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }

    let format = config.observability.log_format.as_str();
    if format != "pretty" && format != "json" {
        errors.push(ValidationError::LogFormat(config.observability.log_format.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
