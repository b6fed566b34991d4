//! Configuration validation module.
//!
//! Provides validation for all configuration values, failing fast on
//! invalid configuration rather than at runtime.

use crate::AppConfig;
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// Pool size must be at least one connection.
    InvalidPoolSize { value: u32 },
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: u32, maximum: u32 },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Domain name is empty or contains key separators.
    InvalidDomain { value: String },
    /// Index list limit must be positive.
    NonPositiveLimit { domain: String },
    /// TTL must be positive when set.
    NonPositiveTtl { domain: String },
    /// Scan batch hint must be positive.
    NonPositiveScanCount,
    /// Monitor interval must be positive.
    NonPositiveInterval,
    /// Monitor pattern entries must have a name and a pattern.
    InvalidPattern { name: String, pattern: String },
    /// Sampling ratio must be between 0.0 and 1.0.
    InvalidSamplingRatio { value: f64 },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPoolSize { value } => {
                write!(f, "Invalid pool size: {} (must be at least 1)", value)
            }
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(f, "Pool size {} exceeds maximum allowed ({})", value, maximum)
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::InvalidDomain { value } => {
                write!(f, "Invalid cache domain '{}' (must be non-empty, without ':' or '*')", value)
            }
            Self::NonPositiveLimit { domain } => {
                write!(f, "List limit for domain '{}' must be positive", domain)
            }
            Self::NonPositiveTtl { domain } => {
                write!(f, "TTL for domain '{}' must be positive when set", domain)
            }
            Self::NonPositiveScanCount => write!(f, "Monitor scan_count must be positive"),
            Self::NonPositiveInterval => write!(f, "Monitor interval_secs must be positive"),
            Self::InvalidPattern { name, pattern } => {
                write!(f, "Invalid monitor pattern '{}' => '{}'", name, pattern)
            }
            Self::InvalidSamplingRatio { value } => {
                write!(
                    f,
                    "Invalid sampling ratio: {} (must be between 0.0 and 1.0)",
                    value
                )
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result of configuration validation containing all errors found.
#[derive(Debug)]
pub struct ValidationResult {
    errors: Vec<ConfigValidationError>,
}

impl ValidationResult {
    fn new() -> Self {
        Self { errors: Vec::new() }
    }

    fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the validation errors.
    pub fn errors(&self) -> &[ConfigValidationError] {
        &self.errors
    }

    /// Converts to Result, returning Err with all errors if any exist.
    pub fn into_result(self) -> Result<(), Vec<ConfigValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: u32 = 1000;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut result = ValidationResult::new();

        Self::validate_redis(&config.redis, &mut result);
        Self::validate_domain(&config.cache.user, &mut result);
        Self::validate_monitor(&config.monitor, &mut result);
        Self::validate_observability(&config.observability, &mut result);

        result.into_result()
    }

    /// Validates Redis configuration.
    fn validate_redis(config: &crate::RedisConfig, result: &mut ValidationResult) {
        if !config.enabled {
            return;
        }

        if !config.url.starts_with("redis://") && !config.url.starts_with("rediss://") {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL must start with redis:// or rediss://".to_string(),
            });
        } else if Url::parse(&config.url).is_err() {
            result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: format!("Invalid URL format: {}", config.url),
            });
        }

        if config.pool_size == 0 {
            result.add_error(ConfigValidationError::InvalidPoolSize {
                value: config.pool_size,
            });
        }
        if config.pool_size > Self::MAX_POOL_SIZE {
            result.add_error(ConfigValidationError::PoolSizeTooLarge {
                value: config.pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }
    }

    /// Validates one cached domain.
    fn validate_domain(config: &crate::DomainConfig, result: &mut ValidationResult) {
        if config.domain.is_empty() || config.domain.contains([':', '*']) {
            result.add_error(ConfigValidationError::InvalidDomain {
                value: config.domain.clone(),
            });
        }
        if config.limit == 0 {
            result.add_error(ConfigValidationError::NonPositiveLimit {
                domain: config.domain.clone(),
            });
        }
        if config.ttl_secs == Some(0) {
            result.add_error(ConfigValidationError::NonPositiveTtl {
                domain: config.domain.clone(),
            });
        }
    }

    /// Validates the keyspace monitor.
    fn validate_monitor(config: &crate::MonitorConfig, result: &mut ValidationResult) {
        if config.scan_count == 0 {
            result.add_error(ConfigValidationError::NonPositiveScanCount);
        }
        if config.enabled && config.interval_secs == 0 {
            result.add_error(ConfigValidationError::NonPositiveInterval);
        }
        for entry in &config.patterns {
            if entry.name.is_empty() || entry.pattern.is_empty() {
                result.add_error(ConfigValidationError::InvalidPattern {
                    name: entry.name.clone(),
                    pattern: entry.pattern.clone(),
                });
            }
        }
    }

    /// Validates observability configuration.
    fn validate_observability(config: &crate::ObservabilityConfig, result: &mut ValidationResult) {
        let level = config.log_level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
            });
        }

        if !(0.0..=1.0).contains(&config.sampling_ratio) {
            result.add_error(ConfigValidationError::InvalidSamplingRatio {
                value: config.sampling_ratio,
            });
        }

        if let Some(ref endpoint) = config.otlp_endpoint {
            if Url::parse(endpoint).is_err() {
                result.add_error(ConfigValidationError::InvalidUrl {
                    url_type: "otlp_endpoint".to_string(),
                    message: format!("Invalid URL format: {}", endpoint),
                });
            }
        }
    }
}
