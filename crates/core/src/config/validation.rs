//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn check_timeout(field: &str, value_ms: u64) -> Result<(), ConfigError> {
    if value_ms < 100 {
        return Err(invalid(field, "must be at least 100ms"));
    }
    if value_ms > 300_000 {
        return Err(invalid(field, "must not exceed 5 minutes (300000ms)"));
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `namespace` is empty or contains `:`
    /// - `cache_max_size`, any TTL, `retry_max_attempts` or `max_results` is 0
    /// - any timeout is below 100ms or above 5 minutes
    /// - `backend_priority` is empty or repeats a backend
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(invalid("namespace", "must not be empty"));
        }
        if self.namespace.contains(':') {
            return Err(invalid("namespace", "must not contain ':'"));
        }

        if self.cache_max_size == 0 {
            return Err(invalid("cache_max_size", "must be greater than 0"));
        }
        if self.escalation_ttl_secs == 0 {
            return Err(invalid("escalation_ttl_secs", "must be greater than 0"));
        }
        if self.query_ttl_secs == 0 {
            return Err(invalid("query_ttl_secs", "must be greater than 0"));
        }
        if self.escalation_max_age_secs == 0 {
            return Err(invalid("escalation_max_age_secs", "must be greater than 0"));
        }

        check_timeout("router_timeout_ms", self.router_timeout_ms)?;
        check_timeout("classifier_timeout_ms", self.classifier_timeout_ms)?;
        check_timeout("fetch_timeout_ms", self.fetch_timeout_ms)?;
        check_timeout("source_timeout_ms", self.source_timeout_ms)?;

        if self.backend_priority.is_empty() {
            return Err(invalid("backend_priority", "must name at least one backend"));
        }
        let mut seen = HashSet::new();
        if !self.backend_priority.iter().all(|b| seen.insert(*b)) {
            return Err(invalid("backend_priority", "must not repeat a backend"));
        }

        if self.retry_max_attempts == 0 {
            return Err(invalid("retry_max_attempts", "must be at least 1"));
        }
        if self.max_results == 0 {
            return Err(invalid("max_results", "must be greater than 0"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.escalation_max_age_secs > self.escalation_ttl_secs {
            tracing::warn!(
                max_age_secs = self.escalation_max_age_secs,
                ttl_secs = self.escalation_ttl_secs,
                "escalation_max_age_secs exceeds escalation_ttl_secs; entries expire before they go stale"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Backend;

    fn field_of(result: Result<(), ConfigError>) -> Option<String> {
        match result {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_namespace() {
        let config = AppConfig { namespace: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("namespace"));

        let config = AppConfig { namespace: "a:b".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("namespace"));
    }

    #[test]
    fn test_validate_cache_max_size_zero() {
        let config = AppConfig { cache_max_size: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("cache_max_size"));
    }

    #[test]
    fn test_validate_timeouts() {
        let config = AppConfig { classifier_timeout_ms: 50, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("classifier_timeout_ms"));

        let config = AppConfig { fetch_timeout_ms: 301_000, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("fetch_timeout_ms"));

        let config = AppConfig { router_timeout_ms: 100, source_timeout_ms: 300_000, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_backend_priority() {
        let config = AppConfig { backend_priority: Vec::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("backend_priority"));
    }

    #[test]
    fn test_validate_duplicate_backend_priority() {
        let config =
            AppConfig { backend_priority: vec![Backend::Cache, Backend::Cache], ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("backend_priority"));
    }

    #[test]
    fn test_validate_retry_attempts_zero() {
        let config = AppConfig { retry_max_attempts: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("retry_max_attempts"));
    }

    #[test]
    fn test_validate_max_bytes_bounds() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("max_bytes"));

        let config = AppConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("max_bytes"));

        let config = AppConfig { max_bytes: 50 * 1024 * 1024, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("user_agent"));
    }
}
