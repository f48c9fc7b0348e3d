// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as minimum attempt counts and positive limiter caps.

use thiserror::Error;

use crate::model::TabulaConfig;

/// A semantic configuration error.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TabulaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.generation.max_generation_attempts < 1 {
        errors.push(ConfigError::new(
            "generation.max_generation_attempts must be >= 1",
        ));
    }

    if config.retrieval.top_k < 1 {
        errors.push(ConfigError::new("retrieval.top_k must be >= 1"));
    }

    if config.retrieval.max_block_chars < 64 {
        errors.push(ConfigError::new(format!(
            "retrieval.max_block_chars must be >= 64, got {}",
            config.retrieval.max_block_chars
        )));
    }

    if config.limiter.max_concurrent_requests < 1 {
        errors.push(ConfigError::new(
            "limiter.max_concurrent_requests must be >= 1",
        ));
    }

    if config.limiter.min_interval_seconds < 0.0 || !config.limiter.min_interval_seconds.is_finite()
    {
        errors.push(ConfigError::new(format!(
            "limiter.min_interval_seconds must be a non-negative finite number, got {}",
            config.limiter.min_interval_seconds
        )));
    }

    if config.agent.max_iterations < 1 {
        errors.push(ConfigError::new("agent.max_iterations must be >= 1"));
    }

    {
        let level = config.agent.log_level.as_str();
        if !matches!(level, "trace" | "debug" | "info" | "warn" | "error") {
            errors.push(ConfigError::new(format!(
                "agent.log_level `{level}` is not one of trace, debug, info, warn, error"
            )));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&TabulaConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors_instead_of_failing_fast() {
        let mut cfg = TabulaConfig::default();
        cfg.generation.max_generation_attempts = 0;
        cfg.retrieval.top_k = 0;
        cfg.limiter.max_concurrent_requests = 0;
        let errors = validate_config(&cfg).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn rejects_negative_interval() {
        let mut cfg = TabulaConfig::default();
        cfg.limiter.min_interval_seconds = -1.0;
        let errors = validate_config(&cfg).unwrap_err();
        assert!(errors[0].message.contains("min_interval_seconds"));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut cfg = TabulaConfig::default();
        cfg.agent.log_level = "verbose".into();
        let errors = validate_config(&cfg).unwrap_err();
        assert!(errors[0].message.contains("log_level"));
    }
}
