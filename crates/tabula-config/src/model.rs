// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tabula agent runtime.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Tabula configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TabulaConfig {
    /// Agent loop settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// SQL generation coordinator settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Schema context retrieval settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Shared rate/concurrency limiter settings.
    #[serde(default)]
    pub limiter: LimiterConfig,
}

/// Agent loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Hard cap on recursive turns per run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Default model identifier passed to the backend.
    #[serde(default = "default_model")]
    pub model: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            model: default_model(),
            log_level: default_log_level(),
        }
    }
}

fn default_max_iterations() -> u32 {
    8
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// SQL generation coordinator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Fresh generation attempts per session. Must be >= 1.
    #[serde(default = "default_max_generation_attempts")]
    pub max_generation_attempts: u32,

    /// Repair attempts per failed generation.
    #[serde(default = "default_max_fix_attempts")]
    pub max_fix_attempts: u32,

    /// Whether candidate SQL is dry-run against the data source.
    #[serde(default = "default_true")]
    pub enable_dry_run_validation: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_generation_attempts: default_max_generation_attempts(),
            max_fix_attempts: default_max_fix_attempts(),
            enable_dry_run_validation: true,
        }
    }
}

fn default_max_generation_attempts() -> u32 {
    3
}

fn default_max_fix_attempts() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

/// Schema context retrieval configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Number of distinct tables returned per query. Must be >= 1.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Maximum characters per formatted table context block.
    #[serde(default = "default_max_block_chars")]
    pub max_block_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_block_chars: default_max_block_chars(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_max_block_chars() -> usize {
    2000
}

/// Shared rate/concurrency limiter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LimiterConfig {
    /// Maximum model/tool calls in flight across the process.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Minimum interval between admitted requests, in seconds.
    #[serde(default = "default_min_interval_seconds")]
    pub min_interval_seconds: f64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent_requests(),
            min_interval_seconds: default_min_interval_seconds(),
        }
    }
}

fn default_max_concurrent_requests() -> usize {
    8
}

fn default_min_interval_seconds() -> f64 {
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let cfg = TabulaConfig::default();
        assert!(cfg.generation.max_generation_attempts >= 1);
        assert!(cfg.generation.enable_dry_run_validation);
        assert!(cfg.retrieval.top_k >= 1);
        assert!(cfg.limiter.max_concurrent_requests >= 1);
        assert_eq!(cfg.agent.log_level, "info");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml = "[generation]\nmax_generation_atempts = 3\n";
        let result: Result<TabulaConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
