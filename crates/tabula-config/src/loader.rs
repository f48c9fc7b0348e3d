// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tabula.toml` > `~/.config/tabula/tabula.toml`
//! > `/etc/tabula/tabula.toml` with environment variable overrides via the
//! `TABULA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use tracing::debug;

use crate::model::TabulaConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tabula/tabula.toml` (system-wide)
/// 3. `~/.config/tabula/tabula.toml` (user XDG config)
/// 4. `./tabula.toml` (local directory)
/// 5. `TABULA_*` environment variables
pub fn load_config() -> Result<TabulaConfig, figment::Error> {
    let config: TabulaConfig = Figment::new()
        .merge(Serialized::defaults(TabulaConfig::default()))
        .merge(Toml::file("/etc/tabula/tabula.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("tabula/tabula.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("tabula.toml"))
        .merge(env_provider())
        .extract()?;
    debug!(
        max_iterations = config.agent.max_iterations,
        log_level = %config.agent.log_level,
        "configuration loaded from XDG hierarchy"
    );
    Ok(config)
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<TabulaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TabulaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TabulaConfig, figment::Error> {
    let config: TabulaConfig = Figment::new()
        .merge(Serialized::defaults(TabulaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()?;
    debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Create the environment variable provider.
///
/// Uses an explicit `map()` rather than `split("_")` so that
/// underscore-containing key names stay unambiguous: the first `_` after
/// the prefix separates the section, the rest is the key. For example,
/// `TABULA_GENERATION_MAX_FIX_ATTEMPTS` maps to
/// `generation.max_fix_attempts`.
fn env_provider() -> Env {
    Env::prefixed("TABULA_").map(|key| {
        let raw = key.as_str().to_lowercase();
        match raw.split_once('_') {
            Some((section, rest)) => format!("{section}.{rest}").into(),
            None => raw.into(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_str_applies_overrides_over_defaults() {
        let cfg = load_config_from_str(
            "[generation]\nmax_generation_attempts = 7\n\n[retrieval]\ntop_k = 2\n",
        )
        .unwrap();
        assert_eq!(cfg.generation.max_generation_attempts, 7);
        assert_eq!(cfg.retrieval.top_k, 2);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.limiter.max_concurrent_requests, 8);
    }

    #[test]
    fn load_from_str_empty_yields_defaults() {
        let cfg = load_config_from_str("").unwrap();
        assert_eq!(cfg.agent.max_iterations, 8);
    }

    #[test]
    fn later_layers_override_earlier() {
        let cfg: TabulaConfig = Figment::new()
            .merge(Serialized::defaults(TabulaConfig::default()))
            .merge(Toml::string("[limiter]\nmax_concurrent_requests = 2\n"))
            .merge(Toml::string("[limiter]\nmax_concurrent_requests = 4\n"))
            .extract()
            .unwrap();
        assert_eq!(cfg.limiter.max_concurrent_requests, 4);
    }
}
