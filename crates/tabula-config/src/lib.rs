// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Tabula agent runtime.
//!
//! Layered TOML configuration via Figment (defaults -> system -> XDG user ->
//! local -> `TABULA_*` env vars) with post-deserialization semantic
//! validation.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{AgentConfig, GenerationConfig, LimiterConfig, RetrievalConfig, TabulaConfig};
pub use validation::{ConfigError, validate_config};

use tabula_core::TabulaError;

/// Load and validate configuration, converting failures into [`TabulaError`].
pub fn load_validated() -> Result<TabulaConfig, TabulaError> {
    let config = load_config().map_err(|e| TabulaError::Config(e.to_string()))?;
    validate_config(&config).map_err(|errors| {
        let joined = errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        TabulaError::Config(joined)
    })?;
    Ok(config)
}
