// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits for the external collaborators of the core runtime.

pub mod executor;
pub mod model;
pub mod telemetry;

pub use executor::QueryExecutor;
pub use model::ModelBackend;
pub use telemetry::{LogSink, TelemetrySink};
