// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tabula tests.
//!
//! Provides mock adapters for fast, deterministic, CI-runnable tests
//! without external services.
//!
//! # Components
//!
//! - [`MockModel`] - Mock model backend with pre-configured responses
//! - [`MockExecutor`] - Mock data-source executor over in-memory schemas

pub mod mock_executor;
pub mod mock_model;

pub use mock_executor::MockExecutor;
pub use mock_model::MockModel;
