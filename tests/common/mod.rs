//! Common test utilities for Gantry CLI tests.
//!
//! This module provides:
//! - `TestEnv`: Isolated source tree plus a simulated host behind a state file
//! - Assertion macros: `assert_output_contains!`, `assert_staged!`, etc.
//! - Fixtures: Reusable endpoint file constants

pub mod assertions;
pub mod env;
pub mod fixtures;

pub use assertions::*;
pub use env::*;
pub use fixtures::*;
