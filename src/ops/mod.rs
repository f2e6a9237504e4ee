//! Endpoint pipeline stages.
//!
//! A `provision` run walks these in order: preflight checks, teardown of
//! any endpoint with the same name, content staging, host provisioning.
//! `check` runs the preflight stage alone, `remove` the teardown stage.

pub mod preflight;
pub mod provision;
pub mod stage;
pub mod teardown;

pub use preflight::CheckReport;
pub use provision::ProvisionOutcome;
pub use stage::StageReport;
pub use teardown::{TeardownReport, TeardownRequest};
