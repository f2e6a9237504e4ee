//! Gantry - web endpoint provisioning tool
//!
//! Gantry stands up OData-style web service endpoints on the local web
//! server: it validates the host, stages the endpoint files, registers the
//! application pool, site and application, binds TLS, and patches deployed
//! settings documents.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod host;
pub mod ops;
pub mod report;
pub mod webconfig;

// Re-exports for convenience
pub use endpoint::{CertSelector, EndpointSpec, PoolIdentity};
pub use error::{GantryError, GantryResult};
pub use host::{AppCmdHost, StateFileHost, WebHost};
pub use ops::{CheckReport, ProvisionOutcome, StageReport, TeardownReport, TeardownRequest};
pub use webconfig::{set_app_setting, SettingOutcome};
