//! # pat-harness
//!
//! Collaborators and sequencing for platform acceptance scenarios.
//!
//! ## Components
//!
//! - [`CommandRunner`]: the command-line client, as a trait so scenarios
//!   can run against [`ProcessRunner`] or the scripted [`fake::ScriptedRunner`]
//! - [`ApiClient`]: the management REST API
//! - [`HttpProbe`]: plain requests against app routes
//! - [`samplers`]: the three collaborators wrapped as poll samplers
//! - [`resources`]: one probe per resource kind
//! - [`Scenario`]: sequencing with scoped cleanup
//!
//! Every collaborator call receives an explicit [`TestContext`]; nothing
//! reads ambient login or target state.

pub mod api;
pub mod cli;
pub mod config;
pub mod context;
mod error;
pub mod fake;
pub mod parse;
pub mod probe;
pub mod resources;
pub mod samplers;
pub mod scenario;
pub mod telemetry;

pub use api::ApiClient;
pub use cli::{CommandRunner, ProcessRunner};
pub use config::HarnessConfig;
pub use context::{Role, TestContext, UserContext};
pub use error::HarnessError;
pub use probe::HttpProbe;
pub use scenario::{fast_budgets, Scenario};
