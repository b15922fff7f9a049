//! # pat-names
//!
//! Unique names for the resources an acceptance scenario creates.
//!
//! ## Design Principles
//!
//! - Every fixture gets a fresh name, so concurrent scenarios never collide
//! - Names are typed to prevent passing an app name where a service
//!   instance is expected
//! - Names are valid hostnames, so an app name can double as its route host
//!
//! ## Name Format
//!
//! All names use the format `pat-{kind}-{ulid}` with the ULID in lowercase:
//!
//! - `pat-app-01hv4z3mxnkpqr9hstz7wcld4e`
//! - `pat-svc-01hv4z4nyrltrs0jtua8xdme5f`
//!
//! The shared `pat-` marker lets cleanup tooling find leftovers from
//! aborted runs.

mod error;
mod macros;
mod types;

pub use error::NameError;
pub use types::*;

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;

/// Marker prefix shared by every generated name.
pub const MARKER: &str = "pat";
