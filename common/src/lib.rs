//! Shared building blocks for the DeployBot host.
//!
//! Everything here is dependency-light so both the bridge core and the
//! desktop shell can use it without pulling in a runtime.

pub mod error;

pub use error::error_location::ErrorLocation;
