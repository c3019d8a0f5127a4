//! Provides API for resolving, installing, checking and removing OLM managed operators.
#![warn(missing_docs)]

/// Control plane module for the Kubernetes API the tool consumes.
pub mod control_plane;
/// Error module for failures of the lifecycle operations.
pub mod error;
/// Install module for applying manifests and waiting on OLM.
pub mod install;
/// Locator module for finding where a subscription lives.
pub mod locator;
/// Manifest module for locating and parsing operator manifests.
pub mod manifest;
/// Probe module for observing install state.
pub mod probe;
/// Registry module for mapping aliases to operators.
pub mod registry;
/// Uninstall module for ordered, namespace preserving removal.
pub mod uninstall;
/// Utils module for shared context and time handling.
pub mod utils;

pub use error::Error;
