//! Provides types and functions that are shared by the olmctl binaries.
#![deny(missing_docs)]
pub mod operator_info;
#[cfg(feature = "telemetry")]
pub mod telemetry;
