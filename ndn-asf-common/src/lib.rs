//! Common types and utilities for the Adaptive SRTT Forwarding (ASF) daemon.
//!
//! This crate provides the shared vocabulary used by the forwarder library
//! and the scenario CLI: NDN names, packet types, face identifiers, error
//! types, and traffic counters.

pub mod error;
pub mod metrics;
pub mod name;
pub mod packet;
pub mod types;

/// Reexport of common types
pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
