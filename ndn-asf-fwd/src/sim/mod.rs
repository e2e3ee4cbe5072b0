//! Deterministic virtual-time topology harness.
//!
//! Runs a handful of forwarders connected by delayed links entirely on the
//! virtual clock: no threads, no real time, identical results on every run.
//! Used by the integration tests and by the scenario CLI.

pub mod rng;
pub mod topology;

pub use rng::MidpointRng;
pub use topology::{AppFaceId, LinkId, NodeId, Topology};
