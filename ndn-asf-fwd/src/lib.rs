//! NDN forwarder library built around the Adaptive SRTT Forwarding strategy.
//!
//! The crate is organised the way the daemon runs: [`tables`] hold the FIB,
//! PIT, and measurement state, [`strategy`] makes per-Interest forwarding
//! decisions, [`forwarder`] dispatches packet and timer events between them,
//! and [`sim`] provides a deterministic virtual-time topology harness used by
//! the integration tests and the scenario CLI.
//!
//! Everything is single-threaded: handlers run to completion on the caller's
//! thread and timers are ordinary queue events on a virtual clock.

pub mod clock;
pub mod forwarder;
pub mod sim;
pub mod strategy;
pub mod tables;

pub use forwarder::{Emission, Forwarder};
pub use strategy::{Strategy, StrategyRegistry};
