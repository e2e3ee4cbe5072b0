//! Forwarder tables: FIB, PIT, and the measurements tree.

pub mod fib;
pub mod measurements;
pub mod pit;

pub use fib::{Fib, NextHop};
pub use measurements::{EntryId, MeasurementTree};
pub use pit::{InRecord, OutRecord, Pit, PitEntry};
