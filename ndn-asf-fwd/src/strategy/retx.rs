//! Per-upstream retransmission suppression with exponential back-off.
//!
//! Suppression is decided independently for every upstream of a PIT entry: a
//! retransmission may be suppressed towards one face and admitted towards
//! another in the same decision cycle. The back-off interval lives in the
//! entry's strategy info, so it survives out-record expiry.

use crate::clock::Timestamp;
use crate::tables::pit::PitEntry;
use ndn_asf_common::types::FaceId;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(10);
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_MULTIPLIER: u32 = 2;

/// Verdict for one (PIT entry, upstream) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetxSuppressionResult {
    /// The Interest was never forwarded to this upstream.
    New,
    /// Retransmission outside the suppression window; forward it.
    Forward,
    /// Retransmission inside the suppression window; do not forward.
    Suppress,
}

/// Back-off state kept per PIT entry, one interval per upstream.
#[derive(Debug, Default)]
pub struct SuppressionInfo {
    intervals: HashMap<FaceId, Duration>,
}

/// Exponential retransmission suppression policy.
#[derive(Debug, Clone)]
pub struct RetxSuppressionExponential {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: u32,
}

impl Default for RetxSuppressionExponential {
    fn default() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl RetxSuppressionExponential {
    /// Decides whether a retransmission may go out towards `face`.
    pub fn decide_per_upstream(
        &self,
        entry: &mut PitEntry,
        face: FaceId,
        now: Timestamp,
    ) -> RetxSuppressionResult {
        let last_tx = match entry.out_record(face) {
            None => return RetxSuppressionResult::New,
            Some(record) => record.last_tx_time,
        };
        let interval = *entry
            .strategy_info_mut::<SuppressionInfo>()
            .intervals
            .entry(face)
            .or_insert(self.initial_interval);
        if now.saturating_sub(last_tx) < interval {
            RetxSuppressionResult::Suppress
        } else {
            RetxSuppressionResult::Forward
        }
    }

    /// Backs off the window after an admitted retransmission towards `face`.
    pub fn increment_interval(&self, entry: &mut PitEntry, face: FaceId) {
        let interval = entry
            .strategy_info_mut::<SuppressionInfo>()
            .intervals
            .entry(face)
            .or_insert(self.initial_interval);
        *interval = (*interval * self.multiplier).min(self.max_interval);
    }
}
