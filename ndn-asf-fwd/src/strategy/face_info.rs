//! Per-(namespace, face) measurement records and face rankings.
//!
//! Each namespace the strategy forwards under keeps one [`FaceInfo`] per
//! upstream face: the last RTT observation, an RFC 6298 smoothed RTT with
//! variance, and the timeout bookkeeping that drives face demotion. Rankings
//! are computed on demand from transient [`FaceStats`] tuples.

use crate::clock::Timestamp;
use crate::tables::measurements::{EntryId, MeasurementTree};
use ndn_asf_common::name::Name;
use ndn_asf_common::types::FaceId;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

const RTT_ALPHA: f64 = 1.0 / 8.0;
const RTT_BETA: f64 = 1.0 / 4.0;
const RTO_K: u32 = 4;

/// RTO used before any RTT sample exists.
pub const INITIAL_RTO: Duration = Duration::from_secs(1);
/// Lower bound on the advertised RTO.
pub const MIN_RTO: Duration = Duration::from_millis(200);
/// Upper bound on the advertised RTO.
pub const MAX_RTO: Duration = Duration::from_secs(60);

/// Outcome of the most recent exchange on a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rtt {
    /// The last Interest on this face brought Data back this fast.
    Measured(Duration),
    /// The face has never completed an exchange.
    NoMeasurement,
    /// The face stopped answering (or answered with a Nack).
    Timeout,
}

impl Rtt {
    pub fn is_measured(self) -> bool {
        matches!(self, Rtt::Measured(_))
    }
}

/// Measurement record for one (namespace, face) pair.
#[derive(Debug)]
pub struct FaceInfo {
    last_rtt: Rtt,
    srtt: Option<Duration>,
    rtt_var: Option<Duration>,
    n_timeouts: u32,
    /// Generation of the armed RTO timer; `None` when no timer is pending.
    armed_timeout: Option<u64>,
    next_generation: u64,
}

impl Default for FaceInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceInfo {
    pub fn new() -> Self {
        Self {
            last_rtt: Rtt::NoMeasurement,
            srtt: None,
            rtt_var: None,
            n_timeouts: 0,
            armed_timeout: None,
            next_generation: 0,
        }
    }

    pub fn last_rtt(&self) -> Rtt {
        self.last_rtt
    }

    pub fn srtt(&self) -> Option<Duration> {
        self.srtt
    }

    pub fn n_timeouts(&self) -> u32 {
        self.n_timeouts
    }

    /// Credits an RTT sample: updates last RTT and the smoothed estimate,
    /// clears the timeout counter, and cancels any pending RTO timer.
    pub fn record_rtt(&mut self, sample: Duration) {
        self.last_rtt = Rtt::Measured(sample);
        let sample_s = sample.as_secs_f64();
        match (self.srtt, self.rtt_var) {
            (Some(srtt), Some(rtt_var)) => {
                let srtt_s = srtt.as_secs_f64();
                let delta = (srtt_s - sample_s).abs();
                let var_s = (1.0 - RTT_BETA) * rtt_var.as_secs_f64() + RTT_BETA * delta;
                let srtt_s = (1.0 - RTT_ALPHA) * srtt_s + RTT_ALPHA * sample_s;
                self.srtt = Some(Duration::from_secs_f64(srtt_s));
                self.rtt_var = Some(Duration::from_secs_f64(var_s));
            }
            _ => {
                self.srtt = Some(sample);
                self.rtt_var = Some(sample / 2);
            }
        }
        self.n_timeouts = 0;
        self.armed_timeout = None;
    }

    /// Demotes the face: the last RTT becomes [`Rtt::Timeout`] while the
    /// smoothed estimate keeps its previous value.
    pub fn record_timeout(&mut self) {
        self.last_rtt = Rtt::Timeout;
        self.n_timeouts = 0;
        self.armed_timeout = None;
    }

    /// Demotes the face after a recoverable Nack. Does not touch the timeout
    /// counter: a Nack is an answer, just not the one we wanted.
    pub fn record_nack(&mut self) {
        self.last_rtt = Rtt::Timeout;
        self.armed_timeout = None;
    }

    /// Counts one expired RTO and returns the running total.
    pub fn increment_timeouts(&mut self) -> u32 {
        self.n_timeouts += 1;
        self.n_timeouts
    }

    /// The retransmission timeout advertised to the forwarder.
    pub fn rto(&self) -> Duration {
        match (self.srtt, self.rtt_var) {
            (Some(srtt), Some(rtt_var)) => (srtt + rtt_var * RTO_K).clamp(MIN_RTO, MAX_RTO),
            _ => INITIAL_RTO,
        }
    }

    /// Whether an RTO timer is currently pending for this face.
    pub fn is_timeout_armed(&self) -> bool {
        self.armed_timeout.is_some()
    }

    /// Arms the RTO timer and returns the generation to attach to the event.
    pub fn arm_timeout(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.armed_timeout = Some(generation);
        generation
    }

    /// Cancels the pending RTO timer, if any.
    pub fn cancel_timeout(&mut self) {
        self.armed_timeout = None;
    }

    /// Claims a fired RTO event. Returns false when the timer was cancelled
    /// or superseded since it was armed.
    pub fn claim_timeout(&mut self, generation: u64) -> bool {
        if self.armed_timeout == Some(generation) {
            self.armed_timeout = None;
            true
        } else {
            false
        }
    }
}

/// Transient ranking tuple for one candidate upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceStats {
    pub face: FaceId,
    pub rtt: Rtt,
    pub srtt: Option<Duration>,
    pub cost: u32,
}

fn srtt_key(stats: &FaceStats) -> Duration {
    stats.srtt.unwrap_or(Duration::MAX)
}

fn forwarding_group(stats: &FaceStats) -> u8 {
    match stats.rtt {
        Rtt::Measured(_) => 0,
        Rtt::NoMeasurement => 1,
        Rtt::Timeout => 2,
    }
}

fn probing_group(stats: &FaceStats) -> u8 {
    match stats.rtt {
        Rtt::NoMeasurement => 0,
        Rtt::Measured(_) => 1,
        Rtt::Timeout => 2,
    }
}

/// Tie-break inside a group; `a` and `b` are in the same group, so keying
/// off `a`'s RTT state is enough.
fn compare_within_group(a: &FaceStats, b: &FaceStats) -> Ordering {
    match a.rtt {
        // Working faces: fastest first.
        Rtt::Measured(_) => (srtt_key(a), a.cost, a.face).cmp(&(srtt_key(b), b.cost, b.face)),
        // Unmeasured faces: cheapest first.
        Rtt::NoMeasurement => (a.cost, a.face).cmp(&(b.cost, b.face)),
        // Timed-out faces: cheapest first, then whatever once looked fastest.
        Rtt::Timeout => (a.cost, srtt_key(a), a.face).cmp(&(b.cost, srtt_key(b), b.face)),
    }
}

/// Total order used to pick the upstream to forward on:
/// working-measured, then unmeasured, then timed-out.
pub fn compare_for_forwarding(a: &FaceStats, b: &FaceStats) -> Ordering {
    forwarding_group(a)
        .cmp(&forwarding_group(b))
        .then_with(|| compare_within_group(a, b))
}

/// Total order used to pick a probe target: unmeasured faces are the most
/// interesting, then measured, then timed-out.
pub fn compare_for_probing(a: &FaceStats, b: &FaceStats) -> Ordering {
    probing_group(a)
        .cmp(&probing_group(b))
        .then_with(|| compare_within_group(a, b))
}

/// Per-namespace strategy state: one [`FaceInfo`] per upstream plus the
/// probing bookkeeping.
#[derive(Debug)]
pub struct NamespaceInfo {
    prefix: Name,
    faces: HashMap<FaceId, FaceInfo>,
    next_probe_deadline: Option<Timestamp>,
    outstanding_probe: Option<FaceId>,
}

impl NamespaceInfo {
    pub fn new(prefix: Name) -> Self {
        Self {
            prefix,
            faces: HashMap::new(),
            next_probe_deadline: None,
            outstanding_probe: None,
        }
    }

    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    pub fn face_info(&self, face: FaceId) -> Option<&FaceInfo> {
        self.faces.get(&face)
    }

    pub fn face_info_mut(&mut self, face: FaceId) -> Option<&mut FaceInfo> {
        self.faces.get_mut(&face)
    }

    pub fn get_or_create_face_info(&mut self, face: FaceId) -> &mut FaceInfo {
        self.faces.entry(face).or_default()
    }

    pub fn next_probe_deadline(&self) -> Option<Timestamp> {
        self.next_probe_deadline
    }

    pub fn set_next_probe_deadline(&mut self, deadline: Timestamp) {
        self.next_probe_deadline = Some(deadline);
    }

    pub fn outstanding_probe(&self) -> Option<FaceId> {
        self.outstanding_probe
    }

    pub fn set_outstanding_probe(&mut self, face: FaceId) {
        self.outstanding_probe = Some(face);
    }

    pub fn clear_outstanding_probe(&mut self) {
        self.outstanding_probe = None;
    }

    /// Ranking tuple for `face` at the given routing cost.
    pub fn face_stats(&self, face: FaceId, cost: u32) -> FaceStats {
        match self.faces.get(&face) {
            Some(info) => FaceStats {
                face,
                rtt: info.last_rtt(),
                srtt: info.srtt(),
                cost,
            },
            None => FaceStats {
                face,
                rtt: Rtt::NoMeasurement,
                srtt: None,
                cost,
            },
        }
    }
}

/// The strategy's side of the measurements tree: namespace records in a flat
/// table keyed by tree entry id.
#[derive(Debug, Default)]
pub struct AsfMeasurements {
    namespaces: HashMap<EntryId, NamespaceInfo>,
}

impl AsfMeasurements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the records of tree entries whose lifetime has lapsed.
    pub fn prune(&mut self, tree: &mut MeasurementTree, now: Timestamp) {
        for id in tree.prune(now) {
            self.namespaces.remove(&id);
        }
    }

    /// Finds or creates the record anchored at `prefix`.
    ///
    /// Returns the entry id and whether the record was just created.
    pub fn get_or_create(
        &mut self,
        tree: &mut MeasurementTree,
        prefix: &Name,
        now: Timestamp,
    ) -> (EntryId, bool) {
        let (id, created) = tree.find_or_create(prefix, now);
        let fresh = created || !self.namespaces.contains_key(&id);
        if fresh {
            self.namespaces.insert(id, NamespaceInfo::new(prefix.clone()));
        }
        (id, fresh)
    }

    pub fn get(&self, id: EntryId) -> Option<&NamespaceInfo> {
        self.namespaces.get(&id)
    }

    pub fn get_mut(&mut self, id: EntryId) -> Option<&mut NamespaceInfo> {
        self.namespaces.get_mut(&id)
    }

    /// Longest-prefix lookup of the record covering `name`.
    pub fn lookup_mut(
        &mut self,
        tree: &MeasurementTree,
        name: &Name,
        now: Timestamp,
    ) -> Option<&mut NamespaceInfo> {
        let id = tree.lookup(name, now)?;
        self.namespaces.get_mut(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    fn assert_close(actual: Duration, expected: Duration) {
        let diff = if actual > expected {
            actual - expected
        } else {
            expected - actual
        };
        assert!(
            diff < Duration::from_micros(1),
            "expected ~{expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn first_sample_seeds_the_estimator() {
        let mut info = FaceInfo::new();
        assert_eq!(info.last_rtt(), Rtt::NoMeasurement);
        assert_eq!(info.rto(), INITIAL_RTO);

        info.record_rtt(100 * MS);
        assert_eq!(info.last_rtt(), Rtt::Measured(100 * MS));
        assert_eq!(info.srtt(), Some(100 * MS));
        // rto = srtt + 4 * (srtt / 2) = 300ms
        assert_eq!(info.rto(), 300 * MS);
    }

    #[test]
    fn smoothing_follows_rfc6298() {
        let mut info = FaceInfo::new();
        info.record_rtt(100 * MS);
        info.record_rtt(100 * MS);
        // srtt stays 100ms, rttvar decays to 37.5ms, rto = 250ms
        assert_close(info.srtt().unwrap(), 100 * MS);
        assert_close(info.rto(), 250 * MS);

        info.record_rtt(200 * MS);
        // srtt = 112.5ms, rttvar = 53.125ms, rto = 325ms
        assert_close(info.srtt().unwrap(), Duration::from_micros(112_500));
        assert_close(info.rto(), 325 * MS);
    }

    #[test]
    fn rto_is_clamped() {
        let mut info = FaceInfo::new();
        info.record_rtt(10 * MS);
        // 10 + 4*5 = 30ms, below the floor
        assert_eq!(info.rto(), MIN_RTO);
    }

    #[test]
    fn data_resets_the_timeout_counter() {
        let mut info = FaceInfo::new();
        info.increment_timeouts();
        info.increment_timeouts();
        assert_eq!(info.n_timeouts(), 2);
        info.record_rtt(50 * MS);
        assert_eq!(info.n_timeouts(), 0);
    }

    #[test]
    fn demotion_keeps_srtt() {
        let mut info = FaceInfo::new();
        info.record_rtt(30 * MS);
        info.record_timeout();
        assert_eq!(info.last_rtt(), Rtt::Timeout);
        assert_eq!(info.srtt(), Some(30 * MS));
    }

    #[test]
    fn timer_generations_reject_stale_firings() {
        let mut info = FaceInfo::new();
        let first = info.arm_timeout();
        assert!(info.is_timeout_armed());
        info.cancel_timeout();
        assert!(!info.claim_timeout(first));

        let second = info.arm_timeout();
        assert!(!info.claim_timeout(first));
        assert!(info.claim_timeout(second));
        assert!(!info.is_timeout_armed());
    }

    fn measured(face: u64, srtt_ms: u64, cost: u32) -> FaceStats {
        FaceStats {
            face: FaceId(face),
            rtt: Rtt::Measured(Duration::from_millis(srtt_ms)),
            srtt: Some(Duration::from_millis(srtt_ms)),
            cost,
        }
    }

    fn unmeasured(face: u64, cost: u32) -> FaceStats {
        FaceStats {
            face: FaceId(face),
            rtt: Rtt::NoMeasurement,
            srtt: None,
            cost,
        }
    }

    fn timed_out(face: u64, srtt_ms: Option<u64>, cost: u32) -> FaceStats {
        FaceStats {
            face: FaceId(face),
            rtt: Rtt::Timeout,
            srtt: srtt_ms.map(Duration::from_millis),
            cost,
        }
    }

    /// The full 14-face ranking table: four working faces, three unmeasured,
    /// seven timed-out, covering every tie-break level.
    fn ranking_fixture() -> Vec<FaceStats> {
        vec![
            measured(1, 25, 0),
            measured(2, 25, 0),
            measured(3, 30, 0),
            measured(4, 30, 1),
            unmeasured(5, 0),
            unmeasured(6, 0),
            unmeasured(7, 1),
            timed_out(8, Some(30), 0),
            timed_out(9, Some(30), 0),
            timed_out(10, Some(45), 0),
            timed_out(11, None, 0),
            timed_out(12, Some(15), 1),
            timed_out(13, Some(45), 1),
            timed_out(14, None, 1),
        ]
    }

    #[test]
    fn forwarding_order_ranks_working_unmeasured_timeout() {
        let mut faces = ranking_fixture();
        // Shuffle deterministically so the sort has work to do.
        faces.reverse();
        faces.sort_by(compare_for_forwarding);
        let ids: Vec<u64> = faces.iter().map(|s| s.face.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14]);
    }

    #[test]
    fn probing_order_prefers_unmeasured() {
        let mut faces = ranking_fixture();
        faces.reverse();
        faces.sort_by(compare_for_probing);
        let ids: Vec<u64> = faces.iter().map(|s| s.face.0).collect();
        assert_eq!(ids, vec![5, 6, 7, 1, 2, 3, 4, 8, 9, 10, 11, 12, 13, 14]);
    }

    #[test]
    fn rankings_are_total_and_stable() {
        let faces = ranking_fixture();
        for a in &faces {
            assert_eq!(compare_for_forwarding(a, a), Ordering::Equal);
            for b in &faces {
                let fwd = compare_for_forwarding(a, b);
                assert_eq!(fwd.reverse(), compare_for_forwarding(b, a));
                let probe = compare_for_probing(a, b);
                assert_eq!(probe.reverse(), compare_for_probing(b, a));
            }
        }
        // Re-sorting an already sorted vector must not move anything.
        let mut sorted = ranking_fixture();
        sorted.sort_by(compare_for_forwarding);
        let again = {
            let mut v = sorted.clone();
            v.sort_by(compare_for_forwarding);
            v
        };
        assert_eq!(sorted, again);
    }

    #[test]
    fn namespace_tracks_probe_state() {
        let mut ns = NamespaceInfo::new(Name::from_uri("/hr/C").unwrap());
        assert_eq!(ns.next_probe_deadline(), None);
        ns.set_next_probe_deadline(Duration::from_secs(3));
        ns.set_outstanding_probe(FaceId(4));
        assert_eq!(ns.outstanding_probe(), Some(FaceId(4)));
        ns.clear_outstanding_probe();
        assert_eq!(ns.outstanding_probe(), None);
    }

    #[test]
    fn measurements_evict_with_the_tree() {
        let mut tree = MeasurementTree::new(Duration::from_secs(60));
        let mut measurements = AsfMeasurements::new();
        let prefix = Name::from_uri("/hr/C").unwrap();

        let (id, created) = measurements.get_or_create(&mut tree, &prefix, Duration::ZERO);
        assert!(created);
        measurements
            .get_mut(id)
            .unwrap()
            .get_or_create_face_info(FaceId(1))
            .record_rtt(40 * MS);

        let later = Duration::from_secs(120);
        measurements.prune(&mut tree, later);
        assert!(measurements.get(id).is_none());

        let (fresh, created) = measurements.get_or_create(&mut tree, &prefix, later);
        assert!(created);
        assert_ne!(fresh, id);
        let ns = measurements.get(fresh).unwrap();
        assert!(ns.face_info(FaceId(1)).is_none());
    }
}
