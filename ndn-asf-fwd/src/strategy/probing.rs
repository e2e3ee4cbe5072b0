//! Probing: periodically refresh the measurement of non-preferred faces.
//!
//! Each namespace gets a probe deadline. The first one lands shortly after
//! the namespace is first used; afterwards the deadline is re-armed with a
//! jittered copy of the configured probing interval every time a probe goes
//! out. A probe is an extra copy of the current Interest, sent on a face
//! distinct from the chosen one and always carrying a fresh nonce.

use crate::clock::Timestamp;
use crate::strategy::face_info::{FaceStats, NamespaceInfo};
use ndn_asf_common::types::{FaceId, Nonce};
use rand::{Rng as _, RngCore};
use std::time::Duration;

/// Default probing interval.
pub const DEFAULT_PROBING_INTERVAL: Duration = Duration::from_secs(60);
/// Smallest accepted probing interval.
pub const MIN_PROBING_INTERVAL: Duration = Duration::from_secs(1);
/// The first probe for a namespace is due within this much of first use.
pub const FIRST_PROBE_WINDOW: Duration = Duration::from_secs(5);

/// Probe scheduling and selection.
pub struct ProbingModule {
    probing_interval: Duration,
    rng: Box<dyn RngCore>,
}

impl std::fmt::Debug for ProbingModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbingModule")
            .field("probing_interval", &self.probing_interval)
            .finish_non_exhaustive()
    }
}

impl ProbingModule {
    pub fn new(probing_interval: Duration, rng: Box<dyn RngCore>) -> Self {
        Self {
            probing_interval,
            rng,
        }
    }

    pub fn probing_interval(&self) -> Duration {
        self.probing_interval
    }

    /// Arms the first probe deadline of a namespace that has none yet.
    pub fn schedule_first_probe(&mut self, ns: &mut NamespaceInfo, now: Timestamp) {
        if ns.next_probe_deadline().is_none() {
            let window = FIRST_PROBE_WINDOW.min(self.probing_interval);
            let delay = self.rng.gen_range(0..=window.as_millis() as u64);
            ns.set_next_probe_deadline(now + Duration::from_millis(delay));
        }
    }

    /// Whether a probe should accompany the next Interest of this namespace.
    pub fn is_probing_needed(&self, ns: &NamespaceInfo, now: Timestamp) -> bool {
        ns.outstanding_probe().is_none()
            && ns.next_probe_deadline().is_some_and(|deadline| now >= deadline)
    }

    /// Picks the probe target: the first face in probing order that is not
    /// the face the Interest is being forwarded on.
    pub fn select_probe_face(ranked: &[FaceStats], chosen: FaceId) -> Option<FaceId> {
        ranked.iter().map(|s| s.face).find(|&face| face != chosen)
    }

    /// Records a sent probe and re-arms the deadline with jitter in
    /// [0.9, 1.1] of the probing interval.
    pub fn after_probe(&mut self, ns: &mut NamespaceInfo, face: FaceId, now: Timestamp) {
        ns.set_outstanding_probe(face);
        let interval_ms = self.probing_interval.as_millis() as u64;
        let jittered = self.rng.gen_range(interval_ms * 9 / 10..=interval_ms * 11 / 10);
        ns.set_next_probe_deadline(now + Duration::from_millis(jittered));
    }

    /// Fresh nonce for a probe Interest, never reusing the original's.
    pub fn probe_nonce(&mut self, original: Nonce) -> Nonce {
        let nonce = self.rng.next_u32();
        if nonce == original {
            nonce.wrapping_add(1)
        } else {
            nonce
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::face_info::Rtt;
    use ndn_asf_common::name::Name;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn module(interval: Duration) -> ProbingModule {
        ProbingModule::new(interval, Box::new(StdRng::seed_from_u64(0x5eed)))
    }

    fn ns() -> NamespaceInfo {
        NamespaceInfo::new(Name::from_uri("/hr/C").unwrap())
    }

    #[test]
    fn first_probe_lands_inside_the_window() {
        for seed in 0..32u64 {
            let mut probing = ProbingModule::new(
                DEFAULT_PROBING_INTERVAL,
                Box::new(StdRng::seed_from_u64(seed)),
            );
            let mut info = ns();
            let now = Duration::from_secs(7);
            probing.schedule_first_probe(&mut info, now);
            let deadline = info.next_probe_deadline().unwrap();
            assert!(deadline >= now);
            assert!(deadline <= now + FIRST_PROBE_WINDOW);
        }
    }

    #[test]
    fn first_probe_window_never_exceeds_the_interval() {
        let mut probing = module(Duration::from_secs(1));
        let mut info = ns();
        probing.schedule_first_probe(&mut info, Duration::ZERO);
        assert!(info.next_probe_deadline().unwrap() <= Duration::from_secs(1));
    }

    #[test]
    fn rearm_keeps_existing_deadline() {
        let mut probing = module(DEFAULT_PROBING_INTERVAL);
        let mut info = ns();
        probing.schedule_first_probe(&mut info, Duration::ZERO);
        let first = info.next_probe_deadline().unwrap();
        probing.schedule_first_probe(&mut info, Duration::from_secs(9));
        assert_eq!(info.next_probe_deadline(), Some(first));
    }

    #[test]
    fn needed_only_past_deadline_without_outstanding_probe() {
        let mut probing = module(DEFAULT_PROBING_INTERVAL);
        let mut info = ns();
        assert!(!probing.is_probing_needed(&info, Duration::from_secs(100)));

        info.set_next_probe_deadline(Duration::from_secs(10));
        assert!(!probing.is_probing_needed(&info, Duration::from_secs(9)));
        assert!(probing.is_probing_needed(&info, Duration::from_secs(10)));

        info.set_outstanding_probe(FaceId(3));
        assert!(!probing.is_probing_needed(&info, Duration::from_secs(10)));

        info.clear_outstanding_probe();
        probing.after_probe(&mut info, FaceId(3), Duration::from_secs(10));
        assert!(!probing.is_probing_needed(&info, Duration::from_secs(10)));
    }

    #[test]
    fn rearmed_deadline_is_jittered_around_the_interval() {
        for seed in 0..32u64 {
            let mut probing = ProbingModule::new(
                Duration::from_secs(60),
                Box::new(StdRng::seed_from_u64(seed)),
            );
            let mut info = ns();
            let now = Duration::from_secs(30);
            probing.after_probe(&mut info, FaceId(1), now);
            let deadline = info.next_probe_deadline().unwrap();
            assert!(deadline >= now + Duration::from_secs(54));
            assert!(deadline <= now + Duration::from_secs(66));
        }
    }

    #[test]
    fn probe_face_skips_the_chosen_one() {
        let stats = |face, cost| FaceStats {
            face: FaceId(face),
            rtt: Rtt::NoMeasurement,
            srtt: None,
            cost,
        };
        let ranked = vec![stats(1, 0), stats(2, 1)];
        assert_eq!(
            ProbingModule::select_probe_face(&ranked, FaceId(1)),
            Some(FaceId(2))
        );
        assert_eq!(
            ProbingModule::select_probe_face(&ranked, FaceId(9)),
            Some(FaceId(1))
        );
        assert_eq!(
            ProbingModule::select_probe_face(&ranked[..1], FaceId(1)),
            None
        );
    }

    #[test]
    fn probe_nonce_differs_from_original() {
        let mut probing = module(DEFAULT_PROBING_INTERVAL);
        for original in [0u32, 1, u32::MAX] {
            assert_ne!(probing.probe_nonce(original), original);
        }
    }
}
