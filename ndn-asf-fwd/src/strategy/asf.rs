//! The Adaptive SRTT-based Forwarding strategy.
//!
//! ASF forwards every Interest on the face with the best measured RTT for
//! its namespace, explores the alternatives with periodic probes, suppresses
//! tight retransmissions per upstream, and demotes faces that keep timing
//! out. Measurement state hangs off the forwarder's measurements tree and
//! ages out with it.

use crate::clock::{TimerEvent, Timestamp};
use crate::strategy::face_info::{
    compare_for_forwarding, compare_for_probing, AsfMeasurements, FaceStats,
};
use crate::strategy::params::AsfParameters;
use crate::strategy::probing::ProbingModule;
use crate::strategy::retx::{RetxSuppressionExponential, RetxSuppressionResult};
use crate::strategy::{Strategy, StrategyCtx};
use crate::tables::fib::NextHop;
use crate::tables::measurements::EntryId;
use log::{debug, trace};
use ndn_asf_common::name::Name;
use ndn_asf_common::packet::{Data, Interest, Nack, NackReason};
use ndn_asf_common::types::{FaceId, Nonce};
use ndn_asf_common::Result;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::cmp::Ordering;
use std::time::Duration;

/// Adaptive SRTT-based forwarding.
#[derive(Debug)]
pub struct AsfStrategy {
    params: AsfParameters,
    measurements: AsfMeasurements,
    probing: ProbingModule,
    retx: RetxSuppressionExponential,
}

impl AsfStrategy {
    /// The versioned strategy name configuration components append to.
    pub fn strategy_name() -> Name {
        Name::root()
            .append("strategy")
            .append("asf")
            .append("v=4")
    }

    /// Builds an instance from its (possibly parameterised) strategy name.
    ///
    /// The RNG drives probe timing jitter and probe nonces; inject a seeded
    /// one for reproducible runs.
    pub fn new(instance_name: &Name, rng: Box<dyn RngCore>) -> Result<Self> {
        let params = AsfParameters::parse(instance_name, &Self::strategy_name())?;
        Ok(Self {
            params,
            measurements: AsfMeasurements::new(),
            probing: ProbingModule::new(params.probing_interval, rng),
            retx: RetxSuppressionExponential::default(),
        })
    }

    /// Like [`AsfStrategy::new`] with an OS-seeded RNG.
    pub fn from_entropy(instance_name: &Name) -> Result<Self> {
        Self::new(instance_name, Box::new(StdRng::from_entropy()))
    }

    pub fn params(&self) -> &AsfParameters {
        &self.params
    }

    /// Ranked candidate list for `hops` under the namespace's measurements.
    fn ranked(
        &self,
        ns_id: EntryId,
        hops: &[NextHop],
        compare: fn(&FaceStats, &FaceStats) -> Ordering,
    ) -> Vec<FaceStats> {
        let Some(ns) = self.measurements.get(ns_id) else {
            return Vec::new();
        };
        let mut stats: Vec<FaceStats> = hops
            .iter()
            .map(|hop| ns.face_stats(hop.face, hop.cost))
            .collect();
        stats.sort_by(compare);
        stats
    }

    /// Sends `interest` on `face` and arms the RTO timer for the pair if one
    /// is not already pending.
    fn forward_interest(
        &mut self,
        ctx: &mut StrategyCtx<'_>,
        interest: &Interest,
        face: FaceId,
        ns_id: EntryId,
        is_probe: bool,
    ) {
        trace!("forward {} to {} probe={}", interest.name, face, is_probe);
        ctx.send_interest(face, interest.clone(), is_probe);
        ctx.measurements.extend_lifetime(&interest.name, ctx.now);

        let Some(ns) = self.measurements.get_mut(ns_id) else {
            return;
        };
        let info = ns.get_or_create_face_info(face);
        if !info.is_timeout_armed() {
            let generation = info.arm_timeout();
            let rto = info.rto();
            ctx.scheduler.schedule(
                ctx.now,
                rto,
                TimerEvent::RtoTimeout {
                    name: interest.name.clone(),
                    face,
                    generation,
                },
            );
        }
    }

    /// Sends an extra copy of `interest` on a probe face when a probe is due
    /// and a face other than `chosen` exists.
    fn maybe_send_probe(
        &mut self,
        ctx: &mut StrategyCtx<'_>,
        interest: &Interest,
        chosen: FaceId,
        ns_id: EntryId,
        eligible: &[NextHop],
    ) {
        let needed = match self.measurements.get(ns_id) {
            Some(ns) => self.probing.is_probing_needed(ns, ctx.now),
            None => false,
        };
        if !needed {
            return;
        }

        let ranked = self.ranked(ns_id, eligible, compare_for_probing);
        let Some(probe_face) = ProbingModule::select_probe_face(&ranked, chosen) else {
            return;
        };

        let probe = interest
            .clone()
            .with_nonce(self.probing.probe_nonce(interest.nonce));
        debug!("probe {} via {}", probe.name, probe_face);
        self.forward_interest(ctx, &probe, probe_face, ns_id, true);
        if let Some(ns) = self.measurements.get_mut(ns_id) {
            self.probing.after_probe(ns, probe_face, ctx.now);
        }
    }

    fn send_no_route(&mut self, ctx: &mut StrategyCtx<'_>, interest: &Interest, ingress: FaceId) {
        debug!("no route for {} from {}", interest.name, ingress);
        ctx.send_nack(ingress, Nack::new(interest.clone(), NackReason::NoRoute));
        ctx.pit.erase(&interest.name);
    }

    /// Relays `nack` to every live downstream and gives up on the entry.
    fn relay_nack(&mut self, ctx: &mut StrategyCtx<'_>, nack: &Nack) {
        let Some(entry) = ctx.pit.get(&nack.interest.name) else {
            return;
        };
        let now = ctx.now;
        let targets: Vec<(FaceId, Nonce)> = entry
            .in_records()
            .iter()
            .filter(|r| r.expiry > now)
            .map(|r| (r.face, r.nonce))
            .collect();
        for (face, nonce) in targets {
            ctx.send_nack(
                face,
                Nack::new(nack.interest.clone().with_nonce(nonce), nack.reason),
            );
        }
        ctx.pit.erase(&nack.interest.name);
    }
}

impl Strategy for AsfStrategy {
    fn after_receive_interest(
        &mut self,
        ctx: &mut StrategyCtx<'_>,
        interest: &Interest,
        ingress: FaceId,
    ) {
        self.measurements.prune(ctx.measurements, ctx.now);

        let Some((prefix, hops)) = ctx.fib.longest_prefix_match(&interest.name) else {
            self.send_no_route(ctx, interest, ingress);
            return;
        };
        let prefix = prefix.clone();
        let eligible: Vec<NextHop> = hops
            .iter()
            .copied()
            .filter(|hop| hop.face != ingress)
            .collect();
        if eligible.is_empty() {
            self.send_no_route(ctx, interest, ingress);
            return;
        }

        let (ns_id, _) = self
            .measurements
            .get_or_create(ctx.measurements, &prefix, ctx.now);
        if let Some(ns) = self.measurements.get_mut(ns_id) {
            self.probing.schedule_first_probe(ns, ctx.now);
        }

        let is_retx = ctx
            .pit
            .get(&interest.name)
            .is_some_and(|entry| entry.has_out_records());

        let ranked = self.ranked(ns_id, &eligible, compare_for_forwarding);

        if !is_retx {
            let Some(best) = ranked.first().map(|stats| stats.face) else {
                return;
            };
            self.forward_interest(ctx, interest, best, ns_id, false);
            self.maybe_send_probe(ctx, interest, best, ns_id, &eligible);
            return;
        }

        // Retransmission: take the first upstream in ranking order that the
        // per-upstream suppression admits.
        for stats in &ranked {
            let decision = match ctx.pit.get_mut(&interest.name) {
                Some(entry) => self.retx.decide_per_upstream(entry, stats.face, ctx.now),
                None => return,
            };
            match decision {
                RetxSuppressionResult::New => {
                    self.forward_interest(ctx, interest, stats.face, ns_id, false);
                    return;
                }
                RetxSuppressionResult::Forward => {
                    if let Some(entry) = ctx.pit.get_mut(&interest.name) {
                        self.retx.increment_interval(entry, stats.face);
                    }
                    self.forward_interest(ctx, interest, stats.face, ns_id, false);
                    return;
                }
                RetxSuppressionResult::Suppress => {
                    trace!("retx suppressed {} towards {}", interest.name, stats.face);
                }
            }
        }
        debug!("all upstreams suppressed for {}", interest.name);
    }

    fn before_satisfy_interest(
        &mut self,
        ctx: &mut StrategyCtx<'_>,
        data: &Data,
        ingress: FaceId,
    ) {
        self.measurements.prune(ctx.measurements, ctx.now);
        let now = ctx.now;

        let sample = ctx
            .pit
            .get(&data.name)
            .and_then(|entry| entry.out_record(ingress))
            .map(|record| now.saturating_sub(record.last_tx_time));

        let Some(ns) = self.measurements.lookup_mut(ctx.measurements, &data.name, now) else {
            return;
        };
        if let Some(info) = ns.face_info_mut(ingress) {
            match sample {
                Some(rtt) => {
                    trace!("rtt {} via {}: {:?}", data.name, ingress, rtt);
                    info.record_rtt(rtt);
                }
                // The out-record is gone; all we can do is stop the timer.
                None => info.cancel_timeout(),
            }
        }
        if ns.outstanding_probe() == Some(ingress) {
            ns.clear_outstanding_probe();
        }
        ctx.measurements.extend_lifetime(&data.name, now);
    }

    fn after_receive_nack(&mut self, ctx: &mut StrategyCtx<'_>, nack: &Nack, ingress: FaceId) {
        self.measurements.prune(ctx.measurements, ctx.now);
        let name = nack.interest.name.clone();
        let now = ctx.now;
        debug!("nack {:?} for {} from {}", nack.reason, name, ingress);

        if !nack.reason.is_recoverable() {
            self.relay_nack(ctx, nack);
            return;
        }

        if let Some(ns) = self.measurements.lookup_mut(ctx.measurements, &name, now) {
            if let Some(info) = ns.face_info_mut(ingress) {
                info.record_nack();
            }
            if ns.outstanding_probe() == Some(ingress) {
                ns.clear_outstanding_probe();
            }
        }

        // Try one upstream this entry has not been sent to yet.
        if let Some((prefix, hops)) = ctx.fib.longest_prefix_match(&name) {
            let prefix = prefix.clone();
            let (tried, downstreams) = match ctx.pit.get(&name) {
                Some(entry) => (
                    entry
                        .out_records()
                        .iter()
                        .map(|r| r.face)
                        .collect::<Vec<_>>(),
                    entry.in_records().iter().map(|r| r.face).collect::<Vec<_>>(),
                ),
                None => return,
            };
            let untried: Vec<NextHop> = hops
                .iter()
                .copied()
                .filter(|hop| {
                    hop.face != ingress
                        && !tried.contains(&hop.face)
                        && !downstreams.contains(&hop.face)
                })
                .collect();
            if !untried.is_empty() {
                let (ns_id, _) = self
                    .measurements
                    .get_or_create(ctx.measurements, &prefix, now);
                let ranked = self.ranked(ns_id, &untried, compare_for_forwarding);
                if let Some(stats) = ranked.first() {
                    debug!("nack recovery: {} via {}", name, stats.face);
                    self.forward_interest(ctx, &nack.interest, stats.face, ns_id, false);
                    return;
                }
            }
        }

        // Another upstream may still answer; hold the Nack back for it.
        let other_pending = ctx.pit.get(&name).is_some_and(|entry| {
            entry
                .out_records()
                .iter()
                .any(|r| r.face != ingress && !r.is_expired(now))
        });
        if other_pending {
            return;
        }
        self.relay_nack(ctx, nack);
    }

    fn handle_timer(&mut self, ctx: &mut StrategyCtx<'_>, event: TimerEvent) {
        let TimerEvent::RtoTimeout {
            name,
            face,
            generation,
        } = event;
        self.measurements.prune(ctx.measurements, ctx.now);

        let max_timeouts = self.params.max_timeouts;
        let Some(ns) = self.measurements.lookup_mut(ctx.measurements, &name, ctx.now) else {
            return;
        };
        let Some(info) = ns.face_info_mut(face) else {
            return;
        };
        if !info.claim_timeout(generation) {
            return;
        }
        let timeouts = info.increment_timeouts();
        debug!("timeout {} via {} ({}/{})", name, face, timeouts, max_timeouts);
        if timeouts >= max_timeouts {
            info.record_timeout();
        }
        if ns.outstanding_probe() == Some(face) {
            ns.clear_outstanding_probe();
        }
    }

    fn measurements_lifetime(&self) -> Duration {
        self.params.measurements_lifetime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn strategy(suffix: &str) -> Result<AsfStrategy> {
        let mut name = AsfStrategy::strategy_name();
        if !suffix.is_empty() {
            name = name.append_name(&Name::from_uri(suffix).unwrap());
        }
        AsfStrategy::new(&name, Box::new(StdRng::seed_from_u64(1)))
    }

    #[test]
    fn default_construction() {
        let asf = strategy("").unwrap();
        assert_eq!(asf.params().probing_interval, Duration::from_secs(60));
        assert_eq!(asf.params().max_timeouts, 3);
        assert_eq!(asf.measurements_lifetime(), Duration::from_secs(300));
        assert_eq!(
            asf.retx.initial_interval,
            crate::strategy::retx::DEFAULT_INITIAL_INTERVAL
        );
        assert_eq!(
            asf.retx.max_interval,
            crate::strategy::retx::DEFAULT_MAX_INTERVAL
        );
        assert_eq!(asf.retx.multiplier, crate::strategy::retx::DEFAULT_MULTIPLIER);
    }

    #[test]
    fn parameterised_construction() {
        let asf = strategy("/probing-interval~30000/max-timeouts~5").unwrap();
        assert_eq!(asf.params().probing_interval, Duration::from_secs(30));
        assert_eq!(asf.params().max_timeouts, 5);
        assert_eq!(asf.measurements_lifetime(), Duration::from_secs(300));
    }

    #[test]
    fn invalid_parameters_fail_construction() {
        assert!(strategy("/probing-interval~500").is_err());
        assert!(strategy("/max-timeouts~-1").is_err());
        assert!(strategy("/measurements-lifetime~1000").is_err());
    }
}
