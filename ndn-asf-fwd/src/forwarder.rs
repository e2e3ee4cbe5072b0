//! Single-node packet and timer dispatch.
//!
//! The forwarder owns the tables and one strategy instance. Every incoming
//! packet updates the PIT, is handed to the strategy, and whatever the
//! strategy (or the Data fan-out) decides to transmit is collected as
//! [`Emission`]s for the embedding (the topology simulator or the CLI) to
//! move across links.

use crate::clock::{Scheduler, Timestamp};
use crate::strategy::{Strategy, StrategyCtx, StrategyRegistry};
use crate::tables::{Fib, MeasurementTree, Pit};
use log::{debug, trace};
use ndn_asf_common::metrics::FaceCounters;
use ndn_asf_common::name::Name;
use ndn_asf_common::packet::{Data, Interest, Nack, Packet};
use ndn_asf_common::types::FaceId;
use ndn_asf_common::Result;
use std::collections::HashMap;

/// A packet the forwarder wants transmitted on one of its faces.
#[derive(Debug, Clone)]
pub struct Emission {
    pub face: FaceId,
    pub packet: Packet,
}

/// A forwarder: faces, tables, and one strategy.
pub struct Forwarder {
    faces: HashMap<FaceId, FaceCounters>,
    next_face_id: u64,
    fib: Fib,
    pit: Pit,
    measurements: MeasurementTree,
    scheduler: Scheduler,
    strategy: Option<Box<dyn Strategy>>,
    emissions: Vec<Emission>,
}

impl Forwarder {
    pub fn new(strategy: Box<dyn Strategy>) -> Self {
        let measurements = MeasurementTree::new(strategy.measurements_lifetime());
        Self {
            faces: HashMap::new(),
            next_face_id: 1,
            fib: Fib::new(),
            pit: Pit::new(),
            measurements,
            scheduler: Scheduler::new(),
            strategy: Some(strategy),
            emissions: Vec::new(),
        }
    }

    /// Instantiates the strategy named `strategy_name` from `registry`.
    pub fn from_registry(registry: &StrategyRegistry, strategy_name: &Name) -> Result<Self> {
        Ok(Self::new(registry.create(strategy_name)?))
    }

    /// Creates a face and returns its id.
    pub fn add_face(&mut self) -> FaceId {
        let face = FaceId(self.next_face_id);
        self.next_face_id += 1;
        self.faces.insert(face, FaceCounters::new());
        face
    }

    pub fn register_route(&mut self, prefix: Name, face: FaceId, cost: u32) {
        self.fib.register_route(prefix, face, cost);
    }

    pub fn unregister_route(&mut self, prefix: &Name, face: FaceId) {
        self.fib.unregister_route(prefix, face);
    }

    pub fn face_counters(&self, face: FaceId) -> Option<&FaceCounters> {
        self.faces.get(&face)
    }

    pub fn pit(&self) -> &Pit {
        &self.pit
    }

    /// Feeds an incoming packet from `ingress` into the pipeline.
    pub fn receive(&mut self, now: Timestamp, ingress: FaceId, packet: Packet) {
        let Some(counters) = self.faces.get(&ingress) else {
            debug!("drop {} from unknown {}", packet.packet_type(), ingress);
            return;
        };
        match &packet {
            Packet::Interest(_) => counters.n_in_interests.increment(),
            Packet::Data(_) => counters.n_in_data.increment(),
            Packet::Nack(_) => counters.n_in_nacks.increment(),
        }
        match packet {
            Packet::Interest(interest) => self.on_incoming_interest(now, ingress, interest),
            Packet::Data(data) => self.on_incoming_data(now, ingress, data),
            Packet::Nack(nack) => self.on_incoming_nack(now, ingress, nack),
        }
    }

    /// Fires due timers and expires PIT entries.
    pub fn poll(&mut self, now: Timestamp) {
        while let Some(event) = self.scheduler.pop_due(now) {
            self.with_strategy(now, |strategy, ctx| strategy.handle_timer(ctx, event));
        }
        self.pit.prune_expired(now);
    }

    /// Earliest pending timer, for embeddings that want to sleep.
    pub fn next_timer_due(&self) -> Option<Timestamp> {
        self.scheduler.next_due()
    }

    /// Hands over everything queued for transmission, bumping the out
    /// counters of the emitting faces.
    pub fn drain_emissions(&mut self) -> Vec<Emission> {
        let emissions = std::mem::take(&mut self.emissions);
        for emission in &emissions {
            if let Some(counters) = self.faces.get(&emission.face) {
                match &emission.packet {
                    Packet::Interest(_) => counters.n_out_interests.increment(),
                    Packet::Data(_) => counters.n_out_data.increment(),
                    Packet::Nack(_) => counters.n_out_nacks.increment(),
                }
            }
        }
        emissions
    }

    fn with_strategy(
        &mut self,
        now: Timestamp,
        handler: impl FnOnce(&mut dyn Strategy, &mut StrategyCtx<'_>),
    ) {
        let Some(mut strategy) = self.strategy.take() else {
            return;
        };
        let mut ctx = StrategyCtx::new(
            now,
            &self.fib,
            &mut self.pit,
            &mut self.measurements,
            &mut self.scheduler,
            &mut self.emissions,
        );
        handler(strategy.as_mut(), &mut ctx);
        self.strategy = Some(strategy);
    }

    fn on_incoming_interest(&mut self, now: Timestamp, ingress: FaceId, interest: Interest) {
        trace!("interest {} nonce={} from {}", interest.name, interest.nonce, ingress);
        let entry = self.pit.find_or_create(&interest.name);
        entry.insert_in_record(ingress, interest.nonce, now + interest.lifetime);
        self.with_strategy(now, |strategy, ctx| {
            strategy.after_receive_interest(ctx, &interest, ingress)
        });
    }

    fn on_incoming_data(&mut self, now: Timestamp, ingress: FaceId, data: Data) {
        let Some(entry) = self.pit.get(&data.name) else {
            trace!("unsolicited data {} from {}", data.name, ingress);
            return;
        };
        let already_satisfied = entry.is_satisfied();
        self.with_strategy(now, |strategy, ctx| {
            strategy.before_satisfy_interest(ctx, &data, ingress)
        });

        if already_satisfied {
            // Straggler from a slower upstream; measured above, not relayed.
            return;
        }
        let Some(entry) = self.pit.get_mut(&data.name) else {
            return;
        };
        entry.mark_satisfied();
        let downstreams: Vec<FaceId> = entry
            .in_records()
            .iter()
            .filter(|r| r.face != ingress && r.expiry > now)
            .map(|r| r.face)
            .collect();
        trace!("data {} from {} to {} downstream(s)", data.name, ingress, downstreams.len());
        for face in downstreams {
            self.emissions.push(Emission {
                face,
                packet: Packet::Data(data.clone()),
            });
        }
        self.with_strategy(now, |strategy, ctx| {
            strategy.after_receive_data(ctx, &data, ingress)
        });
    }

    fn on_incoming_nack(&mut self, now: Timestamp, ingress: FaceId, nack: Nack) {
        let matches = self
            .pit
            .get(&nack.interest.name)
            .and_then(|entry| entry.out_record(ingress))
            .is_some_and(|record| record.last_nonce == nack.interest.nonce);
        if !matches {
            trace!(
                "drop nack {} from {}: no matching out-record",
                nack.interest.name,
                ingress
            );
            return;
        }
        self.with_strategy(now, |strategy, ctx| {
            strategy.after_receive_nack(ctx, &nack, ingress)
        });
    }
}
