//! Forwarding strategies.
//!
//! A strategy is the policy half of the forwarder: the dispatch half calls
//! into it on every Interest, Data, Nack, and timer event, and the strategy
//! answers by sending packets through the [`StrategyCtx`]. Strategies are
//! instantiated by name through an explicit [`StrategyRegistry`].

pub mod asf;
pub mod face_info;
pub mod params;
pub mod probing;
pub mod retx;

use crate::clock::{Scheduler, TimerEvent, Timestamp};
use crate::forwarder::Emission;
use crate::tables::{Fib, MeasurementTree, Pit};
use ndn_asf_common::name::Name;
use ndn_asf_common::packet::{Data, Interest, Nack, Packet};
use ndn_asf_common::types::FaceId;
use ndn_asf_common::{Error, Result};
use std::time::Duration;

pub use asf::AsfStrategy;

/// Everything a strategy may touch while handling one event.
pub struct StrategyCtx<'a> {
    pub now: Timestamp,
    pub fib: &'a Fib,
    pub pit: &'a mut Pit,
    pub measurements: &'a mut MeasurementTree,
    pub scheduler: &'a mut Scheduler,
    emissions: &'a mut Vec<Emission>,
}

impl<'a> StrategyCtx<'a> {
    pub(crate) fn new(
        now: Timestamp,
        fib: &'a Fib,
        pit: &'a mut Pit,
        measurements: &'a mut MeasurementTree,
        scheduler: &'a mut Scheduler,
        emissions: &'a mut Vec<Emission>,
    ) -> Self {
        Self {
            now,
            fib,
            pit,
            measurements,
            scheduler,
            emissions,
        }
    }

    /// Sends `interest` on `face`, recording the transmission in the PIT
    /// entry's out-record.
    pub fn send_interest(&mut self, face: FaceId, interest: Interest, is_probe: bool) {
        if let Some(entry) = self.pit.get_mut(&interest.name) {
            entry.insert_out_record(face, interest.nonce, self.now, interest.lifetime, is_probe);
        }
        self.emissions.push(Emission {
            face,
            packet: Packet::Interest(interest),
        });
    }

    /// Sends `nack` downstream on `face`.
    pub fn send_nack(&mut self, face: FaceId, nack: Nack) {
        self.emissions.push(Emission {
            face,
            packet: Packet::Nack(nack),
        });
    }
}

/// The capability set every forwarding strategy implements.
pub trait Strategy {
    /// An Interest arrived and the PIT entry (new or existing) is in place.
    fn after_receive_interest(
        &mut self,
        ctx: &mut StrategyCtx<'_>,
        interest: &Interest,
        ingress: FaceId,
    );

    /// Data arrived that satisfies the PIT entry; called before the
    /// forwarder fans the Data out downstream.
    fn before_satisfy_interest(&mut self, ctx: &mut StrategyCtx<'_>, data: &Data, ingress: FaceId);

    /// Data was accepted and relayed. Strategies that need more than the
    /// measurement bookkeeping of [`Strategy::before_satisfy_interest`] can
    /// hook in here.
    fn after_receive_data(&mut self, ctx: &mut StrategyCtx<'_>, data: &Data, ingress: FaceId) {
        let _ = (ctx, data, ingress);
    }

    /// A Nack arrived from an upstream the Interest was forwarded to.
    fn after_receive_nack(&mut self, ctx: &mut StrategyCtx<'_>, nack: &Nack, ingress: FaceId);

    /// A timer the strategy scheduled came due.
    fn handle_timer(&mut self, ctx: &mut StrategyCtx<'_>, event: TimerEvent);

    /// Retention lifetime the forwarder applies to the measurements tree.
    fn measurements_lifetime(&self) -> Duration {
        crate::tables::measurements::DEFAULT_LIFETIME
    }
}

type StrategyFactory = Box<dyn Fn(&Name) -> Result<Box<dyn Strategy>>>;

/// Explicit name-to-factory table, passed to forwarders at start-up.
#[derive(Default)]
pub struct StrategyRegistry {
    factories: Vec<(Name, StrategyFactory)>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in strategy registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(AsfStrategy::strategy_name(), |instance| {
            Ok(Box::new(AsfStrategy::from_entropy(instance)?))
        });
        registry
    }

    /// Registers `factory` for instance names starting with `prefix`.
    pub fn register(
        &mut self,
        prefix: Name,
        factory: impl Fn(&Name) -> Result<Box<dyn Strategy>> + 'static,
    ) {
        self.factories.push((prefix, Box::new(factory)));
    }

    /// Instantiates the strategy whose registered name is the longest prefix
    /// of `instance_name`.
    pub fn create(&self, instance_name: &Name) -> Result<Box<dyn Strategy>> {
        let best = self
            .factories
            .iter()
            .filter(|(prefix, _)| prefix.is_prefix_of(instance_name))
            .max_by_key(|(prefix, _)| prefix.len());
        match best {
            Some((_, factory)) => factory(instance_name),
            None => Err(Error::InvalidArgument(format!(
                "no strategy registered for {instance_name}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_by_longest_prefix() {
        let registry = StrategyRegistry::with_builtins();
        let name = AsfStrategy::strategy_name().append("max-timeouts~5");
        assert!(registry.create(&name).is_ok());
        assert!(registry
            .create(&Name::from_uri("/strategy/unknown").unwrap())
            .is_err());
    }

    #[test]
    fn registry_propagates_construction_errors() {
        let registry = StrategyRegistry::with_builtins();
        let name = AsfStrategy::strategy_name().append("probing-interval~500");
        assert!(registry.create(&name).is_err());
    }
}
