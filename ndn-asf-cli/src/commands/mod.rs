//! Scenario command implementations.

pub mod grid;
pub mod nack;
pub mod suppression;

use anyhow::{Context, Result};
use ndn_asf_common::name::Name;
use ndn_asf_fwd::sim::MidpointRng;
use ndn_asf_fwd::strategy::{AsfStrategy, Strategy};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Builds an ASF instance from an optional parameter suffix and seed.
///
/// Without a seed the probe timing uses the deterministic midpoint RNG, so
/// repeated runs print identical reports.
pub fn make_strategy(params: Option<&str>, seed: Option<u64>) -> Result<Box<dyn Strategy>> {
    let mut name = AsfStrategy::strategy_name();
    if let Some(suffix) = params {
        let suffix = Name::from_uri(suffix)
            .with_context(|| format!("invalid parameter suffix {suffix:?}"))?;
        name = name.append_name(&suffix);
    }
    let strategy = match seed {
        Some(seed) => AsfStrategy::new(&name, Box::new(StdRng::seed_from_u64(seed))),
        None => AsfStrategy::new(&name, Box::new(MidpointRng)),
    }
    .context("failed to construct the strategy")?;
    Ok(Box::new(strategy))
}
