//! The retransmission suppression sequence.
//!
//! Six retransmissions of one Interest on the triangle A-B-P, spaced so the
//! per-upstream windows admit exactly (1,0) (1,1) (1,1) (1,1) (2,1) (2,2)
//! cumulative sends towards B and P.

use anyhow::{Context, Result};
use ndn_asf_common::name::Name;
use ndn_asf_common::packet::Interest;
use ndn_asf_fwd::sim::Topology;
use serde::Serialize;
use std::time::Duration;

use super::make_strategy;

#[derive(Debug, Serialize)]
struct SuppressionReport {
    sequence: Vec<(u64, u64)>,
}

pub fn run(json: bool) -> Result<()> {
    let prefix = Name::from_uri("/suppress/me")?;
    let mut topo = Topology::new();
    let a = topo.add_forwarder("A", make_strategy(None, None)?);
    let b = topo.add_forwarder("B", make_strategy(None, None)?);
    let p = topo.add_forwarder("P", make_strategy(None, None)?);

    let link_ab = topo.add_link(Duration::from_millis(50), a, b);
    let link_ap = topo.add_link(Duration::from_millis(50), a, p);
    let link_bp = topo.add_link(Duration::from_millis(50), b, p);

    let consumer = topo.add_app_face(a);
    let producer = topo.add_app_face(p);
    topo.add_echo_producer(producer, &prefix, Duration::ZERO);

    let face_ap = topo.link_face(link_ap, a).context("A is on link AP")?;
    let face_ab = topo.link_face(link_ab, a).context("A is on link AB")?;
    topo.register_prefix(a, face_ap, &prefix, 10);
    topo.register_prefix(a, face_ab, &prefix, 1);
    let face_bp = topo.link_face(link_bp, b).context("B is on link BP")?;
    topo.register_prefix(b, face_bp, &prefix, 1);

    let name = prefix.clone().append("retx");
    let step = Duration::from_millis(1);
    let mut sequence = Vec::new();

    // (gap before sending, Interest lifetime)
    let schedule = [
        (0u64, 5u64),
        (0, 100),
        (1, 100),
        (2, 100),
        (5, 100),
        (10, 100),
    ];
    for (gap, lifetime) in schedule {
        topo.advance(step, Duration::from_millis(gap));
        let nonce = topo.fresh_nonce();
        topo.express_interest(
            consumer,
            Interest::new(name.clone(), nonce).with_lifetime(Duration::from_millis(lifetime)),
        );
        topo.advance(step, step);
        sequence.push((
            topo.link_counters(link_ab, a).n_out_interests,
            topo.link_counters(link_ap, a).n_out_interests,
        ));
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&SuppressionReport { sequence })?
        );
        return Ok(());
    }

    println!("Per-upstream suppression sequence");
    println!("=================================");
    println!("  cumulative egress (via B, via P) after each retransmission:");
    for (i, (via_b, via_p)) in sequence.iter().enumerate() {
        println!("  #{}: ({via_b}, {via_p})", i + 1);
    }
    Ok(())
}
