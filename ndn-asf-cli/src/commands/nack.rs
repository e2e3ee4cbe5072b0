//! The dead-end route scenario.
//!
//! Same grid as `grid`, but D has no route to the producer: the cheaper
//! route answers with NoRoute Nacks and the strategy redirects to B.

use anyhow::{Context, Result};
use log::info;
use ndn_asf_common::name::Name;
use ndn_asf_fwd::sim::Topology;
use serde::Serialize;
use std::time::Duration;

use super::make_strategy;

#[derive(Debug, Serialize)]
struct NackReport {
    consumer_data: u64,
    nacks_from_dead_end: u64,
    via_dead_end: u64,
    via_working: u64,
}

pub fn run(count: u32, seed: Option<u64>, json: bool) -> Result<()> {
    let prefix = Name::from_uri("/hr/C")?;
    let mut topo = Topology::new();
    let a = topo.add_forwarder("A", make_strategy(None, seed)?);
    let b = topo.add_forwarder("B", make_strategy(None, seed)?);
    let c = topo.add_forwarder("C", make_strategy(None, seed)?);
    let d = topo.add_forwarder("D", make_strategy(None, seed)?);

    let link_ab = topo.add_link(Duration::from_millis(10), a, b);
    let link_ad = topo.add_link(Duration::from_millis(100), a, d);
    let link_bc = topo.add_link(Duration::from_millis(10), b, c);
    let _link_cd = topo.add_link(Duration::from_millis(100), c, d);

    let consumer = topo.add_app_face(a);
    let producer = topo.add_app_face(c);
    topo.add_echo_producer(producer, &prefix, Duration::ZERO);

    let face_ab = topo.link_face(link_ab, a).context("A is on link AB")?;
    let face_ad = topo.link_face(link_ad, a).context("A is on link AD")?;
    topo.register_prefix(a, face_ab, &prefix, 10);
    topo.register_prefix(a, face_ad, &prefix, 5);
    let face_bc = topo.link_face(link_bc, b).context("B is on link BC")?;
    topo.register_prefix(b, face_bc, &prefix, 0);
    // D gets no route on purpose.

    info!("running {count} Interests against a dead-end preferred route");
    topo.add_interval_consumer(consumer, &prefix, Duration::from_secs(1), count);
    topo.advance(
        Duration::from_millis(10),
        Duration::from_secs(count as u64),
    );

    let report = NackReport {
        consumer_data: topo.app_counters(consumer).n_out_data,
        nacks_from_dead_end: topo.link_counters(link_ad, a).n_in_nacks,
        via_dead_end: topo.link_counters(link_ad, a).n_out_interests,
        via_working: topo.link_counters(link_ab, a).n_out_interests,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Dead-end route scenario ({count} Interests)");
    println!("===========================================");
    println!("  Data delivered to consumer: {}", report.consumer_data);
    println!("  NoRoute Nacks from A-D:     {}", report.nacks_from_dead_end);
    println!("  Egress via dead end (A-D):  {}", report.via_dead_end);
    println!("  Egress via working (A-B):   {}", report.via_working);
    Ok(())
}
