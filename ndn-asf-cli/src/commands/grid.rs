//! The two-path grid scenario.
//!
//! A reaches the producer behind C through B (10 ms legs, cost 10) and
//! through D (100 ms legs, cost 5). ASF starts on the cheap slow route,
//! probes the fast one, and moves over; with `--fail` the fast link is then
//! cut to show timeout-driven failover.

use anyhow::{Context, Result};
use log::info;
use ndn_asf_common::metrics::FaceCountersSnapshot;
use ndn_asf_common::name::Name;
use ndn_asf_fwd::sim::Topology;
use serde::Serialize;
use std::time::Duration;

use super::make_strategy;

#[derive(Debug, Serialize)]
struct PhaseReport {
    phase: &'static str,
    sim_seconds: u64,
    consumer_data: u64,
    via_fast: FaceCountersSnapshot,
    via_slow: FaceCountersSnapshot,
}

pub fn run(
    count: u32,
    interval: u64,
    params: Option<&str>,
    seed: Option<u64>,
    fail: bool,
    json: bool,
) -> Result<()> {
    let prefix = Name::from_uri("/hr/C")?;
    let mut topo = Topology::new();
    let a = topo.add_forwarder("A", make_strategy(params, seed)?);
    let b = topo.add_forwarder("B", make_strategy(params, seed)?);
    let c = topo.add_forwarder("C", make_strategy(params, seed)?);
    let d = topo.add_forwarder("D", make_strategy(params, seed)?);

    let link_ab = topo.add_link(Duration::from_millis(10), a, b);
    let link_ad = topo.add_link(Duration::from_millis(100), a, d);
    let link_bc = topo.add_link(Duration::from_millis(10), b, c);
    let link_cd = topo.add_link(Duration::from_millis(100), c, d);

    let consumer = topo.add_app_face(a);
    let producer = topo.add_app_face(c);
    topo.add_echo_producer(producer, &prefix, Duration::ZERO);

    let face_ab = topo.link_face(link_ab, a).context("A is on link AB")?;
    let face_ad = topo.link_face(link_ad, a).context("A is on link AD")?;
    topo.register_prefix(a, face_ab, &prefix, 10);
    topo.register_prefix(a, face_ad, &prefix, 5);
    let face_bc = topo.link_face(link_bc, b).context("B is on link BC")?;
    topo.register_prefix(b, face_bc, &prefix, 0);
    let face_cd = topo.link_face(link_cd, d).context("D is on link CD")?;
    topo.register_prefix(d, face_cd, &prefix, 0);

    let step = Duration::from_millis(10);
    let batch_seconds = count as u64 * interval;
    let mut reports = Vec::new();

    info!("running {count} Interests at {interval}s intervals");
    topo.add_interval_consumer(consumer, &prefix, Duration::from_secs(interval), count);
    topo.advance(step, Duration::from_secs(batch_seconds));
    reports.push(PhaseReport {
        phase: "adaptation",
        sim_seconds: topo.now().as_secs(),
        consumer_data: topo.app_counters(consumer).n_out_data,
        via_fast: topo.link_counters(link_ab, a),
        via_slow: topo.link_counters(link_ad, a),
    });

    if fail {
        info!("failing the fast link and running another batch");
        topo.fail_link(link_ab);
        topo.add_interval_consumer(consumer, &prefix, Duration::from_secs(interval), count);
        topo.advance(step, Duration::from_secs(batch_seconds));
        reports.push(PhaseReport {
            phase: "failover",
            sim_seconds: topo.now().as_secs(),
            consumer_data: topo.app_counters(consumer).n_out_data,
            via_fast: topo.link_counters(link_ab, a),
            via_slow: topo.link_counters(link_ad, a),
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!("Grid scenario ({count} Interests per batch)");
    println!("==========================================");
    for report in &reports {
        println!();
        println!("[{}] at t={}s", report.phase, report.sim_seconds);
        println!("  Data delivered to consumer: {}", report.consumer_data);
        println!(
            "  Egress via fast path (A-B): {} Interests, {} Data back",
            report.via_fast.n_out_interests, report.via_fast.n_in_data
        );
        println!(
            "  Egress via slow path (A-D): {} Interests, {} Data back",
            report.via_slow.n_out_interests, report.via_slow.n_in_data
        );
    }
    Ok(())
}
