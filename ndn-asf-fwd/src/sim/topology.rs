//! The topology simulator.
//!
//! Nodes are [`Forwarder`]s; links are point-to-point with a fixed one-way
//! delay and can be failed and recovered mid-run. App faces attach echo
//! producers and interval consumers. [`Topology::advance`] moves the virtual
//! clock in fixed steps, delivering packets and firing timers until each
//! step is quiescent.

use crate::clock::Timestamp;
use crate::forwarder::{Emission, Forwarder};
use crate::strategy::Strategy;
use log::trace;
use ndn_asf_common::metrics::FaceCountersSnapshot;
use ndn_asf_common::name::Name;
use ndn_asf_common::packet::{Data, Interest, Packet};
use ndn_asf_common::types::{FaceId, Nonce};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

/// Handle of a node in the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Handle of a link between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub usize);

/// Handle of an application face (consumer or producer attachment point).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppFaceId(pub usize);

struct Node {
    name: String,
    forwarder: Forwarder,
}

#[derive(Debug, Clone, Copy)]
struct LinkEnd {
    node: NodeId,
    face: FaceId,
}

struct Link {
    delay: Duration,
    up: bool,
    ends: [LinkEnd; 2],
}

#[derive(Debug, Clone, Copy)]
struct AppFace {
    node: NodeId,
    face: FaceId,
}

struct Producer {
    app: usize,
    prefix: Name,
    reply_delay: Duration,
}

struct Consumer {
    app: usize,
    prefix: Name,
    interval: Duration,
    remaining: u32,
    next_at: Timestamp,
    sent: u32,
}

#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Link { link: usize },
    App { app: usize },
}

struct Delivery {
    at: Timestamp,
    seq: u64,
    node: NodeId,
    face: FaceId,
    packet: Packet,
}

impl PartialEq for Delivery {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Delivery {}

impl PartialOrd for Delivery {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Delivery {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

/// A set of forwarders wired together on the virtual clock.
#[derive(Default)]
pub struct Topology {
    nodes: Vec<Node>,
    links: Vec<Link>,
    app_faces: Vec<AppFace>,
    producers: Vec<Producer>,
    consumers: Vec<Consumer>,
    adjacency: HashMap<(usize, FaceId), Endpoint>,
    deliveries: BinaryHeap<Reverse<Delivery>>,
    now: Timestamp,
    next_seq: u64,
    next_nonce: Nonce,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Adds a forwarder running `strategy`.
    pub fn add_forwarder(&mut self, name: &str, strategy: Box<dyn Strategy>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            forwarder: Forwarder::new(strategy),
        });
        id
    }

    pub fn node_name(&self, node: NodeId) -> &str {
        &self.nodes[node.0].name
    }

    /// Read access to a node's forwarder, e.g. for PIT inspection.
    pub fn forwarder(&self, node: NodeId) -> &Forwarder {
        &self.nodes[node.0].forwarder
    }

    /// Connects `a` and `b` with a symmetric link of one-way `delay`.
    pub fn add_link(&mut self, delay: Duration, a: NodeId, b: NodeId) -> LinkId {
        let face_a = self.nodes[a.0].forwarder.add_face();
        let face_b = self.nodes[b.0].forwarder.add_face();
        let link = self.links.len();
        self.adjacency.insert((a.0, face_a), Endpoint::Link { link });
        self.adjacency.insert((b.0, face_b), Endpoint::Link { link });
        self.links.push(Link {
            delay,
            up: true,
            ends: [
                LinkEnd { node: a, face: face_a },
                LinkEnd { node: b, face: face_b },
            ],
        });
        LinkId(link)
    }

    /// The face `node` uses for `link`.
    pub fn link_face(&self, link: LinkId, node: NodeId) -> Option<FaceId> {
        self.links[link.0]
            .ends
            .iter()
            .find(|end| end.node == node)
            .map(|end| end.face)
    }

    /// Drops every future transmission on the link; packets already in
    /// flight are still delivered.
    pub fn fail_link(&mut self, link: LinkId) {
        self.links[link.0].up = false;
    }

    pub fn recover_link(&mut self, link: LinkId) {
        self.links[link.0].up = true;
    }

    /// Creates an application face on `node`.
    pub fn add_app_face(&mut self, node: NodeId) -> AppFaceId {
        let face = self.nodes[node.0].forwarder.add_face();
        let app = self.app_faces.len();
        self.adjacency.insert((node.0, face), Endpoint::App { app });
        self.app_faces.push(AppFace { node, face });
        AppFaceId(app)
    }

    /// The forwarder-side face of an application face.
    pub fn app_face(&self, app: AppFaceId) -> FaceId {
        self.app_faces[app.0].face
    }

    /// Registers a FIB route on `node`.
    pub fn register_prefix(&mut self, node: NodeId, face: FaceId, prefix: &Name, cost: u32) {
        self.nodes[node.0]
            .forwarder
            .register_route(prefix.clone(), face, cost);
    }

    /// Attaches a producer to `app` that answers matching Interests with
    /// echo Data after `reply_delay`, and routes the prefix to it on its
    /// node.
    pub fn add_echo_producer(&mut self, app: AppFaceId, prefix: &Name, reply_delay: Duration) {
        let AppFace { node, face } = self.app_faces[app.0];
        self.register_prefix(node, face, prefix, 0);
        self.producers.push(Producer {
            app: app.0,
            prefix: prefix.clone(),
            reply_delay,
        });
    }

    /// Attaches a consumer to `app` that expresses `count` Interests with
    /// unique names under `prefix`, one every `interval`, starting now.
    pub fn add_interval_consumer(
        &mut self,
        app: AppFaceId,
        prefix: &Name,
        interval: Duration,
        count: u32,
    ) {
        self.consumers.push(Consumer {
            app: app.0,
            prefix: prefix.clone(),
            interval,
            remaining: count,
            next_at: self.now,
            sent: 0,
        });
    }

    /// Injects a single Interest through an application face.
    pub fn express_interest(&mut self, app: AppFaceId, interest: Interest) {
        let AppFace { node, face } = self.app_faces[app.0];
        self.push_delivery(self.now, node, face, Packet::Interest(interest));
    }

    /// A nonce no other packet in this run carries.
    pub fn fresh_nonce(&mut self) -> Nonce {
        self.next_nonce += 1;
        self.next_nonce
    }

    /// Traffic counters of `face` on `node`.
    pub fn face_counters(&self, node: NodeId, face: FaceId) -> FaceCountersSnapshot {
        self.nodes[node.0]
            .forwarder
            .face_counters(face)
            .map(|c| c.snapshot())
            .unwrap_or_default()
    }

    /// Counters of the face `node` uses for `link`.
    pub fn link_counters(&self, link: LinkId, node: NodeId) -> FaceCountersSnapshot {
        match self.link_face(link, node) {
            Some(face) => self.face_counters(node, face),
            None => FaceCountersSnapshot::default(),
        }
    }

    /// Counters of an application face, as seen from the forwarder.
    pub fn app_counters(&self, app: AppFaceId) -> FaceCountersSnapshot {
        let AppFace { node, face } = self.app_faces[app.0];
        self.face_counters(node, face)
    }

    /// Advances the clock to `now + total` in increments of `step`.
    pub fn advance(&mut self, step: Duration, total: Duration) {
        let end = self.now + total;
        while self.now < end {
            self.now = (self.now + step).min(end);
            self.tick();
        }
    }

    fn push_delivery(&mut self, at: Timestamp, node: NodeId, face: FaceId, packet: Packet) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.deliveries.push(Reverse(Delivery {
            at,
            seq,
            node,
            face,
            packet,
        }));
    }

    /// Runs one step to quiescence: consumer emissions, due deliveries,
    /// timers, and the resulting transmissions.
    fn tick(&mut self) {
        let now = self.now;

        let mut sends: Vec<(usize, Name, Timestamp)> = Vec::new();
        for consumer in &mut self.consumers {
            while consumer.remaining > 0 && consumer.next_at <= now {
                let name = consumer.prefix.clone().append(consumer.sent.to_string());
                sends.push((consumer.app, name, consumer.next_at));
                consumer.sent += 1;
                consumer.remaining -= 1;
                consumer.next_at += consumer.interval;
            }
        }
        for (app, name, at) in sends {
            let nonce = self.fresh_nonce();
            let AppFace { node, face } = self.app_faces[app];
            self.push_delivery(at, node, face, Packet::Interest(Interest::new(name, nonce)));
        }

        loop {
            let mut progressed = false;

            while self
                .deliveries
                .peek()
                .is_some_and(|Reverse(d)| d.at <= now)
            {
                let Some(Reverse(delivery)) = self.deliveries.pop() else {
                    break;
                };
                self.nodes[delivery.node.0]
                    .forwarder
                    .receive(now, delivery.face, delivery.packet);
                progressed = true;
            }

            for idx in 0..self.nodes.len() {
                self.nodes[idx].forwarder.poll(now);
                let emissions = self.nodes[idx].forwarder.drain_emissions();
                if !emissions.is_empty() {
                    progressed = true;
                }
                for emission in emissions {
                    self.route_emission(idx, emission);
                }
            }

            if !progressed {
                break;
            }
        }
    }

    fn route_emission(&mut self, node_idx: usize, emission: Emission) {
        let endpoint = match self.adjacency.get(&(node_idx, emission.face)) {
            Some(endpoint) => *endpoint,
            None => return,
        };
        match endpoint {
            Endpoint::Link { link } => {
                let (up, delay, remote) = {
                    let link = &self.links[link];
                    let remote = if link.ends[0].node.0 == node_idx {
                        link.ends[1]
                    } else {
                        link.ends[0]
                    };
                    (link.up, link.delay, remote)
                };
                if !up {
                    trace!(
                        "{}: {} lost on failed link",
                        self.nodes[node_idx].name,
                        emission.packet.packet_type()
                    );
                    return;
                }
                self.push_delivery(self.now + delay, remote.node, remote.face, emission.packet);
            }
            Endpoint::App { app } => {
                if let Packet::Interest(interest) = &emission.packet {
                    let reply = self
                        .producers
                        .iter()
                        .find(|p| p.app == app && p.prefix.is_prefix_of(&interest.name))
                        .map(|p| p.reply_delay);
                    if let Some(reply_delay) = reply {
                        let data = Data::new(interest.name.clone(), &b"echo"[..]);
                        let AppFace { node, face } = self.app_faces[app];
                        self.push_delivery(
                            self.now + reply_delay,
                            node,
                            face,
                            Packet::Data(data),
                        );
                    }
                }
                // Data and Nacks reaching an app face end there; the face
                // counters already recorded them.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::MidpointRng;
    use crate::strategy::AsfStrategy;

    fn asf() -> Box<dyn Strategy> {
        Box::new(
            AsfStrategy::new(&AsfStrategy::strategy_name(), Box::new(MidpointRng))
                .expect("default parameters are valid"),
        )
    }

    #[test]
    fn two_node_exchange() {
        let mut topo = Topology::new();
        let a = topo.add_forwarder("A", asf());
        let b = topo.add_forwarder("B", asf());
        let link = topo.add_link(Duration::from_millis(10), a, b);

        let prefix = Name::from_uri("/pnr/C").unwrap();
        let consumer = topo.add_app_face(a);
        let producer = topo.add_app_face(b);
        topo.add_echo_producer(producer, &prefix, Duration::ZERO);
        topo.register_prefix(a, topo.link_face(link, a).unwrap(), &prefix, 10);

        topo.add_interval_consumer(consumer, &prefix, Duration::from_secs(1), 3);
        topo.advance(Duration::from_millis(10), Duration::from_secs(4));

        let a_out = topo.link_counters(link, a);
        assert_eq!(a_out.n_out_interests, 3);
        assert_eq!(a_out.n_in_data, 3);
        assert_eq!(topo.app_counters(consumer).n_out_data, 3);
        assert_eq!(topo.app_counters(producer).n_out_interests, 3);
    }

    #[test]
    fn failed_link_drops_packets() {
        let mut topo = Topology::new();
        let a = topo.add_forwarder("A", asf());
        let b = topo.add_forwarder("B", asf());
        let link = topo.add_link(Duration::from_millis(10), a, b);

        let prefix = Name::from_uri("/pnr/C").unwrap();
        let consumer = topo.add_app_face(a);
        let producer = topo.add_app_face(b);
        topo.add_echo_producer(producer, &prefix, Duration::ZERO);
        topo.register_prefix(a, topo.link_face(link, a).unwrap(), &prefix, 10);

        topo.fail_link(link);
        topo.add_interval_consumer(consumer, &prefix, Duration::from_secs(1), 2);
        topo.advance(Duration::from_millis(10), Duration::from_secs(3));

        // Egress is counted at A, but nothing crosses the wire.
        assert_eq!(topo.link_counters(link, a).n_out_interests, 2);
        assert_eq!(topo.link_counters(link, b).n_in_interests, 0);
        assert_eq!(topo.app_counters(consumer).n_out_data, 0);
    }

    #[test]
    fn no_route_yields_nack() {
        let mut topo = Topology::new();
        let a = topo.add_forwarder("A", asf());
        let consumer = topo.add_app_face(a);
        let prefix = Name::from_uri("/nowhere").unwrap();

        let nonce = topo.fresh_nonce();
        let interest = Interest::new(prefix.clone().append("1"), nonce);
        topo.express_interest(consumer, interest);
        topo.advance(Duration::from_millis(1), Duration::from_millis(5));

        assert_eq!(topo.app_counters(consumer).n_out_nacks, 1);
        assert_eq!(topo.app_counters(consumer).n_out_data, 0);
    }
}
