//! NDN packet types.
//!
//! The forwarder moves three kinds of packets: Interests, Data, and Nacks.
//! Wire encoding is outside this crate; packets travel between simulated
//! faces as in-memory values.

use crate::name::Name;
use crate::types::Nonce;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default Interest lifetime, 4 seconds.
pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_secs(4);

/// Represents an NDN Interest packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    /// The name requested in the Interest.
    pub name: Name,

    /// A nonce value to detect loops and duplicates.
    pub nonce: Nonce,

    /// Interest lifetime.
    pub lifetime: Duration,
}

impl Interest {
    /// Creates a new Interest for `name` with the given nonce.
    pub fn new(name: Name, nonce: Nonce) -> Self {
        Self {
            name,
            nonce,
            lifetime: DEFAULT_INTEREST_LIFETIME,
        }
    }

    /// Sets the Interest lifetime.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Sets the nonce value.
    pub fn with_nonce(mut self, nonce: Nonce) -> Self {
        self.nonce = nonce;
        self
    }
}

/// Represents an NDN Data packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    /// The name of the Data packet.
    pub name: Name,

    /// The content carried by the Data packet.
    pub content: Bytes,

    /// Freshness period in milliseconds.
    pub freshness_ms: u32,
}

impl Data {
    /// Creates a new Data packet.
    pub fn new(name: Name, content: impl Into<Bytes>) -> Self {
        Self {
            name,
            content: content.into(),
            freshness_ms: 10_000,
        }
    }

    /// Sets the freshness period.
    pub fn with_freshness_ms(mut self, freshness_ms: u32) -> Self {
        self.freshness_ms = freshness_ms;
        self
    }
}

/// Reason code carried by a Nack packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NackReason {
    /// No route towards the requested name.
    NoRoute,
    /// The upstream is congested.
    Congestion,
    /// The Interest's nonce was seen before.
    Duplicate,
    /// Unspecified reason.
    None,
}

impl NackReason {
    /// Whether the strategy may recover from this reason by trying an
    /// alternate upstream.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            NackReason::NoRoute | NackReason::Congestion | NackReason::Duplicate
        )
    }
}

/// Represents an NDN Nack: a negative acknowledgement of an Interest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nack {
    /// The Interest being refused.
    pub interest: Interest,

    /// Why the Interest was refused.
    pub reason: NackReason,
}

impl Nack {
    /// Creates a new Nack for `interest`.
    pub fn new(interest: Interest, reason: NackReason) -> Self {
        Self { interest, reason }
    }
}

/// Any packet the forwarder can receive or emit on a face.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Packet {
    /// An Interest packet
    Interest(Interest),
    /// A Data packet
    Data(Data),
    /// A Nack packet
    Nack(Nack),
}

impl Packet {
    /// Get the name the packet refers to.
    pub fn name(&self) -> &Name {
        match self {
            Packet::Interest(interest) => &interest.name,
            Packet::Data(data) => &data.name,
            Packet::Nack(nack) => &nack.interest.name,
        }
    }

    /// Get the type of the packet as a string.
    pub fn packet_type(&self) -> &'static str {
        match self {
            Packet::Interest(_) => "Interest",
            Packet::Data(_) => "Data",
            Packet::Nack(_) => "Nack",
        }
    }
}
