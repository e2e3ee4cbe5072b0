//! Identifier types shared between the forwarder tables and the strategy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a face.
///
/// Faces are opaque to the strategy: the id is used only as a lookup key and
/// as the final tie-break in face rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FaceId(pub u64);

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "face{}", self.0)
    }
}

/// Nonce carried by an Interest to detect loops and duplicates.
pub type Nonce = u32;
