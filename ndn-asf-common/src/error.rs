//! Error types for the ASF forwarder.

use thiserror::Error;

/// All possible errors that can occur within the ASF forwarder.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or out-of-range configuration component.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Error related to NDN name parsing.
    #[error("name error: {0}")]
    Name(String),

    /// A face id that is not registered with the forwarder.
    #[error("unknown face {0}")]
    UnknownFace(u64),

    /// Other errors
    #[error("other error: {0}")]
    Other(String),
}
