//! Error taxonomy for the cloud client
//!
//! Configuration errors and precondition violations are their own variants
//! so callers can branch without string matching. Peer result codes are NOT
//! errors; they come back as `ResultCode` values from `send`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HologramError {
    /// Unrecognized authentication scheme name at construction
    #[error("unknown authentication scheme: {0}")]
    UnknownAuthScheme(String),

    /// Scheme requires a shared secret that was not configured
    #[error("auth scheme '{0}' requires a shared secret")]
    MissingSharedSecret(&'static str),

    /// Modem name not present in the driver registry
    #[error("unknown modem: {0}")]
    UnknownModem(String),

    /// Scan found no modems and no explicit name was given
    #[error("no modem detected")]
    NoModemDetected,

    /// Scan found several modems; auto-selecting among them is forbidden
    #[error("multiple modems detected, explicit selection required: {0:?}")]
    MultipleModemsDetected(Vec<String>),

    /// Connect failed after exhausting the retry policy
    #[error("modem connect failed after {attempts} attempts")]
    ModemConnect {
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// An operation needed a connected driver and none was available
    #[error("not connected to a modem")]
    NotConnected,

    /// Payload exceeds the transport frame limit
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// SMS body over the 160-character bound
    #[error("SMS cannot be more than 160 characters long (got {length})")]
    SmsTooLong { length: usize },

    /// Active modem's hardware cannot carry SMS
    #[error("modem '{0}' does not support SMS")]
    SmsUnsupported(String),

    /// `receive()` called with inbound listening disabled
    #[error("inbound messaging is disabled")]
    InboundDisabled,

    /// Malformed wire frame (encode or decode)
    #[error("frame error: {0}")]
    Frame(String),

    /// Transport-level I/O failure
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Bounded read elapsed without a reply
    #[error("timed out waiting for modem data")]
    ReadTimeout,
}

pub type Result<T> = std::result::Result<T, HologramError>;
