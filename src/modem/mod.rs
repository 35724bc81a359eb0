//! Abstract modem driver contract
//!
//! The cloud layer never branches on which concrete modem is attached:
//! it programs only to [`ModemDriver`], so a hardware family driver and
//! the deterministic [`mock::MockModem`] are interchangeable. Concrete
//! AT-command drivers live behind this seam; all this crate requires is
//! the capability set {open, close, write, read, signal_strength}.

pub mod mock;
pub mod registry;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Connection lifecycle of a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}

/// What a driver's hardware can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub sms: bool,
    pub data: bool,
}

/// Reported signal strength
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStrength {
    /// RSSI in dBm
    Rssi(i32),
    Unknown,
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalStrength::Rssi(dbm) => write!(f, "{} dBm", dbm),
            SignalStrength::Unknown => write!(f, "unknown"),
        }
    }
}

/// Outcome of a bounded read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModemRead {
    Data(Vec<u8>),
    /// The timeout elapsed with nothing to read. Not an error — the
    /// caller decides whether an empty window matters.
    Timeout,
}

/// Capability contract every modem variant implements.
///
/// `read` must be a bounded wait: a stalled modem may cost the caller at
/// most `timeout`, never an indefinite block.
#[async_trait]
pub trait ModemDriver: Send {
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    fn state(&self) -> ConnectionState;

    /// Bring up the transport (serial open, PPP session)
    async fn open(&mut self) -> Result<()>;

    /// Tear down the transport. Idempotent.
    async fn close(&mut self) -> Result<()>;

    /// Transmit raw bytes, returning how many were written
    async fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Read whatever the modem has within `timeout`
    async fn read(&mut self, timeout: Duration) -> Result<ModemRead>;

    fn signal_strength(&self) -> SignalStrength;
}
