//! Modem discovery, selection, and connection lifecycle
//!
//! Owns at most one active driver at a time. Selection is deliberate:
//! exactly one detected modem auto-selects, several demand an explicit
//! choice, since silently picking among multiple would mask hardware
//! misconfiguration.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{HologramError, Result};
use crate::modem::registry::ModemRegistry;
use crate::modem::{Capabilities, ConnectionState, ModemDriver, ModemRead, SignalStrength};

/// Default bounded retry policy for `connect`
pub const DEFAULT_CONNECT_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

pub struct NetworkManager {
    registry: ModemRegistry,
    active: Option<Box<dyn ModemDriver>>,
    last_scan: Vec<String>,
    connect_retries: u32,
    retry_backoff: Duration,
}

impl NetworkManager {
    pub fn new(registry: ModemRegistry) -> Self {
        Self {
            registry,
            active: None,
            last_scan: Vec::new(),
            connect_retries: DEFAULT_CONNECT_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn with_retry_policy(registry: ModemRegistry, retries: u32, backoff: Duration) -> Self {
        Self {
            connect_retries: retries.max(1),
            retry_backoff: backoff,
            ..Self::new(registry)
        }
    }

    /// Probe for currently attached modems. Repeatable; results cached
    /// for the auto-selection policy.
    pub fn scan_for_modems(&mut self) -> Vec<String> {
        self.last_scan = self.registry.detect_all();
        debug!("Modem scan found: {:?}", self.last_scan);
        self.last_scan.clone()
    }

    /// Select a driver by name, or apply the auto-selection policy when
    /// no name is given. Replacing a connected driver tears the old one
    /// down first. On failure the previously active driver is untouched.
    pub async fn select_modem(&mut self, name: Option<&str>) -> Result<()> {
        let chosen = match name {
            Some(name) => name.to_string(),
            None => {
                if self.last_scan.is_empty() {
                    self.scan_for_modems();
                }
                match self.last_scan.as_slice() {
                    [] => return Err(HologramError::NoModemDetected),
                    [only] => only.clone(),
                    several => {
                        return Err(HologramError::MultipleModemsDetected(several.to_vec()))
                    }
                }
            }
        };

        let driver = self.registry.build(&chosen)?;

        if self.state() == ConnectionState::Connected {
            info!("Replacing connected modem, disconnecting first");
            self.disconnect().await?;
        }

        info!("Selected modem '{}'", chosen);
        self.active = Some(driver);
        Ok(())
    }

    /// Bring up the selected driver. Idempotent while connected; retries
    /// transport failures a bounded number of times with linear backoff.
    pub async fn connect(&mut self) -> Result<()> {
        let retries = self.connect_retries;
        let backoff = self.retry_backoff;
        let driver = self.active.as_mut().ok_or(HologramError::NotConnected)?;

        if driver.state() == ConnectionState::Connected {
            debug!("connect() with driver already connected, nothing to do");
            return Ok(());
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match driver.open().await {
                Ok(()) => {
                    info!("Modem '{}' connected (attempt {})", driver.name(), attempt);
                    return Ok(());
                }
                Err(e) if attempt < retries => {
                    let wait = backoff * attempt;
                    warn!(
                        "Connect attempt {}/{} failed: {}. Retrying in {:?}...",
                        attempt, retries, e, wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    let source = match e {
                        HologramError::Transport(io) => io,
                        other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
                    };
                    return Err(HologramError::ModemConnect {
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }

    /// Tear down the active driver. Idempotent.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(driver) = self.active.as_mut() {
            driver.close().await?;
        }
        Ok(())
    }

    /// Transmit a frame over the connected driver
    pub async fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let driver = self.connected_driver()?;
        let written = driver.write(frame).await?;
        if written != frame.len() {
            return Err(HologramError::Frame(format!(
                "short write: {} of {} bytes",
                written,
                frame.len()
            )));
        }
        Ok(())
    }

    /// Bounded-wait read of the peer's reply
    pub async fn read_reply(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        let driver = self.connected_driver()?;
        match driver.read(timeout).await? {
            ModemRead::Data(data) => Ok(data),
            ModemRead::Timeout => Err(HologramError::ReadTimeout),
        }
    }

    fn connected_driver(&mut self) -> Result<&mut Box<dyn ModemDriver>> {
        match self.active.as_mut() {
            Some(driver) if driver.state() == ConnectionState::Connected => Ok(driver),
            _ => Err(HologramError::NotConnected),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.active
            .as_ref()
            .map(|d| d.state())
            .unwrap_or(ConnectionState::Disconnected)
    }

    pub fn active_modem(&self) -> Option<&str> {
        self.active.as_deref().map(|d| d.name())
    }

    pub fn capabilities(&self) -> Option<Capabilities> {
        self.active.as_ref().map(|d| d.capabilities())
    }

    pub fn signal_strength(&self) -> SignalStrength {
        self.active
            .as_ref()
            .map(|d| d.signal_strength())
            .unwrap_or(SignalStrength::Unknown)
    }
}
