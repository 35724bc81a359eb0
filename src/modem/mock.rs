//! Deterministic modem double
//!
//! Stands in for hardware in tests and `--mock` CLI runs. Replies are
//! scripted ahead of time; every open/close/write is counted and every
//! written frame captured, so tests can assert on exact transport
//! activity (including "zero writes happened").

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;

use super::registry::DriverFactory;
use super::{Capabilities, ConnectionState, ModemDriver, ModemRead, SignalStrength};

/// Shared observation surface for tests. Cloned into every driver the
/// owning [`MockFactory`] builds.
#[derive(Default)]
pub struct MockCounters {
    pub opens: AtomicU32,
    pub closes: AtomicU32,
    pub writes: AtomicU32,
    /// Every frame handed to `write`, in order
    pub frames: Mutex<Vec<Vec<u8>>>,
}

impl MockCounters {
    pub fn open_count(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn last_frame(&self) -> Option<Vec<u8>> {
        self.frames.lock().unwrap().last().cloned()
    }
}

/// Scripted state shared between factory and built drivers
struct MockShared {
    name: String,
    counters: Arc<MockCounters>,
    replies: Mutex<VecDeque<Vec<u8>>>,
    fail_open: AtomicBool,
    detectable: bool,
}

pub struct MockModem {
    shared: Arc<MockShared>,
    state: ConnectionState,
    signal: SignalStrength,
}

impl MockModem {
    fn new(shared: Arc<MockShared>) -> Self {
        Self {
            shared,
            state: ConnectionState::Disconnected,
            signal: SignalStrength::Rssi(-67),
        }
    }
}

#[async_trait]
impl ModemDriver for MockModem {
    fn name(&self) -> &str {
        &self.shared.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { sms: true, data: true }
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    async fn open(&mut self) -> Result<()> {
        if self.shared.fail_open.load(Ordering::SeqCst) {
            self.state = ConnectionState::Failed;
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "mock modem refused to open",
            )
            .into());
        }
        self.shared.counters.opens.fetch_add(1, Ordering::SeqCst);
        self.state = ConnectionState::Connected;
        debug!("MockModem opened");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.state == ConnectionState::Connected {
            self.shared.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.shared.counters.writes.fetch_add(1, Ordering::SeqCst);
        self.shared
            .counters
            .frames
            .lock()
            .unwrap()
            .push(data.to_vec());
        Ok(data.len())
    }

    async fn read(&mut self, _timeout: Duration) -> Result<ModemRead> {
        // Scripted reply if one is queued; otherwise the window elapses
        // immediately so tests never wait on wall clock
        match self.shared.replies.lock().unwrap().pop_front() {
            Some(reply) => Ok(ModemRead::Data(reply)),
            None => Ok(ModemRead::Timeout),
        }
    }

    fn signal_strength(&self) -> SignalStrength {
        self.signal
    }
}

/// Factory for [`MockModem`] drivers sharing one scripted state
pub struct MockFactory {
    shared: Arc<MockShared>,
}

impl MockFactory {
    /// A factory whose hardware probe always answers
    pub fn detectable() -> Self {
        Self::new("MockModem", true)
    }

    /// A factory whose hardware probe never answers (registered but absent)
    pub fn undetectable() -> Self {
        Self::new("MockModem", false)
    }

    /// A detectable factory whose drivers report `name`. Must match the
    /// name the factory is registered under, or selection and identity
    /// reporting disagree.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, true)
    }

    fn new(name: impl Into<String>, detectable: bool) -> Self {
        Self {
            shared: Arc::new(MockShared {
                name: name.into(),
                counters: Arc::new(MockCounters::default()),
                replies: Mutex::new(VecDeque::new()),
                fail_open: AtomicBool::new(false),
                detectable,
            }),
        }
    }

    /// Counters shared with every driver this factory builds
    pub fn counters(&self) -> Arc<MockCounters> {
        Arc::clone(&self.shared.counters)
    }

    /// Queue the next reply `read` will return
    pub fn push_reply(&self, reply: impl Into<Vec<u8>>) {
        self.shared.replies.lock().unwrap().push_back(reply.into());
    }

    /// Make every subsequent `open` fail (connect-retry tests)
    pub fn set_fail_open(&self, fail: bool) {
        self.shared.fail_open.store(fail, Ordering::SeqCst);
    }
}

impl DriverFactory for MockFactory {
    fn detect(&self) -> bool {
        self.shared.detectable
    }

    fn build(&self) -> Box<dyn ModemDriver> {
        Box::new(MockModem::new(Arc::clone(&self.shared)))
    }
}
