//! HologramCloud facade
//!
//! Composes the network manager, auth scheme, and wire codec into the
//! public surface: `send`, `send_sms`, `receive`, and result-code
//! interpretation. One facade per application session; endpoints and the
//! auth scheme are fixed at construction.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::{self, AuthScheme, Credentials};
use crate::config::{Config, EndpointConfig, ModemConfig};
use crate::error::{HologramError, Result};
use crate::modem::registry::ModemRegistry;
use crate::modem::{ConnectionState, SignalStrength};
use crate::network::NetworkManager;
use crate::protocol::result::ResultCode;
use crate::protocol::{self, CloudMessage, MAX_PAYLOAD_SIZE, MAX_SMS_LENGTH};

/// Inbound messages buffered between listener task and caller
const INBOUND_QUEUE_DEPTH: usize = 256;

/// Bound on how long one inbound connection may take to deliver its frame
const INBOUND_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Construction-time options for [`HologramCloud`]
#[derive(Debug, Clone)]
pub struct CloudOptions {
    /// Authentication scheme name: "none", "csrpsk", or "totp"
    pub auth_scheme: String,
    pub endpoints: EndpointConfig,
    pub modem: ModemConfig,
    /// Bind the receive listener and make `receive()` available
    pub enable_inbound: bool,
}

impl Default for CloudOptions {
    fn default() -> Self {
        Self {
            auth_scheme: "none".to_string(),
            endpoints: EndpointConfig::default(),
            modem: ModemConfig::default(),
            enable_inbound: false,
        }
    }
}

impl CloudOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            auth_scheme: config.cloud.auth_scheme.clone(),
            endpoints: config.endpoints.clone(),
            modem: config.modem.clone(),
            enable_inbound: config.inbound.enabled,
        }
    }
}

/// A decoded inbound message with reception context
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub message: CloudMessage,
    pub peer: SocketAddr,
    pub received_at: DateTime<Utc>,
}

pub struct HologramCloud {
    credentials: Credentials,
    auth: Box<dyn AuthScheme>,
    network: NetworkManager,
    endpoints: EndpointConfig,
    reply_timeout: Duration,
    inbound_rx: Option<mpsc::Receiver<ReceivedMessage>>,
    inbound_task: Option<JoinHandle<()>>,
    inbound_addr: Option<SocketAddr>,
}

impl HologramCloud {
    /// Build the facade: resolve the auth scheme, apply the modem
    /// selection policy, and (when enabled) bind the inbound listener.
    ///
    /// Fails fast on an unknown scheme or modem name; with no explicit
    /// modem name, exactly one detected modem auto-selects and several
    /// detected modems are an error the operator must resolve.
    pub async fn new(
        credentials: Credentials,
        options: CloudOptions,
        registry: ModemRegistry,
    ) -> Result<Self> {
        let auth = auth::from_name(&options.auth_scheme, &credentials)?;

        let mut network = NetworkManager::with_retry_policy(
            registry,
            options.modem.connect_retries,
            Duration::from_millis(options.modem.retry_backoff_ms),
        );
        network.select_modem(options.modem.name.as_deref()).await?;

        let (inbound_rx, inbound_task, inbound_addr) = if options.enable_inbound {
            let bind = format!(
                "{}:{}",
                options.endpoints.receive_host, options.endpoints.receive_port
            );
            let listener = TcpListener::bind(&bind).await?;
            let addr = listener.local_addr()?;
            info!("Inbound listener bound on {}", addr);

            let (tx, rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
            let task = tokio::spawn(run_inbound_listener(listener, tx));
            (Some(rx), Some(task), Some(addr))
        } else {
            debug!("Inbound messaging disabled");
            (None, None, None)
        };

        info!(
            "HologramCloud ready: auth={} modem={:?} send={}:{}",
            auth.name(),
            network.active_modem(),
            options.endpoints.send_host,
            options.endpoints.send_port
        );

        Ok(Self {
            credentials,
            auth,
            network,
            endpoints: options.endpoints,
            reply_timeout: Duration::from_millis(options.modem.reply_timeout_ms),
            inbound_rx,
            inbound_task,
            inbound_addr,
        })
    }

    /// Send a payload to the cloud with optional topics and metadata.
    ///
    /// Exactly one transmit attempt per call; repeated delivery is the
    /// caller's business. The returned code is the peer's verdict and is
    /// a value to inspect, not an error.
    pub async fn send(
        &mut self,
        payload: Vec<u8>,
        topics: Vec<String>,
        metadata: BTreeMap<String, String>,
    ) -> Result<ResultCode> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(HologramError::PayloadTooLarge {
                size: payload.len(),
                limit: MAX_PAYLOAD_SIZE,
            });
        }

        let mut message = CloudMessage::data(payload, topics, metadata);
        message.auth = self.auth.auth_section(&self.credentials, &message.payload);
        self.transmit(&message).await
    }

    /// Send an SMS through the cloud.
    ///
    /// The 160-character bound is a pure precondition: it fires before
    /// any network activity, connected or not.
    pub async fn send_sms(&mut self, destination: &str, text: &str) -> Result<ResultCode> {
        let length = text.chars().count();
        if length > MAX_SMS_LENGTH {
            return Err(HologramError::SmsTooLong { length });
        }
        if let Some(caps) = self.network.capabilities() {
            if !caps.sms {
                let name = self.network.active_modem().unwrap_or("?").to_string();
                return Err(HologramError::SmsUnsupported(name));
            }
        }

        let mut message = CloudMessage::sms(destination, text);
        message.auth = self.auth.auth_section(&self.credentials, &message.payload);
        self.transmit(&message).await
    }

    /// Encode, deliver, and await the peer's result code
    async fn transmit(&mut self, message: &CloudMessage) -> Result<ResultCode> {
        let frame = message.encode()?;

        // Implicit one-shot connect; its own bounded retry policy applies
        if self.network.state() != ConnectionState::Connected {
            self.network.connect().await?;
        }

        // A write that stalls past the timeout is abandoned and reported
        // as a transport failure, never retried here
        match tokio::time::timeout(self.reply_timeout, self.network.write_frame(&frame)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(HologramError::Transport(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "transport write timed out",
                )))
            }
        }
        let reply = self.network.read_reply(self.reply_timeout).await?;
        let code = protocol::parse_reply(&reply);
        debug!("Peer replied: {} ({})", code.code(), code);
        Ok(code)
    }

    /// Await the next inbound message. Fails immediately when inbound
    /// messaging is disabled — it never silently blocks.
    pub async fn receive(&mut self) -> Result<ReceivedMessage> {
        let rx = self
            .inbound_rx
            .as_mut()
            .ok_or(HologramError::InboundDisabled)?;
        rx.recv().await.ok_or(HologramError::InboundDisabled)
    }

    /// Non-blocking variant of [`receive`](Self::receive)
    pub fn try_receive(&mut self) -> Result<Option<ReceivedMessage>> {
        let rx = self
            .inbound_rx
            .as_mut()
            .ok_or(HologramError::InboundDisabled)?;
        match rx.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(HologramError::InboundDisabled),
        }
    }

    pub async fn connect(&mut self) -> Result<()> {
        self.network.connect().await
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        self.network.disconnect().await
    }

    /// Diagnostic string for a raw peer result code
    pub fn get_result_string(&self, code: i32) -> &'static str {
        protocol::result::get_result_string(code)
    }

    pub fn send_host(&self) -> &str {
        &self.endpoints.send_host
    }

    pub fn send_port(&self) -> u16 {
        self.endpoints.send_port
    }

    pub fn receive_host(&self) -> &str {
        &self.endpoints.receive_host
    }

    pub fn receive_port(&self) -> u16 {
        self.endpoints.receive_port
    }

    /// Actual bound inbound address (differs from `receive_port` when the
    /// configured port is 0)
    pub fn inbound_addr(&self) -> Option<SocketAddr> {
        self.inbound_addr
    }

    pub fn active_modem(&self) -> Option<&str> {
        self.network.active_modem()
    }

    pub fn signal_strength(&self) -> SignalStrength {
        self.network.signal_strength()
    }
}

impl Drop for HologramCloud {
    fn drop(&mut self) {
        if let Some(task) = self.inbound_task.take() {
            task.abort();
        }
    }
}

/// Listener task: accept connections and hand each to its own task.
///
/// Runs independently of the send path; a slow consumer only ever backs
/// up this queue, never an outbound send. Each connection reads under a
/// timeout in its own task, so one stalled peer cannot hold up the
/// accept loop or starve delivery from other peers.
async fn run_inbound_listener(listener: TcpListener, tx: mpsc::Sender<ReceivedMessage>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Inbound accept failed: {}", e);
                continue;
            }
        };
        tokio::spawn(handle_inbound_connection(stream, peer, tx.clone()));
    }
}

async fn handle_inbound_connection(
    mut stream: tokio::net::TcpStream,
    peer: SocketAddr,
    tx: mpsc::Sender<ReceivedMessage>,
) {
    let mut buf = Vec::with_capacity(1024);
    match tokio::time::timeout(INBOUND_READ_TIMEOUT, stream.read_to_end(&mut buf)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            warn!("Inbound read from {} failed: {}", peer, e);
            return;
        }
        Err(_) => {
            warn!("Inbound read from {} timed out, dropping connection", peer);
            return;
        }
    }

    match CloudMessage::decode(&buf) {
        Ok(message) => {
            debug!(
                "Inbound message from {}: {} bytes, {} topic(s)",
                peer,
                message.payload.len(),
                message.topics.len()
            );
            let received = ReceivedMessage {
                message,
                peer,
                received_at: Utc::now(),
            };
            // A send error means the facade is gone; nothing to deliver to
            let _ = tx.send(received).await;
        }
        Err(e) => {
            warn!("Failed to decode inbound frame from {}: {}", peer, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modem::mock::{MockCounters, MockFactory};
    use std::sync::Arc;

    fn credentials() -> Credentials {
        Credentials::with_secret("12345678", "topsecret")
    }

    fn mock_registry() -> (ModemRegistry, Arc<MockCounters>, Arc<MockFactory>) {
        let factory = Arc::new(MockFactory::detectable());
        let counters = factory.counters();
        let mut registry = ModemRegistry::new();
        registry.register(
            "MockModem",
            Arc::clone(&factory) as Arc<dyn crate::modem::registry::DriverFactory>,
        );
        (registry, counters, factory)
    }

    async fn cloud_with(options: CloudOptions) -> (HologramCloud, Arc<MockCounters>, Arc<MockFactory>) {
        let (registry, counters, factory) = mock_registry();
        let cloud = HologramCloud::new(credentials(), options, registry)
            .await
            .unwrap();
        (cloud, counters, factory)
    }

    #[tokio::test]
    async fn test_default_endpoints() {
        let (cloud, _, _) = cloud_with(CloudOptions::default()).await;

        assert_eq!(cloud.send_host(), "cloudsocket.hologram.io");
        assert_eq!(cloud.send_port(), 9999);
        assert_eq!(cloud.receive_host(), "0.0.0.0");
        assert_eq!(cloud.receive_port(), 4010);
    }

    #[tokio::test]
    async fn test_auto_selects_single_modem() {
        let (cloud, _, _) = cloud_with(CloudOptions::default()).await;
        assert_eq!(cloud.active_modem(), Some("MockModem"));
    }

    #[tokio::test]
    async fn test_unknown_scheme_fails_fast() {
        let (registry, _, _) = mock_registry();
        let options = CloudOptions {
            auth_scheme: "md5".to_string(),
            ..CloudOptions::default()
        };
        match HologramCloud::new(credentials(), options, registry).await {
            Err(HologramError::UnknownAuthScheme(name)) => assert_eq!(name, "md5"),
            _ => panic!("expected UnknownAuthScheme"),
        }
    }

    #[tokio::test]
    async fn test_result_strings_on_facade() {
        let (cloud, _, _) = cloud_with(CloudOptions::default()).await;

        assert_eq!(cloud.get_result_string(-1), "Unknown error");
        assert_eq!(cloud.get_result_string(0), "Message sent successfully");
        assert_eq!(
            cloud.get_result_string(1),
            "Connection was closed so we couldn't read the whole message"
        );
        assert_eq!(cloud.get_result_string(2), "Failed to parse the message");
        assert_eq!(
            cloud.get_result_string(3),
            "Auth section of the message was invalid"
        );
        assert_eq!(cloud.get_result_string(4), "Payload type was invalid");
        assert_eq!(cloud.get_result_string(5), "Protocol type was invalid");
        assert_eq!(cloud.get_result_string(6), "Internal error in Hologram Cloud");
        assert_eq!(
            cloud.get_result_string(7),
            "Metadata was formatted incorrectly"
        );
        assert_eq!(cloud.get_result_string(8), "Topic was formatted incorrectly");
    }

    #[tokio::test]
    async fn test_send_returns_peer_code() {
        let options = CloudOptions {
            auth_scheme: "csrpsk".to_string(),
            ..CloudOptions::default()
        };
        let (mut cloud, counters, factory) = cloud_with(options).await;
        factory.push_reply(b"0".to_vec());

        let code = cloud
            .send(b"22.5C".to_vec(), vec!["sensors".to_string()], BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(code, ResultCode::Success);
        // Implicit connect happened exactly once, one frame on the wire
        assert_eq!(counters.open_count(), 1);
        assert_eq!(counters.write_count(), 1);
    }

    #[tokio::test]
    async fn test_send_reply_timeout_is_transport_error() {
        let (mut cloud, _, _) = cloud_with(CloudOptions::default()).await;
        // No scripted reply: the bounded read elapses
        match cloud.send(b"ping".to_vec(), vec![], BTreeMap::new()).await {
            Err(HologramError::ReadTimeout) => {}
            other => panic!("expected ReadTimeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oversize_payload_rejected_before_io() {
        let (mut cloud, counters, _) = cloud_with(CloudOptions::default()).await;
        let result = cloud
            .send(vec![0u8; MAX_PAYLOAD_SIZE + 1], vec![], BTreeMap::new())
            .await;
        assert!(matches!(result, Err(HologramError::PayloadTooLarge { .. })));
        assert_eq!(counters.write_count(), 0);
        assert_eq!(counters.open_count(), 0);
    }

    #[tokio::test]
    async fn test_sms_over_160_fails_without_transport_writes() {
        let (mut cloud, counters, _) = cloud_with(CloudOptions::default()).await;

        let text = "1".repeat(161);
        match cloud.send_sms("+1234567890", &text).await {
            Err(HologramError::SmsTooLong { length }) => assert_eq!(length, 161),
            other => panic!("expected SmsTooLong, got {:?}", other),
        }
        // Pure precondition: zero transport activity, connected or not
        assert_eq!(counters.write_count(), 0);
        assert_eq!(counters.open_count(), 0);
    }

    #[tokio::test]
    async fn test_sms_over_160_fails_identically_when_connected() {
        let (mut cloud, counters, _) = cloud_with(CloudOptions::default()).await;
        cloud.connect().await.unwrap();
        let writes_before = counters.write_count();

        let text = "x".repeat(200);
        assert!(matches!(
            cloud.send_sms("+1234567890", &text).await,
            Err(HologramError::SmsTooLong { length: 200 })
        ));
        assert_eq!(counters.write_count(), writes_before);
    }

    #[tokio::test]
    async fn test_sms_at_exactly_160_passes_validation() {
        let (mut cloud, counters, factory) = cloud_with(CloudOptions::default()).await;
        factory.push_reply(b"0".to_vec());

        let text = "a".repeat(160);
        let code = cloud.send_sms("+1234567890", &text).await.unwrap();
        assert_eq!(code, ResultCode::Success);
        assert_eq!(counters.write_count(), 1);
    }

    #[tokio::test]
    async fn test_psk_auth_sections_differ_across_sends() {
        let options = CloudOptions {
            auth_scheme: "csrpsk".to_string(),
            ..CloudOptions::default()
        };
        let (mut cloud, counters, factory) = cloud_with(options).await;
        factory.push_reply(b"0".to_vec());
        factory.push_reply(b"0".to_vec());

        let topics = vec!["t".to_string()];
        cloud.send(b"same".to_vec(), topics.clone(), BTreeMap::new()).await.unwrap();
        cloud.send(b"same".to_vec(), topics, BTreeMap::new()).await.unwrap();

        let frames = counters.frames.lock().unwrap().clone();
        assert_eq!(frames.len(), 2);
        let first = CloudMessage::decode(&frames[0]).unwrap();
        let second = CloudMessage::decode(&frames[1]).unwrap();
        assert_eq!(first.payload, second.payload);
        assert_ne!(first.auth, second.auth);
    }

    #[tokio::test]
    async fn test_none_auth_section_always_empty() {
        let (mut cloud, counters, factory) = cloud_with(CloudOptions::default()).await;
        factory.push_reply(b"0".to_vec());
        factory.push_reply(b"0".to_vec());

        cloud.send(b"one".to_vec(), vec![], BTreeMap::new()).await.unwrap();
        cloud.send(b"two".to_vec(), vec![], BTreeMap::new()).await.unwrap();

        for frame in counters.frames.lock().unwrap().iter() {
            assert!(CloudMessage::decode(frame).unwrap().auth.is_empty());
        }
    }

    #[tokio::test]
    async fn test_connect_twice_is_idempotent() {
        let (mut cloud, counters, _) = cloud_with(CloudOptions::default()).await;
        cloud.connect().await.unwrap();
        cloud.connect().await.unwrap();
        assert_eq!(counters.open_count(), 1);
        assert_eq!(cloud.signal_strength(), SignalStrength::Rssi(-67));
    }

    #[tokio::test]
    async fn test_receive_unavailable_when_inbound_disabled() {
        let (mut cloud, _, _) = cloud_with(CloudOptions::default()).await;

        assert!(matches!(cloud.try_receive(), Err(HologramError::InboundDisabled)));
        assert!(matches!(
            cloud.receive().await,
            Err(HologramError::InboundDisabled)
        ));
    }

    #[tokio::test]
    async fn test_inbound_round_trip() {
        use tokio::io::AsyncWriteExt;

        let options = CloudOptions {
            enable_inbound: true,
            endpoints: EndpointConfig {
                receive_host: "127.0.0.1".to_string(),
                receive_port: 0, // ephemeral, real addr via inbound_addr()
                ..EndpointConfig::default()
            },
            ..CloudOptions::default()
        };
        let (mut cloud, _, _) = cloud_with(options).await;
        let addr = cloud.inbound_addr().unwrap();

        let message = CloudMessage::data(
            b"from the cloud".to_vec(),
            vec!["downlink".to_string()],
            BTreeMap::new(),
        );
        let frame = message.encode().unwrap();

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(&frame).await.unwrap();
        stream.shutdown().await.unwrap();
        drop(stream);

        let received = tokio::time::timeout(Duration::from_secs(5), cloud.receive())
            .await
            .expect("listener delivered nothing")
            .unwrap();
        assert_eq!(received.message.payload, b"from the cloud");
        assert_eq!(received.message.topics, vec!["downlink".to_string()]);
    }

    #[tokio::test]
    async fn test_idle_peer_does_not_starve_other_inbound() {
        use tokio::io::AsyncWriteExt;

        let options = CloudOptions {
            enable_inbound: true,
            endpoints: EndpointConfig {
                receive_host: "127.0.0.1".to_string(),
                receive_port: 0,
                ..EndpointConfig::default()
            },
            ..CloudOptions::default()
        };
        let (mut cloud, _, _) = cloud_with(options).await;
        let addr = cloud.inbound_addr().unwrap();

        // A peer that connects, sends nothing, and never closes
        let idle = tokio::net::TcpStream::connect(addr).await.unwrap();

        // A second peer delivers a complete frame while the first stalls
        let frame = CloudMessage::data(b"still flowing".to_vec(), vec![], BTreeMap::new())
            .encode()
            .unwrap();
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(&frame).await.unwrap();
        stream.shutdown().await.unwrap();
        drop(stream);

        let received = tokio::time::timeout(Duration::from_secs(5), cloud.receive())
            .await
            .expect("stalled peer starved the listener")
            .unwrap();
        assert_eq!(received.message.payload, b"still flowing");

        drop(idle);
    }
}
