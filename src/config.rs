use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub cloud: CloudSection,
    #[serde(default)]
    pub endpoints: EndpointConfig,
    #[serde(default)]
    pub modem: ModemConfig,
    #[serde(default)]
    pub inbound: InboundConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudSection {
    /// Hologram device key
    pub device_key: String,
    /// Shared secret for csrpsk/totp
    pub shared_secret: Option<String>,
    /// Authentication scheme name: "none", "csrpsk", or "totp"
    #[serde(default = "default_auth_scheme")]
    pub auth_scheme: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_send_host")]
    pub send_host: String,
    #[serde(default = "default_send_port")]
    pub send_port: u16,
    #[serde(default = "default_receive_host")]
    pub receive_host: String,
    #[serde(default = "default_receive_port")]
    pub receive_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModemConfig {
    /// Explicit driver name; when absent, a lone detected modem is
    /// auto-selected
    pub name: Option<String>,
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_auth_scheme() -> String {
    "none".to_string()
}

fn default_send_host() -> String {
    "cloudsocket.hologram.io".to_string()
}

fn default_send_port() -> u16 {
    9999
}

fn default_receive_host() -> String {
    "0.0.0.0".to_string()
}

fn default_receive_port() -> u16 {
    4010
}

fn default_connect_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_reply_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;
        Ok(config)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            send_host: default_send_host(),
            send_port: default_send_port(),
            receive_host: default_receive_host(),
            receive_port: default_receive_port(),
        }
    }
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            name: None,
            connect_retries: default_connect_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            reply_timeout_ms: default_reply_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
