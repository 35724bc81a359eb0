use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hologram_cloud::auth::Credentials;
use hologram_cloud::cloud::{CloudOptions, HologramCloud};
use hologram_cloud::config::Config;
use hologram_cloud::modem::mock::MockFactory;
use hologram_cloud::modem::registry::{DriverFactory, ModemRegistry};

#[derive(Parser)]
#[command(name = "hologram-cloud")]
#[command(about = "Send and receive Hologram Cloud messages over an attached cellular modem")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Register the deterministic mock driver (hardware-free runs)
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a payload to the cloud
    Send {
        /// Message payload (UTF-8 text)
        payload: String,
        /// Topic to tag the message with (repeatable)
        #[arg(short, long)]
        topic: Vec<String>,
        /// Metadata as a JSON object of string values
        #[arg(short, long)]
        metadata: Option<String>,
    },
    /// Send an SMS via the cloud
    Sms {
        /// Destination number, e.g. +1234567890
        destination: String,
        /// Message text (at most 160 characters)
        text: String,
    },
    /// Wait for inbound cloud messages and print them
    Receive,
    /// List registered modem drivers and which are currently detected
    Modems,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config).map_err(|e| {
        anyhow::anyhow!(
            "{} (a [cloud] section with device_key is required)",
            e
        )
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("hologram-cloud v{}", env!("CARGO_PKG_VERSION"));

    let mut registry = ModemRegistry::new();
    if cli.mock {
        info!("Registering mock modem driver");
        registry.register(
            "MockModem",
            Arc::new(MockFactory::detectable()) as Arc<dyn DriverFactory>,
        );
    }
    // Hardware driver factories plug in here; each vendor crate registers
    // its own name -> factory pair against this registry.

    if let Command::Modems = cli.command {
        let names = registry.names();
        let detected = registry.detect_all();
        if names.is_empty() {
            println!("No modem drivers registered");
        }
        for name in names {
            let status = if detected.contains(&name) {
                "detected"
            } else {
                "not detected"
            };
            println!("{:<16} {}", name, status);
        }
        return Ok(());
    }

    let credentials = match &config.cloud.shared_secret {
        Some(secret) => Credentials::with_secret(&config.cloud.device_key, secret),
        None => Credentials::new(&config.cloud.device_key),
    };

    let mut options = CloudOptions::from_config(&config);
    if matches!(cli.command, Command::Receive) {
        options.enable_inbound = true;
    }

    let mut cloud = HologramCloud::new(credentials, options, registry).await?;

    match cli.command {
        Command::Send {
            payload,
            topic,
            metadata,
        } => {
            let metadata: BTreeMap<String, String> = match metadata {
                Some(json) => serde_json::from_str(&json)
                    .map_err(|e| anyhow::anyhow!("--metadata must be a JSON string map: {}", e))?,
                None => BTreeMap::new(),
            };
            let code = cloud.send(payload.into_bytes(), topic, metadata).await?;
            println!("{}: {}", code.code(), cloud.get_result_string(code.code()));
        }
        Command::Sms { destination, text } => {
            let code = cloud.send_sms(&destination, &text).await?;
            println!("{}: {}", code.code(), cloud.get_result_string(code.code()));
        }
        Command::Receive => {
            info!(
                "Listening for inbound messages on {}:{} (Ctrl+C to stop)",
                cloud.receive_host(),
                cloud.receive_port()
            );
            loop {
                tokio::select! {
                    received = cloud.receive() => {
                        let received = received?;
                        println!(
                            "[{}] from {} topics={:?} payload={}",
                            received.received_at.to_rfc3339(),
                            received.peer,
                            received.message.topics,
                            String::from_utf8_lossy(&received.message.payload),
                        );
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutting down...");
                        break;
                    }
                }
            }
        }
        Command::Modems => unreachable!("handled above"),
    }

    cloud.disconnect().await?;
    Ok(())
}
