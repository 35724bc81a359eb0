//! Cloud Simulator
//!
//! Stands in for the Hologram Cloud socket endpoint: accepts TCP
//! connections, decodes each frame, prints its sections, and answers with
//! an ASCII result code. Useful for exercising the client without
//! hardware or a live account.
//!
//! Usage: cargo run --bin cloud-sim [bind_addr] [result_code]

use std::env;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use hologram_cloud::protocol::{CloudMessage, FrameKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let bind_addr = env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9999".to_string());
    let result_code: i32 = env::args()
        .nth(2)
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or(0);

    let listener = TcpListener::bind(&bind_addr).await?;
    println!("☁️  Hologram Cloud Simulator");
    println!("  Listening on: {}", bind_addr);
    println!("  Replying with code: {}", result_code);
    println!();

    loop {
        let (mut stream, peer) = listener.accept().await?;

        let mut buf = Vec::with_capacity(1024);
        if let Err(e) = stream.read_to_end(&mut buf).await {
            println!("❌ Read error from {}: {}", peer, e);
            continue;
        }

        println!("📥 {} bytes from {}", buf.len(), peer);
        match CloudMessage::decode(&buf) {
            Ok(message) => {
                let kind = match message.kind {
                    FrameKind::Data => "data",
                    FrameKind::Sms => "sms",
                };
                println!("   kind:     {}", kind);
                println!("   auth:     {} bytes ({})", message.auth.len(), hex::encode(&message.auth));
                println!("   topics:   {:?}", message.topics);
                println!("   metadata: {:?}", message.metadata);
                if message.kind == FrameKind::Sms {
                    match message.sms_parts() {
                        Ok((dest, text)) => println!("   sms:      to {}: {:?}", dest, text),
                        Err(e) => println!("   sms:      malformed ({})", e),
                    }
                } else {
                    println!(
                        "   payload:  {} bytes: {:?}",
                        message.payload.len(),
                        String::from_utf8_lossy(&message.payload)
                    );
                }
            }
            Err(e) => {
                println!("   ⚠️  Undecodable frame: {}", e);
            }
        }

        let reply = format!("{}\n", result_code);
        if let Err(e) = stream.write_all(reply.as_bytes()).await {
            println!("❌ Reply to {} failed: {}", peer, e);
        }
        println!();
    }
}
