//! Cellular IoT client for the Hologram Cloud
//!
//! Gives a device one way to reach the cloud messaging endpoint no matter
//! which physical modem is attached: drivers implement the abstract
//! [`modem::ModemDriver`] contract, [`network::NetworkManager`] discovers
//! and owns the active one, and [`cloud::HologramCloud`] layers the auth
//! framing and wire protocol on top.

pub mod auth;
pub mod cloud;
pub mod config;
pub mod error;
pub mod modem;
pub mod network;
pub mod protocol;

pub use auth::Credentials;
pub use cloud::{CloudOptions, HologramCloud, ReceivedMessage};
pub use error::{HologramError, Result};
pub use modem::registry::ModemRegistry;
pub use protocol::result::{get_result_string, ResultCode};
pub use protocol::CloudMessage;
