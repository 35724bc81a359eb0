//! Authentication schemes for outbound messages
//!
//! A scheme turns (credentials, payload) into the frame's auth section.
//! The scheme is chosen once by name at facade construction and is fixed
//! for the facade's lifetime. This layer only *produces* sections for
//! outbound sends; verification happens on the cloud side.

pub mod csrpsk;
pub mod totp;

use crate::error::{HologramError, Result};

pub use csrpsk::CsrPskAuth;
pub use totp::TotpAuth;

/// Device credentials. Immutable once handed to the facade.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Hologram device key
    pub device_key: String,
    /// Shared secret, required by the csrpsk and totp schemes
    pub shared_secret: Option<String>,
}

impl Credentials {
    pub fn new(device_key: impl Into<String>) -> Self {
        Self {
            device_key: device_key.into(),
            shared_secret: None,
        }
    }

    pub fn with_secret(device_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            device_key: device_key.into(),
            shared_secret: Some(secret.into()),
        }
    }
}

/// Produces the auth section for an outbound frame
pub trait AuthScheme: Send + Sync {
    fn name(&self) -> &'static str;

    /// Compute the auth section bytes for `payload`.
    ///
    /// An empty return means the message travels unauthenticated.
    fn auth_section(&self, credentials: &Credentials, payload: &[u8]) -> Vec<u8>;
}

/// Trusted-transport scheme: the auth section is always empty
pub struct NoAuth;

impl AuthScheme for NoAuth {
    fn name(&self) -> &'static str {
        "none"
    }

    fn auth_section(&self, _credentials: &Credentials, _payload: &[u8]) -> Vec<u8> {
        Vec::new()
    }
}

/// Resolve a scheme by its configured name.
///
/// Fails fast with `UnknownAuthScheme` for unrecognized names and with
/// `MissingSharedSecret` when csrpsk/totp are requested without a secret.
pub fn from_name(name: &str, credentials: &Credentials) -> Result<Box<dyn AuthScheme>> {
    match name {
        "none" => Ok(Box::new(NoAuth)),
        "csrpsk" => {
            require_secret(credentials, "csrpsk")?;
            Ok(Box::new(CsrPskAuth::new()))
        }
        "totp" => {
            require_secret(credentials, "totp")?;
            Ok(Box::new(TotpAuth::new()))
        }
        other => Err(HologramError::UnknownAuthScheme(other.to_string())),
    }
}

fn require_secret(credentials: &Credentials, scheme: &'static str) -> Result<()> {
    if credentials.shared_secret.is_none() {
        return Err(HologramError::MissingSharedSecret(scheme));
    }
    Ok(())
}
