//! Pre-shared-key challenge-response (CSRPSK)
//!
//! Section layout: `nonce(8, BE) || HMAC-SHA256(secret, devicekey || nonce || payload)`
//! for 40 bytes total. The nonce is strictly monotonic across calls, seeded
//! from wall-clock milliseconds, so two sends of identical content never
//! share a signature (replay resistance).

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{AuthScheme, Credentials};

type HmacSha256 = Hmac<Sha256>;

/// Auth section length: 8-byte nonce + 32-byte signature
pub const SECTION_LEN: usize = 40;

pub struct CsrPskAuth {
    nonce: AtomicU64,
}

impl CsrPskAuth {
    pub fn new() -> Self {
        Self {
            nonce: AtomicU64::new(Utc::now().timestamp_millis() as u64),
        }
    }

    /// Advance to the next nonce: wall clock if it moved past the counter,
    /// otherwise previous + 1. Monotonic either way.
    fn next_nonce(&self) -> u64 {
        let now = Utc::now().timestamp_millis() as u64;
        self.nonce
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                Some(now.max(prev + 1))
            })
            .map(|prev| now.max(prev + 1))
            .unwrap_or(now)
    }
}

impl Default for CsrPskAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthScheme for CsrPskAuth {
    fn name(&self) -> &'static str {
        "csrpsk"
    }

    fn auth_section(&self, credentials: &Credentials, payload: &[u8]) -> Vec<u8> {
        let secret = credentials.shared_secret.as_deref().unwrap_or_default();
        let nonce = self.next_nonce();

        // Secret of any length is valid HMAC key material
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(credentials.device_key.as_bytes());
        mac.update(&nonce.to_be_bytes());
        mac.update(payload);

        let mut section = Vec::with_capacity(SECTION_LEN);
        section.extend_from_slice(&nonce.to_be_bytes());
        section.extend_from_slice(&mac.finalize().into_bytes());
        section
    }
}
