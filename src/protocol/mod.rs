//! Hologram Cloud wire protocol
//!
//! A frame is a version byte, a kind byte, then four length-prefixed
//! sections so a peer can parse each independently of content:
//!
//!   version(1) | kind(1)
//!   | auth_len(u16)  + auth bytes
//!   | meta_count(u16) + { key_len(u16) + key + val_len(u16) + val }*
//!   | topic_count(u16) + { topic_len(u16) + topic }*
//!   | payload_len(u32) + payload
//!
//! All multi-byte integers are big-endian (network byte order). An SMS
//! frame carries `dest_len(u8) + destination + text` as its payload and
//! no metadata or topics.
//!
//! The peer answers with an ASCII decimal result code, optionally
//! newline-terminated; see [`result`] for the code taxonomy.

pub mod result;

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{HologramError, Result};
use result::ResultCode;

/// Protocol version (always 0x01)
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Maximum raw payload accepted before encoding
pub const MAX_PAYLOAD_SIZE: usize = 4096;

/// Maximum total encoded frame size the transport will carry
pub const MAX_FRAME_SIZE: usize = 8192;

/// Maximum SMS body length, in characters
pub const MAX_SMS_LENGTH: usize = 160;

/// Frame kinds (identifier byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    Data = 0x01,
    Sms = 0x02,
}

impl TryFrom<u8> for FrameKind {
    type Error = HologramError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(FrameKind::Data),
            0x02 => Ok(FrameKind::Sms),
            _ => Err(HologramError::Frame(format!(
                "unknown frame kind: 0x{:02x}",
                value
            ))),
        }
    }
}

/// The cloud message envelope: topics, payload, metadata, auth section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudMessage {
    pub kind: FrameKind,
    pub topics: Vec<String>,
    pub payload: Vec<u8>,
    pub metadata: BTreeMap<String, String>,
    pub auth: Vec<u8>,
}

impl CloudMessage {
    /// Build a data message; the auth section is filled in by the sender.
    pub fn data(
        payload: Vec<u8>,
        topics: Vec<String>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            kind: FrameKind::Data,
            topics,
            payload,
            metadata,
            auth: Vec::new(),
        }
    }

    /// Build an SMS message. The destination and text travel in the
    /// payload section; length validation happens in the facade before
    /// this constructor runs.
    pub fn sms(destination: &str, text: &str) -> Self {
        let mut payload = Vec::with_capacity(1 + destination.len() + text.len());
        payload.push(destination.len() as u8);
        payload.extend_from_slice(destination.as_bytes());
        payload.extend_from_slice(text.as_bytes());
        Self {
            kind: FrameKind::Sms,
            topics: Vec::new(),
            payload,
            metadata: BTreeMap::new(),
            auth: Vec::new(),
        }
    }

    /// Split an SMS payload back into (destination, text)
    pub fn sms_parts(&self) -> Result<(String, String)> {
        if self.kind != FrameKind::Sms || self.payload.is_empty() {
            return Err(HologramError::Frame("not an SMS frame".to_string()));
        }
        let dest_len = self.payload[0] as usize;
        if 1 + dest_len > self.payload.len() {
            return Err(HologramError::Frame(
                "SMS destination length exceeds payload".to_string(),
            ));
        }
        let destination = String::from_utf8(self.payload[1..1 + dest_len].to_vec())
            .map_err(|e| HologramError::Frame(format!("invalid UTF-8 in destination: {}", e)))?;
        let text = String::from_utf8(self.payload[1 + dest_len..].to_vec())
            .map_err(|e| HologramError::Frame(format!("invalid UTF-8 in SMS text: {}", e)))?;
        Ok((destination, text))
    }

    /// Encode the envelope into a wire frame
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(HologramError::PayloadTooLarge {
                size: self.payload.len(),
                limit: MAX_PAYLOAD_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(64 + self.payload.len());
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u8(self.kind as u8);

        buf.put_u16(self.auth.len() as u16);
        buf.put_slice(&self.auth);

        buf.put_u16(self.metadata.len() as u16);
        for (key, value) in &self.metadata {
            buf.put_u16(key.len() as u16);
            buf.put_slice(key.as_bytes());
            buf.put_u16(value.len() as u16);
            buf.put_slice(value.as_bytes());
        }

        buf.put_u16(self.topics.len() as u16);
        for topic in &self.topics {
            buf.put_u16(topic.len() as u16);
            buf.put_slice(topic.as_bytes());
        }

        buf.put_u32(self.payload.len() as u32);
        buf.put_slice(&self.payload);

        if buf.len() > MAX_FRAME_SIZE {
            return Err(HologramError::PayloadTooLarge {
                size: buf.len(),
                limit: MAX_FRAME_SIZE,
            });
        }
        Ok(buf.to_vec())
    }

    /// Parse a raw wire frame back into an envelope
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 2 {
            return Err(HologramError::Frame(format!(
                "frame too short: {} bytes",
                data.len()
            )));
        }

        let mut buf = data;

        let version = buf.get_u8();
        if version != PROTOCOL_VERSION {
            return Err(HologramError::Frame(format!(
                "unsupported protocol version: 0x{:02x}",
                version
            )));
        }
        let kind = FrameKind::try_from(buf.get_u8())?;

        let auth = read_section_u16(&mut buf, "auth")?;

        let meta_count = read_u16(&mut buf, "metadata count")?;
        let mut metadata = BTreeMap::new();
        for _ in 0..meta_count {
            let key = read_string_u16(&mut buf, "metadata key")?;
            let value = read_string_u16(&mut buf, "metadata value")?;
            metadata.insert(key, value);
        }

        let topic_count = read_u16(&mut buf, "topic count")?;
        let mut topics = Vec::with_capacity(topic_count as usize);
        for _ in 0..topic_count {
            topics.push(read_string_u16(&mut buf, "topic")?);
        }

        if buf.remaining() < 4 {
            return Err(HologramError::Frame("truncated payload length".to_string()));
        }
        let payload_len = buf.get_u32() as usize;
        if buf.remaining() < payload_len {
            return Err(HologramError::Frame(format!(
                "payload truncated: want {} bytes, have {}",
                payload_len,
                buf.remaining()
            )));
        }
        let payload = buf[..payload_len].to_vec();

        Ok(Self {
            kind,
            topics,
            payload,
            metadata,
            auth,
        })
    }
}

fn read_u16(buf: &mut &[u8], what: &str) -> Result<u16> {
    if buf.remaining() < 2 {
        return Err(HologramError::Frame(format!("truncated {}", what)));
    }
    Ok(buf.get_u16())
}

fn read_section_u16(buf: &mut &[u8], what: &str) -> Result<Vec<u8>> {
    let len = read_u16(buf, what)? as usize;
    if buf.remaining() < len {
        return Err(HologramError::Frame(format!("truncated {} section", what)));
    }
    let bytes = buf[..len].to_vec();
    buf.advance(len);
    Ok(bytes)
}

fn read_string_u16(buf: &mut &[u8], what: &str) -> Result<String> {
    let bytes = read_section_u16(buf, what)?;
    String::from_utf8(bytes)
        .map_err(|e| HologramError::Frame(format!("invalid UTF-8 in {}: {}", what, e)))
}

/// Parse the peer's reply into a result code.
///
/// The reply is an ASCII decimal integer, possibly newline-terminated.
/// Anything unparseable maps to `ResultCode::Unknown`; a garbled reply is
/// a protocol outcome for the caller to inspect, not a local fault.
pub fn parse_reply(data: &[u8]) -> ResultCode {
    match std::str::from_utf8(data) {
        Ok(text) => match text.trim().parse::<i32>() {
            Ok(code) => ResultCode::from_code(code),
            Err(_) => ResultCode::Unknown,
        },
        Err(_) => ResultCode::Unknown,
    }
}
