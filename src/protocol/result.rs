//! Numeric result codes returned by the Hologram Cloud peer
//!
//! The peer summarizes the outcome of a send as a small integer. The mapping
//! is fixed protocol surface: every code has exactly one diagnostic string,
//! and anything outside the table collapses to `Unknown`.

use std::fmt;

/// Outcome of a send attempt as reported by the cloud peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    /// -1 or any unmapped value
    Unknown,
    /// 0
    Success,
    /// 1
    ConnectionClosed,
    /// 2
    ParseFailed,
    /// 3
    AuthInvalid,
    /// 4
    PayloadTypeInvalid,
    /// 5
    ProtocolTypeInvalid,
    /// 6
    InternalError,
    /// 7
    MetadataMalformed,
    /// 8
    TopicMalformed,
}

impl ResultCode {
    /// Total mapping from a raw peer code. Never fails; unmapped and
    /// negative values become `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ResultCode::Success,
            1 => ResultCode::ConnectionClosed,
            2 => ResultCode::ParseFailed,
            3 => ResultCode::AuthInvalid,
            4 => ResultCode::PayloadTypeInvalid,
            5 => ResultCode::ProtocolTypeInvalid,
            6 => ResultCode::InternalError,
            7 => ResultCode::MetadataMalformed,
            8 => ResultCode::TopicMalformed,
            _ => ResultCode::Unknown,
        }
    }

    /// The wire value for this code (`-1` for `Unknown`)
    pub fn code(&self) -> i32 {
        match self {
            ResultCode::Unknown => -1,
            ResultCode::Success => 0,
            ResultCode::ConnectionClosed => 1,
            ResultCode::ParseFailed => 2,
            ResultCode::AuthInvalid => 3,
            ResultCode::PayloadTypeInvalid => 4,
            ResultCode::ProtocolTypeInvalid => 5,
            ResultCode::InternalError => 6,
            ResultCode::MetadataMalformed => 7,
            ResultCode::TopicMalformed => 8,
        }
    }

    /// Human-readable diagnostic for this code
    pub fn description(&self) -> &'static str {
        match self {
            ResultCode::Unknown => "Unknown error",
            ResultCode::Success => "Message sent successfully",
            ResultCode::ConnectionClosed => {
                "Connection was closed so we couldn't read the whole message"
            }
            ResultCode::ParseFailed => "Failed to parse the message",
            ResultCode::AuthInvalid => "Auth section of the message was invalid",
            ResultCode::PayloadTypeInvalid => "Payload type was invalid",
            ResultCode::ProtocolTypeInvalid => "Protocol type was invalid",
            ResultCode::InternalError => "Internal error in Hologram Cloud",
            ResultCode::MetadataMalformed => "Metadata was formatted incorrectly",
            ResultCode::TopicMalformed => "Topic was formatted incorrectly",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResultCode::Success)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Diagnostic string for a raw peer code. Pure and total.
pub fn get_result_string(code: i32) -> &'static str {
    ResultCode::from_code(code).description()
}
