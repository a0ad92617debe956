//! Shared session types: states, close reasons, payload shapes, and the
//! events surfaced by the messaging client.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Status code the remote service uses for an explicit credential
/// invalidation. Any other close status is treated as transient.
pub const STATUS_LOGGED_OUT: u16 = 401;

/// Connection lifecycle, published on a watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    /// A pairing code arrived and is waiting to be scanned.
    AwaitingPairing(String),
    Open,
    Closed(CloseReason),
}

/// Why a session closed, classified from the close status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The remote service invalidated the stored credential. Credentials
    /// are wiped and the next open is fully fresh.
    LoggedOut,
    /// Anything else; the session reopens in resumable mode after backoff.
    Transient(u16),
}

impl CloseReason {
    #[must_use]
    pub fn classify(status: u16) -> Self {
        if status == STATUS_LOGGED_OUT {
            Self::LoggedOut
        } else {
            Self::Transient(status)
        }
    }
}

/// One record of the client-owned opaque credential store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CredentialRecord {
    pub name: String,
    pub data: serde_json::Value,
}

/// Events from the client's connection-state stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Pairing is required; carries the scannable payload.
    PairingRequired { code: String },
    Open { phone_number: Option<String> },
    Closed { status: u16 },
    /// Credentials changed and must be persisted before further events
    /// are processed.
    CredentialsUpdate { records: Vec<CredentialRecord> },
}

/// A single outbound send, shaped by media kind.
///
/// Audio and document payloads carry no caption; the caller follows them
/// with a separate `Text` send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundPayload {
    Text {
        to: String,
        body: String,
    },
    Audio {
        to: String,
        path: PathBuf,
    },
    Image {
        to: String,
        path: PathBuf,
        caption: String,
    },
    Video {
        to: String,
        path: PathBuf,
        caption: String,
    },
    Document {
        to: String,
        path: PathBuf,
        file_name: String,
    },
}

impl OutboundPayload {
    /// Destination digit string of this payload.
    #[must_use]
    pub fn to(&self) -> &str {
        match self {
            Self::Text { to, .. }
            | Self::Audio { to, .. }
            | Self::Image { to, .. }
            | Self::Video { to, .. }
            | Self::Document { to, .. } => to,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn logout_status_classifies_as_logged_out() {
        assert_eq!(CloseReason::classify(401), CloseReason::LoggedOut);
    }

    #[test]
    fn other_statuses_are_transient() {
        assert_eq!(CloseReason::classify(408), CloseReason::Transient(408));
        assert_eq!(CloseReason::classify(500), CloseReason::Transient(500));
        assert_eq!(CloseReason::classify(0), CloseReason::Transient(0));
    }

    #[test]
    fn payload_serializes_with_kind_tag() {
        let payload = OutboundPayload::Image {
            to: "15550199".into(),
            path: PathBuf::from("/m/promo.jpg"),
            caption: "Hi".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "image");
        assert_eq!(json["to"], "15550199");
        assert_eq!(json["caption"], "Hi");
    }
}
