//! Session lifecycle against the external messaging client.
//!
//! Owns connect/reconnect policy, close-reason classification, pairing-code
//! surfacing, and credential persistence. The client itself is an opaque
//! bridge process reached over a local WebSocket; everything protocol-level
//! lives on the far side of that seam.

pub mod bridge;
pub mod client;
pub mod creds;
pub mod error;
pub mod manager;
pub mod qr;
pub mod types;

pub use {
    bridge::{BridgeClient, DEFAULT_BRIDGE_URL},
    client::{ConnectOptions, MessagingClient},
    creds::CredentialStore,
    error::{Error, Result},
    manager::{ReconnectPolicy, SessionHandle, SessionManager},
    types::{
        ClientEvent, CloseReason, CredentialRecord, OutboundPayload, STATUS_LOGGED_OUT,
        SessionState,
    },
};
