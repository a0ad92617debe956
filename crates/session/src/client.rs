//! The seam to the external messaging client.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    error::Result,
    types::{ClientEvent, CredentialRecord, OutboundPayload},
};

/// Options for opening a session.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// `true` forces a fresh login (new pairing code); `false` resumes
    /// with the supplied credential records.
    pub fresh: bool,
    /// Persisted records handed back to the client for a resumable open.
    pub credentials: Vec<CredentialRecord>,
}

/// Opaque connect/send/event-stream surface of the messaging network
/// client. The concrete implementation talks to the bridge process; tests
/// drive the session state machine with scripted fakes.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Open a connection. Events for this connection arrive on the
    /// returned receiver; the stream ending without a close event is
    /// treated as a transient close by the caller.
    async fn connect(&self, options: ConnectOptions) -> Result<mpsc::Receiver<ClientEvent>>;

    /// Deliver one payload, suspending until the client confirms
    /// completion or failure.
    async fn send(&self, payload: OutboundPayload) -> Result<()>;

    /// Tear down the current connection, if any.
    async fn disconnect(&self);
}
