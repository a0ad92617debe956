//! WebSocket client for the messaging bridge process.
//!
//! The bridge owns the wire protocol and encryption; this side speaks a
//! small JSON command/event surface: `login`/`send` out, connection and
//! send-result events back. Send confirmations are correlated by request
//! id so a caller suspends until its own send resolves.

use std::{collections::HashMap, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    futures::{SinkExt, StreamExt, stream::SplitSink},
    serde::{Deserialize, Serialize},
    tokio::{
        net::TcpStream,
        sync::{Mutex, mpsc, oneshot},
        task::JoinHandle,
    },
    tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message},
    tracing::{debug, warn},
};

use crate::{
    client::{ConnectOptions, MessagingClient},
    error::{Error, Result},
    types::{ClientEvent, CredentialRecord, OutboundPayload},
};

/// Default endpoint of a locally running bridge.
pub const DEFAULT_BRIDGE_URL: &str = "ws://127.0.0.1:3180";

const DIAL_ATTEMPTS: u32 = 10;
const DIAL_RETRY_DELAY: Duration = Duration::from_millis(500);
const SEND_TIMEOUT: Duration = Duration::from_secs(60);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type PendingMap = Arc<std::sync::Mutex<HashMap<u64, oneshot::Sender<SendOutcome>>>>;

/// Commands sent to the bridge.
#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum BridgeCommand<'a> {
    Login {
        fresh: bool,
        credentials: &'a [CredentialRecord],
    },
    Send {
        id: u64,
        #[serde(flatten)]
        payload: &'a OutboundPayload,
    },
}

/// Events received from the bridge.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum BridgeEvent {
    Pairing {
        code: String,
    },
    Open {
        #[serde(default)]
        phone_number: Option<String>,
    },
    Closed {
        status: u16,
    },
    CredsUpdate {
        records: Vec<CredentialRecord>,
    },
    SendResult {
        id: u64,
        success: bool,
        #[serde(default)]
        error: Option<String>,
    },
}

#[derive(Debug)]
struct SendOutcome {
    success: bool,
    error: Option<String>,
}

struct Conn {
    sink: WsSink,
    pending: PendingMap,
    next_id: u64,
    reader: JoinHandle<()>,
}

/// [`MessagingClient`] backed by the bridge process.
pub struct BridgeClient {
    url: String,
    conn: Mutex<Option<Conn>>,
}

impl BridgeClient {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            conn: Mutex::new(None),
        }
    }
}

#[async_trait]
impl MessagingClient for BridgeClient {
    async fn connect(&self, options: ConnectOptions) -> Result<mpsc::Receiver<ClientEvent>> {
        // Drop any previous connection first; the bridge allows one
        // session per client.
        self.disconnect().await;

        let ws = dial_with_retry(&self.url, DIAL_ATTEMPTS).await?;
        let (mut sink, stream) = ws.split();

        let (events_tx, events_rx) = mpsc::channel(32);
        let pending: PendingMap = Arc::default();
        let reader = tokio::spawn(read_loop(stream, events_tx, Arc::clone(&pending)));

        let login = serde_json::to_string(&BridgeCommand::Login {
            fresh: options.fresh,
            credentials: &options.credentials,
        })?;
        sink.send(Message::Text(login.into()))
            .await
            .map_err(Error::connect)?;

        *self.conn.lock().await = Some(Conn {
            sink,
            pending,
            next_id: 0,
            reader,
        });

        Ok(events_rx)
    }

    async fn send(&self, payload: OutboundPayload) -> Result<()> {
        let (id, outcome_rx, pending) = {
            let mut guard = self.conn.lock().await;
            let conn = guard
                .as_mut()
                .ok_or_else(|| Error::send("not connected to the bridge"))?;

            conn.next_id += 1;
            let id = conn.next_id;
            let (tx, rx) = oneshot::channel();
            lock_pending(&conn.pending).insert(id, tx);

            let command = serde_json::to_string(&BridgeCommand::Send {
                id,
                payload: &payload,
            })?;
            if let Err(e) = conn.sink.send(Message::Text(command.into())).await {
                lock_pending(&conn.pending).remove(&id);
                return Err(Error::send(e));
            }
            (id, rx, Arc::clone(&conn.pending))
        };

        match tokio::time::timeout(SEND_TIMEOUT, outcome_rx).await {
            Ok(Ok(SendOutcome { success: true, .. })) => Ok(()),
            Ok(Ok(SendOutcome { error, .. })) => Err(Error::send(
                error.unwrap_or_else(|| "rejected by the client".into()),
            )),
            Ok(Err(_)) => Err(Error::send("connection dropped before confirmation")),
            Err(_) => {
                lock_pending(&pending).remove(&id);
                Err(Error::send(format!(
                    "no confirmation within {}s",
                    SEND_TIMEOUT.as_secs()
                )))
            },
        }
    }

    async fn disconnect(&self) {
        if let Some(mut conn) = self.conn.lock().await.take() {
            let _ = conn.sink.send(Message::Close(None)).await;
            conn.reader.abort();
        }
    }
}

fn lock_pending(
    pending: &std::sync::Mutex<HashMap<u64, oneshot::Sender<SendOutcome>>>,
) -> std::sync::MutexGuard<'_, HashMap<u64, oneshot::Sender<SendOutcome>>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

async fn dial_with_retry(
    url: &str,
    attempts: u32,
) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>> {
    let mut last_error = String::new();
    for attempt in 1..=attempts {
        match connect_async(url).await {
            Ok((ws, _)) => {
                if attempt > 1 {
                    debug!(attempt, url, "bridge reachable");
                }
                return Ok(ws);
            },
            Err(e) => {
                debug!(attempt, url, error = %e, "bridge dial failed");
                last_error = e.to_string();
            },
        }
        tokio::time::sleep(DIAL_RETRY_DELAY).await;
    }
    Err(Error::connect(format!(
        "{url} unreachable after {attempts} attempts: {last_error}"
    )))
}

/// Forward bridge events to the session manager and resolve pending sends.
///
/// Dropping the event sender when the socket ends signals a transient
/// close to the manager.
async fn read_loop(
    mut stream: impl StreamExt<Item = tokio_tungstenite::tungstenite::Result<Message>> + Unpin,
    events_tx: mpsc::Sender<ClientEvent>,
    pending: PendingMap,
) {
    while let Some(next) = stream.next().await {
        let message = match next {
            Ok(m) => m,
            Err(e) => {
                debug!(error = %e, "bridge socket error");
                break;
            },
        };
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let event: BridgeEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "undecodable bridge event");
                continue;
            },
        };

        let forwarded = match event {
            BridgeEvent::SendResult { id, success, error } => {
                match lock_pending(&pending).remove(&id) {
                    Some(waiter) => {
                        let _ = waiter.send(SendOutcome { success, error });
                    },
                    None => debug!(id, "send result with no waiter"),
                }
                continue;
            },
            BridgeEvent::Pairing { code } => ClientEvent::PairingRequired { code },
            BridgeEvent::Open { phone_number } => ClientEvent::Open { phone_number },
            BridgeEvent::Closed { status } => ClientEvent::Closed { status },
            BridgeEvent::CredsUpdate { records } => ClientEvent::CredentialsUpdate { records },
        };

        if events_tx.send(forwarded).await.is_err() {
            // Session manager is gone.
            break;
        }
    }
}
