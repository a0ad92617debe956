//! Session state machine: open, classify closes, reconnect.
//!
//! A single event-loop task owns the client connection and drives all
//! transitions; callers observe state on a watch channel and borrow a
//! [`SessionHandle`] per send attempt. Reconnection is unconditional and
//! unlimited: only an explicit logout changes the policy (wipe
//! credentials, open fresh), and only process termination ends the loop.

use std::{sync::Arc, time::Duration};

use {
    tokio::sync::{mpsc, oneshot, watch},
    tracing::{error, info, warn},
};

use crate::{
    client::{ConnectOptions, MessagingClient},
    creds::CredentialStore,
    error::{Error, Result},
    qr::print_pairing_code,
    types::{ClientEvent, CloseReason, OutboundPayload, SessionState},
};

/// Timing knobs for the reconnect loop.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Backoff before reopening after a transient close.
    pub reconnect_backoff: Duration,
    /// Pause before the fresh reopen that follows a logout.
    pub logout_reopen_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            reconnect_backoff: Duration::from_secs(5),
            logout_reopen_delay: Duration::from_secs(3),
        }
    }
}

/// Borrowed send surface for the current session.
///
/// Valid for one attempt; callers re-acquire it through
/// [`SessionManager::await_open`] after any reconnect rather than
/// retaining it.
pub struct SessionHandle {
    client: Arc<dyn MessagingClient>,
}

impl SessionHandle {
    /// Deliver one payload through the live session.
    pub async fn send(&self, payload: OutboundPayload) -> Result<()> {
        self.client.send(payload).await
    }
}

enum Command {
    /// Drop the current connection and reopen in resumable mode. The ack
    /// fires once the session has left `Open`, so a subsequent
    /// `await_open` cannot observe the stale session.
    Reconnect(oneshot::Sender<()>),
}

/// Owns the connection to the external messaging client.
pub struct SessionManager {
    client: Arc<dyn MessagingClient>,
    state_rx: watch::Receiver<SessionState>,
    command_tx: mpsc::Sender<Command>,
    task: tokio::task::JoinHandle<()>,
}

impl SessionManager {
    /// Spawn the session loop. `force_fresh` discards nothing but makes
    /// the first open non-resumable, so a pairing code is issued even
    /// when stored credentials exist.
    #[must_use]
    pub fn start(
        client: Arc<dyn MessagingClient>,
        creds: CredentialStore,
        policy: ReconnectPolicy,
        force_fresh: bool,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let (command_tx, command_rx) = mpsc::channel(4);

        let loop_client = Arc::clone(&client);
        let task = tokio::spawn(run_loop(
            loop_client,
            creds,
            policy,
            state_tx,
            command_rx,
            force_fresh,
        ));

        Self {
            client,
            state_rx,
            command_tx,
            task,
        }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    /// Watch the state stream (used by status output).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Suspend until the session is `Open`, then borrow a send handle.
    pub async fn await_open(&self) -> Result<SessionHandle> {
        let mut state_rx = self.state_rx.clone();
        state_rx
            .wait_for(|s| *s == SessionState::Open)
            .await
            .map_err(|_| Error::LoopStopped)?;
        Ok(SessionHandle {
            client: Arc::clone(&self.client),
        })
    }

    /// Force a resumable reopen; returns once the old session is down.
    ///
    /// The dispatch engine calls this between delivery attempts; the next
    /// `await_open` then waits for the replacement session.
    pub async fn force_reconnect(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.command_tx
            .send(Command::Reconnect(ack_tx))
            .await
            .map_err(|_| Error::LoopStopped)?;
        ack_rx.await.map_err(|_| Error::LoopStopped)
    }

    /// Tear the session down and stop the loop.
    pub async fn shutdown(self) {
        self.task.abort();
        self.client.disconnect().await;
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Outcome of one connection's event stream: how the next open behaves.
enum NextOpen {
    Fresh,
    Resumable,
}

async fn run_loop(
    client: Arc<dyn MessagingClient>,
    creds: CredentialStore,
    policy: ReconnectPolicy,
    state_tx: watch::Sender<SessionState>,
    mut command_rx: mpsc::Receiver<Command>,
    force_fresh: bool,
) {
    let mut fresh = force_fresh || !creds.has_credentials();

    loop {
        // A resume without stored records cannot work; fall back to a
        // fresh open so the pairing code is actually surfaced.
        if !fresh && !creds.has_credentials() {
            fresh = true;
        }
        state_tx.send_replace(SessionState::Connecting);

        let credentials = if fresh {
            Vec::new()
        } else {
            match creds.load() {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, "credential store unreadable, opening fresh");
                    Vec::new()
                },
            }
        };

        let options = ConnectOptions {
            fresh,
            credentials,
        };
        let events = match client.connect(options).await {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "connect failed, retrying");
                state_tx.send_replace(SessionState::Closed(CloseReason::Transient(0)));
                tokio::time::sleep(policy.reconnect_backoff).await;
                continue;
            },
        };

        let next = drive_session(
            &client,
            &creds,
            &policy,
            &state_tx,
            &mut command_rx,
            events,
            fresh,
        )
        .await;

        fresh = match next {
            Some(NextOpen::Fresh) => true,
            Some(NextOpen::Resumable) => false,
            // Manager dropped; stop reconnecting.
            None => return,
        };
    }
}

/// Process one connection's events until it closes.
async fn drive_session(
    client: &Arc<dyn MessagingClient>,
    creds: &CredentialStore,
    policy: &ReconnectPolicy,
    state_tx: &watch::Sender<SessionState>,
    command_rx: &mut mpsc::Receiver<Command>,
    mut events: mpsc::Receiver<ClientEvent>,
    fresh: bool,
) -> Option<NextOpen> {
    loop {
        tokio::select! {
            command = command_rx.recv() => match command {
                Some(Command::Reconnect(ack)) => {
                    info!("forced reconnect");
                    client.disconnect().await;
                    state_tx.send_replace(SessionState::Connecting);
                    let _ = ack.send(());
                    return Some(NextOpen::Resumable);
                },
                None => return None,
            },
            event = events.recv() => match event {
                Some(ClientEvent::PairingRequired { code }) => {
                    if fresh {
                        info!("pairing required, scan the code below");
                        print_pairing_code(&code);
                        state_tx.send_replace(SessionState::AwaitingPairing(code));
                    }
                },
                Some(ClientEvent::Open { phone_number }) => {
                    info!(?phone_number, "session open");
                    state_tx.send_replace(SessionState::Open);
                },
                Some(ClientEvent::CredentialsUpdate { records }) => {
                    // Written before the next event is taken; a crash right
                    // after a credential rotation must not lose the session.
                    if let Err(e) = creds.save(&records) {
                        error!(error = %e, "failed to persist credentials");
                    }
                },
                Some(ClientEvent::Closed { status }) => {
                    let reason = CloseReason::classify(status);
                    state_tx.send_replace(SessionState::Closed(reason));
                    match reason {
                        CloseReason::LoggedOut => {
                            warn!(status, "logged out by the remote service, wiping credentials");
                            if let Err(e) = creds.wipe() {
                                error!(error = %e, "failed to wipe credential store");
                            }
                            tokio::time::sleep(policy.logout_reopen_delay).await;
                            return Some(NextOpen::Fresh);
                        },
                        CloseReason::Transient(status) => {
                            warn!(status, "session closed, reconnecting");
                            tokio::time::sleep(policy.reconnect_backoff).await;
                            return Some(NextOpen::Resumable);
                        },
                    }
                },
                // Stream ended without a close event: transient.
                None => {
                    warn!("client event stream ended, reconnecting");
                    state_tx.send_replace(SessionState::Closed(CloseReason::Transient(0)));
                    tokio::time::sleep(policy.reconnect_backoff).await;
                    return Some(NextOpen::Resumable);
                },
            },
        }
    }
}
