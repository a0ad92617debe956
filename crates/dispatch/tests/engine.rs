#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Dispatch-engine tests against a scripted in-memory client.

use std::{
    collections::HashSet,
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use {async_trait::async_trait, tokio::sync::mpsc, tokio::time::timeout};

use {
    volley_campaign::Campaign,
    volley_config::{MediaMode, VolleyConfig},
    volley_dispatch::{DispatchEngine, RunSummary},
    volley_ledger::{ErrorLog, SentLedger},
    volley_session::{
        ClientEvent, ConnectOptions, CredentialStore, MessagingClient, OutboundPayload,
        ReconnectPolicy, SessionManager,
    },
};

/// Opens immediately on every connect and records every send. Sends whose
/// zero-based global index is in `fail_on` return an error.
struct AutoOpenClient {
    sends: Mutex<Vec<OutboundPayload>>,
    fail_on: HashSet<usize>,
    connects: Mutex<u32>,
    // Keeps event channels open so the manager never sees a spurious close.
    event_senders: Mutex<Vec<mpsc::Sender<ClientEvent>>>,
}

impl AutoOpenClient {
    fn new(fail_on: impl IntoIterator<Item = usize>) -> Arc<Self> {
        Arc::new(Self {
            sends: Mutex::new(Vec::new()),
            fail_on: fail_on.into_iter().collect(),
            connects: Mutex::new(0),
            event_senders: Mutex::new(Vec::new()),
        })
    }

    fn sends(&self) -> Vec<OutboundPayload> {
        self.sends.lock().unwrap().clone()
    }

    fn connects(&self) -> u32 {
        *self.connects.lock().unwrap()
    }
}

#[async_trait]
impl MessagingClient for AutoOpenClient {
    async fn connect(
        &self,
        _options: ConnectOptions,
    ) -> volley_session::Result<mpsc::Receiver<ClientEvent>> {
        *self.connects.lock().unwrap() += 1;
        let (tx, rx) = mpsc::channel(8);
        tx.send(ClientEvent::Open { phone_number: None })
            .await
            .map_err(|_| volley_session::Error::connect("receiver gone"))?;
        self.event_senders.lock().unwrap().push(tx);
        Ok(rx)
    }

    async fn send(&self, payload: OutboundPayload) -> volley_session::Result<()> {
        let mut sends = self.sends.lock().unwrap();
        let index = sends.len();
        sends.push(payload);
        if self.fail_on.contains(&index) {
            return Err(volley_session::Error::send("scripted failure"));
        }
        Ok(())
    }

    async fn disconnect(&self) {}
}

struct Fixture {
    dir: tempfile::TempDir,
    config: VolleyConfig,
}

impl Fixture {
    /// Zero-delay config rooted in a tempdir, with the given media files
    /// created on disk.
    fn new(media_files: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let media_dir = dir.path().join("media");
        std::fs::create_dir(&media_dir).unwrap();
        for name in media_files {
            std::fs::write(media_dir.join(name), b"bytes").unwrap();
        }

        let mut config = VolleyConfig::default();
        config.campaign.media_dir = media_dir;
        config.pacing.between_recipients_secs = 0;
        config.pacing.post_send_settle_ms = 0;
        config.ledger.sent_file = dir.path().join("sent.txt");
        config.ledger.errors_file = dir.path().join("errors.txt");

        Self { dir, config }
    }

    fn manager(&self, client: Arc<AutoOpenClient>) -> SessionManager {
        let policy = ReconnectPolicy {
            reconnect_backoff: Duration::from_millis(1),
            logout_reopen_delay: Duration::from_millis(1),
        };
        SessionManager::start(
            client,
            CredentialStore::new(&self.dir.path().join("auth")),
            policy,
            false,
        )
    }

    fn engine(&self, campaign: Campaign) -> DispatchEngine<'_> {
        let sent = SentLedger::load(&self.config.ledger.sent_file).unwrap();
        let errors = ErrorLog::new(&self.config.ledger.errors_file);
        DispatchEngine::new(&self.config, campaign, sent, errors)
    }

    fn sent_lines(&self) -> Vec<String> {
        read_lines(&self.config.ledger.sent_file)
    }

    fn error_lines(&self) -> Vec<String> {
        read_lines(&self.config.ledger.errors_file)
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(raw) => raw.lines().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}

fn campaign(recipients: &[&str], messages: &[&str], media: &[&str]) -> Campaign {
    Campaign {
        recipients: recipients.iter().map(|s| s.to_string()).collect(),
        messages: messages.iter().map(|s| s.to_string()).collect(),
        media: media.iter().map(|s| s.to_string()).collect(),
    }
}

async fn run(fixture: &Fixture, client: Arc<AutoOpenClient>, campaign: Campaign) -> RunSummary {
    let manager = fixture.manager(Arc::clone(&client));
    let engine = fixture.engine(campaign);
    let summary = timeout(Duration::from_secs(5), engine.run(&manager))
        .await
        .expect("run within deadline")
        .expect("run succeeds");
    manager.shutdown().await;
    summary
}

fn caption_of(payload: &OutboundPayload) -> Option<&str> {
    match payload {
        OutboundPayload::Image { caption, .. } | OutboundPayload::Video { caption, .. } => {
            Some(caption)
        },
        _ => None,
    }
}

fn media_file_of(payload: &OutboundPayload) -> Option<String> {
    match payload {
        OutboundPayload::Audio { path, .. }
        | OutboundPayload::Image { path, .. }
        | OutboundPayload::Video { path, .. }
        | OutboundPayload::Document { path, .. } => {
            Some(path.file_name().unwrap().to_string_lossy().into_owned())
        },
        OutboundPayload::Text { .. } => None,
    }
}

#[tokio::test]
async fn round_robin_interleaves_messages_and_media() {
    let fixture = Fixture::new(&["a.jpg", "b.jpg", "c.jpg"]);
    let client = AutoOpenClient::new([]);
    let recipients = ["1111", "2222", "3333", "4444", "5555", "6666"];

    let summary = run(
        &fixture,
        Arc::clone(&client),
        campaign(&recipients, &["first", "second"], &["a.jpg", "b.jpg", "c.jpg"]),
    )
    .await;

    assert_eq!(summary.delivered, 6);
    let sends = client.sends();
    assert_eq!(sends.len(), 6);

    let captions: Vec<&str> = sends.iter().map(|p| caption_of(p).unwrap()).collect();
    assert_eq!(
        captions,
        vec!["first", "second", "first", "second", "first", "second"]
    );
    let media: Vec<String> = sends.iter().map(|p| media_file_of(p).unwrap()).collect();
    assert_eq!(media, vec!["a.jpg", "b.jpg", "c.jpg", "a.jpg", "b.jpg", "c.jpg"]);

    assert_eq!(fixture.sent_lines(), recipients);
    assert!(fixture.error_lines().is_empty());
}

#[tokio::test]
async fn ledgered_recipient_is_never_attempted() {
    let fixture = Fixture::new(&["a.jpg"]);
    std::fs::write(&fixture.config.ledger.sent_file, "2222\n").unwrap();
    let client = AutoOpenClient::new([]);

    let summary = run(
        &fixture,
        Arc::clone(&client),
        campaign(&["1111", "2222", "3333"], &["hello"], &["a.jpg"]),
    )
    .await;

    assert_eq!(summary.delivered, 2);
    assert_eq!(summary.skipped_sent, 1);
    let sends = client.sends();
    assert_eq!(sends.len(), 2);
    assert!(sends.iter().all(|p| p.to() != "2222"));
    assert!(fixture.error_lines().is_empty());
}

#[tokio::test]
async fn missing_media_file_is_a_soft_skip() {
    let fixture = Fixture::new(&[]);
    let client = AutoOpenClient::new([]);

    let summary = run(
        &fixture,
        Arc::clone(&client),
        campaign(&["1111"], &["hello"], &["ghost.jpg"]),
    )
    .await;

    assert_eq!(summary.skipped_media, 1);
    assert_eq!(summary.delivered, 0);
    assert!(client.sends().is_empty());
    assert!(fixture.sent_lines().is_empty());
    assert!(fixture.error_lines().is_empty());
}

#[tokio::test]
async fn three_failures_abandon_the_recipient() {
    let fixture = Fixture::new(&["a.jpg"]);
    // Every attempt for the only recipient fails.
    let client = AutoOpenClient::new([0, 1, 2, 3]);

    let summary = run(
        &fixture,
        Arc::clone(&client),
        campaign(&["1111"], &["hello"], &["a.jpg"]),
    )
    .await;

    assert_eq!(summary.abandoned, 1);
    assert_eq!(summary.delivered, 0);
    // No 4th attempt.
    assert_eq!(client.sends().len(), 3);
    assert!(fixture.sent_lines().is_empty());

    let errors = fixture.error_lines();
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().all(|l| l.starts_with("1111 | a.jpg | ")));

    // Initial open plus one forced reopen between attempts.
    assert_eq!(client.connects(), 3);
}

#[tokio::test]
async fn retry_recovers_after_one_failure() {
    let fixture = Fixture::new(&["a.jpg"]);
    let client = AutoOpenClient::new([0]);

    let summary = run(
        &fixture,
        Arc::clone(&client),
        campaign(&["1111"], &["hello"], &["a.jpg"]),
    )
    .await;

    assert_eq!(summary.delivered, 1);
    assert_eq!(client.sends().len(), 2);
    assert_eq!(fixture.error_lines().len(), 1);
    assert_eq!(fixture.sent_lines(), vec!["1111"]);
}

#[tokio::test]
async fn audio_and_documents_get_a_separate_caption_send() {
    let fixture = Fixture::new(&["voice.mp3", "list.pdf"]);
    let client = AutoOpenClient::new([]);

    let summary = run(
        &fixture,
        Arc::clone(&client),
        campaign(&["1111", "2222"], &["the caption"], &["voice.mp3", "list.pdf"]),
    )
    .await;

    assert_eq!(summary.delivered, 2);
    let sends = client.sends();
    assert_eq!(sends.len(), 4);
    assert!(matches!(&sends[0], OutboundPayload::Audio { to, .. } if to == "1111"));
    assert!(
        matches!(&sends[1], OutboundPayload::Text { to, body } if to == "1111" && body == "the caption")
    );
    assert!(
        matches!(&sends[2], OutboundPayload::Document { file_name, .. } if file_name == "list.pdf")
    );
    assert!(matches!(&sends[3], OutboundPayload::Text { to, .. } if to == "2222"));
}

#[tokio::test]
async fn failed_caption_send_retries_the_whole_item() {
    let fixture = Fixture::new(&["voice.mp3"]);
    // Audio goes out, its caption fails; the retry resends both.
    let client = AutoOpenClient::new([1]);

    let summary = run(
        &fixture,
        Arc::clone(&client),
        campaign(&["1111"], &["hello"], &["voice.mp3"]),
    )
    .await;

    assert_eq!(summary.delivered, 1);
    let sends = client.sends();
    assert_eq!(sends.len(), 4);
    assert!(matches!(sends[0], OutboundPayload::Audio { .. }));
    assert!(matches!(sends[1], OutboundPayload::Text { .. }));
    assert!(matches!(sends[2], OutboundPayload::Audio { .. }));
    assert!(matches!(sends[3], OutboundPayload::Text { .. }));
    assert_eq!(fixture.error_lines().len(), 1);
}

#[tokio::test]
async fn full_manifest_sends_every_item_per_recipient() {
    let mut fixture = Fixture::new(&["a.jpg", "b.jpg", "c.jpg"]);
    fixture.config.campaign.media_mode = MediaMode::FullManifest;
    let client = AutoOpenClient::new([]);

    let summary = run(
        &fixture,
        Arc::clone(&client),
        campaign(&["1111", "2222"], &["hello"], &["a.jpg", "b.jpg", "c.jpg"]),
    )
    .await;

    assert_eq!(summary.delivered, 2);
    let media: Vec<String> = client
        .sends()
        .iter()
        .filter_map(media_file_of)
        .collect();
    assert_eq!(media, vec!["a.jpg", "b.jpg", "c.jpg", "a.jpg", "b.jpg", "c.jpg"]);
    assert_eq!(fixture.sent_lines(), vec!["1111", "2222"]);
}
