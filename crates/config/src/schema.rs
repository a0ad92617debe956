//! Config schema types (campaign inputs, pacing, session, ledger, dispatch).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VolleyConfig {
    pub campaign: CampaignConfig,
    pub pacing: PacingConfig,
    pub session: SessionConfig,
    pub ledger: LedgerConfig,
    pub dispatch: DispatchConfig,
}

/// How media items are chosen for each recipient.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaMode {
    /// One manifest entry per recipient, advancing round-robin.
    #[default]
    RoundRobin,
    /// Every manifest entry is sent to each recipient.
    FullManifest,
}

/// Campaign input files and selection behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    /// Base directory media filenames are resolved against.
    pub media_dir: PathBuf,

    /// Newline-delimited raw recipient numbers.
    pub recipients_file: PathBuf,

    /// Message entries delimited by a leading `<n>.` marker. A file with
    /// no markers is treated as one fixed caption.
    pub messages_file: PathBuf,

    /// Newline-delimited media filenames.
    pub media_manifest: PathBuf,

    /// Optional default-country file: a calling code or 2-letter region.
    pub country_file: PathBuf,

    /// Media selection behavior per recipient.
    pub media_mode: MediaMode,

    /// Whether a skipped recipient still consumes the pacing delay.
    pub pace_skipped: bool,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("media"),
            recipients_file: PathBuf::from("numbers.txt"),
            messages_file: PathBuf::from("messages.txt"),
            media_manifest: PathBuf::from("media.txt"),
            country_file: PathBuf::from("country.txt"),
            media_mode: MediaMode::default(),
            pace_skipped: false,
        }
    }
}

/// Delays between sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Wait between recipients, in seconds.
    pub between_recipients_secs: u64,

    /// Short settle wait after a successful send, in milliseconds.
    pub post_send_settle_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            between_recipients_secs: 35,
            post_send_settle_ms: 2000,
        }
    }
}

/// Session and reconnect policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory holding the client-owned credential records.
    pub auth_dir: PathBuf,

    /// WebSocket endpoint of the messaging bridge process.
    pub bridge_url: String,

    /// Backoff before reopening after a non-logout close, in seconds.
    pub reconnect_backoff_secs: u64,

    /// Pause before the fresh reopen that follows a logout, in seconds.
    pub logout_reopen_delay_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auth_dir: PathBuf::from("auth"),
            bridge_url: "ws://127.0.0.1:3180".into(),
            reconnect_backoff_secs: 5,
            logout_reopen_delay_secs: 3,
        }
    }
}

/// Durable delivery bookkeeping files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Recipients already delivered, one per line.
    pub sent_file: PathBuf,

    /// Pipe-delimited `recipient | media | cause` failure records.
    pub errors_file: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            sent_file: PathBuf::from("sent.txt"),
            errors_file: PathBuf::from("errors.txt"),
        }
    }
}

/// Per-recipient delivery attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Consecutive failures tolerated before a recipient is abandoned.
    pub attempt_cap: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { attempt_cap: 3 }
    }
}
