//! The dispatch loop.
//!
//! Strictly sequential: one recipient at a time, one send in flight,
//! suspensions only for pacing, the settle delay, and session reopens.
//! Ledger writes all happen from this single task.

use std::{path::Path, time::Duration};

use {
    tokio::time::sleep,
    tracing::{info, warn},
};

use {
    volley_campaign::{Campaign, ItemPicker, MediaKind},
    volley_config::{MediaMode, VolleyConfig, expand_tilde},
    volley_ledger::{ErrorLog, SentLedger},
    volley_session::{OutboundPayload, SessionHandle, SessionManager},
};

/// Crate-wide result type for dispatch.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal dispatch errors. Send failures are retried and recorded, never
/// surfaced here; what does surface aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Ledger(#[from] volley_ledger::Error),

    #[error(transparent)]
    Session(#[from] volley_session::Error),
}

/// Counts reported after the last recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub delivered: usize,
    pub skipped_sent: usize,
    pub skipped_media: usize,
    pub abandoned: usize,
}

/// How one recipient's delivery ended.
enum Delivery {
    Completed,
    MediaMissing,
    Abandoned,
}

/// Drives one campaign run to completion.
pub struct DispatchEngine<'a> {
    config: &'a VolleyConfig,
    campaign: Campaign,
    picker: ItemPicker,
    sent: SentLedger,
    errors: ErrorLog,
}

impl<'a> DispatchEngine<'a> {
    #[must_use]
    pub fn new(
        config: &'a VolleyConfig,
        campaign: Campaign,
        sent: SentLedger,
        errors: ErrorLog,
    ) -> Self {
        Self {
            config,
            campaign,
            picker: ItemPicker::new(),
            sent,
            errors,
        }
    }

    /// Process every recipient in list order, then return the summary.
    pub async fn run(mut self, session: &SessionManager) -> Result<RunSummary> {
        let recipients = self.campaign.recipients.clone();
        let total = recipients.len();
        let mut summary = RunSummary::default();

        for (position, recipient) in recipients.iter().enumerate() {
            if self.sent.contains(recipient) {
                info!(recipient, "already delivered, skipping");
                summary.skipped_sent += 1;
                if self.config.campaign.pace_skipped {
                    self.pace().await;
                }
                continue;
            }

            let (message_idx, media_idx) = self
                .picker
                .pick(self.campaign.messages.len(), self.campaign.media.len());
            let caption = self.campaign.messages[message_idx].clone();
            let media_refs: Vec<String> = match self.config.campaign.media_mode {
                MediaMode::RoundRobin => vec![self.campaign.media[media_idx].clone()],
                MediaMode::FullManifest => self.campaign.media.clone(),
            };

            info!(recipient, position = position + 1, total, "dispatching");
            match self
                .deliver(session, recipient, &caption, &media_refs)
                .await?
            {
                Delivery::Completed => {
                    self.sent.mark_sent(recipient)?;
                    summary.delivered += 1;
                    self.pace().await;
                },
                Delivery::MediaMissing => {
                    summary.skipped_media += 1;
                    if self.config.campaign.pace_skipped {
                        self.pace().await;
                    }
                },
                Delivery::Abandoned => {
                    summary.abandoned += 1;
                    self.pace().await;
                },
            }
        }

        info!(
            delivered = summary.delivered,
            skipped_sent = summary.skipped_sent,
            skipped_media = summary.skipped_media,
            abandoned = summary.abandoned,
            "campaign run complete"
        );
        Ok(summary)
    }

    /// Send every selected media item to one recipient.
    ///
    /// A missing file is a soft skip (console warning, no ledger or error
    /// mutation). The recipient completes only if at least one item went
    /// out and none was abandoned; bookkeeping stays all-or-nothing.
    async fn deliver(
        &self,
        session: &SessionManager,
        recipient: &str,
        caption: &str,
        media_refs: &[String],
    ) -> Result<Delivery> {
        let media_dir = expand_tilde(&self.config.campaign.media_dir);
        let mut sent_any = false;

        for media_ref in media_refs {
            let path = media_dir.join(media_ref);
            if !path.is_file() {
                warn!(recipient, media = media_ref.as_str(), "media file not found, skipping");
                continue;
            }

            if !self
                .send_with_retry(session, recipient, caption, media_ref, &path)
                .await?
            {
                return Ok(Delivery::Abandoned);
            }
            sent_any = true;
            self.settle().await;
        }

        if sent_any {
            Ok(Delivery::Completed)
        } else {
            Ok(Delivery::MediaMissing)
        }
    }

    /// One media item with the bounded retry loop: record every failure,
    /// force a resumable reopen, try again up to the attempt cap.
    async fn send_with_retry(
        &self,
        session: &SessionManager,
        recipient: &str,
        caption: &str,
        media_ref: &str,
        path: &Path,
    ) -> Result<bool> {
        let cap = self.config.dispatch.attempt_cap.max(1);

        for attempt in 1..=cap {
            let handle = session.await_open().await?;
            match send_item(&handle, recipient, caption, path).await {
                Ok(()) => {
                    info!(recipient, media = media_ref, "delivered");
                    return Ok(true);
                },
                Err(e) => {
                    warn!(
                        recipient,
                        media = media_ref,
                        attempt,
                        error = %e,
                        "delivery attempt failed"
                    );
                    self.errors.record(recipient, media_ref, &e.to_string())?;
                    if attempt < cap {
                        session.force_reconnect().await?;
                    }
                },
            }
        }

        warn!(recipient, media = media_ref, cap, "abandoned after repeated failures");
        Ok(false)
    }

    async fn settle(&self) {
        let wait = Duration::from_millis(self.config.pacing.post_send_settle_ms);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }

    async fn pace(&self) {
        let wait = Duration::from_secs(self.config.pacing.between_recipients_secs);
        if wait.is_zero() {
            return;
        }
        info!(secs = wait.as_secs(), "pacing before next recipient");
        sleep(wait).await;
    }
}

/// Shape the payload(s) for one media item and push them through the
/// borrowed session handle. Audio and documents get their caption as a
/// separate text message; images and videos carry it inline.
async fn send_item(
    handle: &SessionHandle,
    to: &str,
    caption: &str,
    path: &Path,
) -> volley_session::Result<()> {
    let kind = MediaKind::from_path(path);
    let payload = match kind {
        MediaKind::Audio => OutboundPayload::Audio {
            to: to.into(),
            path: path.into(),
        },
        MediaKind::Image => OutboundPayload::Image {
            to: to.into(),
            path: path.into(),
            caption: caption.into(),
        },
        MediaKind::Video => OutboundPayload::Video {
            to: to.into(),
            path: path.into(),
            caption: caption.into(),
        },
        MediaKind::Document => OutboundPayload::Document {
            to: to.into(),
            path: path.into(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".into()),
        },
    };

    handle.send(payload).await?;
    if !kind.inline_caption() {
        handle
            .send(OutboundPayload::Text {
                to: to.into(),
                body: caption.into(),
            })
            .await?;
    }
    Ok(())
}
