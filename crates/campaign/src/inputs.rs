//! Flat-file campaign inputs: recipients, messages, media manifest.

use std::path::Path;

use tracing::{debug, info};

use volley_config::CampaignConfig;

use crate::{
    error::{Error, Result},
    normalize::{default_country_code, normalize},
};

/// The three input lists a run operates on, loaded once at startup and
/// held immutable for the run.
#[derive(Debug, Clone)]
pub struct Campaign {
    /// Canonical destination digit strings, in input order.
    pub recipients: Vec<String>,
    /// Message texts, numeric markers stripped.
    pub messages: Vec<String>,
    /// Media filenames, resolved against the media dir at send time.
    pub media: Vec<String>,
}

impl Campaign {
    /// Load and normalize all campaign inputs.
    ///
    /// Any missing or empty required file is an error; no partial run is
    /// attempted.
    pub fn load(config: &CampaignConfig) -> Result<Self> {
        let country_file = volley_config::expand_tilde(&config.country_file);
        let default_code = default_country_code(&country_file);
        if let Some(code) = &default_code {
            info!(code, "applying default country code");
        }

        let recipients_file = volley_config::expand_tilde(&config.recipients_file);
        let recipients: Vec<String> = read_input(&recipients_file)?
            .lines()
            .map(|line| normalize(line, default_code.as_deref()))
            .filter(|n| !n.is_empty())
            .collect();
        if recipients.is_empty() {
            return Err(Error::empty_input(recipients_file));
        }

        let messages_file = volley_config::expand_tilde(&config.messages_file);
        let messages = parse_messages(&read_input(&messages_file)?);
        if messages.is_empty() {
            return Err(Error::empty_input(messages_file));
        }

        let manifest_file = volley_config::expand_tilde(&config.media_manifest);
        let media: Vec<String> = read_input(&manifest_file)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        if media.is_empty() {
            return Err(Error::empty_input(manifest_file));
        }

        debug!(
            recipients = recipients.len(),
            messages = messages.len(),
            media = media.len(),
            "campaign inputs loaded"
        );

        Ok(Self {
            recipients,
            messages,
            media,
        })
    }
}

/// Split raw message-file text into entries.
///
/// An entry starts at a line with a leading `<integer>.` marker; the marker
/// is stripped and lines up to the next marker belong to the entry. Text
/// before the first marker is kept verbatim, and a file with no markers at
/// all is one single message.
#[must_use]
pub fn parse_messages(raw: &str) -> Vec<String> {
    let mut entries: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    for line in raw.lines() {
        match strip_marker(line) {
            Some(body) => {
                if let Some(done) = current.take() {
                    entries.push(done);
                }
                current = Some(body.to_string());
            },
            None => match current.as_mut() {
                Some(entry) => {
                    entry.push('\n');
                    entry.push_str(line);
                },
                None => current = Some(line.to_string()),
            },
        }
    }
    if let Some(done) = current.take() {
        entries.push(done);
    }

    entries
        .into_iter()
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Strip a leading `<integer>.` marker, returning the rest of the line.
fn strip_marker(line: &str) -> Option<&str> {
    let (num, rest) = line.split_once('.')?;
    if num.is_empty() || !num.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(rest.trim_start())
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::read(path, e))
}
