//! Media classification by file extension.

use std::path::Path;

/// Message shape a media file is sent as.
///
/// Audio and document sends are followed by a separate text message
/// carrying the caption; image and video sends carry the caption inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Image,
    Video,
    Document,
}

impl MediaKind {
    /// Classify by extension; anything unrecognized is a generic document.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "mp3" | "wav" | "ogg" => Self::Audio,
            "jpg" | "jpeg" | "png" | "gif" => Self::Image,
            "mp4" | "mov" | "avi" => Self::Video,
            _ => Self::Document,
        }
    }

    /// Whether the caption travels inline with the media payload.
    #[must_use]
    pub fn inline_caption(self) -> bool {
        matches!(self, Self::Image | Self::Video)
    }
}
