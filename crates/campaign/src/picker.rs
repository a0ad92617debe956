//! Deterministic round-robin selection of (message, media) pairs.

/// Tracks the independent message and media cursors across recipients.
#[derive(Debug, Default)]
pub struct ItemPicker {
    message: usize,
    media: usize,
}

impl ItemPicker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next (message, media) index pair. The cursors advance independently
    /// and wrap via modulo, so differently-sized lists interleave.
    pub fn pick(&mut self, message_count: usize, media_count: usize) -> (usize, usize) {
        let pair = (self.message % message_count, self.media % media_count);
        self.message += 1;
        self.media += 1;
        pair
    }
}
