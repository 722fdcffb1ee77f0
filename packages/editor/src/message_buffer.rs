//! # Streaming Text Buffer
//!
//! Holds back the tail of a streaming message while it might be an unfinished
//! markdown link or image, so downstream consumers only ever see complete
//! constructs.
//!
//! ## State machine
//!
//! ```text
//!            '['                 ']'                  '('               ')'
//! Bypass ─────────▶ LinkText ─────────▶ LinkUrlStart ─────▶ LinkUrl ─────────▶ Bypass
//!   │                                       │ other
//!   │ '!'        '['                        ▼
//!   └────▶ MaybeImage ──▶ ImageText ─▶ ImageUrlStart ─▶ ImageUrl ─▶ Bypass
//!              │ other                      │ other
//!              ▼                            ▼
//!            Bypass                       Bypass
//! ```
//!
//! Every character goes into `pending`. Whenever the machine is in `Bypass`
//! after a character, `pending` moves to `confirmed`. Memory is bounded by the
//! longest construct still open.

use serde::{Deserialize, Serialize};

/// Parse state of a [`MessageBuffer`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BufferState {
    #[default]
    Bypass,
    MaybeImage,
    LinkText,
    LinkUrlStart,
    LinkUrl,
    ImageText,
    ImageUrlStart,
    ImageUrl,
}

impl BufferState {
    fn next(self, c: char) -> Self {
        use BufferState::*;

        match (self, c) {
            (Bypass, '[') => LinkText,
            (Bypass, '!') => MaybeImage,
            (Bypass, _) => Bypass,

            (MaybeImage, '[') => ImageText,
            (MaybeImage, _) => Bypass,

            (LinkText, ']') => LinkUrlStart,
            (LinkText, _) => LinkText,
            (LinkUrlStart, '(') => LinkUrl,
            (LinkUrlStart, _) => Bypass,
            (LinkUrl, ')') => Bypass,
            (LinkUrl, _) => LinkUrl,

            (ImageText, ']') => ImageUrlStart,
            (ImageText, _) => ImageText,
            (ImageUrlStart, '(') => ImageUrl,
            (ImageUrlStart, _) => Bypass,
            (ImageUrl, ')') => Bypass,
            (ImageUrl, _) => ImageUrl,
        }
    }
}

/// How a buffer attached to a partially streamed message learns its prefix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResyncStrategy {
    /// Run the existing text through the state machine. Always correct.
    #[default]
    Replay,
    /// Take the existing text as confirmed. Only sound when the server never
    /// hands over a prefix that ends inside a link or image.
    TrustSeed,
}

impl ResyncStrategy {
    /// Build a buffer for a message whose text so far is `existing`.
    pub fn attach(self, existing: &str) -> MessageBuffer {
        match self {
            ResyncStrategy::Replay => MessageBuffer::replay(existing),
            ResyncStrategy::TrustSeed => MessageBuffer::with_seed(existing),
        }
    }
}

/// Per-message streaming buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBuffer {
    state: BufferState,
    confirmed: String,
    pending: String,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer whose confirmed output starts as `seed`, taken on trust.
    pub fn with_seed(seed: impl Into<String>) -> Self {
        Self {
            state: BufferState::Bypass,
            confirmed: seed.into(),
            pending: String::new(),
        }
    }

    /// Buffer that has seen `history` as if it had been streamed.
    pub fn replay(history: &str) -> Self {
        let mut buffer = Self::new();
        buffer.process_delta(history);
        buffer
    }

    /// Feed one delta. Returns true when confirmed output grew.
    pub fn process_delta(&mut self, delta: &str) -> bool {
        let before = self.confirmed.len();

        for c in delta.chars() {
            self.pending.push(c);
            self.state = self.state.next(c);

            if self.state == BufferState::Bypass {
                self.confirmed.push_str(&self.pending);
                self.pending.clear();
            }
        }

        self.confirmed.len() != before
    }

    /// Text safe to render or speak.
    pub fn confirmed(&self) -> &str {
        &self.confirmed
    }

    /// Text held back because it may be an unfinished construct.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    pub fn is_withholding(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Everything received, confirmed or not.
    pub fn text(&self) -> String {
        let mut text = String::with_capacity(self.confirmed.len() + self.pending.len());
        text.push_str(&self.confirmed);
        text.push_str(&self.pending);
        text
    }

    /// Flush the pending tail unconditionally and return the full text.
    ///
    /// An unterminated construct at end of stream is kept as-is.
    pub fn finish(mut self) -> String {
        self.confirmed.push_str(&self.pending);
        self.confirmed
    }

    /// Start over with `seed` as confirmed output.
    pub fn reinitialize(&mut self, seed: impl Into<String>) {
        self.state = BufferState::Bypass;
        self.confirmed = seed.into();
        self.pending.clear();
    }
}
