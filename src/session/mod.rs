#[cfg(test)]
mod tests;

use std::fmt;

use crate::fallback::Conversation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speaker {
    User,
    ExpertDataset,
    Model,
    /// Failure notices, e.g. an interrupted model reply.
    Notice,
}

impl Speaker {
    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::ExpertDataset => "Expert",
            Self::Model => "Bot",
            Self::Notice => "Notice",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
}

impl TranscriptEntry {
    #[inline]
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

/// State of one interactive session: what has been shown, and the context
/// sent to the chat model. Lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct Session {
    transcript: Vec<TranscriptEntry>,
    conversation: Conversation,
}

impl Session {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Append an entry and return it for rendering.
    #[inline]
    pub fn append(&mut self, entry: TranscriptEntry) -> &TranscriptEntry {
        self.transcript.push(entry);
        &self.transcript[self.transcript.len() - 1]
    }

    #[inline]
    pub fn record_exchange(&mut self, query: impl Into<String>, reply: impl Into<String>) {
        self.conversation.record_exchange(query, reply);
    }

    /// Entries spoken by `speaker`, in order.
    #[inline]
    pub fn entries_by(&self, speaker: Speaker) -> impl Iterator<Item = &TranscriptEntry> {
        self.transcript
            .iter()
            .filter(move |entry| entry.speaker == speaker)
    }
}
