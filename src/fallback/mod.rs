// Conversational fallback
// Remote chat model consulted for every query, streamed back fragment by fragment

pub mod gemini;


use serde::Serialize;
use thiserror::Error;

pub use gemini::GeminiClient;

/// Failure talking to the remote chat service, before or during a reply.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Chat service returned HTTP {code}: {message}")]
    Status { code: u16, message: String },
    #[error("Chat service request timed out")]
    Timeout,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Failed to read reply stream: {0}")]
    Stream(#[from] std::io::Error),
    #[error("Malformed reply chunk: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Chat service error: {0}")]
    Service(String),
    #[error("Reply blocked by the chat service: {0}")]
    Blocked(String),
    #[error("Reply stream ended before the reply was complete")]
    Truncated,
    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<ureq::Error> for UpstreamError {
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::Timeout(_) => Self::Timeout,
            ureq::Error::StatusCode(code) => Self::Status {
                code,
                message: "request rejected".to_string(),
            },
            ureq::Error::Io(io) => Self::Stream(io),
            other => Self::Transport(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// Completed exchanges sent to the chat service as context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a finished question and its full reply.
    #[inline]
    pub fn record_exchange(&mut self, query: impl Into<String>, reply: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::User,
            text: query.into(),
        });
        self.turns.push(Turn {
            role: Role::Model,
            text: reply.into(),
        });
    }
}

/// Reply fragments in arrival order. Finite and consumed once.
pub type ReplyStream = Box<dyn Iterator<Item = Result<String, UpstreamError>>>;

/// A remote conversational model.
pub trait ChatBackend {
    /// Start a reply to `query`, given the prior `history`.
    ///
    /// Errors returned here mean no reply was started; errors yielded by the
    /// stream mean the reply failed part way.
    fn send(&self, history: &Conversation, query: &str) -> Result<ReplyStream, UpstreamError>;
}

impl<B: ChatBackend + ?Sized> ChatBackend for &B {
    #[inline]
    fn send(&self, history: &Conversation, query: &str) -> Result<ReplyStream, UpstreamError> {
        (**self).send(history, query)
    }
}
