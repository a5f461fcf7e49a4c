// Query orchestration
// Dataset lookup first, then the chat model, both written into the session transcript


use tracing::{debug, info, warn};

use crate::dataset::Dataset;
use crate::fallback::{ChatBackend, UpstreamError};
use crate::matcher::{Advice, DEFAULT_THRESHOLD, MatchError, MatchResult, find_best_answer};
use crate::session::{Session, Speaker, TranscriptEntry};

/// What happened to a submitted query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    /// Blank input; nothing was recorded.
    Ignored,
    Answered {
        /// Set when a dataset answer cleared the threshold.
        expert: Option<MatchResult>,
        fallback: FallbackStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackStatus {
    Completed { fragments: usize },
    Failed { reason: String },
    Disabled,
}

/// Answers queries against a fixed dataset and an optional chat backend.
pub struct Advisor<B> {
    dataset: Dataset,
    backend: Option<B>,
    threshold: u8,
}

impl<B: ChatBackend> Advisor<B> {
    #[inline]
    pub fn new(dataset: Dataset, backend: Option<B>) -> Self {
        Self {
            dataset,
            backend,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    #[inline]
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    #[inline]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    #[inline]
    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    #[inline]
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Handle one submitted query.
    ///
    /// Appends the query, any dataset answer, and the model reply fragments
    /// (or a failure notice) to `session`, calling `on_entry` for each as it
    /// is appended.
    #[inline]
    pub fn ask<F>(
        &self,
        session: &mut Session,
        query: &str,
        mut on_entry: F,
    ) -> Result<AskOutcome, MatchError>
    where
        F: FnMut(&TranscriptEntry),
    {
        if query.trim().is_empty() {
            debug!("Ignoring blank query");
            return Ok(AskOutcome::Ignored);
        }

        let advice = find_best_answer(query, self.dataset.records(), self.threshold)?;

        on_entry(session.append(TranscriptEntry::new(Speaker::User, query)));

        let expert = match advice {
            Advice::Expert { answer, matched } => {
                info!(
                    "Dataset answer found (record {}, score {})",
                    matched.index, matched.score
                );
                on_entry(session.append(TranscriptEntry::new(Speaker::ExpertDataset, answer)));
                Some(matched)
            }
            Advice::NoMatch { best } => {
                debug!(
                    "No dataset answer above threshold {} (best score {})",
                    self.threshold, best.score
                );
                None
            }
        };

        let fallback = match &self.backend {
            Some(backend) => consult(backend, session, query, &mut on_entry),
            None => FallbackStatus::Disabled,
        };

        Ok(AskOutcome::Answered { expert, fallback })
    }
}

fn consult<B, F>(
    backend: &B,
    session: &mut Session,
    query: &str,
    on_entry: &mut F,
) -> FallbackStatus
where
    B: ChatBackend,
    F: FnMut(&TranscriptEntry),
{
    let stream = match backend.send(session.conversation(), query) {
        Ok(stream) => stream,
        Err(error) => return record_failure(session, &error, on_entry),
    };

    let mut reply = String::new();
    let mut fragments = 0usize;

    for fragment in stream {
        match fragment {
            Ok(text) => {
                reply.push_str(&text);
                fragments += 1;
                on_entry(session.append(TranscriptEntry::new(Speaker::Model, text)));
            }
            Err(error) => return record_failure(session, &error, on_entry),
        }
    }

    debug!("Model reply complete after {} fragments", fragments);
    session.record_exchange(query, reply);

    FallbackStatus::Completed { fragments }
}

fn record_failure<F>(
    session: &mut Session,
    error: &UpstreamError,
    on_entry: &mut F,
) -> FallbackStatus
where
    F: FnMut(&TranscriptEntry),
{
    warn!("Chat model reply failed: {}", error);

    let reason = error.to_string();
    on_entry(session.append(TranscriptEntry::new(
        Speaker::Notice,
        format!("The model could not answer: {}", reason),
    )));

    FallbackStatus::Failed { reason }
}
