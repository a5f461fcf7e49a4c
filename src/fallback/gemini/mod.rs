#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Lines};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::{ChatBackend, Conversation, ReplyStream, Role, UpstreamError};
use crate::config::{ApiKey, GeminiConfig};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Streaming client for the Gemini `streamGenerateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: Url,
    model: String,
    api_key: ApiKey,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: Role,
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn new(history: &'a Conversation, query: &'a str) -> Self {
        let mut contents: Vec<RequestContent<'a>> = history
            .turns()
            .iter()
            .map(|turn| RequestContent {
                role: turn.role,
                parts: [RequestPart { text: &turn.text }],
            })
            .collect();

        contents.push(RequestContent {
            role: Role::User,
            parts: [RequestPart { text: query }],
        });

        Self { contents }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ServiceError,
}

#[derive(Debug, Deserialize)]
pub struct ServiceError {
    pub code: Option<u16>,
    pub message: String,
    pub status: Option<String>,
}

impl GeminiClient {
    #[inline]
    pub fn new(config: &GeminiConfig, api_key: ApiKey) -> Result<Self> {
        let base_url = config
            .endpoint_url()
            .context("Failed to parse Gemini endpoint from config")?;

        Ok(Self {
            base_url,
            model: config.model.clone(),
            api_key,
            agent: build_agent(Duration::from_secs(config.timeout_secs)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn stream_url(&self) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.join(&format!(
            "/v1beta/models/{}:streamGenerateContent",
            self.model
        ))?;
        url.query_pairs_mut().append_pair("alt", "sse");
        Ok(url)
    }
}

impl ChatBackend for GeminiClient {
    fn send(&self, history: &Conversation, query: &str) -> Result<ReplyStream, UpstreamError> {
        let url = self.stream_url()?;
        let request_json = serde_json::to_string(&GenerateRequest::new(history, query))?;

        debug!(
            "Sending query to {} with {} prior turns",
            self.model,
            history.len()
        );

        let response = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .header(API_KEY_HEADER, self.api_key.expose())
            .send(&request_json)?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            let body = response
                .into_body()
                .read_to_string()
                .unwrap_or_default();
            let message = error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
            warn!("Chat service rejected request: HTTP {} {}", code, message);
            return Err(UpstreamError::Status { code, message });
        }

        info!("Streaming reply from {}", self.model);
        let reader = BufReader::new(response.into_body().into_reader());
        Ok(Box::new(SseFragments::new(reader)))
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Pull the human-readable message out of a JSON error body.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
}

/// Text fragments decoded from a server-sent-event reply.
///
/// Each `data:` line holds one JSON chunk. The stream is complete once a
/// candidate reports a finish reason; running out of input before that is
/// reported as [`UpstreamError::Truncated`].
pub struct SseFragments<R> {
    lines: Lines<R>,
    pending: VecDeque<String>,
    finished: bool,
    failed: Option<UpstreamError>,
    done: bool,
}

impl<R: BufRead> SseFragments<R> {
    #[inline]
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            pending: VecDeque::new(),
            finished: false,
            failed: None,
            done: false,
        }
    }

    fn absorb(&mut self, payload: &str) -> Result<(), UpstreamError> {
        let chunk: StreamChunk = serde_json::from_str(payload)?;

        if let Some(error) = chunk.error {
            return Err(UpstreamError::Service(error.message));
        }

        if chunk.candidates.is_empty() {
            if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(UpstreamError::Blocked(reason));
            }
        }

        if let Some(candidate) = chunk.candidates.into_iter().next() {
            let texts = candidate
                .content
                .into_iter()
                .flat_map(|content| content.parts)
                .filter_map(|part| part.text)
                .filter(|text| !text.is_empty());
            self.pending.extend(texts);

            if let Some(reason) = candidate.finish_reason {
                debug!("Reply finished with reason {}", reason);
                match reason.as_str() {
                    "STOP" | "MAX_TOKENS" => self.finished = true,
                    _ => self.failed = Some(UpstreamError::Blocked(reason)),
                }
            }
        }

        Ok(())
    }
}

impl<R: BufRead> Iterator for SseFragments<R> {
    type Item = Result<String, UpstreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(fragment) = self.pending.pop_front() {
                return Some(Ok(fragment));
            }

            if self.done {
                return None;
            }

            if let Some(error) = self.failed.take() {
                self.done = true;
                return Some(Err(error));
            }

            if self.finished {
                self.done = true;
                return None;
            }

            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(error)) => {
                    self.done = true;
                    return Some(Err(UpstreamError::Stream(error)));
                }
                None => {
                    self.done = true;
                    return Some(Err(UpstreamError::Truncated));
                }
            };

            let Some(payload) = line.strip_prefix("data:") else {
                continue;
            };
            let payload = payload.trim();
            if payload.is_empty() {
                continue;
            }

            if let Err(error) = self.absorb(payload) {
                self.done = true;
                return Some(Err(error));
            }
        }
    }
}
