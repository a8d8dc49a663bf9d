//! Incremental insight generation over a server-sent event stream.
//!
//! The backend emits `data: {json}` lines whose `type` is `content`,
//! `complete` or `error`. Lines may be split across network chunks, so the
//! decoder buffers until it sees a full line. Unparseable lines are skipped.

use futures::future::{AbortHandle, AbortRegistration, Abortable};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::cache::{Entity, InvalidationPlan, Mutation};
use crate::errors::ServiceError;
use crate::models::Insight;
use crate::services::DashboardService;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InsightEvent {
    Content { content: String },
    Complete { insight: Insight },
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsightStreamState {
    NotStarted,
    /// Text received so far.
    Streaming(String),
    Complete(Insight),
    Failed(String),
    Cancelled,
}

impl InsightStreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete(_) | Self::Failed(_) | Self::Cancelled
        )
    }

    /// Applies one event. Terminal states ignore anything that follows.
    pub fn apply(&mut self, event: InsightEvent) {
        if self.is_terminal() {
            return;
        }
        *self = match (std::mem::replace(self, Self::NotStarted), event) {
            (Self::Streaming(mut text), InsightEvent::Content { content }) => {
                text.push_str(&content);
                Self::Streaming(text)
            }
            (_, InsightEvent::Content { content }) => Self::Streaming(content),
            (_, InsightEvent::Complete { insight }) => Self::Complete(insight),
            (_, InsightEvent::Error { error }) => Self::Failed(error),
        };
    }
}

/// Splits a byte stream into `data:` payloads.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns every complete event it finished.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<InsightEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Parses whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Option<InsightEvent> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }
}

fn parse_line(raw: &[u8]) -> Option<InsightEvent> {
    let line = String::from_utf8_lossy(raw);
    let data = line.trim_end_matches(['\r', '\n']).strip_prefix("data:")?;
    match serde_json::from_str(data.trim_start()) {
        Ok(event) => Some(event),
        Err(err) => {
            debug!(error = %err, "Skipping malformed stream line");
            None
        }
    }
}

/// Streams a new insight and keeps the dashboard cache in step.
#[derive(Clone)]
pub struct InsightGenerator {
    dashboard: DashboardService,
}

impl InsightGenerator {
    pub fn new(dashboard: DashboardService) -> Self {
        Self { dashboard }
    }

    /// Handle/registration pair for cancelling a running stream.
    pub fn cancel_pair() -> (AbortHandle, AbortRegistration) {
        AbortHandle::new_pair()
    }

    /// Runs one generation, calling `on_update` after every state change.
    ///
    /// Returns `Err` only if the stream could not be opened. Failures after
    /// that, and cancellation through the abort handle, end in a terminal
    /// state instead.
    #[instrument(skip_all)]
    pub async fn generate<F>(
        &self,
        cancel: AbortRegistration,
        mut on_update: F,
    ) -> Result<InsightStreamState, ServiceError>
    where
        F: FnMut(&InsightStreamState) + Send,
    {
        let mut stream = self.dashboard.backend().stream_insight().await?;
        let mut state = InsightStreamState::NotStarted;

        let run = async {
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        for event in decoder.feed(&bytes) {
                            state.apply(event);
                            on_update(&state);
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "Insight stream broke off");
                        state.apply(InsightEvent::Error {
                            error: err.user_message(),
                        });
                        on_update(&state);
                    }
                }
                if state.is_terminal() {
                    return;
                }
            }
            if let Some(event) = decoder.finish() {
                state.apply(event);
                on_update(&state);
            }
            if !state.is_terminal() {
                state.apply(InsightEvent::Error {
                    error: "Insight stream ended before the insight was saved".to_string(),
                });
                on_update(&state);
            }
        };

        if Abortable::new(run, cancel).await.is_err() {
            info!("Insight generation cancelled");
            state = InsightStreamState::Cancelled;
            on_update(&state);
        }

        if let InsightStreamState::Complete(insight) = &state {
            self.dashboard
                .cache()
                .apply(&InvalidationPlan::for_mutation(Mutation::create(Entity::Insight)));
            info!(id = %insight.id, "Insight generated");
        }
        Ok(state)
    }
}
