//! Search-as-you-type suggestions.
//!
//! [`SuggestionResolver`] is the stateless query: empty input short-circuits,
//! everything else goes to the title search endpoint. [`SuggestionSession`]
//! wraps it for one input surface: it debounces keystrokes, spaces out
//! network requests, cancels superseded requests and only ever applies the
//! result of the most recently issued query.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use thiserror::Error;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};
use wiktionary_client::{types::Candidate, ClientError, DictionarySource, MAX_SUGGESTIONS};

use crate::state::SuggestionState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuggestionError {
    #[error("failed to load suggestions: {0}")]
    Fetch(#[from] ClientError),
}

impl SuggestionError {
    /// Text for the single explanatory row shown in place of results.
    pub fn user_message(&self) -> &'static str {
        "Failed to load suggestions."
    }
}

#[derive(Clone)]
pub struct SuggestionResolver {
    source: Arc<dyn DictionarySource>,
    limit: usize,
}

impl SuggestionResolver {
    pub fn new(source: Arc<dyn DictionarySource>, limit: usize) -> Self {
        Self {
            source,
            limit: limit.clamp(1, MAX_SUGGESTIONS),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Candidates for `query` in upstream order. Blank input returns an
    /// empty list without touching the network.
    #[instrument(name = "suggestion_resolver.resolve", skip(self))]
    pub async fn resolve(&self, query: &str) -> Result<Vec<Candidate>, SuggestionError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self.source.search_titles(query, self.limit).await?;
        debug!(query, count = candidates.len(), "resolved suggestions");
        Ok(candidates)
    }
}

/// Enforces a minimum spacing between consecutive network requests.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    next_slot: tokio::sync::Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: tokio::sync::Mutex::new(None),
        }
    }

    /// Wait until the next request slot opens and claim it.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }
        let mut next_slot = self.next_slot.lock().await;
        if let Some(at) = *next_slot {
            if at > Instant::now() {
                sleep_until(at).await;
            }
        }
        *next_slot = Some(Instant::now() + self.interval);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Quiet period after a keystroke before the query is sent.
    pub debounce: Duration,
    /// Minimum spacing between requests that do go out.
    pub min_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(250),
            min_interval: Duration::from_millis(250),
        }
    }
}

struct Applied {
    sequence: u64,
    state: SuggestionState,
}

/// Suggestion state for a single input surface.
pub struct SuggestionSession {
    resolver: SuggestionResolver,
    options: SessionOptions,
    throttle: Throttle,
    issued: AtomicU64,
    current: Mutex<Applied>,
    in_flight: Mutex<CancellationToken>,
}

impl SuggestionSession {
    pub fn new(resolver: SuggestionResolver, options: SessionOptions) -> Self {
        Self {
            resolver,
            options,
            throttle: Throttle::new(options.min_interval),
            issued: AtomicU64::new(0),
            current: Mutex::new(Applied {
                sequence: 0,
                state: SuggestionState::Idle,
            }),
            in_flight: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn snapshot(&self) -> SuggestionState {
        self.current
            .lock()
            .map(|applied| applied.state.clone())
            .unwrap_or_default()
    }

    /// Sequence number of the most recently issued query.
    pub fn latest_issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Submit new input text.
    ///
    /// Returns the state this call applied, or `None` when a newer query
    /// superseded it before its result could be shown.
    #[instrument(name = "suggestion_session.update", skip(self, query))]
    pub async fn update(&self, query: impl Into<String>) -> Option<SuggestionState> {
        let query = query.into();
        let (sequence, token) = self.supersede();

        if query.trim().is_empty() {
            return self.apply(sequence, SuggestionState::Idle);
        }

        self.apply(
            sequence,
            SuggestionState::Loading {
                query: query.clone(),
            },
        );

        if !self.options.debounce.is_zero() {
            tokio::select! {
                () = token.cancelled() => {
                    trace!(sequence, "query superseded during debounce");
                    return None;
                }
                () = sleep(self.options.debounce) => {}
            }
        }

        let result = tokio::select! {
            () = token.cancelled() => {
                debug!(sequence, query = %query, "superseded suggestion request dropped");
                return None;
            }
            result = async {
                self.throttle.acquire().await;
                self.resolver.resolve(&query).await
            } => result,
        };

        let next = match result {
            Ok(candidates) => SuggestionState::Ready { query, candidates },
            Err(error) => SuggestionState::Failed { query, error },
        };
        self.apply(sequence, next)
    }

    /// Issue the next sequence number, cancel whatever is in flight and
    /// hand out the new query's token. Both happen under one lock so the
    /// newest sequence always owns the live token.
    fn supersede(&self) -> (u64, CancellationToken) {
        let token = CancellationToken::new();
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        in_flight.cancel();
        *in_flight = token.clone();
        (sequence, token)
    }

    /// Results are ordered by issue sequence, never by arrival.
    fn apply(&self, sequence: u64, state: SuggestionState) -> Option<SuggestionState> {
        let mut current = self.current.lock().ok()?;
        if sequence != self.latest_issued() || sequence < current.sequence {
            trace!(sequence, latest = self.latest_issued(), "discarding stale suggestion state");
            return None;
        }
        current.sequence = sequence;
        current.state = state.clone();
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn throttle_spaces_requests() {
        let throttle = Throttle::new(Duration::from_millis(100));
        let started = Instant::now();
        throttle.acquire().await;
        throttle.acquire().await;
        throttle.acquire().await;
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_never_waits() {
        let throttle = Throttle::new(Duration::ZERO);
        let started = Instant::now();
        throttle.acquire().await;
        throttle.acquire().await;
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
