//! Expectation registry, matcher and verifier.
//!
//! # Design
//! `SimpleResponseProvider` keeps every registered pattern in registration
//! order behind a single mutex. Matching is exact: an incoming request
//! answers to the first entry whose pattern equals it on method, content
//! type, body, path and query-parameter set. Looking up the entry, reading
//! its cursor and advancing it happen under one lock acquisition, so two
//! identical concurrent requests never consume the same response.
//!
//! Nothing in here fails while requests are being served. Misses are logged
//! and reported all at once by `verify()`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::error::{RejectedRequest, RequestError, UnmetExpectation, UnsatisfiedExpectationError};
use crate::expectation::{Expectation, ExpectationEntry, Policy};
use crate::http::HttpResponse;
use crate::request::{FullHttpRequest, HttpRequest};

/// Source of responses for a mock server.
pub trait ExpectedResponseProvider: Send + Sync {
    /// Response for `request`, or `None` when the request is not expected.
    fn response(&self, request: &HttpRequest) -> Option<HttpResponse>;

    /// Records a request the server could not decode into an
    /// [`HttpRequest`]. It got no response and counts as unexpected.
    fn reject(&self, request: RejectedRequest);

    /// Checks that every expectation was met once all requests were sent.
    fn verify(&self) -> Result<(), UnsatisfiedExpectationError>;
}

#[derive(Debug, Default)]
struct State {
    entries: Vec<ExpectationEntry>,
    unexpected: Vec<HttpRequest>,
    received: Vec<HttpRequest>,
    rejected: Vec<RejectedRequest>,
}

impl State {
    /// First registered entry whose pattern equals `request`.
    fn find_mut(&mut self, request: &HttpRequest) -> Option<&mut ExpectationEntry> {
        self.entries.iter_mut().find(|e| e.pattern.as_request() == request)
    }

    fn insert(&mut self, expectation: Expectation) {
        match self.find_mut(expectation.pattern.as_request()) {
            Some(entry) => {
                debug!(
                    url = %entry.pattern.url(),
                    added = expectation.responses.len(),
                    "extending expectation"
                );
                entry.merge(expectation);
            }
            None => {
                debug!(url = %expectation.pattern.url(), "registering expectation");
                self.entries.push(ExpectationEntry::new(expectation));
            }
        }
    }
}

/// In-memory [`ExpectedResponseProvider`] for one test.
#[derive(Debug, Default)]
pub struct SimpleResponseProvider {
    policy: Policy,
    state: Mutex<State>,
}

impl SimpleResponseProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: Policy) -> Self {
        Self {
            policy,
            state: Mutex::default(),
        }
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Expects `pattern` once more, answered by `response`.
    ///
    /// Registering an equal pattern again appends to its response sequence,
    /// so the first call gets the first response, the second call the next.
    pub fn register(&self, pattern: impl Into<FullHttpRequest>, response: HttpResponse) {
        self.lock().insert(Expectation::new(pattern).respond_with(response));
    }

    /// Expects `pattern` to be answered by `responses` on successive calls.
    pub fn register_sequence(
        &self,
        pattern: impl Into<FullHttpRequest>,
        responses: impl IntoIterator<Item = HttpResponse>,
    ) -> Result<(), RequestError> {
        self.expect(Expectation::new(pattern).respond_with_sequence(responses))
    }

    /// Registers an expectation, merging it into an existing entry with an
    /// equal pattern.
    ///
    /// Fails when the expectation is new and has no response to give.
    pub fn expect(&self, expectation: Expectation) -> Result<(), RequestError> {
        let mut state = self.lock();
        let known = state.find_mut(expectation.pattern.as_request()).is_some();
        if expectation.responses.is_empty() && !known {
            return Err(RequestError::NoResponses(expectation.pattern.url()));
        }
        state.insert(expectation);
        Ok(())
    }

    /// Every request seen so far, matched or not, in arrival order.
    pub fn received_requests(&self) -> Vec<HttpRequest> {
        self.lock().received.clone()
    }

    /// Requests that did not get a response from any expectation.
    pub fn unexpected_requests(&self) -> Vec<HttpRequest> {
        self.lock().unexpected.clone()
    }

    /// Requests the server received but could not decode.
    pub fn rejected_requests(&self) -> Vec<RejectedRequest> {
        self.lock().rejected.clone()
    }

    /// Forgets all expectations and recorded requests.
    pub fn reset(&self) {
        *self.lock() = State::default();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // Every critical section leaves the state consistent, so a panic in
        // another thread does not invalidate it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ExpectedResponseProvider for SimpleResponseProvider {
    fn response(&self, request: &HttpRequest) -> Option<HttpResponse> {
        let mut state = self.lock();
        state.received.push(request.clone());

        let answer = state
            .find_mut(request)
            .and_then(|entry| entry.next_response(self.policy.on_exhausted));

        match answer {
            Some(response) => {
                debug!(
                    method = %request.method(),
                    path = ?request.path(),
                    status = response.status(),
                    "matched expectation"
                );
                Some(response)
            }
            None => {
                warn!(method = %request.method(), path = ?request.path(), "unexpected request");
                state.unexpected.push(request.clone());
                None
            }
        }
    }

    fn reject(&self, request: RejectedRequest) {
        warn!(
            method = %request.method,
            uri = %request.uri,
            reason = %request.reason,
            "rejected request"
        );
        self.lock().rejected.push(request);
    }

    fn verify(&self) -> Result<(), UnsatisfiedExpectationError> {
        let state = self.lock();
        let unmet: Vec<UnmetExpectation> = state
            .entries
            .iter()
            .filter(|e| !e.is_satisfied())
            .map(|e| UnmetExpectation {
                pattern: e.pattern.clone(),
                times: e.times,
                call_count: e.total_calls(),
            })
            .collect();
        let (unexpected, rejected) = if self.policy.fail_on_unexpected {
            (state.unexpected.clone(), state.rejected.clone())
        } else {
            (Vec::new(), Vec::new())
        };

        if unmet.is_empty() && unexpected.is_empty() && rejected.is_empty() {
            return Ok(());
        }
        Err(UnsatisfiedExpectationError {
            unmet,
            unexpected,
            rejected,
        })
    }
}
