//! Expectations: a request pattern bound to the responses it should get.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::http::HttpResponse;
use crate::request::FullHttpRequest;

/// How many matching calls an expectation requires for `verify()` to pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Times {
    /// Exactly this many matching calls. Calls that arrive after the
    /// response sequence ran out count too, even when they got no response.
    Exactly(usize),
    /// At least one answered call.
    #[default]
    AtLeastOnce,
    /// Any number of calls, including none.
    Unbounded,
}

impl Times {
    pub fn is_satisfied_by(&self, call_count: usize) -> bool {
        match self {
            Times::Exactly(n) => call_count == *n,
            Times::AtLeastOnce => call_count >= 1,
            Times::Unbounded => true,
        }
    }
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Times::Exactly(1) => write!(f, "exactly 1 call"),
            Times::Exactly(n) => write!(f, "exactly {n} calls"),
            Times::AtLeastOnce => write!(f, "at least 1 call"),
            Times::Unbounded => write!(f, "any number of calls"),
        }
    }
}

/// What a matched pattern answers once its response sequence is used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exhausted {
    /// Keep answering with the last declared response.
    RepeatLast,
    /// Answer nothing and log the call as unexpected.
    #[default]
    NoMatch,
}

/// Provider-wide behaviour for the cases a test suite may want either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub on_exhausted: Exhausted,
    /// Whether requests that matched nothing make `verify()` fail.
    pub fail_on_unexpected: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            on_exhausted: Exhausted::NoMatch,
            fail_on_unexpected: true,
        }
    }
}

/// A declared expectation, ready to be registered with a provider.
///
/// Registering an expectation whose pattern equals one already known
/// appends its responses to the existing sequence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    #[serde(rename = "request")]
    pub(crate) pattern: FullHttpRequest,
    #[serde(default)]
    pub(crate) responses: Vec<HttpResponse>,
    #[serde(default)]
    pub(crate) times: Option<Times>,
}

impl Expectation {
    pub fn new(pattern: impl Into<FullHttpRequest>) -> Self {
        Self {
            pattern: pattern.into(),
            responses: Vec::new(),
            times: None,
        }
    }

    pub fn respond_with(mut self, response: HttpResponse) -> Self {
        self.responses.push(response);
        self
    }

    pub fn respond_with_sequence(
        mut self,
        responses: impl IntoIterator<Item = HttpResponse>,
    ) -> Self {
        self.responses.extend(responses);
        self
    }

    pub fn times(mut self, times: Times) -> Self {
        self.times = Some(times);
        self
    }

    pub fn pattern(&self) -> &FullHttpRequest {
        &self.pattern
    }

    pub fn responses(&self) -> &[HttpResponse] {
        &self.responses
    }
}

/// Registry record for one distinct pattern.
#[derive(Debug, Clone)]
pub(crate) struct ExpectationEntry {
    pub(crate) pattern: FullHttpRequest,
    pub(crate) responses: Vec<HttpResponse>,
    pub(crate) times: Times,
    cursor: usize,
    pub(crate) call_count: usize,
    /// Matching calls refused because the sequence was used up.
    excess_calls: usize,
}

impl ExpectationEntry {
    pub(crate) fn new(expectation: Expectation) -> Self {
        Self {
            pattern: expectation.pattern,
            responses: expectation.responses,
            times: expectation.times.unwrap_or_default(),
            cursor: 0,
            call_count: 0,
            excess_calls: 0,
        }
    }

    pub(crate) fn merge(&mut self, expectation: Expectation) {
        self.responses.extend(expectation.responses);
        if let Some(times) = expectation.times {
            self.times = times;
        }
    }

    /// Answers one matched call and advances the cursor.
    ///
    /// Returns `None` only when the sequence is used up and the policy is
    /// `Exhausted::NoMatch`; such a call is not answered, so it only counts
    /// as an excess call.
    pub(crate) fn next_response(&mut self, on_exhausted: Exhausted) -> Option<HttpResponse> {
        let response = match self.responses.get(self.cursor) {
            Some(response) => {
                self.cursor += 1;
                response.clone()
            }
            None => match on_exhausted {
                Exhausted::RepeatLast => self.responses.last()?.clone(),
                Exhausted::NoMatch => {
                    self.excess_calls += 1;
                    return None;
                }
            },
        };
        self.call_count += 1;
        Some(response)
    }

    /// Every call that matched the pattern, answered or not.
    pub(crate) fn total_calls(&self) -> usize {
        self.call_count + self.excess_calls
    }

    pub(crate) fn is_satisfied(&self) -> bool {
        self.times.is_satisfied_by(self.total_calls())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;

    fn entry(responses: &[u16]) -> ExpectationEntry {
        let pattern = FullHttpRequest::builder(Method::Get).path("/ping").build();
        ExpectationEntry::new(
            Expectation::new(pattern)
                .respond_with_sequence(responses.iter().map(|s| HttpResponse::new(*s))),
        )
    }

    #[test]
    fn sequence_then_no_match() {
        let mut e = entry(&[200, 201]);
        assert_eq!(e.next_response(Exhausted::NoMatch).unwrap().status(), 200);
        assert_eq!(e.next_response(Exhausted::NoMatch).unwrap().status(), 201);
        assert!(e.next_response(Exhausted::NoMatch).is_none());
        assert_eq!(e.call_count, 2);
        assert_eq!(e.total_calls(), 3);
    }

    #[test]
    fn sequence_then_repeat_last() {
        let mut e = entry(&[200, 201]);
        e.next_response(Exhausted::RepeatLast);
        e.next_response(Exhausted::RepeatLast);
        assert_eq!(e.next_response(Exhausted::RepeatLast).unwrap().status(), 201);
        assert_eq!(e.call_count, 3);
    }

    #[test]
    fn times_satisfaction() {
        assert!(Times::AtLeastOnce.is_satisfied_by(3));
        assert!(!Times::AtLeastOnce.is_satisfied_by(0));
        assert!(Times::Exactly(2).is_satisfied_by(2));
        assert!(!Times::Exactly(2).is_satisfied_by(3));
        assert!(Times::Unbounded.is_satisfied_by(0));
    }

    #[test]
    fn merge_appends_and_overrides_times() {
        let mut e = entry(&[200]);
        let pattern = e.pattern.clone();
        e.merge(Expectation::new(pattern.clone()).respond_with(HttpResponse::new(500)));
        assert_eq!(e.responses.len(), 2);
        assert_eq!(e.times, Times::AtLeastOnce);

        e.merge(Expectation::new(pattern).times(Times::Exactly(2)));
        assert_eq!(e.responses.len(), 2);
        assert_eq!(e.times, Times::Exactly(2));
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let p: Policy = serde_json::from_str("{}").unwrap();
        assert_eq!(p, Policy::default());
        let p: Policy = serde_json::from_str(r#"{"on_exhausted":"repeat_last"}"#).unwrap();
        assert_eq!(p.on_exhausted, Exhausted::RepeatLast);
        assert!(p.fail_on_unexpected);
    }

    #[test]
    fn times_deserializes() {
        let t: Times = serde_json::from_str(r#"{"exactly":3}"#).unwrap();
        assert_eq!(t, Times::Exactly(3));
        let t: Times = serde_json::from_str(r#""unbounded""#).unwrap();
        assert_eq!(t, Times::Unbounded);
    }
}
