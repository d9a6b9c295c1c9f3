//! Error types for building requests and verifying expectations.
//!
//! # Design
//! Construction problems (`RequestError`) are authoring bugs in the test and
//! fail at the call that caused them. Matching problems are never errors at
//! request time; they are collected and reported together by
//! `UnsatisfiedExpectationError` when the test verifies.

use std::fmt;

use thiserror::Error;

use crate::expectation::Times;
use crate::request::{FullHttpRequest, HttpRequest};

/// Invalid input while building a request, response or expectation.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("query parameter key must not be empty")]
    EmptyQueryKey,

    #[error("query parameter `{key}` must have a non-empty value")]
    EmptyQueryValue { key: String },

    #[error("unsupported HTTP method: {0}")]
    UnknownMethod(String),

    /// A wire query pair that has no `QueryParameter` equivalent.
    #[error("query pair `{pair}` cannot be matched: empty key or value, or not UTF-8")]
    UnrepresentableQuery { pair: String },

    #[error("path `{0}` does not percent-decode to UTF-8")]
    UndecodablePath(String),

    #[error("request body is not valid UTF-8")]
    NonUtf8Body,

    #[error("expectation for `{0}` declares no response")]
    NoResponses(String),

    /// An expectation set document could not be parsed.
    #[error("invalid expectation set: {0}")]
    InvalidExpectationSet(#[from] serde_json::Error),
}

/// An expectation that was not called the way it was declared.
#[derive(Debug, Clone)]
pub struct UnmetExpectation {
    pub pattern: FullHttpRequest,
    pub times: Times,
    pub call_count: usize,
}

/// A request that reached the server but could not be turned into an
/// [`HttpRequest`], so no expectation could ever match it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRequest {
    pub method: String,
    pub uri: String,
    pub reason: String,
}

impl fmt::Display for RejectedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Method: {}", self.method)?;
        writeln!(f, "Uri: {}", self.uri)?;
        write!(f, "Rejected: {}", self.reason)
    }
}

/// Returned by `verify()` when expectations were not met or unexpected
/// requests arrived.
///
/// The message lists every unmet expectation followed by every unexpected
/// request, each in its multi-line human readable form. Rejected requests
/// count as unexpected.
#[derive(Debug, Clone)]
pub struct UnsatisfiedExpectationError {
    pub unmet: Vec<UnmetExpectation>,
    pub unexpected: Vec<HttpRequest>,
    pub rejected: Vec<RejectedRequest>,
}

impl fmt::Display for UnsatisfiedExpectationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} unmet expectation(s), {} unexpected request(s)",
            self.unmet.len(),
            self.unexpected.len() + self.rejected.len()
        )?;
        for (i, missing) in self.unmet.iter().enumerate() {
            write!(
                f,
                "\n\nUnmet expectation #{} (expected {}, received {}):\n{}",
                i + 1,
                missing.times,
                missing.call_count,
                missing.pattern
            )?;
        }
        for (i, request) in self.unexpected.iter().enumerate() {
            write!(f, "\n\nUnexpected request #{}:\n{}", i + 1, request)?;
        }
        let offset = self.unexpected.len();
        for (i, request) in self.rejected.iter().enumerate() {
            write!(f, "\n\nUnexpected request #{}:\n{}", offset + i + 1, request)?;
        }
        Ok(())
    }
}

impl std::error::Error for UnsatisfiedExpectationError {}
