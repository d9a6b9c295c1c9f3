//! Expectation matching and verification core for a mock HTTP server.
//!
//! # Overview
//! Tests declare expectations (a request pattern plus the responses it should
//! get), a server hands every decoded request to an
//! [`ExpectedResponseProvider`], and at the end the test calls `verify()` to
//! learn about expectations that were never met and requests nobody expected.
//! Nothing in this crate performs I/O; the server crate owns the socket.
//!
//! # Design
//! - Requests and responses are immutable values built through owning
//!   builders; equality is exact and structural, unset fields included.
//! - `SimpleResponseProvider` keeps its registry behind one mutex so the
//!   server can serve concurrently while the test keeps registering.
//! - Behaviour on exhausted response sequences and on unexpected requests is
//!   an explicit [`Policy`], never guessed.

pub mod error;
pub mod expectation;
pub mod expectation_set;
pub mod http;
pub mod provider;
pub mod request;

pub use error::{RejectedRequest, RequestError, UnmetExpectation, UnsatisfiedExpectationError};
pub use expectation::{Exhausted, Expectation, Policy, Times};
pub use expectation_set::ExpectationSet;
pub use http::{HttpResponse, Method, QueryParameter};
pub use provider::{ExpectedResponseProvider, SimpleResponseProvider};
pub use request::{
    FullHttpRequest, FullHttpRequestBuilder, HttpRequest, HttpRequestBuilder, QueryParameters,
};
