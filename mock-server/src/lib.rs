//! Mock HTTP server that answers from declared expectations.
//!
//! # Design
//! The router has no routes of its own: a single fallback handler decodes
//! every request into a [`FullHttpRequest`], asks the provider for a
//! response and writes it back verbatim. Requests the provider does not know
//! get the fallback response, which defaults to a `404` with an explanatory
//! body so it cannot be mistaken for a declared response. Requests that
//! cannot be decoded at all get the same fallback and are handed to the
//! provider as rejected, so verification still sees them.

mod config;
mod error;
mod server;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{
        self,
        header::{CONTENT_TYPE, HOST},
        uri::Authority,
        HeaderMap, HeaderValue, StatusCode, Uri,
    },
    response::Response,
    Router,
};
use mockhttp_core::{
    ExpectedResponseProvider, FullHttpRequest, HttpResponse, Method, QueryParameter,
    RejectedRequest, RequestError,
};
use percent_encoding::percent_decode_str;
use tracing::{debug, warn};

pub use config::ServerConfig;
pub use error::ServerError;
pub use server::MockHttpServer;

/// Status of the response served when no expectation answers a request.
pub const UNEXPECTED_STATUS: u16 = 404;

/// Response served when no expectation answers a request.
pub fn default_fallback() -> HttpResponse {
    HttpResponse::with_body(UNEXPECTED_STATUS, "text/plain", "Received unexpected request")
}

#[derive(Clone)]
struct AppState {
    provider: Arc<dyn ExpectedResponseProvider>,
    fallback: Arc<HttpResponse>,
}

/// Router answering every request from `provider`, or with `fallback`.
///
/// Request bodies are not size limited.
pub fn app(provider: Arc<dyn ExpectedResponseProvider>, fallback: HttpResponse) -> Router {
    Router::new()
        .fallback(serve_expectation)
        .layer(DefaultBodyLimit::disable())
        .with_state(AppState {
            provider,
            fallback: Arc::new(fallback),
        })
}

async fn serve_expectation(
    State(state): State<AppState>,
    method: http::Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match decode_request(&method, &uri, &headers, &body) {
        Ok(request) => request,
        Err(err) => {
            state.provider.reject(RejectedRequest {
                method: method.to_string(),
                uri: uri.to_string(),
                reason: err.to_string(),
            });
            return encode_response(&state.fallback);
        }
    };

    match state.provider.response(request.as_request()) {
        Some(response) => {
            debug!(url = %request.url(), status = response.status(), "serving expected response");
            encode_response(&response)
        }
        None => encode_response(&state.fallback),
    }
}

/// Turns the parts of a wire request into the value the provider matches.
///
/// The path and every query key and value are percent-decoded (RFC 3986:
/// `%20` becomes a space, `+` stays `+`), so a pattern declared with
/// `.path("/a b")` matches a request for `/a%20b`. Empty `&&` segments are
/// ignored. An empty body means no content.
///
/// Fails when the method is outside the supported set, when the path or a
/// query pair does not decode to UTF-8, when a query pair has an empty key
/// or value (`?debug`, `?a=`, `?=x`), or when the body is not UTF-8. None of
/// these can be expressed as a pattern, so they must never match one.
pub fn decode_request(
    method: &http::Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<FullHttpRequest, RequestError> {
    let path = percent_decode_str(uri.path())
        .decode_utf8()
        .map_err(|_| RequestError::UndecodablePath(uri.path().to_string()))?;
    let mut builder = FullHttpRequest::builder(method.as_str().parse::<Method>()?).path(path);

    for pair in uri.query().unwrap_or_default().split('&').filter(|p| !p.is_empty()) {
        builder = builder.with_query_parameter(decode_query_pair(pair)?);
    }

    if let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        builder = builder.content_type(content_type);
    }
    if !body.is_empty() {
        let content = std::str::from_utf8(body).map_err(|_| RequestError::NonUtf8Body)?;
        builder = builder.content(content);
    }

    let authority = uri.authority().cloned().or_else(|| {
        headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<Authority>().ok())
    });
    if let Some(authority) = authority {
        builder = builder.domain(authority.host());
        if let Some(port) = authority.port_u16() {
            builder = builder.port(port);
        }
    }

    Ok(builder.build())
}

fn decode_query_pair(pair: &str) -> Result<QueryParameter, RequestError> {
    let unrepresentable = || RequestError::UnrepresentableQuery {
        pair: pair.to_string(),
    };
    let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
    let key = percent_decode_str(key).decode_utf8().map_err(|_| unrepresentable())?;
    let value = percent_decode_str(value).decode_utf8().map_err(|_| unrepresentable())?;
    QueryParameter::new(key, value).map_err(|_| unrepresentable())
}

/// Writes status, `Content-Type` and body exactly as declared.
pub fn encode_response(response: &HttpResponse) -> Response {
    let body = response.content().unwrap_or_default().to_owned();
    let mut encoded = Response::new(axum::body::Body::from(body));
    *encoded.status_mut() = StatusCode::from_u16(response.status()).unwrap_or_else(|_| {
        warn!(status = response.status(), "invalid status code in response");
        StatusCode::INTERNAL_SERVER_ERROR
    });
    if let Some(content_type) = response.content_type() {
        match HeaderValue::from_str(content_type) {
            Ok(value) => {
                encoded.headers_mut().insert(CONTENT_TYPE, value);
            }
            Err(_) => warn!(content_type, "invalid content type in response"),
        }
    }
    encoded
}
