//! Plain-data HTTP building blocks shared by requests and expectations.
//!
//! # Design
//! These types describe a request method, a single query parameter and a
//! response as values. The matching engine never touches the network: the
//! server crate decodes the wire request into these types and writes an
//! `HttpResponse` back, keeping the core deterministic and easy to test.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// HTTP method of a request. Closed set; matching is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "PUT" => Ok(Method::Put),
            "POST" => Ok(Method::Post),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            other => Err(RequestError::UnknownMethod(other.to_string())),
        }
    }
}

/// One `key=value` pair of a URL query string.
///
/// Both parts are non-empty. Equality and ordering compare `(key, value)`,
/// so several values for one key are distinct parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QueryParameter {
    key: String,
    value: String,
}

impl QueryParameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, RequestError> {
        let key = key.into();
        let value = value.into();
        if key.is_empty() {
            return Err(RequestError::EmptyQueryKey);
        }
        if value.is_empty() {
            return Err(RequestError::EmptyQueryValue { key });
        }
        Ok(Self { key, value })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for QueryParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

impl<'de> Deserialize<'de> for QueryParameter {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            key: String,
            value: String,
        }

        let raw = Raw::deserialize(deserializer)?;
        QueryParameter::new(raw.key, raw.value).map_err(serde::de::Error::custom)
    }
}

/// A canned response returned for a matched expectation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HttpResponse {
    status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

impl HttpResponse {
    /// Response with a status code and no body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            content: None,
        }
    }

    /// Response with a status code, a `Content-Type` and a body.
    pub fn with_body(
        status: u16,
        content_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            status,
            content_type: Some(content_type.into()),
            content: Some(content.into()),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }
}

impl fmt::Display for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status: {}", self.status)?;
        writeln!(f, "Content-Type: {}", self.content_type.as_deref().unwrap_or("null"))?;
        write!(f, "Content: {}", self.content.as_deref().unwrap_or("null"))
    }
}
