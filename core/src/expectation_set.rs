//! Expectations declared as a JSON document.
//!
//! ```json
//! {
//!   "policy": { "on_exhausted": "repeat_last", "fail_on_unexpected": true },
//!   "expectations": [
//!     {
//!       "request": { "method": "GET", "path": "/ping" },
//!       "responses": [ { "status": 200, "content_type": "text/plain", "content": "pong" } ],
//!       "times": { "exactly": 1 }
//!     }
//!   ]
//! }
//! ```
//!
//! Requests go through the same validation as the builders, so an empty
//! query key in a file fails to load just like it fails in code.

use serde::Deserialize;

use crate::error::RequestError;
use crate::expectation::{Expectation, Policy};
use crate::provider::SimpleResponseProvider;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectationSet {
    #[serde(default)]
    pub policy: Policy,
    #[serde(default)]
    pub expectations: Vec<Expectation>,
}

impl ExpectationSet {
    pub fn from_json(json: &str) -> Result<Self, RequestError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Provider using this set's policy with every expectation registered in
    /// document order.
    pub fn into_provider(self) -> Result<SimpleResponseProvider, RequestError> {
        let provider = SimpleResponseProvider::with_policy(self.policy);
        for expectation in self.expectations {
            provider.expect(expectation)?;
        }
        Ok(provider)
    }
}
