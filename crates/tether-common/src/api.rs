//! Query envelope exchanged between the shell and the engine.
//!
//! The bridge treats query payloads as opaque strings. By convention the
//! shell encodes each call as a small JSON object naming an HTTP-like method
//! and an API endpoint; the engine decodes and validates it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApiMethod {
    Get,
    Post,
}

/// A typed query payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: ApiMethod,
    pub endpoint: String,
    #[serde(default)]
    pub body: String,
}

impl ApiRequest {
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            method: ApiMethod::Get,
            endpoint: endpoint.into(),
            body: String::new(),
        }
    }

    pub fn post(endpoint: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: ApiMethod::Post,
            endpoint: endpoint.into(),
            body: body.into(),
        }
    }

    /// Parse a query payload. Unknown methods and malformed JSON both yield
    /// an error string suitable for an error response.
    pub fn from_json(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| format!("malformed query: {e}"))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }

    /// Endpoint path without leading slashes.
    pub fn path(&self) -> &str {
        self.endpoint.trim_start_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get() {
        let req = ApiRequest::from_json(r#"{"method":"GET","endpoint":"version"}"#).unwrap();
        assert_eq!(req.method, ApiMethod::Get);
        assert_eq!(req.endpoint, "version");
        assert!(req.body.is_empty());
    }

    #[test]
    fn post_carries_body() {
        let req = ApiRequest::post("/config", r#"{"dark":true}"#);
        let parsed = ApiRequest::from_json(&req.to_json()).unwrap();
        assert_eq!(parsed, req);
        assert_eq!(parsed.path(), "config");
    }

    #[test]
    fn rejects_other_methods() {
        let err = ApiRequest::from_json(r#"{"method":"DELETE","endpoint":"x"}"#).unwrap_err();
        assert!(err.starts_with("malformed query"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(ApiRequest::from_json("not json").is_err());
        assert!(ApiRequest::from_json(r#"{"endpoint":"x"}"#).is_err());
    }
}
