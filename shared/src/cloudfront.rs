use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// CloudFront origin-response trigger event
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OriginResponseEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventRecord {
    pub cf: CloudFrontRecord,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CloudFrontRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    pub request: OriginRequest,
    pub response: OriginResponse,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OriginRequest {
    /// ex) /images/w100/image.jpg
    pub uri: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl OriginRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            extra: serde_json::Map::new(),
        }
    }

    /// Object key for the request: uri without the leading slash
    pub fn object_key(&self) -> &str {
        self.uri.strip_prefix('/').unwrap_or(&self.uri)
    }
}

/// One header value in CloudFront's `{"key": "Content-Type", "value": "..."}` form
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeaderValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
}

/// Headers keyed by lowercase name
pub type Headers = BTreeMap<String, Vec<HeaderValue>>;

/// Response object of the trigger; returned as-is or rewritten
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_description: Option<String>,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_encoding: Option<String>,
    /// Fields we don't model are carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl OriginResponse {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            status_description: None,
            headers: Headers::new(),
            body: None,
            body_encoding: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == "404"
    }

    /// Replace a header, keeping CloudFront's lowercase map key
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(
            name.to_ascii_lowercase(),
            vec![HeaderValue {
                key: Some(name.to_string()),
                value: value.into(),
            }],
        );
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(|h| h.value.as_str())
    }
}
