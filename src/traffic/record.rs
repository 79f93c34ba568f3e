//! Traffic record assembly.
//!
//! A [`NetworkLogRecord`] is built once per request from a snapshot of the
//! request, the downstream response and the start time. Building never
//! fails: a body that cannot be read or parsed leaves its field `null`.

use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Response, StatusCode};
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::config::CaptureConfig;
use crate::traffic::body::{read_bounded, BoundedBody};
use crate::traffic::ident::IdentifierGenerator;

const UNKNOWN: &str = "unknown";

/// Opaque platform metadata for a request, attached as a request extension
/// and copied verbatim into the `cf` field of the record.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMetadata(pub Value);

/// What the interceptor keeps of a request after handing it downstream.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Buffered copy of the body, present only when it was eligible for capture.
    pub body: Option<Bytes>,
    pub edge: Option<EdgeMetadata>,
}

/// One persisted traffic log entry. Write-once: fields are private and only
/// set by [`TrafficRecordBuilder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkLogRecord {
    timestamp: String,
    high_fidelity_timestamp: String,
    method: String,
    path: String,
    query_string: String,
    url: String,
    user_agent: String,
    ip: String,
    #[serde(rename = "cf")]
    edge_metadata: Option<Value>,
    referer: Option<String>,
    request_headers: BTreeMap<String, Option<String>>,
    request_body: Option<Value>,
    response_status: u16,
    response_headers: BTreeMap<String, Option<String>>,
    response_body: Option<Value>,
    response_time: u64,
    document_id: Option<String>,
    #[serde(skip)]
    captured_at: DateTime<Utc>,
}

impl NetworkLogRecord {
    /// Wall-clock time the record was captured.
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// ISO-8601 capture timestamp, as serialized.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn high_fidelity_timestamp(&self) -> &str {
        &self.high_fidelity_timestamp
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn request_headers(&self) -> &BTreeMap<String, Option<String>> {
        &self.request_headers
    }

    pub fn request_body(&self) -> Option<&Value> {
        self.request_body.as_ref()
    }

    pub fn response_status(&self) -> u16 {
        self.response_status
    }

    pub fn response_headers(&self) -> &BTreeMap<String, Option<String>> {
        &self.response_headers
    }

    pub fn response_body(&self) -> Option<&Value> {
        self.response_body.as_ref()
    }

    /// Latency in milliseconds.
    pub fn response_time(&self) -> u64 {
        self.response_time
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }
}

/// Applies the capture policy and assembles records.
#[derive(Debug, Clone)]
pub struct TrafficRecordBuilder {
    policy: CaptureConfig,
    ids: IdentifierGenerator,
}

impl TrafficRecordBuilder {
    pub fn new(policy: CaptureConfig, ids: IdentifierGenerator) -> Self {
        Self { policy, ids }
    }

    pub fn policy(&self) -> &CaptureConfig {
        &self.policy
    }

    /// Whether the request body should be buffered for capture.
    pub fn wants_request_body(&self, method: &Method, path: &str) -> bool {
        *method == Method::POST && path.starts_with(&self.policy.api_prefix)
    }

    /// Whether the response body should be read for capture.
    pub fn wants_response_body(&self, path: &str, headers: &HeaderMap) -> bool {
        path.starts_with(&self.policy.api_prefix)
            && header_string(headers, header::CONTENT_TYPE.as_str())
                .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
                .unwrap_or(false)
    }

    /// Build a record. The response body is read only when the policy asks
    /// for it and is otherwise dropped unread.
    pub async fn build(
        &self,
        request: &RequestSnapshot,
        response: Response<Body>,
        started: DateTime<Utc>,
        document_id: Option<String>,
    ) -> NetworkLogRecord {
        let (parts, body) = response.into_parts();
        let path = request.url.path();

        let response_body = if self.wants_response_body(path, &parts.headers) {
            self.read_response_body(body, path).await
        } else {
            None
        };

        self.assemble(request, parts.status, &parts.headers, response_body, started, document_id)
    }

    /// Bodies past `max_body_bytes` are drained for their length only, which
    /// always lands them on the placeholder.
    async fn read_response_body(&self, body: Body, path: &str) -> Option<Value> {
        match read_bounded(body, self.policy.max_body_bytes).await {
            BoundedBody::Complete(bytes) => self.capture_response_body(&bytes),
            oversized => match oversized.char_len().await {
                Some(length) if length >= self.policy.max_response_chars => {
                    Some(self.response_placeholder(length))
                }
                _ => {
                    tracing::debug!(path = %path, "Response body not captured");
                    None
                }
            },
        }
    }

    fn assemble(
        &self,
        request: &RequestSnapshot,
        status: StatusCode,
        response_headers: &HeaderMap,
        response_body: Option<Value>,
        started: DateTime<Utc>,
        document_id: Option<String>,
    ) -> NetworkLogRecord {
        let now = self.ids.clock().now();
        let url = &request.url;
        let headers = &request.headers;

        let request_body = if self.wants_request_body(&request.method, url.path()) {
            request
                .body
                .as_ref()
                .and_then(|bytes| self.capture_request_body(bytes))
        } else {
            None
        };

        NetworkLogRecord {
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            high_fidelity_timestamp: self.ids.high_fidelity_timestamp_at(now),
            method: request.method.to_string(),
            path: url.path().to_string(),
            query_string: query_string(url),
            url: url.to_string(),
            user_agent: non_empty_header(headers, header::USER_AGENT.as_str())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            ip: self.client_ip(headers),
            edge_metadata: request.edge.as_ref().map(|e| e.0.clone()),
            referer: non_empty_header(headers, header::REFERER.as_str()),
            request_headers: self.filter_request_headers(headers),
            request_body,
            response_status: status.as_u16(),
            response_headers: filter_response_headers(response_headers),
            response_body,
            response_time: (now - started).num_milliseconds().max(0) as u64,
            document_id,
            captured_at: now,
        }
    }

    /// Parse a request body as JSON and cut an overlong `content` field.
    pub fn capture_request_body(&self, bytes: &[u8]) -> Option<Value> {
        let mut body: Value = serde_json::from_slice(bytes).ok()?;
        if let Some(Value::String(content)) = body.get_mut("content") {
            if content.chars().count() > self.policy.max_content_chars {
                let mut cut: String = content.chars().take(self.policy.max_content_chars).collect();
                cut.push_str(&self.policy.truncation_marker);
                *content = cut;
            }
        }
        Some(body)
    }

    /// Parse a short response body, or describe a long one.
    pub fn capture_response_body(&self, bytes: &[u8]) -> Option<Value> {
        let text = std::str::from_utf8(bytes).ok()?;
        let length = text.chars().count();
        if length < self.policy.max_response_chars {
            serde_json::from_str(text).ok()
        } else {
            Some(self.response_placeholder(length))
        }
    }

    fn response_placeholder(&self, length: usize) -> Value {
        serde_json::json!({ "truncated": true, "length": length })
    }

    /// Connecting-IP header, then `x-forwarded-for`, else `"unknown"`.
    /// Empty headers fall through.
    pub fn client_ip(&self, headers: &HeaderMap) -> String {
        non_empty_header(headers, &self.policy.connecting_ip_header)
            .or_else(|| non_empty_header(headers, "x-forwarded-for"))
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// `content-type`, `accept`, and every reserved-prefix header.
    pub fn filter_request_headers(&self, headers: &HeaderMap) -> BTreeMap<String, Option<String>> {
        let mut filtered = BTreeMap::new();
        for name in [header::CONTENT_TYPE, header::ACCEPT] {
            filtered.insert(name.as_str().to_string(), header_string(headers, name.as_str()));
        }
        for name in headers.keys() {
            let name = name.as_str();
            if self
                .policy
                .reserved_header_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
            {
                filtered.insert(name.to_string(), header_string(headers, name));
            }
        }
        filtered
    }
}

fn filter_response_headers(headers: &HeaderMap) -> BTreeMap<String, Option<String>> {
    let mut filtered = BTreeMap::new();
    filtered.insert(
        header::CONTENT_TYPE.as_str().to_string(),
        header_string(headers, header::CONTENT_TYPE.as_str()),
    );
    filtered
}

/// All values of a header joined with `", "`; `None` when absent.
fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    let values: Vec<_> = headers
        .get_all(name)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

/// Like [`header_string`], but an empty value counts as absent.
fn non_empty_header(headers: &HeaderMap, name: &str) -> Option<String> {
    header_string(headers, name).filter(|v| !v.is_empty())
}

/// `?`-prefixed query, or empty when there is none.
pub fn query_string(url: &Url) -> String {
    match url.query() {
        Some(q) if !q.is_empty() => format!("?{}", q),
        _ => String::new(),
    }
}

/// Document id: the segment after `document_prefix`, or everything after
/// `document_load_prefix`.
pub fn extract_document_id(path: &str, policy: &CaptureConfig) -> Option<String> {
    if let Some(rest) = path.strip_prefix(policy.document_prefix.as_str()) {
        rest.split('/').next().map(str::to_string)
    } else {
        path.strip_prefix(policy.document_load_prefix.as_str())
            .map(str::to_string)
    }
}
