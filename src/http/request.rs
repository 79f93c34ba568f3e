//! Request normalization.
//!
//! # Responsibilities
//! - Reconstruct the absolute request URL (scheme, host, path, query)
//! - Attach platform metadata (peer address, protocol) as an extension
//!
//! # Design Decisions
//! - `url::Url` gives WHATWG normalization of host and path
//! - Unusable `Host` headers fall back to the configured default host

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, Request, Uri},
    middleware::Next,
    response::Response,
};
use serde_json::json;
use url::Url;

use crate::config::ListenerConfig;
use crate::traffic::EdgeMetadata;

/// Absolute URL of a request as seen by the client.
pub fn request_url(
    uri: &Uri,
    headers: &HeaderMap,
    defaults: &ListenerConfig,
) -> Result<Url, url::ParseError> {
    let scheme = forwarded_proto(headers)
        .or_else(|| uri.scheme_str().map(str::to_string))
        .unwrap_or_else(|| defaults.default_scheme.clone());

    let host = uri
        .authority()
        .map(|a| a.as_str().to_string())
        .or_else(|| {
            headers
                .get(header::HOST)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| defaults.default_host.clone());

    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    Url::parse(&format!("{}://{}{}", scheme, host, path_and_query)).or_else(|e| {
        tracing::debug!(host = %host, error = %e, "Unusable request host, using default");
        Url::parse(&format!(
            "{}://{}{}",
            scheme, defaults.default_host, path_and_query
        ))
    })
}

fn forwarded_proto(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("x-forwarded-proto")?.to_str().ok()?;
    let proto = value.split(',').next()?.trim().to_ascii_lowercase();
    matches!(proto.as_str(), "http" | "https").then_some(proto)
}

/// Insert [`EdgeMetadata`] describing the connection, unless an outer
/// layer already provided one.
pub async fn attach_edge_metadata(mut request: Request<Body>, next: Next) -> Response {
    if request.extensions().get::<EdgeMetadata>().is_none() {
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string());
        let metadata = json!({
            "remoteAddr": remote_addr,
            "httpProtocol": format!("{:?}", request.version()),
        });
        request.extensions_mut().insert(EdgeMetadata(metadata));
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_origin_form_uses_host_header() {
        let uri: Uri = "/somepage?x=1".parse().unwrap();
        let url = request_url(
            &uri,
            &headers(&[("host", "Amp-Blockchain.com")]),
            &ListenerConfig::default(),
        )
        .unwrap();
        assert_eq!(url.as_str(), "https://amp-blockchain.com/somepage?x=1");
    }

    #[test]
    fn test_forwarded_proto_wins() {
        let uri: Uri = "/".parse().unwrap();
        let url = request_url(
            &uri,
            &headers(&[("host", "example.test:8080"), ("x-forwarded-proto", "HTTP, https")]),
            &ListenerConfig::default(),
        )
        .unwrap();
        assert_eq!(url.as_str(), "http://example.test:8080/");
    }

    #[test]
    fn test_absolute_form() {
        let uri: Uri = "http://other.test/a/../b".parse().unwrap();
        let url = request_url(&uri, &HeaderMap::new(), &ListenerConfig::default()).unwrap();
        assert_eq!(url.as_str(), "http://other.test/b");
    }

    #[test]
    fn test_missing_or_bad_host_falls_back() {
        let uri: Uri = "/x".parse().unwrap();
        let defaults = ListenerConfig::default();

        let url = request_url(&uri, &HeaderMap::new(), &defaults).unwrap();
        assert_eq!(url.host_str(), Some("amp-blockchain.com"));

        let url = request_url(&uri, &headers(&[("host", "bad host^")]), &defaults).unwrap();
        assert_eq!(url.host_str(), Some("amp-blockchain.com"));
        assert_eq!(url.path(), "/x");
    }
}
