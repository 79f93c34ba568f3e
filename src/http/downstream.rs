//! The handler the interceptor forwards to.
//!
//! # Responsibilities
//! - Forward to an upstream origin (hyper-util client, authority rewritten)
//! - Or serve a static asset directory
//! - Or answer 404 when nothing is configured
//!
//! # Design Decisions
//! - Upstream takes precedence over assets
//! - Upstream failures become 502 and are logged like any other response

use std::str::FromStr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tower_http::services::ServeDir;
use url::Url;

use crate::config::DownstreamConfig;

/// Error building the downstream handler.
#[derive(Debug, thiserror::Error)]
pub enum DownstreamError {
    #[error("invalid upstream '{0}'")]
    InvalidUpstream(String),
}

/// Forwarding target and client.
#[derive(Clone)]
pub struct Upstream {
    client: Client<HttpConnector, Body>,
    authority: Authority,
}

impl Upstream {
    pub fn new(upstream: &str, connect_timeout: Duration) -> Result<Self, DownstreamError> {
        let invalid = || DownstreamError::InvalidUpstream(upstream.to_string());

        let url = Url::parse(upstream).map_err(|_| invalid())?;
        let host = url.host_str().ok_or_else(invalid)?;
        let port = url.port_or_known_default().ok_or_else(invalid)?;
        let authority = Authority::from_str(&format!("{}:{}", host, port)).map_err(|_| invalid())?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self { client, authority })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }
}

/// Build the downstream router for `config`.
pub fn build_downstream(
    config: &DownstreamConfig,
    connect_timeout: Duration,
) -> Result<Router, DownstreamError> {
    if let Some(upstream) = &config.upstream {
        let upstream = Upstream::new(upstream, connect_timeout)?;
        tracing::info!(authority = %upstream.authority(), "Downstream: upstream forwarder");
        return Ok(Router::new().fallback(forward_handler).with_state(upstream));
    }

    if let Some(dir) = &config.assets_dir {
        tracing::info!(dir = %dir, "Downstream: static assets");
        return Ok(Router::new().fallback_service(ServeDir::new(dir)));
    }

    tracing::info!("Downstream: none configured, answering 404");
    Ok(Router::new().fallback(not_found))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// Forward a request to the upstream, keeping method, headers and body.
async fn forward_handler(State(upstream): State<Upstream>, request: Request<Body>) -> Response {
    let (mut parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(upstream.authority.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build upstream URI");
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    match upstream.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(authority = %upstream.authority, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    #[test]
    fn test_upstream_authority_defaults_port() {
        let upstream = Upstream::new("http://origin.test", Duration::from_secs(1)).unwrap();
        assert_eq!(upstream.authority().as_str(), "origin.test:80");

        let upstream = Upstream::new("http://127.0.0.1:3000/ignored", Duration::from_secs(1)).unwrap();
        assert_eq!(upstream.authority().as_str(), "127.0.0.1:3000");
    }

    #[test]
    fn test_upstream_rejects_garbage() {
        assert!(Upstream::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_no_downstream_is_404() {
        let router = build_downstream(&DownstreamConfig::default(), Duration::from_secs(1)).unwrap();
        let response = router
            .oneshot(Request::builder().uri("/anything").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_assets_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "hi").unwrap();
        let config = DownstreamConfig {
            upstream: None,
            assets_dir: Some(dir.path().to_string_lossy().into_owned()),
        };

        let router = build_downstream(&config, Duration::from_secs(1)).unwrap();
        let response = router
            .oneshot(Request::builder().uri("/hello.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"hi");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_502() {
        // Port 9 (discard) on loopback is almost never listening.
        let config = DownstreamConfig {
            upstream: Some("http://127.0.0.1:9".into()),
            assets_dir: None,
        };
        let router = build_downstream(&config, Duration::from_secs(1)).unwrap();
        let response = router
            .oneshot(Request::builder().uri("/x").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
