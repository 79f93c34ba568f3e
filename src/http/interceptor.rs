//! Edge interceptor middleware.
//!
//! Every request passes through [`intercept`]: it is forwarded downstream,
//! the (request, response) pair is handed to the traffic logger as
//! background work, and the caller receives the redirect decided from the
//! request URL. Logging outcome never changes the response, and a
//! downstream that exceeds the request timeout is logged as a 504.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::time::timeout;

use crate::http::request::request_url;
use crate::http::response::redirect_response;
use crate::http::server::EdgeState;
use crate::observability::metrics;
use crate::redirect::{RedirectDecision, RedirectRule};
use crate::traffic::{extract_document_id, read_bounded, BoundedBody, EdgeMetadata, RequestSnapshot};

pub async fn intercept(
    State(state): State<EdgeState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let started = state.clock.now();
    let method = request.method().clone();

    let url = match request_url(request.uri(), request.headers(), &state.listener) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(uri = %request.uri(), error = %e, "Unroutable request URL, not logged");
            let decision = RedirectDecision {
                target: state.resolver.external_root().to_string(),
                status: StatusCode::MOVED_PERMANENTLY,
                rule: RedirectRule::Passthrough,
            };
            return redirect_response(&decision);
        }
    };

    tracing::debug!(method = %method, url = %url, "Intercepted request");

    let (parts, body) = request.into_parts();

    // The downstream always receives every byte; capture keeps a copy only
    // when the whole body fits the limit.
    let (captured, body) = if state.recorder.wants_request_body(&parts.method, url.path()) {
        let limit = state.recorder.policy().max_body_bytes;
        if declared_length(&parts.headers).is_some_and(|len| len > limit) {
            tracing::debug!(path = %url.path(), limit, "Request body over capture limit");
            (None, body)
        } else {
            match read_bounded(body, limit).await {
                BoundedBody::Complete(bytes) => (Some(bytes.clone()), Body::from(bytes)),
                partial => {
                    tracing::debug!(path = %url.path(), limit, "Request body not captured");
                    (None, partial.into_body())
                }
            }
        }
    } else {
        (None, body)
    };

    let snapshot = RequestSnapshot {
        method: parts.method.clone(),
        url: url.clone(),
        headers: parts.headers.clone(),
        body: captured,
        edge: parts.extensions.get::<EdgeMetadata>().cloned(),
    };

    let downstream = next.run(Request::from_parts(parts, body));
    let response = match timeout(state.request_timeout, downstream).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(
                path = %url.path(),
                timeout_secs = state.request_timeout.as_secs(),
                "Downstream timed out"
            );
            (StatusCode::GATEWAY_TIMEOUT, "Downstream timed out").into_response()
        }
    };
    let document_id = extract_document_id(url.path(), state.recorder.policy());

    if state.persister.is_bound() {
        let recorder = state.recorder.clone();
        let persister = state.persister.clone();
        state.background.submit(async move {
            let record = recorder.build(&snapshot, response, started, document_id).await;
            persister.persist(&record).await;
        });
    } else {
        metrics::record_traffic_log("skipped");
        tracing::warn!(path = %url.path(), "Storage not available for logging");
    }

    let decision = state.resolver.resolve(&url);
    tracing::debug!(
        location = %decision.target,
        rule = decision.rule.as_str(),
        "Redirecting"
    );
    metrics::record_redirect(decision.rule.as_str());
    metrics::record_request(method.as_str(), start);

    redirect_response(&decision)
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
