//! Redirect responses.

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::redirect::RedirectDecision;

/// A bodyless response carrying the decision's status and `Location`.
pub fn redirect_response(decision: &RedirectDecision) -> Response {
    let location = HeaderValue::from_bytes(decision.target.as_bytes()).unwrap_or_else(|e| {
        tracing::error!(location = %decision.target, error = %e, "Redirect target is not a valid header value");
        HeaderValue::from_static("/")
    });
    (decision.status, [(header::LOCATION, location)]).into_response()
}
