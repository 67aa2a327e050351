//! Gatekeeper middleware.
//!
//! Mount with `axum::middleware::from_fn_with_state`. Admitted requests carry
//! a [`GateContext`](crate::gatekeeper::GateContext) in their extensions;
//! rejected ones are answered here with `{"error": ...}` and never reach the
//! inner service.

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::gatekeeper::{GateRequest, Gatekeeper};
use crate::http::request::RequestIdExt;
use crate::observability::metrics;

/// A gatekeeper that can be replaced while requests are in flight.
pub type SharedGatekeeper = Arc<ArcSwap<Gatekeeper>>;

/// Middleware over a fixed gatekeeper.
pub async fn gatekeeper_middleware(
    State(gatekeeper): State<Gatekeeper>,
    request: Request<Body>,
    next: Next,
) -> Response {
    guard(&gatekeeper, request, next).await
}

/// Middleware over a hot-swappable gatekeeper. Each request runs to
/// completion on the gatekeeper that was current when it arrived.
pub async fn shared_gatekeeper_middleware(
    State(shared): State<SharedGatekeeper>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let gatekeeper = shared.load_full();
    guard(&gatekeeper, request, next).await
}

async fn guard(gatekeeper: &Gatekeeper, request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let request_id = request.request_id().to_string();
    let (mut parts, body) = request.into_parts();

    match gatekeeper.check(GateRequest::from_parts(&parts)).await {
        Ok(guarded) => {
            let context = guarded.context;
            metrics::record_decision("admitted", Some(&context.pattern_match.pattern), start);
            tracing::debug!(
                request_id = %request_id,
                method = %context.method,
                pattern = %context.pattern_match.pattern,
                "Request admitted"
            );
            parts.extensions.insert(context);
            next.run(Request::from_parts(parts, body)).await
        }
        Err(rejection) => {
            metrics::record_decision(rejection.kind.as_str(), rejection.pattern.as_deref(), start);
            tracing::debug!(
                request_id = %request_id,
                method = %parts.method,
                path = %parts.uri.path(),
                status = rejection.status().as_u16(),
                reason = %rejection.message,
                "Request rejected"
            );
            rejection.into_response()
        }
    }
}
