use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::engine::{RejectCountries, Verdict};

/// Same decision as [`crate::RejectCountriesLayer`], for use with
/// `axum::middleware::from_fn_with_state`.
pub async fn reject_countries_middleware(
    State(filter): State<Arc<RejectCountries>>,
    req: Request,
    next: Next,
) -> Response {
    match filter.decide_request(&req) {
        Verdict::Reject { .. } => filter.static_response().render(),
        Verdict::Allow(_) => next.run(req).await,
    }
}
