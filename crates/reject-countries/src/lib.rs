use std::sync::Arc;
use std::time::Duration;

use ::tracing::info;
use axum::Router;
use reject_countries_cli::{CliArgs, ServeArgs};
use reject_countries_filter::{RejectCountries, RejectCountriesLayer, Verdict};
use reject_countries_types::RejectCountriesResult;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::proxy::Upstream;

pub mod proxy;
pub mod tracing;

/// Resolves the filter configuration (config file or flags) and builds the
/// shared filter instance.
pub fn build_filter(args: &CliArgs) -> RejectCountriesResult<Arc<RejectCountries>> {
    let config = args.filter.to_config()?;
    let filter = RejectCountries::new(&config, &args.filter.name)?;
    info!(
        "Filter {} rejects requests from {}",
        filter.name(),
        filter.config().blocked_countries.sorted().join(", ")
    );
    Ok(Arc::new(filter))
}

pub fn build_upstream(serve_args: &ServeArgs) -> RejectCountriesResult<Upstream> {
    Upstream::new(
        &serve_args.upstream_url,
        Duration::from_secs(serve_args.upstream_request_timeout),
    )
}

/// Every path is proxied to the upstream unless the filter rejects it first.
pub fn configure_server(filter: Arc<RejectCountries>, upstream: Upstream) -> Router {
    Router::new()
        .fallback(proxy::forward)
        .with_state(upstream)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RejectCountriesLayer::new(filter)),
        )
}

pub fn check(filter: &RejectCountries, ip: &str) -> Verdict {
    filter.decide_ip(ip.trim())
}
