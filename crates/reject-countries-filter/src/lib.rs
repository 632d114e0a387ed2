pub mod client_ip;
pub mod config;
pub mod engine;
pub mod layer;
pub mod matcher;
pub mod middleware;
pub mod static_response;

pub use config::FilterConfig;
pub use engine::{AllowReason, RejectCountries, Verdict};
pub use layer::{RejectCountriesLayer, RejectCountriesService};
pub use middleware::reject_countries_middleware;
