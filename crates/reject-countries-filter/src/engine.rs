use std::fmt::{self, Display, Formatter};
use std::net::IpAddr;
use std::str::FromStr;

use http::{HeaderMap, Request};
use reject_countries_geoip::{CountryLookup, GeoLookup, load_country_lookup};
use reject_countries_types::ClientIp;
use reject_countries_types::config::RejectCountriesConfig;
use reject_countries_types::errors::{ConfigError, LookupError};
use tracing::{info, warn};

use crate::client_ip::{client_ip, remote_addr};
use crate::config::FilterConfig;
use crate::static_response::StaticResponse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowReason {
    LookupUnavailable,
    NoClientIp,
    InvalidClientIp(String),
    LookupFailed(LookupError),
    CountryNotMatched(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow(AllowReason),
    Reject { country: String, client_ip: ClientIp },
}

impl Verdict {
    pub fn is_reject(&self) -> bool {
        matches!(self, Verdict::Reject { .. })
    }
}

impl Display for AllowReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AllowReason::LookupUnavailable => write!(f, "GeoIP lookup is unavailable"),
            AllowReason::NoClientIp => write!(f, "no client ip could be determined"),
            AllowReason::InvalidClientIp(ip) => write!(f, "invalid client ip {ip}"),
            AllowReason::LookupFailed(e) => write!(f, "{e}"),
            AllowReason::CountryNotMatched(country) => {
                write!(f, "country {country} is not in the match list")
            }
        }
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Allow(reason) => write!(f, "allow: {reason}"),
            Verdict::Reject { country, client_ip } => {
                write!(f, "reject: {client_ip} resolved to {country}")
            }
        }
    }
}

/// Decides per request whether to serve the static response. Anything that
/// prevents a positive country match lets the request through.
#[derive(Debug)]
pub struct RejectCountries {
    name: String,
    config: FilterConfig,
    lookup: GeoLookup,
}

impl RejectCountries {
    /// Validates `config` and opens the country database it points to. A
    /// database that cannot be opened does not fail construction.
    pub fn new(config: &RejectCountriesConfig, name: &str) -> Result<Self, ConfigError> {
        let filter_config = FilterConfig::try_from(config)?;
        let lookup = load_country_lookup(&config.db_path, name);
        Ok(Self::with_lookup(filter_config, name, lookup))
    }

    pub fn with_lookup(config: FilterConfig, name: &str, lookup: GeoLookup) -> Self {
        Self {
            name: name.to_string(),
            config,
            lookup,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn lookup(&self) -> &GeoLookup {
        &self.lookup
    }

    pub fn static_response(&self) -> &StaticResponse {
        &self.config.static_response
    }

    pub fn client_ip(&self, headers: &HeaderMap, remote_addr: Option<&str>) -> Option<String> {
        client_ip(headers, remote_addr, self.config.prefer_forwarded_header)
    }

    pub fn decide_request<B>(&self, req: &Request<B>) -> Verdict {
        self.decide(req.headers(), remote_addr(req).as_deref())
    }

    pub fn decide(&self, headers: &HeaderMap, remote_addr: Option<&str>) -> Verdict {
        let GeoLookup::Available(lookup) = &self.lookup else {
            return Verdict::Allow(AllowReason::LookupUnavailable);
        };
        let Some(client_ip) = self.client_ip(headers, remote_addr) else {
            return Verdict::Allow(AllowReason::NoClientIp);
        };
        self.classify(lookup.as_ref(), &client_ip)
    }

    /// Classifies an already extracted client ip.
    pub fn decide_ip(&self, client_ip: &str) -> Verdict {
        match &self.lookup {
            GeoLookup::Unavailable => Verdict::Allow(AllowReason::LookupUnavailable),
            GeoLookup::Available(lookup) => self.classify(lookup.as_ref(), client_ip),
        }
    }

    fn classify(&self, lookup: &dyn CountryLookup, client_ip: &str) -> Verdict {
        let Ok(ip) = IpAddr::from_str(client_ip) else {
            warn!("Invalid IP address: {client_ip}");
            return Verdict::Allow(AllowReason::InvalidClientIp(client_ip.to_string()));
        };

        match lookup.lookup(ip) {
            Err(e) => {
                info!("GeoIP lookup failed for IP {client_ip}: {e}");
                Verdict::Allow(AllowReason::LookupFailed(e))
            }
            Ok(country) if self.config.blocked_countries.matches(&country) => {
                info!(
                    "Rejecting request from country {country} (IP: {client_ip}) [{}]",
                    self.name
                );
                Verdict::Reject {
                    country,
                    client_ip: ClientIp { ip },
                }
            }
            Ok(country) => Verdict::Allow(AllowReason::CountryNotMatched(country)),
        }
    }
}
