use reject_countries_types::config::RejectCountriesConfig;
use reject_countries_types::errors::ConfigError;

use crate::matcher::CountryMatcher;
use crate::static_response::StaticResponse;

/// Validated filter settings. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    pub prefer_forwarded_header: bool,
    pub blocked_countries: CountryMatcher,
    pub static_response: StaticResponse,
}

impl TryFrom<&RejectCountriesConfig> for FilterConfig {
    type Error = ConfigError;

    fn try_from(config: &RejectCountriesConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            prefer_forwarded_header: config.prefer_x_forwarded_for_header,
            blocked_countries: CountryMatcher::new(&config.match_countries)?,
            static_response: StaticResponse::from_config(&config.static_response),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use reject_countries_types::config::StaticResponseConfig;

    #[test]
    fn empty_match_countries_is_rejected() {
        let err = FilterConfig::try_from(&RejectCountriesConfig::default()).unwrap_err();
        assert_eq!(err, ConfigError::EmptyMatchCountries);
    }

    #[test]
    fn builds_from_valid_config() {
        let config = RejectCountriesConfig {
            prefer_x_forwarded_for_header: false,
            match_countries: vec!["gb".into(), "US".into()],
            static_response: StaticResponseConfig {
                status_code: 5,
                headers: None,
                body: "Access denied".into(),
            },
            ..Default::default()
        };
        let filter_config = FilterConfig::try_from(&config).unwrap();
        assert!(!filter_config.prefer_forwarded_header);
        assert!(filter_config.blocked_countries.matches("GB"));
        assert!(filter_config.blocked_countries.matches("us"));
        assert_eq!(filter_config.static_response.status(), StatusCode::OK);
        assert!(filter_config.static_response.headers().is_empty());
        assert_eq!(filter_config.static_response.body(), "Access denied");
    }
}
