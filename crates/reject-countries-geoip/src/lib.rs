use std::fmt::{Debug, Formatter};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use maxminddb::{MaxMindDBError, geoip2};
use reject_countries_types::errors::{GeoIpError, LookupError};
use tracing::{info, warn};

/// Resolves an ip address to a 2-letter ISO country code.
pub trait CountryLookup: Send + Sync {
    fn lookup(&self, ip: IpAddr) -> Result<String, LookupError>;
}

impl<F> CountryLookup for F
where
    F: Fn(IpAddr) -> Result<String, LookupError> + Send + Sync,
{
    fn lookup(&self, ip: IpAddr) -> Result<String, LookupError> {
        self(ip)
    }
}

/// Whether a country lookup could be set up for a filter instance.
/// Set once at startup and never changed afterwards.
#[derive(Clone, Default)]
pub enum GeoLookup {
    #[default]
    Unavailable,
    Available(Arc<dyn CountryLookup>),
}

impl GeoLookup {
    pub fn from_lookup(lookup: impl CountryLookup + 'static) -> Self {
        GeoLookup::Available(Arc::new(lookup))
    }

    pub fn is_available(&self) -> bool {
        matches!(self, GeoLookup::Available(_))
    }
}

impl Debug for GeoLookup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoLookup::Unavailable => write!(f, "GeoLookup::Unavailable"),
            GeoLookup::Available(_) => write!(f, "GeoLookup::Available"),
        }
    }
}

pub struct MaxMindCountryLookup {
    db_path: PathBuf,
    reader: maxminddb::Reader<Vec<u8>>,
}

impl MaxMindCountryLookup {
    pub fn open(db_path: &Path) -> Result<Self, GeoIpError> {
        if !db_path.exists() {
            return Err(GeoIpError::DatabaseNotFound(db_path.to_path_buf()));
        }
        let reader = maxminddb::Reader::open_readfile(db_path)
            .map_err(|e| GeoIpError::DatabaseOpen(db_path.to_path_buf(), e.to_string()))?;
        Ok(Self {
            db_path: db_path.to_path_buf(),
            reader,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl CountryLookup for MaxMindCountryLookup {
    fn lookup(&self, ip: IpAddr) -> Result<String, LookupError> {
        match self.reader.lookup::<geoip2::Country>(ip) {
            Ok(record) => record
                .country
                .and_then(|country| country.iso_code)
                .map(|iso_code| iso_code.to_string())
                .ok_or(LookupError::MissingCountryCode(ip)),
            Err(MaxMindDBError::AddressNotFoundError(_)) => Err(LookupError::AddressNotFound(ip)),
            Err(e) => Err(LookupError::InvalidRecord(ip, e.to_string())),
        }
    }
}

/// Opens the country database at `db_path`. A missing or unreadable database
/// leaves the lookup unavailable, which makes the filter let every request through.
pub fn load_country_lookup(db_path: &Path, name: &str) -> GeoLookup {
    match MaxMindCountryLookup::open(db_path) {
        Ok(lookup) => {
            info!(
                "GeoIP lookup initialized: db={}, name={}",
                lookup.db_path().display(),
                name
            );
            GeoLookup::from_lookup(lookup)
        }
        Err(e) => {
            warn!("Failed to initialize GeoIP lookup for {name}: {e}. All requests will be allowed");
            GeoLookup::Unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tracing_test::traced_test;

    fn ip(s: &str) -> IpAddr {
        IpAddr::from_str(s).unwrap()
    }

    #[test]
    #[traced_test]
    fn missing_database_leaves_lookup_unavailable() {
        let lookup = load_country_lookup(Path::new("/non/existent/path.mmdb"), "test");
        assert!(!lookup.is_available());
        assert!(logs_contain("GeoIP database not found: /non/existent/path.mmdb"));
    }

    #[test]
    #[traced_test]
    fn unreadable_database_leaves_lookup_unavailable() {
        let path = std::env::temp_dir().join(format!("{}.mmdb", ulid::Ulid::new()));
        std::fs::write(&path, b"definitely not a maxmind database").unwrap();

        let lookup = load_country_lookup(&path, "test");
        std::fs::remove_file(&path).unwrap();

        assert!(!lookup.is_available());
        assert!(logs_contain("failed to open GeoIP database"));
    }

    #[test]
    fn opening_a_missing_database_reports_the_path() {
        let err = MaxMindCountryLookup::open(Path::new("/non/existent/path.mmdb"))
            .err()
            .unwrap();
        assert_eq!(
            err,
            GeoIpError::DatabaseNotFound(PathBuf::from("/non/existent/path.mmdb"))
        );
    }

    #[test]
    fn closures_can_act_as_lookups() {
        let lookup = GeoLookup::from_lookup(|addr: IpAddr| {
            if addr == ip("81.2.69.142") {
                Ok("GB".to_string())
            } else {
                Err(LookupError::AddressNotFound(addr))
            }
        });
        let GeoLookup::Available(lookup) = lookup else {
            panic!("expected an available lookup");
        };
        assert_eq!(lookup.lookup(ip("81.2.69.142")).unwrap(), "GB");
        assert_eq!(
            lookup.lookup(ip("10.0.0.1")).unwrap_err(),
            LookupError::AddressNotFound(ip("10.0.0.1"))
        );
    }

    fn fixture_path() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata/reject-countries-test.mmdb")
    }

    fn fixture() -> MaxMindCountryLookup {
        MaxMindCountryLookup::open(&fixture_path()).expect("Failed to open test database")
    }

    #[test]
    fn resolves_country_iso_code() {
        assert_eq!(fixture().lookup(ip("81.2.69.142")).unwrap(), "GB");
    }

    #[test]
    fn addresses_outside_the_database_are_not_found() {
        let lookup = fixture();
        assert_eq!(
            lookup.lookup(ip("8.8.8.8")).unwrap_err(),
            LookupError::AddressNotFound(ip("8.8.8.8"))
        );
        assert_eq!(
            lookup.lookup(ip("81.2.69.143")).unwrap_err(),
            LookupError::AddressNotFound(ip("81.2.69.143"))
        );
    }

    #[test]
    fn record_without_country_has_no_code() {
        assert_eq!(
            fixture().lookup(ip("1.1.1.1")).unwrap_err(),
            LookupError::MissingCountryCode(ip("1.1.1.1"))
        );
    }

    #[test]
    fn malformed_record_is_reported_as_invalid() {
        let err = fixture().lookup(ip("2.2.2.2")).unwrap_err();
        assert!(matches!(err, LookupError::InvalidRecord(addr, _) if addr == ip("2.2.2.2")));
    }

    #[test]
    #[traced_test]
    fn loading_a_valid_database_logs_its_path() {
        let lookup = load_country_lookup(&fixture_path(), "fixture");
        assert!(lookup.is_available());
        assert!(logs_contain("GeoIP lookup initialized: db="));
        assert!(logs_contain("reject-countries-test.mmdb, name=fixture"));
        assert_eq!(fixture().db_path(), fixture_path().as_path());
    }

    #[test]
    fn default_is_unavailable() {
        assert!(!GeoLookup::default().is_available());
    }
}
