use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyMatchCountries,
    FileRead(PathBuf, String),
    FileParse(PathBuf, String),
}

impl Error for ConfigError {}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptyMatchCountries => write!(f, "matchCountries cannot be empty"),
            ConfigError::FileRead(path, why) => {
                write!(f, "could not read config file at {}: {why}", path.display())
            }
            ConfigError::FileParse(path, why) => {
                write!(f, "config file at {} was invalid due to {why}", path.display())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoIpError {
    DatabaseNotFound(PathBuf),
    DatabaseOpen(PathBuf, String),
}

impl Error for GeoIpError {}

impl Display for GeoIpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoIpError::DatabaseNotFound(path) => {
                write!(f, "GeoIP database not found: {}", path.display())
            }
            GeoIpError::DatabaseOpen(path, why) => {
                write!(f, "failed to open GeoIP database {}: {why}", path.display())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    AddressNotFound(IpAddr),
    MissingCountryCode(IpAddr),
    InvalidRecord(IpAddr, String),
}

impl Error for LookupError {}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::AddressNotFound(ip) => write!(f, "address not found: {ip}"),
            LookupError::MissingCountryCode(ip) => {
                write!(f, "record for {ip} has no country iso code")
            }
            LookupError::InvalidRecord(ip, why) => {
                write!(f, "could not decode record for {ip}: {why}")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum RejectCountriesError {
    Config(ConfigError),
    InvalidUpstreamUrl(String),
    UpstreamClientBuild(String),
    ServerBind(String),
}

impl Error for RejectCountriesError {}

impl Display for RejectCountriesError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectCountriesError::Config(e) => write!(f, "{e}"),
            RejectCountriesError::InvalidUpstreamUrl(e) => {
                write!(f, "Invalid upstream url: {e}")
            }
            RejectCountriesError::UpstreamClientBuild(e) => {
                write!(f, "Failed to build upstream http client: {e}")
            }
            RejectCountriesError::ServerBind(e) => write!(f, "Failed to bind server: {e}"),
        }
    }
}

impl From<ConfigError> for RejectCountriesError {
    fn from(value: ConfigError) -> Self {
        RejectCountriesError::Config(value)
    }
}
