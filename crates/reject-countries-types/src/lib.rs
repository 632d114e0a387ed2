use std::fmt;
use std::fmt::{Display, Formatter};
use std::net::IpAddr;

pub mod config;
pub mod errors;

use crate::errors::RejectCountriesError;

pub type RejectCountriesResult<T> = Result<T, RejectCountriesError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp {
    pub ip: IpAddr,
}

impl Display for ClientIp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ip)
    }
}
