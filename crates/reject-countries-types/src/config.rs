use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::errors::ConfigError;

pub const DEFAULT_DB_PATH: &str = "/mmdb/GeoLite2-Country.mmdb";
pub const DEFAULT_STATUS_CODE: i64 = 200;

/// Header name to values, in the order they were configured.
pub type HeaderList = Vec<(String, Vec<String>)>;

/// Filter configuration as it is written by operators, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RejectCountriesConfig {
    pub db_path: PathBuf,
    pub prefer_x_forwarded_for_header: bool,
    pub match_countries: Vec<String>,
    pub static_response: StaticResponseConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticResponseConfig {
    pub status_code: i64,
    #[serde(deserialize_with = "ordered_headers::deserialize")]
    pub headers: Option<HeaderList>,
    pub body: String,
}

impl Default for RejectCountriesConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            prefer_x_forwarded_for_header: true,
            match_countries: vec![],
            static_response: StaticResponseConfig::default(),
        }
    }
}

impl Default for StaticResponseConfig {
    fn default() -> Self {
        Self {
            status_code: DEFAULT_STATUS_CODE,
            headers: Some(vec![]),
            body: String::new(),
        }
    }
}

impl RejectCountriesConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e.to_string()))?;
        Self::from_json_str(&content)
            .map_err(|e| ConfigError::FileParse(path.to_path_buf(), e.to_string()))
    }

    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

/// Keeps headers in document order and accepts either a single string or a
/// list of strings per header name.
mod ordered_headers {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    impl From<OneOrMany> for Vec<String> {
        fn from(value: OneOrMany) -> Self {
            match value {
                OneOrMany::One(v) => vec![v],
                OneOrMany::Many(vs) => vs,
            }
        }
    }

    struct HeaderListVisitor;

    impl<'de> Visitor<'de> for HeaderListVisitor {
        type Value = Option<HeaderList>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a map of header names to a string or a list of strings")
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
            deserializer.deserialize_map(HeaderListVisitor)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut headers: HeaderList = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, values)) = map.next_entry::<String, OneOrMany>()? {
                let values: Vec<String> = values.into();
                match headers.iter_mut().find(|(existing, _)| *existing == name) {
                    Some((_, existing_values)) => existing_values.extend(values),
                    None => headers.push((name, values)),
                }
            }
            Ok(Some(headers))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<HeaderList>, D::Error> {
        deserializer.deserialize_option(HeaderListVisitor)
    }
}
