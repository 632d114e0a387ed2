use ahash::HashSet;
use reject_countries_types::errors::ConfigError;

/// Uppercased set of country codes to reject. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryMatcher {
    countries: HashSet<String>,
}

impl CountryMatcher {
    pub fn new<I, S>(countries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = HashSet::default();
        for country in countries {
            normalized.insert(country.as_ref().to_uppercase());
        }
        if normalized.is_empty() {
            return Err(ConfigError::EmptyMatchCountries);
        }
        Ok(Self {
            countries: normalized,
        })
    }

    pub fn matches(&self, country: &str) -> bool {
        self.countries.contains(&country.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// Codes in alphabetical order, for logs and display.
    pub fn sorted(&self) -> Vec<&str> {
        let mut countries: Vec<&str> = self.countries.iter().map(String::as_str).collect();
        countries.sort_unstable();
        countries
    }
}
