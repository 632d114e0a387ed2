use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use reject_countries_types::config::{
    DEFAULT_DB_PATH, DEFAULT_STATUS_CODE, HeaderList, RejectCountriesConfig, StaticResponseConfig,
};
use reject_countries_types::errors::ConfigError;

#[derive(Subcommand, Debug, Clone)]
pub enum Mode {
    /// Run a reverse proxy that answers requests from the matched countries with the static response
    Serve(ServeArgs),
    /// Classify a single ip address and print the verdict
    Check(CheckArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Which port should this server listen for HTTP traffic on
    #[clap(short, long, env, default_value_t = 3063)]
    pub port: u16,
    /// Which interfaces should this server listen for HTTP traffic on
    #[clap(short, long, env, default_value = "0.0.0.0")]
    pub interface: String,
    /// Where allowed requests are forwarded to, e.g. http://localhost:8080
    #[clap(short, long, env)]
    pub upstream_url: String,
    /// Timeout (in seconds) for requests to the upstream
    #[clap(long, env, default_value_t = 5)]
    pub upstream_request_timeout: u64,
}

impl ServeArgs {
    pub fn http_server_addr(&self) -> String {
        format!("{}:{}", self.interface, self.port)
    }
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// The ip address to classify
    pub ip: String,
}

#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// JSON file with the full filter configuration (dbPath, preferXForwardedForHeader, matchCountries, staticResponse).
    /// When set, the other filter options are ignored
    #[clap(long, env, global = true)]
    pub config_file: Option<PathBuf>,

    /// Path to a MaxMind country database. If it can't be opened every request is allowed through
    #[clap(long, env, global = true, default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,

    /// Use the leftmost X-Forwarded-For entry as client ip instead of the connection address.
    /// Only safe behind a proxy that sets this header, since clients can send any value
    #[clap(long, env, global = true, default_value_t = true, action = ArgAction::Set)]
    pub prefer_x_forwarded_for_header: bool,

    /// Country codes to reject. Accepts a comma separated list or multiple instances of the flag. Case insensitive
    #[clap(long, env, global = true, value_delimiter = ',')]
    pub match_countries: Vec<String>,

    /// Status code of the static response. Values outside 100-999 are served as 200
    #[clap(long, env, global = true, default_value_t = DEFAULT_STATUS_CODE, allow_negative_numbers = true)]
    pub status_code: i64,

    /// Header to add to the static response, in the format <headername>:<headervalue>.
    /// Repeat the flag to add several headers or several values for the same header
    #[clap(long, env, global = true, value_parser = string_to_header_tuple)]
    pub static_response_header: Vec<(String, String)>,

    /// Body of the static response
    #[clap(long, env, global = true, default_value = "")]
    pub static_response_body: String,

    /// Name of this filter instance. Shows up in logs
    #[clap(long, env = "REJECT_COUNTRIES_NAME", global = true, default_value = "reject-countries")]
    pub name: String,
}

impl FilterArgs {
    pub fn to_config(&self) -> Result<RejectCountriesConfig, ConfigError> {
        if let Some(config_file) = &self.config_file {
            return RejectCountriesConfig::from_json_file(config_file);
        }
        Ok(RejectCountriesConfig {
            db_path: self.db_path.clone(),
            prefer_x_forwarded_for_header: self.prefer_x_forwarded_for_header,
            match_countries: self.match_countries.clone(),
            static_response: StaticResponseConfig {
                status_code: self.status_code,
                headers: Some(group_headers(&self.static_response_header)),
                body: self.static_response_body.clone(),
            },
        })
    }
}

/// Groups repeated header names, keeping the order each name first appeared in.
fn group_headers(headers: &[(String, String)]) -> HeaderList {
    let mut grouped: HeaderList = vec![];
    for (name, value) in headers {
        match grouped
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some((_, values)) => values.push(value.clone()),
            None => grouped.push((name.clone(), vec![value.clone()])),
        }
    }
    grouped
}

pub fn string_to_header_tuple(s: &str) -> Result<(String, String), String> {
    let format_message = "Please pass headers in the format <headername>:<headervalue>".to_string();
    if let Some((header_name, header_value)) = s.split_once(':') {
        Ok((
            header_name.trim().to_string(),
            header_value.trim().to_string(),
        ))
    } else {
        Err(format_message)
    }
}

#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    Plain,
    Json,
    Pretty,
}

#[derive(Parser, Debug, Clone)]
pub struct CliArgs {
    #[command(subcommand)]
    pub mode: Mode,

    #[clap(flatten)]
    pub filter: FilterArgs,

    /// Which log format should be used
    #[clap(short, long, env, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    #[arg(long, hide = true, global = true)]
    pub markdown_help: bool,
}
