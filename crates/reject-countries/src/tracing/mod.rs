use reject_countries_cli::{CliArgs, LogFormat};
use tracing_subscriber::{EnvFilter, Layer, Registry};

pub fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn formatting_layer(cli_args: &CliArgs) -> Box<dyn Layer<Registry> + Send + Sync> {
    match &cli_args.log_format {
        LogFormat::Plain => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().pretty().boxed(),
    }
}
