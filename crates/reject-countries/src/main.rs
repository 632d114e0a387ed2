use std::net::SocketAddr;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use clap::Parser;
use hyper_util::rt::TokioTimer;
use reject_countries::{build_filter, build_upstream, check, configure_server};
use reject_countries_cli::{CliArgs, Mode, ServeArgs};
use reject_countries_filter::RejectCountries;
use reject_countries_types::RejectCountriesResult;
use reject_countries_types::errors::RejectCountriesError;
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const H1_HEADER_TIMEOUT: Duration = Duration::from_secs(15);
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(20);
const KEEP_ALIVE_TIMEOUT: Duration = Duration::from_secs(20);
const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

async fn shutdown_signal(address: String) {
    info!("reject-countries is listening to HTTP traffic on {address}");

    let mut sigint = pin!(signal::ctrl_c());
    #[cfg(unix)]
    {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm_stream) => {
                let mut sigterm = pin!(sigterm_stream.recv());
                tokio::select! {
                    _ = &mut sigint => {
                        info!("Received Ctrl+C (SIGINT), shutting down gracefully...");
                    }
                    _ = &mut sigterm => {
                        info!("Received SIGTERM, shutting down gracefully...");
                    }
                }
            }
            Err(e) => {
                warn!("Failed to bind SIGTERM, only listening for Ctrl+C: {e}");
                let _ = sigint.await;
                info!("Received Ctrl+C (SIGINT), shutting down gracefully...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = sigint.await;
        info!("Received Ctrl+C (SIGINT), shutting down gracefully...");
    }
}

async fn run_server(filter: Arc<RejectCountries>, serve_args: &ServeArgs) -> RejectCountriesResult<()> {
    let upstream = build_upstream(serve_args)?;
    info!("Forwarding allowed requests to {}", upstream.base_url());
    let router = configure_server(filter, upstream);

    let address = serve_args.http_server_addr();
    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| RejectCountriesError::ServerBind(format!("{address}: {e}")))?;

    let handle = Handle::new();
    let http_handle_clone = handle.clone();
    let shutdown_fut = shutdown_signal(address.clone());
    tokio::spawn(async move {
        shutdown_fut.await;
        http_handle_clone.graceful_shutdown(Some(GRACEFUL_SHUTDOWN_TIMEOUT));
    });

    let mut builder = axum_server::bind(socket_addr).handle(handle);
    let http_builder = builder.http_builder();
    http_builder
        .http1()
        .timer(TokioTimer::new())
        .keep_alive(true)
        .header_read_timeout(H1_HEADER_TIMEOUT);
    http_builder
        .http2()
        .timer(TokioTimer::new())
        .keep_alive_interval(Some(KEEP_ALIVE_INTERVAL))
        .keep_alive_timeout(KEEP_ALIVE_TIMEOUT);
    builder
        .serve(router.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|e| RejectCountriesError::ServerBind(format!("{address}: {e}")))
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = CliArgs::parse();
    if args.markdown_help {
        clap_markdown::print_help_markdown::<CliArgs>();
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(reject_countries::tracing::formatting_layer(&args))
        .with(reject_countries::tracing::log_filter())
        .init();

    let filter = build_filter(&args)?;
    match &args.mode {
        Mode::Serve(serve_args) => run_server(filter, serve_args).await,
        Mode::Check(check_args) => {
            println!("{}: {}", check_args.ip, check(&filter, &check_args.ip));
            Ok(())
        }
    }
    .map_err(|e| e.into())
}
