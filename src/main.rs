//! # Megaport to Datadog Bridge - Main Entry Point
//!
//! Intended to run as a short-lived, timer-triggered invocation. Parses CLI
//! arguments (each with an environment-variable fallback), wires up the two
//! HTTP clients, and runs one collection pass. Exits 1 on authentication
//! failure with the raw login response on stderr; any other failure surfaces
//! as an error report.

use clap::Parser;
use color_eyre::Result;
use megaport_datadog::{
    config::Config,
    datadog::DatadogClient,
    error::AuthError,
    megaport::MegaportClient,
    pipeline,
};
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
    Layer,
};

#[derive(Parser)]
#[command(name = "megaport-datadog")]
#[command(about = "Publishes Megaport product bandwidth telemetry to Datadog")]
#[command(version)]
struct Cli {
    /// Megaport account username
    #[arg(short, long, env = "MP_USERNAME")]
    username: String,

    /// Megaport account password
    #[arg(short, long, env = "MP_PASSWORD")]
    password: String,

    /// Datadog API key
    #[arg(short, long, env = "DD_API_KEY")]
    key: String,

    /// Metric name prefix, e.g. "megaport"
    #[arg(short, long, default_value = "megaport")]
    metric: String,

    /// Megaport API base URL
    #[arg(long, env = "MP_API_URL", default_value = "https://api.megaport.com/v2")]
    megaport_url: String,

    /// Datadog API base URL
    #[arg(long, env = "DD_API_URL", default_value = "https://api.datadoghq.com")]
    datadog_url: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("megaport_datadog={log_level}")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(filter))
        .with(tracing_error::ErrorLayer::default())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    color_eyre::install()?;

    let config = Config::new(
        cli.username,
        cli.password,
        cli.key,
        cli.metric,
        cli.megaport_url,
        cli.datadog_url,
    )?;

    let http = reqwest::Client::new();
    let provider = MegaportClient::new(http.clone(), config.megaport_url.clone());
    let sink = DatadogClient::new(http, config.datadog_url.clone(), config.datadog_api_key.clone());

    match pipeline::run(&config, &provider, &sink).await {
        Ok(()) => Ok(()),
        Err(report) => {
            // Authentication failure is the one controlled exit: print the raw
            // login response and stop. Everything else is an uncaught fault.
            if let Some(auth) = report.downcast_ref::<AuthError>() {
                match auth.response_body() {
                    Some(body) => eprintln!("{body}"),
                    None => eprintln!("{auth}"),
                }
                std::process::exit(1);
            }
            Err(report)
        }
    }
}
