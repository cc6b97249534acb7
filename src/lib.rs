//! # Megaport to Datadog Bandwidth Bridge
//!
//! A scheduled, stateless bridge that republishes Megaport product bandwidth
//! telemetry as Datadog time-series metrics:
//!
//! 1. Authenticates against the Megaport v2 API
//! 2. Lists the account's provisioned products
//! 3. Fetches the last 30 minutes of bandwidth telemetry per product
//! 4. Splits samples by direction and converts timestamps to epoch seconds
//! 5. Publishes two series per product (`<prefix>.bandwidth.mbps_in` / `mbps_out`)
//!
//! ## Architecture
//!
//! - **`config`**: Immutable per-invocation settings built from CLI arguments
//! - **`error`**: Typed authentication failures, the one fatal path
//! - **`megaport`**: Thin typed client for the provider API plus response types
//! - **`datadog`**: Metric series submission client behind the [`MetricsSink`] seam
//! - **`pipeline`**: The linear collector-publisher wiring it all together
//!
//! ## Usage
//!
//! ```bash
//! megaport-datadog --username=ops@example.com \
//!                  --password=... \
//!                  --key=$DD_API_KEY \
//!                  --metric=megaport
//! ```
//!
//! Each flag falls back to an environment variable (`MP_USERNAME`,
//! `MP_PASSWORD`, `DD_API_KEY`), which is how the tool is wired up when run
//! from a timer-triggered serverless function.

pub mod config;
pub mod datadog;
pub mod error;
pub mod megaport;
pub mod pipeline;

pub use config::Config;
pub use datadog::{
    DatadogClient,
    MetricSeries,
    MetricsSink,
};
pub use error::AuthError;
pub use megaport::{
    MegaportApi,
    MegaportClient,
    Product,
    TelemetryRecord,
    TelemetryWindow,
};
