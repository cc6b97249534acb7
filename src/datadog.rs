//! # Datadog Metrics Client
//!
//! Submits time-series points to the Datadog v1 series API. Each submission is
//! one named series with its full point list in a single call; there is no
//! chunking against payload limits. The [`MetricsSink`] trait is the seam the
//! pipeline publishes through, so tests can record submissions instead.

use eyre::Result;
use reqwest::Client as HttpClient;
use serde::Serialize;
use std::{
    future::Future,
    pin::Pin,
};

/// One metric submission: a named series of `(epoch_seconds, value)` points
/// and its tags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub metric: String,
    pub points: Vec<(i64, f64)>,
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SeriesPayload<'a> {
    series: [&'a MetricSeries; 1],
}

/// Seam over the monitoring backend so tests can record submissions.
pub trait MetricsSink {
    /// Submit one series. Best effort: callers are free to ignore the result.
    fn send<'a>(&'a self, series: MetricSeries) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

pub struct DatadogClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
}

impl DatadogClient {
    pub fn new(http: HttpClient, base_url: String, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }
}

impl MetricsSink for DatadogClient {
    fn send<'a>(&'a self, series: MetricSeries) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            // The response status is not inspected; submission is best effort.
            self.http
                .post(format!("{}/api/v1/series", self.base_url))
                .query(&[("api_key", self.api_key.as_str())])
                .json(&SeriesPayload { series: [&series] })
                .send()
                .await?;

            Ok(())
        })
    }
}
