//! # Megaport API Client
//!
//! Thin typed client for the Megaport v2 REST API. Three calls are consumed:
//!
//! - **Login**: exchanges account credentials for a session token
//! - **Products**: lists the account's provisioned products
//! - **Telemetry**: fetches bandwidth samples for one product over a window
//!
//! Every response wraps its payload in a `{ "data": ... }` envelope. The
//! session token is passed as a `token` query parameter on all calls after
//! login and lives for one invocation only.
//!
//! The [`MegaportApi`] trait is the seam the pipeline runs against, so tests
//! can substitute a fake provider.

use crate::error::AuthError;
use eyre::Result;
use reqwest::{
    Client as HttpClient,
    StatusCode,
};
use serde::Deserialize;
use std::{
    future::Future,
    pin::Pin,
};

/// Telemetry lookback applied to every product in one invocation.
pub const LOOKBACK_MS: i64 = 1_800_000;

/// Explicit fetch window in epoch milliseconds, computed once per invocation
/// and shared by every product in the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryWindow {
    pub from_ms: i64,
    pub to_ms: i64,
}

impl TelemetryWindow {
    /// Thirty minutes of lookback ending at `now_ms`.
    pub fn ending_at(now_ms: i64) -> Self {
        Self {
            from_ms: now_ms - LOOKBACK_MS,
            to_ms: now_ms,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
}

/// One provisioned product from the account inventory. The listing carries
/// many more fields; only the identifiers are kept.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_uid: String,
    pub product_name: String,
}

/// One telemetry record: a direction subtype and its `[timestamp_ms, value]`
/// sample pairs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TelemetryRecord {
    pub subtype: String,
    pub samples: Vec<(i64, f64)>,
}

/// Seam over the provider API so the pipeline can run against a fake.
pub trait MegaportApi {
    /// Exchange account credentials for a session token.
    fn login<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AuthError>> + Send + 'a>>;

    /// List the account's provisioned products. No pagination.
    fn products<'a>(&'a self, token: &'a str) -> Pin<Box<dyn Future<Output = Result<Vec<Product>>> + Send + 'a>>;

    /// Fetch bandwidth telemetry for one product over the given window.
    fn telemetry<'a>(
        &'a self,
        token: &'a str,
        product_uid: &'a str,
        window: TelemetryWindow,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TelemetryRecord>>> + Send + 'a>>;
}

pub struct MegaportClient {
    http: HttpClient,
    base_url: String,
}

impl MegaportClient {
    pub fn new(http: HttpClient, base_url: String) -> Self {
        Self { http, base_url }
    }
}

impl MegaportApi for MegaportClient {
    fn login<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, AuthError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .http
                .post(format!("{}/login", self.base_url))
                .query(&[("username", username), ("password", password)])
                .send()
                .await
                .map_err(AuthError::Network)?;

            let status = response.status();
            let body = response.text().await.map_err(AuthError::Network)?;
            parse_login_response(status, &body)
        })
    }

    fn products<'a>(&'a self, token: &'a str) -> Pin<Box<dyn Future<Output = Result<Vec<Product>>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .http
                .get(format!("{}/products", self.base_url))
                .query(&[("token", token)])
                .send()
                .await?;

            let envelope: Envelope<Vec<Product>> = response.json().await?;
            Ok(envelope.data)
        })
    }

    fn telemetry<'a>(
        &'a self,
        token: &'a str,
        product_uid: &'a str,
        window: TelemetryWindow,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TelemetryRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let to = window.to_ms.to_string();
            let from = window.from_ms.to_string();

            // Only MCR2 products report bandwidth telemetry at this endpoint.
            let response = self
                .http
                .get(format!("{}/product/mcr2/{product_uid}/telemetry", self.base_url))
                .query(&[
                    ("token", token),
                    ("type", "bits"),
                    ("to", to.as_str()),
                    ("from", from.as_str()),
                ])
                .send()
                .await?;

            let envelope: Envelope<Vec<TelemetryRecord>> = response.json().await?;
            Ok(envelope.data)
        })
    }
}

/// Extract the session token from a login response, mapping each failure mode
/// to its own [`AuthError`] variant with the raw body preserved.
fn parse_login_response(status: StatusCode, body: &str) -> Result<String, AuthError> {
    if !status.is_success() {
        return Err(AuthError::Status {
            status,
            body: body.to_string(),
        });
    }

    let envelope: Envelope<LoginData> = serde_json::from_str(body).map_err(|_| AuthError::MissingToken {
        body: body.to_string(),
    })?;

    Ok(envelope.data.token)
}
