//! # Configuration Module
//!
//! Immutable per-invocation settings, built once from CLI arguments (each with
//! an environment-variable fallback) and never mutated afterwards.

use eyre::Result;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub datadog_api_key: String,
    pub metric_prefix: String,
    pub megaport_url: String,
    pub datadog_url: String,
}

impl Config {
    pub fn new(
        username: String,
        password: String,
        datadog_api_key: String,
        metric_prefix: String,
        megaport_url: String,
        datadog_url: String,
    ) -> Result<Self> {
        let megaport_url = normalize_base_url(&megaport_url)?;
        let datadog_url = normalize_base_url(&datadog_url)?;

        Ok(Self {
            username,
            password,
            datadog_api_key,
            metric_prefix,
            megaport_url,
            datadog_url,
        })
    }
}

/// Validate a base URL and strip any trailing slash, since endpoint paths are
/// appended with a leading one.
fn normalize_base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw)?;
    url.host_str()
        .ok_or_else(|| eyre::eyre!("No host found in base URL: {raw}"))?;
    Ok(raw.trim_end_matches('/').to_string())
}
