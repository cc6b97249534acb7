//! # Collector-Publisher Pipeline
//!
//! The linear per-invocation flow: authenticate, list products, fetch each
//! product's telemetry over one shared 30-minute window, classify samples by
//! direction, publish two series per product. Strictly sequential; the only
//! branch is the fatal authentication path.

use crate::{
    config::Config,
    datadog::{
        MetricSeries,
        MetricsSink,
    },
    megaport::{
        MegaportApi,
        Product,
        TelemetryRecord,
        TelemetryWindow,
    },
};
use chrono::Utc;
use eyre::Result;
use tracing::{
    debug,
    info,
};

/// Tag identifying this tool as the origin of every published point.
pub const SOURCE_TAG: &str = "source:megaport-datadog";

/// Per-product bandwidth samples split by direction, timestamps already
/// converted to epoch seconds. Discarded after publishing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductBandwidth {
    pub mbps_in: Vec<(i64, f64)>,
    pub mbps_out: Vec<(i64, f64)>,
}

/// Split telemetry records by direction, truncating timestamps from
/// milliseconds to whole seconds. Sample order is preserved; records with a
/// subtype other than `"In"` or `"Out"` are dropped silently.
pub fn classify(records: &[TelemetryRecord]) -> ProductBandwidth {
    let mut bandwidth = ProductBandwidth::default();

    for record in records {
        let samples = record.samples.iter().map(|&(ts_ms, value)| (ts_ms / 1000, value));
        match record.subtype.as_str() {
            "In" => bandwidth.mbps_in.extend(samples),
            "Out" => bandwidth.mbps_out.extend(samples),
            _ => {}
        }
    }

    bandwidth
}

/// Tags attached to both series of a product.
pub fn product_tags(product: &Product) -> Vec<String> {
    vec![
        SOURCE_TAG.to_string(),
        format!("product_name:{}", product.product_name),
        format!("product_uid:{}", product.product_uid),
    ]
}

/// Run one collection pass end to end.
///
/// A failed login aborts before any other endpoint is called. Listing and
/// telemetry failures propagate and abort the invocation; submission failures
/// do not.
pub async fn run(config: &Config, provider: &impl MegaportApi, sink: &impl MetricsSink) -> Result<()> {
    info!("Authenticating to the Megaport API");
    let token = provider.login(&config.username, &config.password).await?;

    info!("Listing provisioned Megaport products");
    let products = provider.products(&token).await?;
    info!("Found {} products", products.len());

    // One window shared by every product in this invocation.
    let window = TelemetryWindow::ending_at(Utc::now().timestamp_millis());

    for product in &products {
        info!("Collecting bandwidth telemetry for {}", product.product_name);
        debug!(from_ms = window.from_ms, to_ms = window.to_ms, "telemetry window");

        let records = provider.telemetry(&token, &product.product_uid, window).await?;
        let bandwidth = classify(&records);

        publish_product(config, sink, product, bandwidth).await;
    }

    info!("Done");
    Ok(())
}

/// Publish the inbound and outbound series for one product.
async fn publish_product(config: &Config, sink: &impl MetricsSink, product: &Product, bandwidth: ProductBandwidth) {
    let tags = product_tags(product);

    info!(
        "Sending {} mbps_in points for {}",
        bandwidth.mbps_in.len(),
        product.product_name
    );
    // TODO: surface submission failures instead of dropping them.
    if let Err(error) = sink
        .send(MetricSeries {
            metric: format!("{}.bandwidth.mbps_in", config.metric_prefix),
            points: bandwidth.mbps_in,
            tags: tags.clone(),
        })
        .await
    {
        debug!(%error, "mbps_in submission failed");
    }

    info!(
        "Sending {} mbps_out points for {}",
        bandwidth.mbps_out.len(),
        product.product_name
    );
    if let Err(error) = sink
        .send(MetricSeries {
            metric: format!("{}.bandwidth.mbps_out", config.metric_prefix),
            points: bandwidth.mbps_out,
            tags,
        })
        .await
    {
        debug!(%error, "mbps_out submission failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use eyre::eyre;
    use pretty_assertions::assert_eq;
    use std::{
        future::Future,
        pin::Pin,
        sync::{
            atomic::{
                AtomicUsize,
                Ordering,
            },
            Mutex,
        },
    };

    fn record(subtype: &str, samples: Vec<(i64, f64)>) -> TelemetryRecord {
        TelemetryRecord {
            subtype: subtype.to_string(),
            samples,
        }
    }

    fn product(uid: &str, name: &str) -> Product {
        Product {
            product_uid: uid.to_string(),
            product_name: name.to_string(),
        }
    }

    fn config(prefix: &str) -> Config {
        Config::new(
            "user".into(),
            "pass".into(),
            "key".into(),
            prefix.into(),
            "https://api.megaport.com/v2".into(),
            "https://api.datadoghq.com".into(),
        )
        .unwrap()
    }

    struct FakeProvider {
        fail_login: bool,
        products: Vec<Product>,
        telemetry: Vec<TelemetryRecord>,
        products_calls: AtomicUsize,
        telemetry_calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new(products: Vec<Product>, telemetry: Vec<TelemetryRecord>) -> Self {
            Self {
                fail_login: false,
                products,
                telemetry,
                products_calls: AtomicUsize::new(0),
                telemetry_calls: AtomicUsize::new(0),
            }
        }
    }

    impl MegaportApi for FakeProvider {
        fn login<'a>(
            &'a self,
            _username: &'a str,
            _password: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<String, AuthError>> + Send + 'a>> {
            Box::pin(async move {
                if self.fail_login {
                    Err(AuthError::MissingToken {
                        body: r#"{"data":{}}"#.to_string(),
                    })
                } else {
                    Ok("session-token".to_string())
                }
            })
        }

        fn products<'a>(&'a self, _token: &'a str) -> Pin<Box<dyn Future<Output = Result<Vec<Product>>> + Send + 'a>> {
            self.products_calls.fetch_add(1, Ordering::SeqCst);
            let products = self.products.clone();
            Box::pin(async move { Ok(products) })
        }

        fn telemetry<'a>(
            &'a self,
            _token: &'a str,
            _product_uid: &'a str,
            _window: TelemetryWindow,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<TelemetryRecord>>> + Send + 'a>> {
            self.telemetry_calls.fetch_add(1, Ordering::SeqCst);
            let telemetry = self.telemetry.clone();
            Box::pin(async move { Ok(telemetry) })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<MetricSeries>>,
    }

    impl MetricsSink for RecordingSink {
        fn send<'a>(&'a self, series: MetricSeries) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                self.sent.lock().unwrap().push(series);
                Ok(())
            })
        }
    }

    struct FailingSink;

    impl MetricsSink for FailingSink {
        fn send<'a>(&'a self, _series: MetricSeries) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move { Err(eyre!("datadog is down")) })
        }
    }

    #[test]
    fn classify_splits_by_direction_and_truncates_timestamps() {
        let records = vec![
            record("In", vec![(1000, 5.0)]),
            record("Out", vec![(2000, 7.0)]),
            record("Foo", vec![(3000, 9.0)]),
        ];

        let bandwidth = classify(&records);

        assert_eq!(bandwidth.mbps_in, vec![(1, 5.0)]);
        assert_eq!(bandwidth.mbps_out, vec![(2, 7.0)]);
    }

    #[test]
    fn classify_truncates_sub_second_remainders() {
        let bandwidth = classify(&[record("In", vec![(1999, 1.0), (2001, 2.0)])]);
        assert_eq!(bandwidth.mbps_in, vec![(1, 1.0), (2, 2.0)]);
    }

    #[test]
    fn classify_preserves_input_order_across_records() {
        let records = vec![
            record("In", vec![(5000, 1.0), (1000, 2.0)]),
            record("In", vec![(3000, 3.0)]),
        ];

        let bandwidth = classify(&records);
        assert_eq!(bandwidth.mbps_in, vec![(5, 1.0), (1, 2.0), (3, 3.0)]);
    }

    #[test]
    fn unknown_subtypes_contribute_nothing() {
        let bandwidth = classify(&[record("Aggregate", vec![(1000, 5.0), (2000, 6.0)])]);
        assert_eq!(bandwidth, ProductBandwidth::default());
    }

    #[test]
    fn tags_carry_source_name_and_uid() {
        let tags = product_tags(&product("p1", "Router A"));
        assert_eq!(
            tags,
            vec![
                "source:megaport-datadog".to_string(),
                "product_name:Router A".to_string(),
                "product_uid:p1".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn one_product_publishes_in_and_out_series() {
        let provider = FakeProvider::new(
            vec![product("p1", "A")],
            vec![
                record("In", vec![(1000, 5.0)]),
                record("Out", vec![(2000, 7.0)]),
                record("Foo", vec![(3000, 9.0)]),
            ],
        );
        let sink = RecordingSink::default();

        run(&config("megaport"), &provider, &sink).await.unwrap();

        let sent = sink.sent.into_inner().unwrap();
        assert_eq!(sent.len(), 2);

        assert_eq!(sent[0].metric, "megaport.bandwidth.mbps_in");
        assert_eq!(sent[0].points, vec![(1, 5.0)]);
        assert_eq!(sent[1].metric, "megaport.bandwidth.mbps_out");
        assert_eq!(sent[1].points, vec![(2, 7.0)]);
        for series in &sent {
            assert_eq!(series.tags, product_tags(&product("p1", "A")));
        }
    }

    #[tokio::test]
    async fn two_products_yield_four_submissions() {
        let provider = FakeProvider::new(
            vec![product("p1", "Router A"), product("p2", "Router B")],
            vec![record("In", vec![(1000, 1.0)]), record("Out", vec![(2000, 2.0)])],
        );
        let sink = RecordingSink::default();

        run(&config("megaport"), &provider, &sink).await.unwrap();

        assert_eq!(provider.telemetry_calls.load(Ordering::SeqCst), 2);

        let sent = sink.sent.into_inner().unwrap();
        assert_eq!(sent.len(), 4);
        assert!(sent[0].tags.contains(&"product_uid:p1".to_string()));
        assert!(sent[0].tags.contains(&"product_name:Router A".to_string()));
        assert!(sent[2].tags.contains(&"product_uid:p2".to_string()));
        assert!(sent[2].tags.contains(&"product_name:Router B".to_string()));
    }

    #[tokio::test]
    async fn metric_prefix_is_configurable() {
        let provider = FakeProvider::new(vec![product("p1", "A")], vec![]);
        let sink = RecordingSink::default();

        run(&config("staging.megaport"), &provider, &sink).await.unwrap();

        let sent = sink.sent.into_inner().unwrap();
        assert_eq!(sent[0].metric, "staging.megaport.bandwidth.mbps_in");
        assert_eq!(sent[1].metric, "staging.megaport.bandwidth.mbps_out");
    }

    #[tokio::test]
    async fn empty_series_are_still_submitted() {
        let provider = FakeProvider::new(vec![product("p1", "A")], vec![]);
        let sink = RecordingSink::default();

        run(&config("megaport"), &provider, &sink).await.unwrap();

        let sent = sink.sent.into_inner().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].points.is_empty());
        assert!(sent[1].points.is_empty());
    }

    #[tokio::test]
    async fn failed_login_stops_the_pipeline() {
        let mut provider = FakeProvider::new(vec![product("p1", "A")], vec![]);
        provider.fail_login = true;
        let sink = RecordingSink::default();

        let report = run(&config("megaport"), &provider, &sink).await.unwrap_err();

        assert!(matches!(
            report.downcast_ref::<AuthError>(),
            Some(AuthError::MissingToken { .. })
        ));
        assert_eq!(provider.products_calls.load(Ordering::SeqCst), 0);
        assert_eq!(provider.telemetry_calls.load(Ordering::SeqCst), 0);
        assert!(sink.sent.into_inner().unwrap().is_empty());
    }

    #[tokio::test]
    async fn submission_failures_do_not_abort_the_run() {
        let provider = FakeProvider::new(
            vec![product("p1", "A"), product("p2", "B")],
            vec![record("In", vec![(1000, 1.0)])],
        );

        run(&config("megaport"), &provider, &FailingSink).await.unwrap();

        assert_eq!(provider.telemetry_calls.load(Ordering::SeqCst), 2);
    }
}
