//! The Prometheus `/metrics` endpoint.

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use challenger_executor::config::MetricsConfig;
use prometheus::{Encoder, TextEncoder};
use tokio::task::JoinHandle;
use warp::Filter;

/// Renders every metric of the default registry in the text exposition format.
#[must_use]
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(%err, "failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Socket address the endpoint binds to.
///
/// # Errors
/// Returns an error if the configured address is not an IP address.
pub fn bind_address(config: &MetricsConfig) -> Result<SocketAddr> {
    let ip: IpAddr = config
        .address
        .parse()
        .with_context(|| format!("invalid metrics address `{}`", config.address))?;
    Ok(SocketAddr::new(ip, config.port))
}

/// Serves `/metrics` in the background. Returns `None` when disabled.
///
/// # Errors
/// Returns an error if the bind address is invalid.
pub fn spawn_metrics_server(config: &MetricsConfig) -> Result<Option<JoinHandle<()>>> {
    if !config.enabled {
        return Ok(None);
    }
    let addr = bind_address(config)?;

    Ok(Some(tokio::spawn(async move {
        let metrics_route = warp::path("metrics").map(render).boxed();

        tracing::info!("Metrics available at http://{addr}/metrics");
        warp::serve(metrics_route).run(addr).await;
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_address_from_config() {
        let config = MetricsConfig {
            address: "127.0.0.1".to_string(),
            port: 9464,
            enabled: true,
        };
        assert_eq!(bind_address(&config).unwrap(), "127.0.0.1:9464".parse().unwrap());

        let config = MetricsConfig {
            address: "localhost".to_string(),
            ..config
        };
        assert!(bind_address(&config).is_err());
    }

    #[tokio::test]
    async fn disabled_server_is_not_started() {
        let config = MetricsConfig {
            enabled: false,
            ..MetricsConfig::default()
        };
        assert!(spawn_metrics_server(&config).unwrap().is_none());
    }

    #[test]
    fn render_includes_executor_metrics() {
        challenger_executor::metrics::FAILOVER_COUNTER.inc_by(0);
        assert!(render().contains("challenger_failover_total"));
    }
}
