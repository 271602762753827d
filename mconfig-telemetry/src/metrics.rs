use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Port on which the Prometheus scrape endpoint listens.
pub const METRICS_PORT: u16 = 9000;

/// Installs the global metrics recorder and serves it on `[::]:9000/metrics`.
///
/// Must be called from within a tokio runtime because the exporter spawns its HTTP
/// listener on the current runtime.
pub fn init_metrics(deployment: Option<&str>) -> Result<(), BuildError> {
    let mut builder = PrometheusBuilder::new().with_http_listener(SocketAddr::new(
        IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        METRICS_PORT,
    ));

    if let Some(deployment) = deployment {
        builder = builder.add_global_label("deployment", deployment);
    }

    builder.install()?;

    Ok(())
}
