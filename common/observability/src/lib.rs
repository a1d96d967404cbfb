use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use tracing_subscriber::EnvFilter;

pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Install the fmt subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(service: &'static str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second call (tests, embedded use) leaves the first subscriber in place.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    tracing::info!(service, "tracing initialised");
}

/// Per-service registry plus the counters every protected service exposes.
#[derive(Clone)]
pub struct ServiceMetrics {
    service: &'static str,
    registry: Registry,
    rejections: IntCounterVec,
}

impl ServiceMetrics {
    pub fn new(service: &'static str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let rejections = IntCounterVec::new(
            Opts::new(
                "auth_rejections_total",
                "Requests rejected by the authentication/authorization pipeline",
            ),
            &["service", "error", "status"],
        )?;
        registry.register(Box::new(rejections.clone()))?;
        Ok(Self { service, registry, rejections })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn rejection(&self, error: &str, status: u16) {
        let status = status.to_string();
        self.rejections
            .with_label_values(&[self.service, error, status.as_str()])
            .inc();
    }

    pub fn rejection_count(&self, error: &str, status: u16) -> u64 {
        let status = status.to_string();
        self.rejections
            .with_label_values(&[self.service, error, status.as_str()])
            .get()
    }

    /// Prometheus text exposition of everything registered in this registry.
    pub fn render(&self) -> Result<Vec<u8>, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}
