use anyhow::Result;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use common_observability::{ServiceMetrics, TEXT_CONTENT_TYPE};
use prometheus::{IntCounterVec, Opts};

pub const SERVICE_NAME: &str = "auth-service";

#[derive(Clone)]
pub struct AuthMetrics {
    service: ServiceMetrics,
    login_attempts: IntCounterVec,
    refresh_attempts: IntCounterVec,
}

impl AuthMetrics {
    pub fn new() -> Result<Self> {
        let service = ServiceMetrics::new(SERVICE_NAME)?;

        let login_attempts = IntCounterVec::new(
            Opts::new(
                "auth_login_attempts_total",
                "Count of login attempts grouped by outcome",
            ),
            &["outcome"],
        )?;
        service.registry().register(Box::new(login_attempts.clone()))?;

        let refresh_attempts = IntCounterVec::new(
            Opts::new(
                "auth_refresh_attempts_total",
                "Count of refresh attempts grouped by outcome",
            ),
            &["outcome"],
        )?;
        service.registry().register(Box::new(refresh_attempts.clone()))?;

        Ok(Self {
            service,
            login_attempts,
            refresh_attempts,
        })
    }

    /// Shared registry, also handed to the security gate for rejection counts.
    pub fn service(&self) -> &ServiceMetrics {
        &self.service
    }

    pub fn login_attempt(&self, outcome: &str) {
        self.login_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn refresh_attempt(&self, outcome: &str) {
        self.refresh_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn login_count(&self, outcome: &str) -> u64 {
        self.login_attempts.with_label_values(&[outcome]).get()
    }

    pub fn refresh_count(&self, outcome: &str) -> u64 {
        self.refresh_attempts.with_label_values(&[outcome]).get()
    }

    pub fn render(&self) -> Result<Response> {
        let buffer = self.service.render()?;
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE))
            .body(Body::from(buffer))?;
        Ok(response)
    }
}
