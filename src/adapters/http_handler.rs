use std::{sync::Arc, time::Instant};

use axum::{
    Router,
    body::Body as AxumBody,
    extract::Request,
    http::{StatusCode, header},
    response::Response,
    routing::{any, get},
};
use eyre::{Result, WrapErr};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::{config::IngressConfig, core::IngressService, tracing_setup};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// HTTP adapter in front of the ingress service
pub struct HttpHandler {
    ingress: Arc<IngressService>,
    config: Arc<IngressConfig>,
    prometheus: Option<PrometheusHandle>,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl HttpHandler {
    pub fn new(
        ingress: Arc<IngressService>,
        config: Arc<IngressConfig>,
        prometheus: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            ingress,
            config,
            prometheus,
            started_at: chrono::Utc::now(),
        }
    }

    /// Accept one envelope. Headers are ignored; only the body is processed.
    pub async fn handle_notify(&self, req: Request) -> Result<Response<AxumBody>, eyre::Error> {
        let span = tracing_setup::create_request_span(req.method().as_str(), req.uri().path());
        let start = Instant::now();

        async move {
            tracing::debug!("Receiving incoming request");

            let (status, message) = match self.ingress.handle(req.into_body()).await {
                Ok(accepted) => (accepted.status_code(), accepted.message()),
                Err(e) => {
                    tracing::debug!(error = %e, "Request not accepted");
                    (e.status_code(), e.message())
                }
            };

            let current = tracing::Span::current();
            current.record("http.status_code", status.as_u16());
            current.record("duration_ms", start.elapsed().as_millis() as u64);

            Response::builder()
                .status(status)
                .header(header::CONTENT_TYPE, TEXT_PLAIN)
                .body(AxumBody::from(message))
                .wrap_err("Failed to build notify response")
        }
        .instrument(span)
        .await
    }

    /// Handle health check endpoint
    pub async fn handle_health(&self) -> Result<Response<AxumBody>, eyre::Error> {
        let admission = self.ingress.admission();
        let now = chrono::Utc::now();

        let health_data = serde_json::json!({
            "status": "healthy",
            "admission": {
                "outstanding": admission.outstanding(),
                "threshold": admission.threshold(),
                "unbounded": admission.is_unbounded(),
            },
            "uptime_secs": (now - self.started_at).num_seconds(),
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": now.to_rfc3339(),
        });

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(AxumBody::from(health_data.to_string()))
            .wrap_err("Failed to build health check response")
    }

    /// Render the Prometheus exposition, or 404 when metrics are disabled
    pub async fn handle_metrics(&self) -> Result<Response<AxumBody>, eyre::Error> {
        let Some(prometheus) = &self.prometheus else {
            return Response::builder()
                .status(StatusCode::NOT_FOUND)
                .header(header::CONTENT_TYPE, TEXT_PLAIN)
                .body(AxumBody::from("Metrics disabled\n"))
                .wrap_err("Failed to build 404 response");
        };

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(AxumBody::from(prometheus.render()))
            .wrap_err("Failed to build metrics response")
    }
}

fn into_response(result: Result<Response<AxumBody>, eyre::Error>) -> Response<AxumBody> {
    result.unwrap_or_else(|e| {
        tracing::error!("Request handling error: {:?}", e);
        let mut response = Response::new(AxumBody::from("Internal Server Error"));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

/// Build the axum router: the notify path (any method), `/health`, and the
/// metrics path when a Prometheus handle is present.
pub fn build_router(handler: Arc<HttpHandler>) -> Router {
    let notify_route = {
        let handler = handler.clone();
        any(move |req: Request| {
            let handler = handler.clone();
            async move { into_response(handler.handle_notify(req).await) }
        })
    };

    let health_route = {
        let handler = handler.clone();
        get(move || {
            let handler = handler.clone();
            async move { into_response(handler.handle_health().await) }
        })
    };

    let mut router = Router::new()
        .route(&handler.config.notify_path, notify_route)
        .route("/health", health_route);

    if handler.prometheus.is_some() {
        let metrics_handler = handler.clone();
        router = router.route(
            &handler.config.metrics.path,
            get(move || {
                let handler = metrics_handler.clone();
                async move { into_response(handler.handle_metrics().await) }
            }),
        );
    }

    router.layer(TraceLayer::new_for_http())
}
