use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryCriteriaRegistry};
use crate::registry_http::HttpCriteriaRegistry;
use crate::routes::with_curation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use trial_curation::config::AppConfig;
use trial_curation::error::AppError;
use trial_curation::telemetry;
use trial_curation::workflows::adjudication::{AdjudicationService, CriteriaRegistry};
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = if args.in_memory {
        info!("serving against the in-memory registry");
        build_app(
            Arc::new(InMemoryCriteriaRegistry::seeded()),
            app_state,
            prometheus_layer,
        )
    } else {
        build_app(
            Arc::new(HttpCriteriaRegistry::new(&config.registry)),
            app_state,
            prometheus_layer,
        )
    };

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, registry = %config.registry.base_url, "criteria curation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn build_app<R>(
    registry: Arc<R>,
    app_state: AppState,
    prometheus_layer: PrometheusMetricLayer<'static>,
) -> axum::Router
where
    R: CriteriaRegistry + 'static,
{
    let service = Arc::new(AdjudicationService::new(registry));
    with_curation_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer)
}
