use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use trial_curation::workflows::adjudication::{
    adjudication_router, AdjudicationService, CriteriaRegistry,
};
use trial_curation::workflows::eligibility::{build_eligibility_sections, Section};

pub(crate) fn with_curation_routes<R>(service: Arc<AdjudicationService<R>>) -> axum::Router
where
    R: CriteriaRegistry + 'static,
{
    adjudication_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/eligibility/sections",
            axum::routing::post(sections_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Render a raw matched-criteria payload into the six display sections. The
/// transform tolerates arbitrary payload shapes, so any JSON body is
/// accepted.
pub(crate) async fn sections_endpoint(
    Json(payload): Json<serde_json::Value>,
) -> Json<Vec<Section>> {
    Json(build_eligibility_sections(&payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn sections_endpoint_returns_six_fixed_panels() {
        let payload = json!({
            "1": {
                "fieldName": "Hemoglobin",
                "operator": "gte",
                "fieldValue": 9,
                "isMatched": true,
            },
        });

        let Json(sections) = sections_endpoint(Json(payload)).await;

        assert_eq!(sections.len(), 6);
        let organ = sections
            .iter()
            .find(|section| section.title == "Organ Function")
            .expect("organ panel");
        assert_eq!(organ.items.len(), 1);
        assert_eq!(organ.items[0].text(), "Hemoglobin \u{2265} 9 g/dL.");
    }

    #[tokio::test]
    async fn sections_endpoint_accepts_foreign_payloads() {
        let Json(sections) = sections_endpoint(Json(json!({ "anything": [1, 2, 3] }))).await;
        assert_eq!(sections.len(), 6);
        assert!(sections.iter().all(|section| section.items.is_empty()));
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn composed_router_serves_the_adjudication_surface() {
        use crate::infra::InMemoryCriteriaRegistry;
        use axum::body::Body;
        use axum::http::Request;
        use tower::util::ServiceExt;

        let service = Arc::new(AdjudicationService::new(Arc::new(
            InMemoryCriteriaRegistry::seeded(),
        )));
        let app = with_curation_routes(service);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/adjudication/load")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("request is handled");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/v1/adjudication/studies")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("request is handled");
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        let studies: serde_json::Value = serde_json::from_slice(&body).expect("json payload");
        assert_eq!(studies[0]["study"]["code"], "NCT-0042");
    }
}
