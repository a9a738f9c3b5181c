use crate::infra::{AppState, ServiceEngine};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use works_council::council::works_council_router;

pub(crate) fn with_council_routes(
    engine: Arc<ServiceEngine>,
    shutdown: CancellationToken,
) -> axum::Router {
    works_council_router(engine, shutdown)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::build_engine;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use works_council::council::{InMemoryEmployeeDirectory, MembershipPolicy, UnitId};

    fn router() -> axum::Router {
        let engine = build_engine(
            InMemoryEmployeeDirectory::default(),
            MembershipPolicy::default(),
        );
        with_council_routes(engine, CancellationToken::new())
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn council_routes_are_mounted_next_to_health() {
        let router = router();

        let health = router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .expect("router responds");
        assert_eq!(health.status(), StatusCode::OK);

        let members = router
            .oneshot(
                Request::get(format!("/api/v1/works-council/{}/members", UnitId::new()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("router responds");
        assert_eq!(members.status(), StatusCode::OK);
        let body = axum::body::to_bytes(members.into_body(), 1024)
            .await
            .expect("read body");
        assert_eq!(&body[..], b"[]");
    }
}
