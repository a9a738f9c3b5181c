use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::domain::{EmployeeId, UnitId};
use super::engine::{ErrorKind, MembershipEngine, MembershipError};
use super::repository::{CouncilRepository, EmployeeDirectory, MembershipRepository};

/// Shared handler state: the engine plus the service-wide shutdown token each request derives
/// its cancellation from.
pub struct CouncilState<C, M, E> {
    engine: Arc<MembershipEngine<C, M, E>>,
    shutdown: CancellationToken,
}

impl<C, M, E> Clone for CouncilState<C, M, E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<C, M, E> CouncilState<C, M, E> {
    pub fn new(engine: Arc<MembershipEngine<C, M, E>>, shutdown: CancellationToken) -> Self {
        Self { engine, shutdown }
    }

    fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequest {
    pub employee_id: EmployeeId,
    pub category: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkMembersRequest {
    #[serde(default)]
    pub employee_ids: Vec<EmployeeId>,
    pub category: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub category: String,
    #[serde(default)]
    pub ordered_ids: Vec<EmployeeId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub category: Option<String>,
}

/// Router exposing the works-council membership endpoints.
pub fn works_council_router<C, M, E>(
    engine: Arc<MembershipEngine<C, M, E>>,
    shutdown: CancellationToken,
) -> Router
where
    C: CouncilRepository + 'static,
    M: MembershipRepository + 'static,
    E: EmployeeDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/works-council/:unit_id/members",
            get(list_members_handler::<C, M, E>)
                .post(add_member_handler::<C, M, E>)
                .delete(remove_member_handler::<C, M, E>),
        )
        .route(
            "/api/v1/works-council/:unit_id/members/bulk-add",
            post(bulk_add_handler::<C, M, E>),
        )
        .route(
            "/api/v1/works-council/:unit_id/members/bulk-remove",
            post(bulk_remove_handler::<C, M, E>),
        )
        .route(
            "/api/v1/works-council/:unit_id/reorder",
            post(reorder_handler::<C, M, E>),
        )
        .with_state(CouncilState::new(engine, shutdown))
}

pub(crate) async fn list_members_handler<C, M, E>(
    State(state): State<CouncilState<C, M, E>>,
    Path(unit_id): Path<UnitId>,
    Query(query): Query<ListQuery>,
) -> Response
where
    C: CouncilRepository + 'static,
    M: MembershipRepository + 'static,
    E: EmployeeDirectory + 'static,
{
    let category = query
        .category
        .as_deref()
        .filter(|value| !value.trim().is_empty());
    match state
        .engine
        .list_members(&unit_id, category, &state.request_token())
    {
        Ok(members) => (StatusCode::OK, Json(members)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn add_member_handler<C, M, E>(
    State(state): State<CouncilState<C, M, E>>,
    Path(unit_id): Path<UnitId>,
    Json(request): Json<MemberRequest>,
) -> Response
where
    C: CouncilRepository + 'static,
    M: MembershipRepository + 'static,
    E: EmployeeDirectory + 'static,
{
    match state.engine.add_member(
        &unit_id,
        &request.employee_id,
        &request.category,
        &state.request_token(),
    ) {
        Ok(members) => (StatusCode::OK, Json(members)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn remove_member_handler<C, M, E>(
    State(state): State<CouncilState<C, M, E>>,
    Path(unit_id): Path<UnitId>,
    Json(request): Json<MemberRequest>,
) -> Response
where
    C: CouncilRepository + 'static,
    M: MembershipRepository + 'static,
    E: EmployeeDirectory + 'static,
{
    match state.engine.remove_member(
        &unit_id,
        &request.employee_id,
        &request.category,
        &state.request_token(),
    ) {
        Ok(removed) => (StatusCode::OK, Json(removed)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn bulk_add_handler<C, M, E>(
    State(state): State<CouncilState<C, M, E>>,
    Path(unit_id): Path<UnitId>,
    Json(request): Json<BulkMembersRequest>,
) -> Response
where
    C: CouncilRepository + 'static,
    M: MembershipRepository + 'static,
    E: EmployeeDirectory + 'static,
{
    match state.engine.bulk_add_members(
        &unit_id,
        &request.employee_ids,
        &request.category,
        &state.request_token(),
    ) {
        Ok(sets) => (StatusCode::OK, Json(sets)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn bulk_remove_handler<C, M, E>(
    State(state): State<CouncilState<C, M, E>>,
    Path(unit_id): Path<UnitId>,
    Json(request): Json<BulkMembersRequest>,
) -> Response
where
    C: CouncilRepository + 'static,
    M: MembershipRepository + 'static,
    E: EmployeeDirectory + 'static,
{
    match state.engine.bulk_remove_members(
        &unit_id,
        &request.employee_ids,
        &request.category,
        &state.request_token(),
    ) {
        Ok(sets) => (StatusCode::OK, Json(sets)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reorder_handler<C, M, E>(
    State(state): State<CouncilState<C, M, E>>,
    Path(unit_id): Path<UnitId>,
    Json(request): Json<ReorderRequest>,
) -> Response
where
    C: CouncilRepository + 'static,
    M: MembershipRepository + 'static,
    E: EmployeeDirectory + 'static,
{
    match state.engine.reorder_members(
        &unit_id,
        &request.category,
        &request.ordered_ids,
        &state.request_token(),
    ) {
        Ok(members) => (StatusCode::OK, Json(members)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Duplicate memberships are a client mistake (400); losing a council creation race is a
/// genuine conflict (409).
fn status_for(err: &MembershipError) -> StatusCode {
    match (err.kind(), err) {
        (ErrorKind::Conflict, MembershipError::DuplicateMembership { .. }) => {
            StatusCode::BAD_REQUEST
        }
        (ErrorKind::Conflict, _) => StatusCode::CONFLICT,
        (ErrorKind::Invalid, _) => StatusCode::BAD_REQUEST,
        (ErrorKind::NotFound, _) => StatusCode::NOT_FOUND,
        (ErrorKind::Cancelled, _) => StatusCode::SERVICE_UNAVAILABLE,
        (ErrorKind::Storage, _) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: MembershipError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        warn!(error = %err, "works council request failed");
    }
    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
