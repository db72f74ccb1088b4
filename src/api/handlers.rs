use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::Json,
};
use serde_json::Value;
use tracing::info;

use super::response::ApiError;
use super::types::{
    validate_team_name, validate_user_id, CreatePrRequest, MassDeactivateRequest, MergePrRequest,
    PrResponse, ReassignRequest, SetIsActiveRequest, TeamQuery, TeamRequest, TeamResponse,
    UserQuery, UserResponse, UserReviewResponse,
};
use super::AppState;
use crate::database::models::Team;
use crate::engine::Reassignment;
use crate::statistics::Statistics;

type ApiResult<T> = Result<T, ApiError>;

fn required(value: Option<String>, name: &str) -> ApiResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest(format!("{} is required", name)))
}

pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn add_team(
    State(state): State<AppState>,
    payload: Result<Json<TeamRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TeamResponse>)> {
    let Json(request) = payload?;
    request.validate()?;

    let team = state
        .engine
        .create_team(&request.team_name, &request.members)
        .await?;
    Ok((StatusCode::CREATED, Json(TeamResponse { team })))
}

pub async fn get_team(
    State(state): State<AppState>,
    query: Result<Query<TeamQuery>, QueryRejection>,
) -> ApiResult<Json<Team>> {
    let Query(query) = query?;
    let team_name = required(query.team_name, "team_name")?;
    validate_team_name(&team_name)?;

    let team = state.engine.get_team(&team_name).await?;
    Ok(Json(team))
}

pub async fn deactivate_team_users(
    State(state): State<AppState>,
    payload: Result<Json<MassDeactivateRequest>, JsonRejection>,
) -> ApiResult<Json<TeamResponse>> {
    let Json(request) = payload?;
    request.validate()?;

    info!(
        "Mass deactivation requested for {} users in team {}",
        request.user_ids.len(),
        request.team_name
    );
    let team = state
        .engine
        .mass_deactivate(&request.team_name, &request.user_ids)
        .await?;
    Ok(Json(TeamResponse { team }))
}

pub async fn set_is_active(
    State(state): State<AppState>,
    payload: Result<Json<SetIsActiveRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(request) = payload?;
    request.validate()?;

    let user = state
        .engine
        .set_user_active(&request.user_id, request.is_active)
        .await?;
    Ok(Json(UserResponse { user }))
}

pub async fn get_review(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<Json<UserReviewResponse>> {
    let Query(query) = query?;
    let user_id = required(query.user_id, "user_id")?;
    validate_user_id(&user_id)?;

    let pull_requests = state.engine.get_review_prs(&user_id).await?;
    Ok(Json(UserReviewResponse {
        user_id,
        pull_requests,
    }))
}

pub async fn create_pr(
    State(state): State<AppState>,
    payload: Result<Json<CreatePrRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PrResponse>)> {
    let Json(request) = payload?;
    request.validate()?;

    let pr = state
        .engine
        .create_pr(
            &request.pull_request_id,
            &request.pull_request_name,
            &request.author_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(PrResponse { pr })))
}

pub async fn merge_pr(
    State(state): State<AppState>,
    payload: Result<Json<MergePrRequest>, JsonRejection>,
) -> ApiResult<Json<PrResponse>> {
    let Json(request) = payload?;
    request.validate()?;

    let pr = state.engine.merge_pr(&request.pull_request_id).await?;
    Ok(Json(PrResponse { pr }))
}

pub async fn reassign_pr(
    State(state): State<AppState>,
    payload: Result<Json<ReassignRequest>, JsonRejection>,
) -> ApiResult<Json<Reassignment>> {
    let Json(request) = payload?;
    request.validate()?;

    let reassignment = state
        .engine
        .reassign_reviewer(&request.pull_request_id, &request.old_user_id)
        .await?;
    Ok(Json(reassignment))
}

pub async fn statistics(State(state): State<AppState>) -> ApiResult<Json<Statistics>> {
    Ok(Json(state.engine.statistics().await?))
}
