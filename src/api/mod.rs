//! HTTP surface over the assignment engine.

pub mod handlers;
pub mod response;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::engine::AssignmentEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: AssignmentEngine,
}

impl AppState {
    pub fn new(engine: AssignmentEngine) -> Self {
        Self { engine }
    }
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/team/add", post(handlers::add_team))
        .route("/team/get", get(handlers::get_team))
        .route("/team/users/deactivate", post(handlers::deactivate_team_users))
        .route("/users/setIsActive", post(handlers::set_is_active))
        .route("/users/getReview", get(handlers::get_review))
        .route("/pullRequest/create", post(handlers::create_pr))
        .route("/pullRequest/merge", post(handlers::merge_pr))
        .route("/pullRequest/reassign", post(handlers::reassign_pr))
        .route("/statistics", get(handlers::statistics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .into_inner(),
        )
        .with_state(state)
}
