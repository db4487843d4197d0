use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::GenerationResponse;
use super::prompt::MealRequest;
use super::services::{generate_meal, GenerationOutcome, GenerationTrigger};
use crate::state::AppState;

pub fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/meals/generate", post(generate))
        .route("/meals/latest", get(latest))
}

/// Failures still carry a typed body so the client can show the exact reason.
pub(crate) fn respond(outcome: GenerationOutcome) -> (StatusCode, Json<GenerationResponse>) {
    let resp = GenerationResponse::from(outcome);
    let status = if resp.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, Json(resp))
}

#[instrument(skip(state, payload))]
pub async fn generate(
    State(state): State<AppState>,
    Json(payload): Json<MealRequest>,
) -> (StatusCode, Json<GenerationResponse>) {
    let trigger = if payload.is_description_only() {
        GenerationTrigger::Description
    } else {
        GenerationTrigger::Selection
    };
    let outcome = generate_meal(state.generator.as_ref(), &state.ledger, &payload, trigger).await;
    respond(outcome)
}

#[instrument(skip(state))]
pub async fn latest(
    State(state): State<AppState>,
) -> Result<Json<GenerationResponse>, (StatusCode, String)> {
    state
        .ledger
        .latest()
        .await
        .map(|o| Json(o.into()))
        .ok_or((StatusCode::NOT_FOUND, "No meal generated yet".into()))
}
