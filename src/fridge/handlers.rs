use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{error, instrument};

use super::dto::{AddItemBody, FridgeView, ToggleBody};
use super::services::FridgeError;
use crate::meals::dto::GenerationResponse;
use crate::meals::handlers::respond;
use crate::meals::services::{generate_meal, GenerationTrigger};
use crate::products::dto::Product;
use crate::state::AppState;

type ApiError = (StatusCode, String);

pub fn fridge_routes() -> Router<AppState> {
    Router::new()
        .route("/fridge", get(show))
        .route("/fridge/items", post(add_item))
        .route("/fridge/items/:index", delete(remove_item))
        .route("/fridge/products", post(add_product))
        .route("/fridge/selection/toggle", post(toggle))
        .route("/fridge/selection/all", post(select_all))
        .route("/fridge/selection", delete(clear_selection))
        .route("/fridge/generate", post(generate))
}

fn to_status(e: FridgeError) -> ApiError {
    let status = match &e {
        FridgeError::EmptyName => StatusCode::BAD_REQUEST,
        FridgeError::Duplicate(_) | FridgeError::NotEnoughSelected(_) => StatusCode::CONFLICT,
        FridgeError::NotFound(_) => StatusCode::NOT_FOUND,
        FridgeError::Storage(err) => {
            error!(error = %format!("{err:#}"), "fridge storage");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> Json<FridgeView> {
    Json(state.fridge.snapshot().await.into())
}

#[instrument(skip(state))]
pub async fn add_item(
    State(state): State<AppState>,
    Json(body): Json<AddItemBody>,
) -> Result<(StatusCode, Json<FridgeView>), ApiError> {
    let fridge = state.fridge.add_manual(&body.name).await.map_err(to_status)?;
    Ok((StatusCode::CREATED, Json(fridge.into())))
}

#[instrument(skip(state, product), fields(code = %product.code))]
pub async fn add_product(
    State(state): State<AppState>,
    Json(product): Json<Product>,
) -> Result<(StatusCode, Json<FridgeView>), ApiError> {
    let fridge = state.fridge.add_product(&product).await.map_err(to_status)?;
    Ok((StatusCode::CREATED, Json(fridge.into())))
}

#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<FridgeView>, ApiError> {
    let fridge = state.fridge.remove(index).await.map_err(to_status)?;
    Ok(Json(fridge.into()))
}

#[instrument(skip(state))]
pub async fn toggle(
    State(state): State<AppState>,
    Json(body): Json<ToggleBody>,
) -> Result<Json<FridgeView>, ApiError> {
    let fridge = state.fridge.toggle(&body.name).await.map_err(to_status)?;
    Ok(Json(fridge.into()))
}

#[instrument(skip(state))]
pub async fn select_all(State(state): State<AppState>) -> Json<FridgeView> {
    Json(state.fridge.select_all().await.into())
}

#[instrument(skip(state))]
pub async fn clear_selection(State(state): State<AppState>) -> Json<FridgeView> {
    Json(state.fridge.clear_selection().await.into())
}

#[instrument(skip(state))]
pub async fn generate(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<GenerationResponse>), ApiError> {
    let request = state.fridge.meal_request().await.map_err(to_status)?;
    let outcome = generate_meal(
        state.generator.as_ref(),
        &state.ledger,
        &request,
        GenerationTrigger::Fridge,
    )
    .await;
    Ok(respond(outcome))
}
