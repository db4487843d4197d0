use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, instrument};

use super::dto::{Product, SearchQuery};
use crate::state::AppState;

pub fn product_routes() -> Router<AppState> {
    Router::new().route("/products/search", get(search))
}

#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Product>>, (StatusCode, String)> {
    state.products.search(&query.q).await.map(Json).map_err(|e| {
        error!(error = %e, "product search");
        (StatusCode::BAD_GATEWAY, e.to_string())
    })
}
