pub mod dto;
pub mod errors;
pub mod handlers;
pub mod prompt;
pub mod services;
pub mod types;
pub mod validate;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::meal_routes()
}
