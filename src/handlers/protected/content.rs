use axum::{extract::State, Json};
use serde_json::{Map, Value};

use crate::app::AppState;
use crate::storage::CatalogKind;

/// GET /lessons - every lesson keyed by id
pub async fn lessons_get(State(state): State<AppState>) -> Json<Map<String, Value>> {
    Json(state.catalog.load(CatalogKind::Lessons).await)
}

/// GET /challenges - every challenge keyed by id
pub async fn challenges_get(State(state): State<AppState>) -> Json<Map<String, Value>> {
    Json(state.catalog.load(CatalogKind::Challenges).await)
}
