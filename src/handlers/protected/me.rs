use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::AuthUser;

/// GET /me - confirm the token and summarize the caller's stored record
pub async fn me_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Value>, ApiError> {
    let record = state.profiles.load_user(&user.uid).await?;
    let children: Vec<&String> = record.children.keys().collect();

    Ok(Json(json!({ "uid": user.uid, "children": children })))
}
