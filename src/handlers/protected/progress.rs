use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::storage::{ChildProfile, ProfileUpdate};

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub uid: String,
    #[serde(rename = "childId")]
    pub child_id: String,
    pub profile: ChildProfile,
}

/// GET /progress/:child_id - a child's progress, created with defaults on first access
pub async fn progress_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(child_id): Path<String>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let profile = state.profiles.get_child_profile(&user.uid, &child_id).await?;

    Ok(Json(ProgressResponse {
        uid: user.uid,
        child_id,
        profile,
    }))
}

/// PUT /progress/:child_id - merge the supplied fields into a child's progress
pub async fn progress_put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(child_id): Path<String>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let Json(update) = payload?;
    let profile = state
        .profiles
        .update_child_profile(&user.uid, &child_id, update)
        .await?;

    Ok(Json(ProgressResponse {
        uid: user.uid,
        child_id,
        profile,
    }))
}
