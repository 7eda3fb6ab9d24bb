use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::error::ApiError;

/// Authenticated caller, injected into request extensions by [`require_user`].
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub uid: String,
}

/// Bearer authentication middleware for the protected routes
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request.headers().get(AUTHORIZATION).cloned();
    let uid = state.auth.authenticate(header.as_ref()).await?;

    tracing::debug!("Authenticated request for user '{}'", uid);
    request.extensions_mut().insert(AuthUser { uid });

    Ok(next.run(request).await)
}
