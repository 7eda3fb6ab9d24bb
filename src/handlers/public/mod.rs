// handlers/public - endpoints that need no authentication
use axum::response::Json;
use serde_json::{json, Value};

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "CodeCadet API",
        "version": version,
        "description": "Progress and catalog backend for the CodeCadet coding app",
        "endpoints": {
            "health": "/health (public)",
            "me": "/me (protected)",
            "progress": "/progress/:child_id (protected - GET, PUT)",
            "lessons": "/lessons (protected)",
            "challenges": "/challenges (protected)"
        }
    }))
}

/// GET /health - liveness probe
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
