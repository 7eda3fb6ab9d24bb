use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{AuthGate, FirebaseVerifier, IdentityProvider};
use crate::config::{AppConfig, SecurityConfig};
use crate::handlers::{protected, public};
use crate::middleware::require_user;
use crate::storage::{CatalogStore, ProfileStore};

/// Shared handles resolved once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthGate>,
    pub profiles: Arc<ProfileStore>,
    pub catalog: Arc<CatalogStore>,
}

impl AppState {
    pub fn new(config: AppConfig, provider: Option<Arc<dyn IdentityProvider>>) -> Self {
        let auth = AuthGate::new(provider, config.auth.allow_test_token);
        let profiles = ProfileStore::new(config.storage.users_dir());
        let catalog = CatalogStore::new(config.storage.lessons_path(), config.storage.challenges_path());

        Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            profiles: Arc::new(profiles),
            catalog: Arc::new(catalog),
        }
    }

    /// Initialize Firebase verification from the auth config and build the state.
    pub fn from_config(config: AppConfig) -> Self {
        let provider = FirebaseVerifier::from_config(&config.auth)
            .map(|verifier| Arc::new(verifier) as Arc<dyn IdentityProvider>);
        Self::new(config, provider)
    }
}

pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/me", get(protected::me_get))
        .route(
            "/progress/:child_id",
            get(protected::progress_get).put(protected::progress_put),
        )
        .route("/lessons", get(protected::lessons_get))
        .route("/challenges", get(protected::challenges_get))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected
        .merge(protected_routes)
        .with_state(state.clone());

    // Global middleware
    if state.config.security.enable_cors {
        router = router.layer(cors_layer(&state.config.security));
    }
    if state.config.server.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
