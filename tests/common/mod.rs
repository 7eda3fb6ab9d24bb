#![allow(dead_code)]

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use codecadet_api::auth::{IdentityProvider, VerifyError};
use codecadet_api::config::AppConfig;
use codecadet_api::{app, AppState};

pub const TEST_TOKEN: &str = "test-token";

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub data_dir: tempfile::TempDir,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let data_dir = tempfile::tempdir().context("failed to create data dir")?;
        seed_catalogs(data_dir.path())?;

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_codecadet-api"));
        cmd.env("APP_ENV", "development")
            .env("CODECADET_PORT", port.to_string())
            .env("SERVER_BIND_ADDR", "127.0.0.1")
            .env("CODECADET_DATA_DIR", data_dir.path())
            .env("AUTH_ALLOW_TEST_TOKEN", "true")
            .env("FIREBASE_PROJECT_ID", "")
            .env("FIREBASE_SERVICE_ACCOUNT", data_dir.path().join("missing-key.json"))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, data_dir, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

/// Lessons get a catalog; challenges.json is deliberately left absent.
fn seed_catalogs(dir: &Path) -> Result<()> {
    let lessons = json!([
        {"lesson_id": 1, "title": "Meet the robot"},
        {"lesson_id": 2, "title": "Loops"}
    ]);
    std::fs::write(dir.join("lessons.json"), lessons.to_string())?;
    Ok(())
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Identity provider that accepts exactly one token.
pub struct StubProvider;

pub const STUB_TOKEN: &str = "stub-valid-token";
pub const STUB_UID: &str = "firebase-user-42";

#[async_trait]
impl IdentityProvider for StubProvider {
    async fn verify_id_token(&self, token: &str) -> Result<String, VerifyError> {
        if token == STUB_TOKEN {
            Ok(STUB_UID.to_string())
        } else {
            Err(VerifyError::Malformed("InvalidToken".to_string()))
        }
    }
}

/// Build the router in-process over `data_dir`.
pub fn in_process_app(data_dir: &Path, provider: Option<Arc<dyn IdentityProvider>>, allow_test_token: bool) -> Router {
    let mut config = AppConfig::development();
    config.storage.data_dir = data_dir.to_path_buf();
    config.auth.allow_test_token = allow_test_token;
    config.server.enable_request_logging = false;
    app(AppState::new(config, provider))
}

/// Send one request through the router and decode the JSON body.
pub async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}
