use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub service_account_path: PathBuf,
    pub project_id: Option<String>,
    pub jwks_url: String,
    pub key_cache_secs: u64,
    /// Minimum spacing between signing-key fetches triggered by unknown key ids.
    pub key_refetch_secs: u64,
    /// Accept the literal `test-token` bearer credential without verification.
    pub allow_test_token: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl StorageConfig {
    pub fn users_dir(&self) -> PathBuf {
        self.data_dir.join("users")
    }

    pub fn lessons_path(&self) -> PathBuf {
        self.data_dir.join("lessons.json")
    }

    pub fn challenges_path(&self) -> PathBuf {
        self.data_dir.join("challenges.json")
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        // Set defaults based on environment, then override with specific env vars
        Self::for_app_env(env::var("APP_ENV").ok().as_deref()).with_env_overrides()
    }

    /// Preset for an `APP_ENV` value. An unset `APP_ENV` gets the development
    /// preset without the test-token bypass; only an explicit development
    /// environment (or `AUTH_ALLOW_TEST_TOKEN`) turns it on.
    pub fn for_app_env(app_env: Option<&str>) -> Self {
        match app_env {
            Some("production") | Some("prod") => Self::production(),
            Some("staging") | Some("stage") => Self::staging(),
            Some("development") | Some("dev") => Self::development(),
            _ => {
                let mut config = Self::development();
                config.auth.allow_test_token = false;
                config
            }
        }
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("SERVER_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(port) = env::var("CODECADET_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.server.enable_request_logging = v.parse().unwrap_or(self.server.enable_request_logging);
        }

        // Storage overrides
        if let Ok(v) = env::var("CODECADET_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(v);
        }

        // Auth overrides
        if let Ok(v) = env::var("FIREBASE_SERVICE_ACCOUNT") {
            self.auth.service_account_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("FIREBASE_PROJECT_ID") {
            let v = v.trim().to_string();
            self.auth.project_id = if v.is_empty() { None } else { Some(v) };
        }
        if let Ok(v) = env::var("FIREBASE_JWKS_URL") {
            self.auth.jwks_url = v;
        }
        if let Ok(v) = env::var("AUTH_KEY_CACHE_SECS") {
            self.auth.key_cache_secs = v.parse().unwrap_or(self.auth.key_cache_secs);
        }
        if let Ok(v) = env::var("AUTH_KEY_REFETCH_SECS") {
            self.auth.key_refetch_secs = v.parse().unwrap_or(self.auth.key_refetch_secs);
        }
        if let Ok(v) = env::var("AUTH_ALLOW_TEST_TOKEN") {
            self.auth.allow_test_token = v.parse().unwrap_or(self.auth.allow_test_token);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        self
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// The test-token bypass is on in a non-development environment.
    pub fn test_token_outside_development(&self) -> bool {
        self.auth.allow_test_token && !self.is_development()
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                bind_addr: "0.0.0.0".to_string(),
                port: 8000,
                enable_request_logging: true,
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("data"),
            },
            auth: AuthConfig {
                service_account_path: PathBuf::from("serviceAccountKey.json"),
                project_id: None,
                jwks_url: DEFAULT_JWKS_URL.to_string(),
                key_cache_secs: 60 * 60,
                key_refetch_secs: 30,
                allow_test_token: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                bind_addr: "0.0.0.0".to_string(),
                port: 8000,
                enable_request_logging: true,
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("data"),
            },
            auth: AuthConfig {
                service_account_path: PathBuf::from("serviceAccountKey.json"),
                project_id: None,
                jwks_url: DEFAULT_JWKS_URL.to_string(),
                key_cache_secs: 60 * 60,
                key_refetch_secs: 30,
                allow_test_token: false,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.codecadet.app".to_string()],
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                bind_addr: "0.0.0.0".to_string(),
                port: 8000,
                enable_request_logging: false,
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("data"),
            },
            auth: AuthConfig {
                service_account_path: PathBuf::from("serviceAccountKey.json"),
                project_id: None,
                jwks_url: DEFAULT_JWKS_URL.to_string(),
                key_cache_secs: 6 * 60 * 60,
                key_refetch_secs: 60,
                allow_test_token: false,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://codecadet.app".to_string()],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.is_development());
        assert!(config.auth.allow_test_token);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.security.cors_origins, vec!["http://localhost:3000"]);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.is_development());
        assert!(!config.auth.allow_test_token);
        assert!(!config.server.enable_request_logging);
    }

    #[test]
    fn test_unset_app_env_disables_test_token() {
        let config = AppConfig::for_app_env(None);
        assert!(config.is_development());
        assert!(!config.auth.allow_test_token);

        let config = AppConfig::for_app_env(Some("something-else"));
        assert!(!config.auth.allow_test_token);

        assert!(AppConfig::for_app_env(Some("development")).auth.allow_test_token);
        assert!(AppConfig::for_app_env(Some("dev")).auth.allow_test_token);
        assert!(!AppConfig::for_app_env(Some("staging")).auth.allow_test_token);
        assert!(!AppConfig::for_app_env(Some("prod")).auth.allow_test_token);
    }

    #[test]
    fn test_bypass_outside_development_is_flagged() {
        assert!(!AppConfig::development().test_token_outside_development());
        assert!(!AppConfig::production().test_token_outside_development());

        let mut config = AppConfig::staging();
        config.auth.allow_test_token = true;
        assert!(config.test_token_outside_development());
    }

    #[test]
    fn test_storage_layout() {
        let storage = StorageConfig {
            data_dir: PathBuf::from("/srv/codecadet"),
        };
        assert_eq!(storage.users_dir(), PathBuf::from("/srv/codecadet/users"));
        assert_eq!(storage.lessons_path(), PathBuf::from("/srv/codecadet/lessons.json"));
        assert_eq!(storage.challenges_path(), PathBuf::from("/srv/codecadet/challenges.json"));
    }
}
