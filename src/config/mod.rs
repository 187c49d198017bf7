use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub tenancy: TenancyConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Shared server; every tenant schema and the registry live here
    #[serde(skip_serializing)]
    pub url: Option<String>,
    /// Per-tenant pool size
    pub max_connections: u32,
    pub min_connections: u32,
    /// Pool acquire timeout in seconds
    pub connection_timeout: u64,
    /// 0 disables idle eviction
    pub idle_timeout_secs: u64,
    /// 0 disables age-based recycling
    pub max_lifetime_secs: u64,
    /// Shared schema holding the central restaurant registry
    pub registry_schema: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    pub provision_timeout_secs: u64,
    /// How many `-N` suffixes signup tries before giving up on a name
    pub max_slug_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl TenancyConfig {
    pub fn provision_timeout(&self) -> Duration {
        Duration::from_secs(self.provision_timeout_secs)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|url| !url.trim().is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_MIN_CONNECTIONS") {
            self.database.min_connections = v.parse().unwrap_or(self.database.min_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_IDLE_TIMEOUT") {
            self.database.idle_timeout_secs = v.parse().unwrap_or(self.database.idle_timeout_secs);
        }
        if let Ok(v) = env::var("DATABASE_MAX_LIFETIME") {
            self.database.max_lifetime_secs = v.parse().unwrap_or(self.database.max_lifetime_secs);
        }
        if let Ok(v) = env::var("DATABASE_REGISTRY_SCHEMA") {
            if !v.trim().is_empty() {
                self.database.registry_schema = v;
            }
        }

        // Tenancy overrides
        if let Ok(v) = env::var("TENANCY_PROVISION_TIMEOUT_SECS") {
            self.tenancy.provision_timeout_secs = v.parse().unwrap_or(self.tenancy.provision_timeout_secs);
        }
        if let Ok(v) = env::var("TENANCY_MAX_SLUG_ATTEMPTS") {
            self.tenancy.max_slug_attempts = v.parse().unwrap_or(self.tenancy.max_slug_attempts);
        }

        // API overrides
        if let Some(port) = env::var("RESTRO_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse().ok())
        {
            self.api.port = port;
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                min_connections: 0,
                connection_timeout: 30,
                idle_timeout_secs: 600,
                max_lifetime_secs: 1800,
                registry_schema: "public".to_string(),
            },
            tenancy: TenancyConfig {
                provision_timeout_secs: 30,
                max_slug_attempts: 20,
            },
            api: ApiConfig {
                port: 9001,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: "restro-development-secret".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                min_connections: 1,
                connection_timeout: 10,
                idle_timeout_secs: 300,
                max_lifetime_secs: 1800,
                registry_schema: "public".to_string(),
            },
            tenancy: TenancyConfig {
                provision_timeout_secs: 20,
                max_slug_attempts: 20,
            },
            api: ApiConfig {
                port: 9001,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                enable_cors: true,
                cors_origins: vec!["https://staging.restro.example.com".to_string()],
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                min_connections: 1,
                connection_timeout: 5,
                idle_timeout_secs: 300,
                max_lifetime_secs: 3600,
                registry_schema: "public".to_string(),
            },
            tenancy: TenancyConfig {
                provision_timeout_secs: 15,
                max_slug_attempts: 50,
            },
            api: ApiConfig {
                port: 9001,
                enable_request_logging: false,
            },
            security: SecurityConfig {
                // Must come from JWT_SECRET
                jwt_secret: String::new(),
                jwt_expiry_hours: 12,
                enable_cors: true,
                cors_origins: vec!["https://app.restro.example.com".to_string()],
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_defaults_are_usable_locally() {
        let config = AppConfig::development();
        assert!(!config.security.jwt_secret.is_empty());
        assert_eq!(config.database.registry_schema, "public");
        assert!(config.database.min_connections <= config.database.max_connections);
    }

    #[test]
    fn production_requires_explicit_secret() {
        let config = AppConfig::production();
        assert!(config.security.jwt_secret.is_empty());
        assert!(config.tenancy.provision_timeout_secs < AppConfig::development().tenancy.provision_timeout_secs);
    }

    #[test]
    fn provision_timeout_is_seconds() {
        let config = AppConfig::staging();
        assert_eq!(config.tenancy.provision_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut config = AppConfig::development();
        config.database.url = Some("postgres://user:pw@localhost/restro".to_string());
        let rendered = serde_json::to_string(&config).unwrap();
        assert!(!rendered.contains("pw@localhost"));
        assert!(!rendered.contains("restro-development-secret"));
    }
}
