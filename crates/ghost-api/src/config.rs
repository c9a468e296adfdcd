//! API configuration.

/// Default request body limit. Every route takes a small JSON object.
const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024;

/// Which storage implementation backs the ledger and the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

impl StoreBackend {
    /// Resolve from `STORE_BACKEND`, defaulting to Firestore only when a
    /// project id is configured.
    pub fn from_env() -> Self {
        match std::env::var("STORE_BACKEND").map(|s| s.trim().to_lowercase()) {
            Ok(s) if s == "firestore" => Self::Firestore,
            Ok(s) if s == "memory" => Self::Memory,
            _ => {
                let has_project = std::env::var("GCP_PROJECT_ID")
                    .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
                    .map(|s| !s.trim().is_empty())
                    .unwrap_or(false);
                if has_project {
                    Self::Firestore
                } else {
                    Self::Memory
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Firestore => "firestore",
            Self::Memory => "memory",
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    pub store_backend: StoreBackend,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            environment: "development".to_string(),
            store_backend: StoreBackend::Memory,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .or_else(|_| std::env::var("PORT"))
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_BODY_SIZE),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            store_backend: StoreBackend::from_env(),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    fn clear_env() {
        for key in [
            "API_HOST",
            "API_PORT",
            "PORT",
            "MAX_BODY_SIZE",
            "ENVIRONMENT",
            "STORE_BACKEND",
            "GCP_PROJECT_ID",
            "FIREBASE_PROJECT_ID",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_from_empty_env() {
        clear_env();
        let config = ApiConfig::from_env();
        assert_eq!(config.port, 5000);
        assert_eq!(config.max_body_size, 10 * 1024);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(!config.is_production());
    }

    #[test]
    #[serial]
    fn test_project_id_selects_firestore() {
        clear_env();
        std::env::set_var("GCP_PROJECT_ID", "ghost-prod");
        assert_eq!(StoreBackend::from_env(), StoreBackend::Firestore);

        std::env::set_var("STORE_BACKEND", "memory");
        assert_eq!(StoreBackend::from_env(), StoreBackend::Memory);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_port_falls_back() {
        clear_env();
        std::env::set_var("API_PORT", "not-a-port");
        std::env::set_var("ENVIRONMENT", "Production");
        let config = ApiConfig::from_env();
        assert_eq!(config.port, 5000);
        assert!(config.is_production());
        clear_env();
    }
}
