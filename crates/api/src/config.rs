use std::path::PathBuf;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `120`). Uploads of long
    /// rides can take a while to transfer.
    pub request_timeout_secs: u64,
    /// Root directory for uploaded videos (default: `./data`).
    pub storage_dir: PathBuf,
    /// Public URL under which `storage_dir` is served
    /// (default: `http://localhost:3000/files`).
    pub public_base_url: String,
    /// PostgreSQL connection string. When unset the in-memory store is used.
    pub database_url: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                       |
    /// |------------------------|-------------------------------|
    /// | `HOST`                 | `0.0.0.0`                     |
    /// | `PORT`                 | `3000`                        |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`       |
    /// | `REQUEST_TIMEOUT_SECS` | `120`                         |
    /// | `STORAGE_DIR`          | `./data`                      |
    /// | `PUBLIC_BASE_URL`      | `http://localhost:3000/files` |
    /// | `DATABASE_URL`         | unset                         |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let storage_dir =
            PathBuf::from(std::env::var("STORAGE_DIR").unwrap_or_else(|_| "./data".into()));

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000/files".into());

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            storage_dir,
            public_base_url,
            database_url,
        }
    }
}
