//! Server configuration loaded from environment variables.
//!
//! Built once at startup and passed to the components that need it, so no
//! code reads process-wide state ad hoc. Every setting has a default that
//! works for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Socket address for the HTTP API server.
    /// Env: `HTTP_ADDR` — default `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path for the sled database.
    /// Env: `DATA_DIR` — default `./stitchtrack_data`
    pub data_dir: PathBuf,

    /// Directory where uploaded files are written.
    /// Env: `UPLOAD_DIR` — default `./uploads`
    pub upload_dir: PathBuf,

    /// Base URL prepended to stored file references when building
    /// links (spreadsheet export, upload responses).
    /// Env: `PUBLIC_BASE_URL` — default `http://localhost:8080`
    pub public_base_url: String,

    /// HMAC secret for session tokens.
    /// Env: `JWT_SECRET` — default is a fixed dev-only value.
    pub jwt_secret: String,

    /// Maximum accepted upload/request body size in bytes.
    /// Env: `MAX_UPLOAD_BYTES` — default 25 MiB
    pub max_upload_bytes: usize,

    /// Allowed CORS origins, comma-separated. Empty means any origin.
    /// Env: `ALLOWED_ORIGINS`
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            data_dir: PathBuf::from("./stitchtrack_data"),
            upload_dir: PathBuf::from("./uploads"),
            public_base_url: "http://localhost:8080".to_string(),
            jwt_secret: "stitchtrack-dev-secret".to_string(),
            max_upload_bytes: 25 * 1024 * 1024, // 25 MiB
            allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DATA_DIR") {
            config.data_dir = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("PUBLIC_BASE_URL") {
            config.public_base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            if !secret.is_empty() {
                config.jwt_secret = secret;
            }
        }

        if let Ok(val) = std::env::var("MAX_UPLOAD_BYTES") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_upload_bytes = n;
            }
        }

        if let Ok(val) = std::env::var("ALLOWED_ORIGINS") {
            config.allowed_origins = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
        assert!(config.allowed_origins.is_empty());
    }
}
