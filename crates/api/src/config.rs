use chrono::Duration;
use krossfire_engine::MatchConfig;

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
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Matchmaking timeout in milliseconds (default: `15000`).
    pub match_timeout_ms: i64,
    /// Extra seconds an expired queue entry survives before cleanup
    /// (default: `60`).
    pub cleanup_grace_secs: i64,
    /// Gemini API key; when absent the synthetic generator is used.
    pub gemini_api_key: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default     |
    /// |------------------------|-------------|
    /// | `HOST`                 | `0.0.0.0`   |
    /// | `PORT`                 | `3000`      |
    /// | `CORS_ORIGINS`         | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS` | `30`        |
    /// | `MATCH_TIMEOUT_MS`     | `15000`     |
    /// | `CLEANUP_GRACE_SECS`   | `60`        |
    /// | `GEMINI_API_KEY`       | unset       |
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
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let match_timeout_ms: i64 = std::env::var("MATCH_TIMEOUT_MS")
            .unwrap_or_else(|_| "15000".into())
            .parse()
            .expect("MATCH_TIMEOUT_MS must be a valid i64");

        let cleanup_grace_secs: i64 = std::env::var("CLEANUP_GRACE_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("CLEANUP_GRACE_SECS must be a valid i64");

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            match_timeout_ms,
            cleanup_grace_secs,
            gemini_api_key,
        }
    }

    /// Matchmaking engine configuration derived from the server config.
    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            timeout: Duration::milliseconds(self.match_timeout_ms),
            cleanup_grace: Duration::seconds(self.cleanup_grace_secs),
            ..MatchConfig::default()
        }
    }
}
