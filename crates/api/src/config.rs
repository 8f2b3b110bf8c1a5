//! Server configuration, read once at startup.

use crate::auth::jwt::JwtConfig;

/// Everything the HTTP server needs that is not database state.
///
/// Missing variables fall back to local-development defaults; malformed
/// values abort startup rather than limp along misconfigured.
///
/// | Variable               | Default                 |
/// |------------------------|-------------------------|
/// | `HOST`                 | `0.0.0.0`               |
/// | `PORT`                 | `3000`                  |
/// | `CORS_ORIGINS`         | `http://localhost:5173` |
/// | `REQUEST_TIMEOUT_SECS` | `30`                    |
///
/// JWT variables are documented on [`JwtConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Comma-separated list in `CORS_ORIGINS`, split and trimmed.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        ServerConfig {
            host: env_or("HOST", "0.0.0.0"),
            port: parse_env("PORT", 3000),
            cors_origins: env_or("CORS_ORIGINS", "http://localhost:5173")
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS", 30),
            jwt: JwtConfig::from_env(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .unwrap_or_else(|_| panic!("{key} is set but not a valid value")),
        Err(_) => default,
    }
}
