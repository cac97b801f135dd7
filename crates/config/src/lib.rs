use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// `AppConfig` holds all configuration parameters required by the delivery
/// backend.
///
/// The configuration is loaded from environment variables (optionally via a
/// `.env` file) or uses default values if the variable is not set. Fields
/// cover the database, the HTTP gateway, pagination defaults, JWT settings
/// and the request admission gate. This struct is deserializable via Serde.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    // --- Database settings ---
    /// Database hostname or service name (e.g. "postgres" in Docker Compose,
    /// "localhost" for local runs).
    pub db_host: String,
    /// Database port (default: 5432).
    pub db_port: u16,
    /// Database user.
    pub db_user: String,
    /// Database password.
    pub db_password: String,
    /// Database name.
    pub db_name: String,
    /// Maximum size of the Postgres connection pool.
    pub db_max_connections: usize,

    // --- HTTP gateway ---
    /// The port on which the HTTP gateway will listen.
    pub http_port: u16,
    /// Capacity of the request admission gate; requests beyond this cap
    /// wait until an in-flight slot frees.
    pub max_inflight_requests: usize,

    // --- Pagination defaults ---
    /// Page used when the `page` query parameter is absent.
    pub default_page: i64,
    /// Limit used when the `limit` query parameter is absent.
    pub default_limit: i64,

    // --- Auth ---
    /// HMAC secret for signing JWTs.
    pub jwt_secret: String,
    /// Lifetime of issued tokens (human-friendly format, e.g. "24h").
    #[serde(deserialize_with = "deserialize_duration")]
    pub jwt_expiry: Duration,

    // --- Shutdown timeout ---
    /// Graceful shutdown timeout (human-friendly format, e.g. "5s", "1m").
    #[serde(deserialize_with = "deserialize_duration")]
    pub shutdown_timeout: Duration,
}

/// Custom deserializer for duration fields.
/// Accepts human-readable formats like "5s", "1m", "24h".
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let val = String::deserialize(deserializer)?;
    humantime::parse_duration(&val)
        .map_err(|e| D::Error::custom(format!("Invalid duration '{val}': {e}")))
}

impl AppConfig {
    /// Loads configuration from environment variables (and optionally from
    /// a `.env` file).
    ///
    /// Fields not set via env will be filled with default values.
    ///
    /// # Errors
    /// Returns an error if environment variables are invalid or missing
    /// required values.
    pub fn load() -> Result<Self> {
        // Load from .env file (for Docker environment)
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            // Database
            .set_default("db_host", "localhost")?
            .set_default("db_port", 5432)?
            .set_default("db_user", "delivery_user")?
            .set_default("db_password", "securepassword")?
            .set_default("db_name", "delivery_db")?
            .set_default("db_max_connections", 16)?
            // HTTP
            .set_default("http_port", 8081)?
            .set_default("max_inflight_requests", 500)?
            // Pagination
            .set_default("default_page", 1)?
            .set_default("default_limit", 10)?
            // Auth
            .set_default("jwt_secret", "change-me")?
            .set_default("jwt_expiry", "24h")?
            // Shutdown
            .set_default("shutdown_timeout", "5s")?
            .add_source(config::Environment::default().separator("_"))
            .build()?;

        settings
            .try_deserialize()
            .context("Failed to load configuration")
    }
}
