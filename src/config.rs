//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `BASE_URL` (optional): public base URL, used for callback URLs and as the fallback redirect
/// - `CALLBACK_PREFIX` (optional): first path segment of the processor callback route
/// - `CHECKOUT_URL` (optional): where cancelled payments are sent to restart checkout
/// - `PROCESSOR_URL` (optional): base URL of the payment processor; mock processor when unset
/// - `PROCESSOR_API_KEY` (optional): bearer token sent to the processor
/// - `PROCESSOR_TIMEOUT_SECS` (optional): per-request processor timeout, defaults to 30
/// - `MOCK_PROCESSOR_BEHAVIOR` (optional): `success`, `decline` or `fault`
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_callback_prefix")]
    pub callback_prefix: String,

    #[serde(default = "default_checkout_url")]
    pub checkout_url: String,

    #[serde(default)]
    pub processor_url: Option<String>,

    #[serde(default)]
    pub processor_api_key: Option<String>,

    #[serde(default = "default_processor_timeout")]
    pub processor_timeout_secs: u64,

    #[serde(default = "default_mock_behavior")]
    pub mock_processor_behavior: String,
}

fn default_port() -> u16 {
    3000
}

fn default_base_url() -> String {
    "http://localhost:3000/".to_string()
}

fn default_callback_prefix() -> String {
    "paymentendpoint".to_string()
}

fn default_checkout_url() -> String {
    "/checkout".to_string()
}

fn default_processor_timeout() -> u64 {
    30
}

fn default_mock_behavior() -> String {
    "success".to_string()
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is loaded first if present.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a value cannot be parsed.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }

    /// Configuration for tests and local runs that never touch PostgreSQL.
    pub fn for_testing() -> Self {
        Self {
            database_url: String::new(),
            server_port: default_port(),
            base_url: default_base_url(),
            callback_prefix: default_callback_prefix(),
            checkout_url: default_checkout_url(),
            processor_url: None,
            processor_api_key: None,
            processor_timeout_secs: default_processor_timeout(),
            mock_processor_behavior: default_mock_behavior(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_fields() {
        let vars = vec![(
            "DATABASE_URL".to_string(),
            "postgres://localhost/payments".to_string(),
        )];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.callback_prefix, "paymentendpoint");
        assert_eq!(config.checkout_url, "/checkout");
        assert_eq!(config.processor_timeout_secs, 30);
        assert!(config.processor_url.is_none());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let vars: Vec<(String, String)> = vec![("SERVER_PORT".to_string(), "8080".to_string())];
        assert!(envy::from_iter::<_, Config>(vars).is_err());
    }
}
