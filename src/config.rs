use std::time::Duration;

use log::info;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8081";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Runtime configuration for the client, resolved from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let api_base_url =
            get_env_var("SURVEY_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let timeout_secs = get_env_var("SURVEY_API_TIMEOUT_SECS")
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        info!(
            "Configuration loaded: backend {} (timeout {}s)",
            api_base_url, timeout_secs
        );

        AppConfig {
            api_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

// Helper function to get environment variables using runtime loading
fn get_env_var(key: &str) -> Option<String> {
    // Load .env file if it exists for development
    let _ = dotenvy::dotenv();

    match std::env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}
