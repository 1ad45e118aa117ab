use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Search capability
    pub search_api_url: String,
    pub search_api_key: String,

    // Scrape capability
    pub scrape_api_url: String,
    pub scrape_api_key: String,

    // Report synthesis
    pub anthropic_api_key: String,

    // Email delivery (optional — jobs without email delivery work without SMTP)
    pub smtp_host: Option<String>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Background trigger loop
    pub trigger_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            search_api_url: env::var("SEARCH_API_URL")
                .unwrap_or_else(|_| "https://api.tavily.com/search".to_string()),
            search_api_key: required_env("SEARCH_API_KEY"),
            scrape_api_url: env::var("SCRAPE_API_URL")
                .unwrap_or_else(|_| "https://api.firecrawl.dev/v1/scrape".to_string()),
            scrape_api_key: required_env("SCRAPE_API_KEY"),
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            smtp_host: env::var("SMTP_HOST").ok(),
            smtp_username: env::var("SMTP_USERNAME").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            smtp_from: env::var("SMTP_FROM").ok(),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
            trigger_interval_secs: env::var("TRIGGER_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .expect("TRIGGER_INTERVAL_SECS must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
