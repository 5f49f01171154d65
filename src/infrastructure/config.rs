use secrecy::SecretString;
use std::env;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub jwt_secret: SecretString,
    pub jwt_ttl_hours: i64,
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    pub seed_demo: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if cfg!(debug_assertions) => "secret".to_string(),
            _ => return Err("JWT_SECRET environment variable must be set in production".into()),
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://habit_tracker.db?mode=rwc".to_string()),
            port: parse_var("PORT").unwrap_or(8000),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(Vec::new),
            jwt_secret: SecretString::new(jwt_secret),
            jwt_ttl_hours: parse_var("JWT_TTL_HOURS").unwrap_or(24),
            cache_ttl: Duration::from_secs(parse_var("CACHE_TTL_SECS").unwrap_or(300)),
            cache_max_entries: parse_var("CACHE_MAX_ENTRIES").unwrap_or(100),
            seed_demo: env::var("SEED_DEMO")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(false),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
            jwt_secret: SecretString::new("secret".to_string()),
            jwt_ttl_hours: 24,
            cache_ttl: Duration::from_secs(300),
            cache_max_entries: 100,
            seed_demo: false,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
