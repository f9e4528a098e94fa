use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub mongo_uri: String,
    pub mongo_db: String,
    pub session_ttl_minutes: i64,
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("PORT", "3000"),
            mongo_uri: try_load("MONGO_URI", "mongodb://localhost:27017"),
            mongo_db: try_load("MONGO_DB", "qa-portal"),
            session_ttl_minutes: try_load("SESSION_TTL_MINUTES", "60"),
            cors_origin: load_optional("CORS_ORIGIN"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

fn load_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
