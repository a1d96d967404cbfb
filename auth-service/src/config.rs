use anyhow::{anyhow, Context, Result};
use common_auth::JwtConfig;
use std::env;
use std::net::IpAddr;

const DEFAULT_PORT: u16 = 8085;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub jwt: JwtConfig,
}

pub fn load_service_config() -> Result<ServiceConfig> {
    let host = env::var("HOST")
        .ok()
        .and_then(|value| normalize_optional(&value))
        .unwrap_or_else(|| "0.0.0.0".to_string())
        .parse::<IpAddr>()
        .context("Failed to parse HOST")?;

    let port = match env::var("PORT").ok().and_then(|value| normalize_optional(&value)) {
        Some(value) => value
            .parse::<u16>()
            .map_err(|err| anyhow!("Invalid PORT '{value}': {err}"))?,
        None => DEFAULT_PORT,
    };

    let database_url = env::var("DATABASE_URL")
        .ok()
        .and_then(|value| normalize_optional(&value))
        .ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;

    let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .map(|value| parse_origins(&value))
        .unwrap_or_else(default_origins);

    let jwt = JwtConfig::from_env().context("Failed to load JWT configuration")?;

    Ok(ServiceConfig {
        host,
        port,
        database_url,
        cors_allowed_origins,
        jwt,
    })
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ';' || c == ' ')
        .filter_map(normalize_optional)
        .collect()
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
