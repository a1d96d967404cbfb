use anyhow::{anyhow, Context, Result};
use common_auth::JwtConfig;
use std::env;
use std::net::IpAddr;

const DEFAULT_PORT: u16 = 8081;

#[derive(Debug, Clone)]
pub struct ItemServiceConfig {
    pub host: IpAddr,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub jwt: JwtConfig,
}

pub fn load_item_config() -> Result<ItemServiceConfig> {
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

    let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .map(|value| {
            value
                .split(',')
                .filter_map(normalize_optional)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    // Verifying services share the issuer's secret; TTLs are read but unused here.
    let jwt = JwtConfig::from_env().context("Failed to load JWT configuration")?;

    Ok(ItemServiceConfig {
        host,
        port,
        cors_allowed_origins,
        jwt,
    })
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
