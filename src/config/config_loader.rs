use anyhow::{Context, Result};
use std::str::FromStr;
use url::Url;

use super::{
    config_model::{Checkout, Database, DotEnvyConfig, Server, Session, Stripe},
    stage::Stage,
};

pub const DEFAULT_JWT_TTL_SECONDS: i64 = 24 * 60 * 60;
pub const DEFAULT_CURRENCY: &str = "usd";

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: parse_var("SERVER_PORT")?,
        body_limit: parse_var("SERVER_BODY_LIMIT")?,
        timeout: parse_var("SERVER_TIMEOUT")?,
    };

    let database = Database {
        url: required_var("DATABASE_URL")?,
    };

    let stripe = Stripe {
        secret_key: required_var("STRIPE_SECRET_KEY")?,
        webhook_secret: required_var("STRIPE_WEBHOOK_SECRET")?,
    };

    let session = Session {
        jwt_secret: required_var("JWT_SECRET")?,
        ttl_seconds: match optional_var("JWT_TTL_SECONDS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("JWT_TTL_SECONDS is invalid: {raw}"))?,
            None => DEFAULT_JWT_TTL_SECONDS,
        },
    };

    let public_base_url = required_var("PUBLIC_BASE_URL")?;
    let checkout = Checkout {
        public_base_url: Url::parse(&public_base_url)
            .with_context(|| format!("PUBLIC_BASE_URL is invalid: {public_base_url}"))?,
        currency: optional_var("CURRENCY")
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
            .to_lowercase(),
    };

    Ok(DotEnvyConfig {
        stage: get_stage(),
        server,
        database,
        stripe,
        session,
        checkout,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or("".to_string());
    Stage::try_from(&stage_str).unwrap_or_default()
}

fn required_var(key: &str) -> Result<String> {
    optional_var(key).with_context(|| format!("{key} is missing"))
}

fn optional_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = required_var(key)?;
    raw.parse::<T>()
        .with_context(|| format!("{key} is invalid: {raw}"))
}
