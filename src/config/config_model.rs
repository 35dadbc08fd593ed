use url::Url;

use super::stage::Stage;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub stage: Stage,
    pub server: Server,
    pub database: Database,
    pub stripe: Stripe,
    pub session: Session,
    pub checkout: Checkout,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Stripe {
    pub secret_key: String,
    pub webhook_secret: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub jwt_secret: String,
    pub ttl_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct Checkout {
    pub public_base_url: Url,
    pub currency: String,
}
