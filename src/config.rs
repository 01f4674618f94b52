use serde::Deserialize;
use std::env;

/// Page size the identity provider enforces on batched user lookups.
pub const DEFAULT_IDENTITY_PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub host: String,
    pub allowed_origins: Vec<String>,

    // Identity provider
    pub identity_api_url: String,
    pub identity_api_key: Option<String>,
    pub identity_page_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),

            identity_api_url: env::var("IDENTITY_API_URL")
                .unwrap_or_else(|_| "https://api.clerk.com/v1".to_string()),
            identity_api_key: env::var("IDENTITY_API_KEY").ok(),
            identity_page_limit: env::var("IDENTITY_PAGE_LIMIT")
                .ok()
                .and_then(|limit| limit.parse().ok())
                .unwrap_or(DEFAULT_IDENTITY_PAGE_LIMIT),
        })
    }
}
