use anyhow::{Context, Result};
use std::env;

pub const DEFAULT_PSK: &str = "defaultpsk";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub api_root: String, // url prefix, no trailing slash
    pub auth_psk: String,
    pub bind_address: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let api_root = lookup("API_ROOT")
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string();

        let auth_psk = lookup("AUTH_PSK").unwrap_or_else(|| {
            log::warn!("AUTH_PSK not set, falling back to the built-in default key");
            DEFAULT_PSK.to_string()
        });

        let port = match lookup("PORT") {
            Some(port) => port
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {port}"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            database_url,
            api_root,
            auth_psk,
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            port,
        })
    }
}
