use std::sync::{Arc, Mutex};

use anyhow::Result;
use dotenvy::dotenv;

mod api;
mod config;
mod db;
mod error;
mod schema;
mod validation;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env()?;
    let db = Arc::new(Mutex::new(db::Db::connect(&config.database_url)?));
    log::info!("using database {}", config.database_url);

    api::new_http_server(db, &config).await?;
    Ok(())
}
