use std::sync::Arc;

use log::{error, info};

use cargo_insurance::http::{self, AppState};
use cargo_insurance::{AppConfig, PgTariffStore, Result};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    if let Err(err) = run().await {
        error!("{}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = AppConfig::from_env();

    let store = PgTariffStore::connect(&config.database_url()).await?;
    store.init_schema().await?;
    info!(
        "connected to {}:{}/{}",
        config.postgres_host, config.postgres_port, config.postgres_db
    );

    let state = AppState {
        store: Arc::new(store),
        rates_file: config.rates_file.clone(),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("listening on {}", config.bind_addr);
    axum::serve(listener, http::router(state)).await?;
    Ok(())
}
