mod server;

use std::sync::Arc;

use anyhow::Result;
use pidash_core::{AppError, Config};
use pidash_weather::{DiskCache, ProviderOptions, WeatherProvider};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    pidash_core::init()?;

    if let Err(e) = run().await {
        tracing::error!("{} ({})", e.user_message(), e);
        return Err(e.into());
    }

    Ok(())
}

async fn run() -> Result<(), AppError> {
    let (config, _) = Config::load_validated()?;
    let address = config.server.socket_addr()?;

    let store = Arc::new(DiskCache::new(&config.cache.dir));
    tracing::info!("Caching upstream responses in {}", store.dir().display());
    let provider = WeatherProvider::new(store, ProviderOptions::from(&config.weather))
        .map_err(|e| AppError::Other(e.into()))?;

    tracing::info!(
        "pidash started with {} location(s)",
        config.weather.locations.len()
    );

    let state = server::AppState {
        provider,
        locations: Arc::new(config.weather.locations),
        frontend_dir: config.server.frontend_dir,
    };

    server::run(address, state).await
}
