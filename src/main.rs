use cash_register::{
    config::{AppConfig, products::load_seed_products},
    errors::Result,
    server,
};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let config = AppConfig::from_env()
        .inspect_err(|e| error!("Invalid configuration: {}", e))?;
    info!(store = %config.store_path.display(), "Configuration loaded.");

    // 4. Products used when the store holds no valid catalog
    let seeds = load_seed_products(&config.products_config)
        .inspect_err(|e| error!("Failed to load seed products: {}", e))?;
    info!("{} seed products available.", seeds.len());

    // 5. Serve until Ctrl-C
    server::run_register(&config, &seeds).await
}
