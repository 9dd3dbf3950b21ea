use entity_coll::config::AppConfig;
use entity_coll::seed::{self, DemoCollections};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load()?;
    log::info!(
        "Configuration loaded: server={}:{}",
        config.server.host,
        config.server.port
    );

    let collections = DemoCollections::new();
    if std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        seed::load_seed_data(&collections);
    }

    let app = entity_coll::build_app(&config, &collections)?;
    entity_coll::run_server(app, &config).await
}
