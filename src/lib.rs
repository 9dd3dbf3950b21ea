pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::routes;
pub use api::{
    ApiError, ApiState, AuthError, Authenticator, CollectionRegistry, RegistryError,
    StaticAuthenticator,
};

// Export logic types
pub use logic::{
    parse_collection_filter, parse_collection_path, parse_entity_path, parse_query_string,
    resolve_route, PathError, RouteError,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{CollectionError, EntityCollection, MemoryCollection, Record};

use std::sync::Arc;

/// Build the demo application: the seed collections behind the configured authenticator
pub fn build_app(
    config: &config::AppConfig,
    collections: &seed::DemoCollections,
) -> anyhow::Result<axum::Router> {
    let mut registry = CollectionRegistry::new();
    collections.register(&mut registry)?;

    let authenticator = StaticAuthenticator::new(config.auth.user_table());
    if authenticator.is_empty() {
        log::warn!("No users configured under [[auth.users]]; every request will be rejected");
    }

    let state = ApiState::new(registry, Arc::new(authenticator), config.auth.realm.clone())
        .with_max_body_bytes(config.server.max_body_bytes);

    Ok(routes::create_router(&config.cors).with_state(state))
}

/// Serve `app` until the listener fails
pub async fn run_server(app: axum::Router, config: &config::AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    log::info!("entity-coll server running on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
