use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::api::auth::Authenticator;
use crate::api::registry::CollectionRegistry;
use crate::api::{dispatch, handlers};
use crate::config::CorsConfig;

pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Everything a request needs, built once at startup.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<CollectionRegistry>,
    pub authenticator: Arc<dyn Authenticator>,
    pub realm: Arc<str>,
    pub max_body_bytes: usize,
}

impl ApiState {
    pub fn new(
        registry: CollectionRegistry,
        authenticator: Arc<dyn Authenticator>,
        realm: impl Into<String>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            authenticator,
            realm: Arc::from(realm.into()),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

pub fn create_router(cors: &CorsConfig) -> Router<ApiState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Every registered collection, nested at any depth
        .fallback(dispatch::dispatch_request)
        .layer(ServiceBuilder::new().layer(cors_layer(cors)))
}

/// CORS for browser clients; answers every OPTIONS request without authentication.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::PUT, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::LOCATION]);

    if config.allowed_origin == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(&config.allowed_origin) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            log::warn!(
                "Invalid CORS origin ({}), cross-origin requests will be refused",
                config.allowed_origin
            );
            layer
        }
    }
}
