use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{Collection, CollectionFilter, Identity, PathIdentifierMap};

/// Failure reported by an entity collection.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("entity {0} not found")]
    NotFound(Uuid),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// The caller asked for something the collection refuses to do.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl CollectionError {
    /// Whether the failure is attributable to the request rather than the backend
    pub fn is_client_error(&self) -> bool {
        !matches!(self, CollectionError::Backend(_))
    }
}

impl From<serde_json::Error> for CollectionError {
    fn from(err: serde_json::Error) -> Self {
        CollectionError::InvalidBody(err.to_string())
    }
}

/// A REST-addressable collection of entities of one concrete type.
#[async_trait::async_trait]
pub trait EntityCollection: Send + Sync + 'static {
    type Entity: Serialize + Send;

    /// The URL segment naming this collection
    fn rest_name(&self) -> &str;

    /// Create an entity from a JSON body, returning the REST path to it
    async fn create_entity(
        &self,
        requestor: &Identity,
        parent_ids: &PathIdentifierMap,
        body: &[u8],
    ) -> Result<String, CollectionError>;

    async fn get_entity(&self, id: Uuid) -> Result<Self::Entity, CollectionError>;

    /// List the entities under `parent_ids` that satisfy `filter`
    async fn get_collection(
        &self,
        parent_ids: &PathIdentifierMap,
        filter: &CollectionFilter,
    ) -> Result<Collection<Self::Entity>, CollectionError>;

    /// Apply a JSON body to an existing entity
    async fn edit_entity(&self, id: Uuid, body: &[u8]) -> Result<(), CollectionError>;

    async fn delete_entity(&self, id: Uuid) -> Result<(), CollectionError>;
}
