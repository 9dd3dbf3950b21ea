use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::api::error::{ApiError, Operation};
use crate::logic::route_resolver::CollectionNames;
use crate::model::{Collection, CollectionFilter, Identity, PathIdentifierMap};
use crate::store::traits::EntityCollection;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a collection named '{0}' is already registered")]
    DuplicateCollection(String),

    #[error("'{0}' is not a valid collection name")]
    InvalidName(String),
}

/// Object-safe view of an `EntityCollection` with entities rendered as JSON.
#[async_trait::async_trait]
pub trait DynCollection: Send + Sync {
    fn rest_name(&self) -> &str;

    async fn create(
        &self,
        requestor: &Identity,
        parent_ids: &PathIdentifierMap,
        body: &[u8],
    ) -> Result<String, ApiError>;

    async fn get(&self, id: Uuid) -> Result<Value, ApiError>;

    async fn list(
        &self,
        parent_ids: &PathIdentifierMap,
        filter: &CollectionFilter,
    ) -> Result<Collection<Value>, ApiError>;

    async fn edit(&self, id: Uuid, body: &[u8]) -> Result<(), ApiError>;

    async fn delete(&self, id: Uuid) -> Result<(), ApiError>;
}

#[async_trait::async_trait]
impl<C: EntityCollection> DynCollection for C {
    fn rest_name(&self) -> &str {
        EntityCollection::rest_name(self)
    }

    async fn create(
        &self,
        requestor: &Identity,
        parent_ids: &PathIdentifierMap,
        body: &[u8],
    ) -> Result<String, ApiError> {
        self.create_entity(requestor, parent_ids, body)
            .await
            .map_err(ApiError::operation(Operation::Create))
    }

    async fn get(&self, id: Uuid) -> Result<Value, ApiError> {
        let entity = self
            .get_entity(id)
            .await
            .map_err(ApiError::operation(Operation::Get))?;
        Ok(serde_json::to_value(entity)?)
    }

    async fn list(
        &self,
        parent_ids: &PathIdentifierMap,
        filter: &CollectionFilter,
    ) -> Result<Collection<Value>, ApiError> {
        let collection = self
            .get_collection(parent_ids, filter)
            .await
            .map_err(ApiError::operation(Operation::List))?;
        let entities = collection
            .entities
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Collection::new(collection.total_entities, entities))
    }

    async fn edit(&self, id: Uuid, body: &[u8]) -> Result<(), ApiError> {
        self.edit_entity(id, body)
            .await
            .map_err(ApiError::operation(Operation::Edit))
    }

    async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        self.delete_entity(id)
            .await
            .map_err(ApiError::operation(Operation::Delete))
    }
}

/// Collections reachable through the API, keyed by rest name.
///
/// Filled during startup, then frozen inside an `Arc` by `ApiState`.
#[derive(Default)]
pub struct CollectionRegistry {
    collections: HashMap<String, Arc<dyn DynCollection>>,
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C: EntityCollection>(&mut self, collection: C) -> Result<(), RegistryError> {
        self.register_shared(Arc::new(collection))
    }

    /// Register a collection the caller keeps a handle to
    pub fn register_shared<C: EntityCollection>(
        &mut self,
        collection: Arc<C>,
    ) -> Result<(), RegistryError> {
        let name = EntityCollection::rest_name(collection.as_ref()).to_string();
        validate_name(&name)?;
        if self.collections.contains_key(&name) {
            return Err(RegistryError::DuplicateCollection(name));
        }

        log::info!("registered collection /{}", name);
        self.collections.insert(name, collection);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn DynCollection>> {
        self.collections.get(name)
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

impl CollectionNames for CollectionRegistry {
    fn contains_collection(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }
}

// Request paths are matched undecoded, so names are limited to unreserved
// URI characters. A name that looks like an identifier would make `/<name>`
// ambiguous.
fn validate_name(name: &str) -> Result<(), RegistryError> {
    let unreserved = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~');
    if name.is_empty() || !name.chars().all(unreserved) || Uuid::parse_str(name).is_ok() {
        return Err(RegistryError::InvalidName(name.to_string()));
    }
    Ok(())
}
