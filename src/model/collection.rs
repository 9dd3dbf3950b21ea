use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifiers of the ancestor entities named in a request path, keyed by
/// the collection name that preceded each identifier.
pub type PathIdentifierMap = HashMap<String, Uuid>;

/// One page of a collection listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection<E> {
    /// Number of entities matching the listing before pagination
    pub total_entities: usize,
    pub entities: Vec<E>,
}

impl<E> Collection<E> {
    pub fn new(total_entities: usize, entities: Vec<E>) -> Self {
        Self {
            total_entities,
            entities,
        }
    }
}

/// Outcome of matching a request path against the registered collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedRoute {
    /// `/…/<collection>/<uuid>`
    Singular {
        collection_name: String,
        entity_id: Uuid,
    },
    /// `/…/<collection>`
    Plural {
        collection_name: String,
        parent_identifiers: PathIdentifierMap,
    },
}

impl ResolvedRoute {
    pub fn collection_name(&self) -> &str {
        match self {
            ResolvedRoute::Singular {
                collection_name, ..
            }
            | ResolvedRoute::Plural {
                collection_name, ..
            } => collection_name,
        }
    }

    pub fn is_singular(&self) -> bool {
        matches!(self, ResolvedRoute::Singular { .. })
    }
}
