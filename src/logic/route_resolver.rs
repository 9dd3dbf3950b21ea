//! Singular vs plural resolution of collection paths.
//!
//! Clients never disambiguate with a trailing slash, so every path is tested
//! against two shapes: first as a collection (`…/<name>`), then as an entity
//! of a collection (`…/<name>/<id>`).

use std::collections::HashSet;
use thiserror::Error;

use crate::logic::path::{self, PathError};
use crate::model::ResolvedRoute;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("no collection registered for path ({0})")]
    NotFound(String),

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Anything that can say whether a collection name is registered.
pub trait CollectionNames {
    fn contains_collection(&self, name: &str) -> bool;
}

impl CollectionNames for HashSet<String> {
    fn contains_collection(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl CollectionNames for [&str] {
    fn contains_collection(&self, name: &str) -> bool {
        self.iter().any(|candidate| *candidate == name)
    }
}

impl<const N: usize> CollectionNames for [&str; N] {
    fn contains_collection(&self, name: &str) -> bool {
        self.as_slice().contains_collection(name)
    }
}

/// Resolve `request_path` against the registered collection names.
pub fn resolve_route<C>(collections: &C, request_path: &str) -> Result<ResolvedRoute, RouteError>
where
    C: CollectionNames + ?Sized,
{
    let segments = path::split_segments(request_path);

    // First hypothesis: the last segment names a collection.
    if let Some(name) = segments.last() {
        if !name.is_empty() && collections.contains_collection(name) {
            let parsed = path::parse_collection_path(request_path)?;
            return Ok(ResolvedRoute::Plural {
                collection_name: parsed.collection_name,
                parent_identifiers: parsed.parent_identifiers,
            });
        }
    }

    // Second hypothesis: the penultimate segment names a collection and the
    // last one identifies a member of it.
    if segments.len() >= 2 {
        let name = segments[segments.len() - 2];
        if collections.contains_collection(name) {
            let parsed = path::parse_entity_path(request_path)?;
            return Ok(ResolvedRoute::Singular {
                collection_name: parsed.collection_name,
                entity_id: parsed.entity_id,
            });
        }
    }

    Err(RouteError::NotFound(request_path.to_string()))
}
