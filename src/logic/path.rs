//! Decomposition of hierarchical REST paths.
//!
//! A collection path alternates collection names and entity identifiers and
//! ends in a collection name:
//!
//! ```text
//! /projects/6f1c…/widgets
//! ```
//!
//! An entity path has the same pairs but ends in the entity's identifier:
//!
//! ```text
//! /projects/6f1c…/widgets/0b9e…
//! ```

use thiserror::Error;
use uuid::Uuid;

use crate::model::PathIdentifierMap;

#[derive(Debug, Error)]
pub enum PathError {
    #[error(
        "collection URL ({0}) has the wrong number of components: expected a collection \
         name and UUID for each parent entity, followed by the target segment"
    )]
    Shape(String),

    #[error("error decoding UUID of path component ({segment}): {source}")]
    Identifier {
        segment: String,
        #[source]
        source: uuid::Error,
    },
}

/// A parsed collection path: parent identifiers plus the trailing collection name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPath {
    pub parent_identifiers: PathIdentifierMap,
    pub collection_name: String,
}

/// A parsed entity path: parent identifiers, the collection and the entity identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPath {
    pub parent_identifiers: PathIdentifierMap,
    pub collection_name: String,
    pub entity_id: Uuid,
}

/// Split a path on `/`, dropping the empty segment before a leading slash.
pub fn split_segments(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    trimmed.split('/').collect()
}

/// Parse `/<name>/<uuid>/…/<name>` into its parent identifiers and trailing name.
pub fn parse_collection_path(path: &str) -> Result<CollectionPath, PathError> {
    let segments = split_segments(path);
    if segments.len() % 2 != 1 {
        return Err(PathError::Shape(path.to_string()));
    }

    let (pairs, last) = segments.split_at(segments.len() - 1);
    Ok(CollectionPath {
        parent_identifiers: parse_pairs(pairs)?,
        collection_name: last[0].to_string(),
    })
}

/// Parse `/<name>/<uuid>/…/<name>/<uuid>`. The final identifier is returned
/// as `entity_id` and is not part of `parent_identifiers`.
pub fn parse_entity_path(path: &str) -> Result<EntityPath, PathError> {
    let segments = split_segments(path);
    if segments.len() % 2 != 0 {
        return Err(PathError::Shape(path.to_string()));
    }

    let (pairs, last) = segments.split_at(segments.len() - 2);
    let collection_name = last[0];
    let entity_id = parse_identifier(collection_name, last[1])?;

    Ok(EntityPath {
        parent_identifiers: parse_pairs(pairs)?,
        collection_name: collection_name.to_string(),
        entity_id,
    })
}

fn parse_pairs(pairs: &[&str]) -> Result<PathIdentifierMap, PathError> {
    let mut identifiers = PathIdentifierMap::with_capacity(pairs.len() / 2);
    for pair in pairs.chunks_exact(2) {
        let id = parse_identifier(pair[0], pair[1])?;
        identifiers.insert(pair[0].to_string(), id);
    }
    Ok(identifiers)
}

fn parse_identifier(segment: &str, raw: &str) -> Result<Uuid, PathError> {
    Uuid::parse_str(raw).map_err(|source| PathError::Identifier {
        segment: segment.to_string(),
        source,
    })
}

/// Build `/<parent>/<uuid>/…/<name>` from ancestors listed outermost first.
pub fn build_collection_path<S: AsRef<str>>(parents: &[(S, Uuid)], name: &str) -> String {
    let mut path = String::new();
    for (parent, id) in parents {
        path.push('/');
        path.push_str(parent.as_ref());
        path.push('/');
        path.push_str(&id.to_string());
    }
    path.push('/');
    path.push_str(name);
    path
}

/// Build `/<parent>/<uuid>/…/<name>/<id>` from ancestors listed outermost first.
pub fn build_entity_path<S: AsRef<str>>(parents: &[(S, Uuid)], name: &str, id: Uuid) -> String {
    format!("{}/{}", build_collection_path(parents, name), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_collection_path() {
        let parsed = parse_collection_path("/widgets").unwrap();
        assert_eq!(parsed.collection_name, "widgets");
        assert!(parsed.parent_identifiers.is_empty());
    }

    #[test]
    fn test_nested_collection_path() {
        let project = Uuid::new_v4();
        let parsed = parse_collection_path(&format!("/projects/{}/widgets", project)).unwrap();
        assert_eq!(parsed.collection_name, "widgets");
        assert_eq!(parsed.parent_identifiers.len(), 1);
        assert_eq!(parsed.parent_identifiers["projects"], project);
    }

    #[test]
    fn test_even_segment_count_is_shape_error() {
        match parse_collection_path("/foo/bar") {
            Err(PathError::Shape(path)) => assert_eq!(path, "/foo/bar"),
            other => panic!("expected shape error, got {:?}", other),
        }

        let id = Uuid::new_v4();
        assert!(parse_collection_path(&format!("/foo/{}/bar", id)).is_ok());
    }

    #[test]
    fn test_invalid_identifier_stops_parsing() {
        let good = Uuid::new_v4();
        let path = format!("/orgs/{}/projects/not-a-uuid/widgets", good);
        match parse_collection_path(&path) {
            Err(PathError::Identifier { segment, .. }) => assert_eq!(segment, "projects"),
            other => panic!("expected identifier error, got {:?}", other),
        }
    }

    #[test]
    fn test_entity_path() {
        let project = Uuid::new_v4();
        let widget = Uuid::new_v4();
        let parsed =
            parse_entity_path(&format!("/projects/{}/widgets/{}", project, widget)).unwrap();

        assert_eq!(parsed.collection_name, "widgets");
        assert_eq!(parsed.entity_id, widget);
        assert_eq!(parsed.parent_identifiers.len(), 1);
        assert!(!parsed.parent_identifiers.values().any(|id| *id == widget));
    }

    #[test]
    fn test_entity_path_rejects_odd_count() {
        assert!(matches!(
            parse_entity_path("/widgets"),
            Err(PathError::Shape(_))
        ));
    }

    #[test]
    fn test_entity_path_bad_terminal_identifier() {
        match parse_entity_path("/widgets/123") {
            Err(PathError::Identifier { segment, .. }) => assert_eq!(segment, "widgets"),
            other => panic!("expected identifier error, got {:?}", other),
        }
    }

    #[test]
    fn test_build_then_parse_round_trip() {
        let parents: Vec<(String, Uuid)> = ["orgs", "projects", "boards"]
            .iter()
            .map(|name| (name.to_string(), Uuid::new_v4()))
            .collect();

        let path = build_collection_path(&parents, "widgets");
        let parsed = parse_collection_path(&path).unwrap();

        assert_eq!(parsed.collection_name, "widgets");
        assert_eq!(parsed.parent_identifiers.len(), parents.len());
        for (name, id) in &parents {
            assert_eq!(parsed.parent_identifiers.get(name), Some(id));
        }
    }

    #[test]
    fn test_build_entity_path() {
        let project = Uuid::new_v4();
        let widget = Uuid::new_v4();
        let path = build_entity_path(&[("projects", project)], "widgets", widget);
        assert_eq!(path, format!("/projects/{}/widgets/{}", project, widget));
        assert_eq!(
            build_entity_path::<&str>(&[], "widgets", widget),
            format!("/widgets/{}", widget)
        );
    }
}
