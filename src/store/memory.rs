use itertools::Itertools;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use uuid::Uuid;

use crate::logic::path::build_entity_path;
use crate::model::{
    Collection, CollectionFilter, Identity, PathIdentifierMap, PropertyFilter, SortDirective,
    SortOrder,
};
use crate::store::traits::{CollectionError, EntityCollection};

/// An entity that can live in a `MemoryCollection`.
pub trait Record: Serialize + Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;

    /// Identifiers of the ancestors this record was created under
    fn parent_ids(&self) -> PathIdentifierMap;

    /// Build a new record from a create request body
    fn from_body(
        id: Uuid,
        requestor: &Identity,
        parent_ids: PathIdentifierMap,
        body: &[u8],
    ) -> Result<Self, CollectionError>;

    /// Update this record from an edit request body
    fn apply_edit(&mut self, body: &[u8]) -> Result<(), CollectionError>;
}

/// Entity collection held in process memory, in insertion order.
pub struct MemoryCollection<R: Record> {
    rest_name: String,
    ancestors: Vec<String>,
    records: RwLock<Vec<R>>,
}

impl<R: Record> MemoryCollection<R> {
    pub fn new(rest_name: impl Into<String>) -> Self {
        Self {
            rest_name: rest_name.into(),
            ancestors: Vec::new(),
            records: RwLock::new(Vec::new()),
        }
    }

    /// Declare the ancestor collections, outermost first, that every entity
    /// must be created under
    pub fn with_ancestors<I, S>(mut self, ancestors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ancestors = ancestors.into_iter().map(Into::into).collect();
        self
    }

    pub fn insert(&self, record: R) {
        self.records.write().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Path of an entity created under `parent_ids`
    fn entity_path(&self, parent_ids: &PathIdentifierMap, id: Uuid) -> String {
        let parents: Vec<(&str, Uuid)> = self
            .ancestors
            .iter()
            .filter_map(|name| parent_ids.get(name).map(|id| (name.as_str(), *id)))
            .collect();
        build_entity_path(&parents, &self.rest_name, id)
    }
}

#[async_trait::async_trait]
impl<R: Record> EntityCollection for MemoryCollection<R> {
    type Entity = R;

    fn rest_name(&self) -> &str {
        &self.rest_name
    }

    async fn create_entity(
        &self,
        requestor: &Identity,
        parent_ids: &PathIdentifierMap,
        body: &[u8],
    ) -> Result<String, CollectionError> {
        let mut own_parents = PathIdentifierMap::with_capacity(self.ancestors.len());
        for ancestor in &self.ancestors {
            let id = parent_ids.get(ancestor).ok_or_else(|| {
                CollectionError::Rejected(format!(
                    "{} must be created under a {} entity",
                    self.rest_name, ancestor
                ))
            })?;
            own_parents.insert(ancestor.clone(), *id);
        }

        let id = Uuid::new_v4();
        let record = R::from_body(id, requestor, own_parents, body)?;
        let path = self.entity_path(&record.parent_ids(), id);
        self.insert(record);

        log::debug!("{} created {} for {}", self.rest_name, id, requestor.user_id);
        Ok(path)
    }

    async fn get_entity(&self, id: Uuid) -> Result<R, CollectionError> {
        self.records
            .read()
            .iter()
            .find(|record| record.id() == id)
            .cloned()
            .ok_or(CollectionError::NotFound(id))
    }

    async fn get_collection(
        &self,
        parent_ids: &PathIdentifierMap,
        filter: &CollectionFilter,
    ) -> Result<Collection<R>, CollectionError> {
        let candidates: Vec<(R, Value)> = {
            let records = self.records.read();
            records
                .iter()
                .filter(|record| belongs_to(&record.parent_ids(), parent_ids))
                .map(|record| {
                    serde_json::to_value(record)
                        .map(|value| (record.clone(), value))
                        .map_err(|e| CollectionError::Backend(e.into()))
                })
                .collect::<Result<_, _>>()?
        };

        let matching: Vec<(R, Value)> = candidates
            .into_iter()
            .filter(|(_, value)| matches_all(value, &filter.property_filters))
            .collect();
        let total = matching.len();

        let (skip, take) = page_window(filter.page, filter.count);
        let entities = matching
            .into_iter()
            .sorted_by(|a, b| compare_by_directives(&a.1, &b.1, &filter.sort))
            .skip(skip)
            .take(take)
            .map(|(record, _)| record)
            .collect();

        Ok(Collection::new(total, entities))
    }

    async fn edit_entity(&self, id: Uuid, body: &[u8]) -> Result<(), CollectionError> {
        let mut records = self.records.write();
        let record = records
            .iter_mut()
            .find(|record| record.id() == id)
            .ok_or(CollectionError::NotFound(id))?;
        record.apply_edit(body)
    }

    async fn delete_entity(&self, id: Uuid) -> Result<(), CollectionError> {
        let mut records = self.records.write();
        let index = records
            .iter()
            .position(|record| record.id() == id)
            .ok_or(CollectionError::NotFound(id))?;
        records.remove(index);
        Ok(())
    }
}

fn belongs_to(record_parents: &PathIdentifierMap, requested: &PathIdentifierMap) -> bool {
    requested
        .iter()
        .all(|(name, id)| record_parents.get(name) == Some(id))
}

/// Look up `a.b` style field names
fn field<'a>(value: &'a Value, field_name: &str) -> Option<&'a Value> {
    if field_name.contains('.') {
        value.pointer(&format!("/{}", field_name.replace('.', "/")))
    } else {
        value.get(field_name)
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Comparable form of a field value: finite numbers rank before all text.
#[derive(Debug, Clone, PartialEq)]
enum FieldKey {
    Number(f64),
    Text(String),
}

impl FieldKey {
    fn parse(text: &str) -> Self {
        match text.parse::<f64>() {
            Ok(number) if number.is_finite() => FieldKey::Number(number),
            _ => FieldKey::Text(text.to_string()),
        }
    }
}

// Total order, so multi-key sorts stay consistent for mixed values.
fn compare_keys(left: &FieldKey, right: &FieldKey) -> Ordering {
    match (left, right) {
        (FieldKey::Number(l), FieldKey::Number(r)) => l.total_cmp(r),
        (FieldKey::Number(_), FieldKey::Text(_)) => Ordering::Less,
        (FieldKey::Text(_), FieldKey::Number(_)) => Ordering::Greater,
        (FieldKey::Text(l), FieldKey::Text(r)) => l.cmp(r),
    }
}

fn field_key(value: &Value, field_name: &str) -> Option<FieldKey> {
    field(value, field_name)
        .and_then(scalar_text)
        .map(|text| FieldKey::parse(&text))
}

fn matches_all(value: &Value, filters: &[PropertyFilter]) -> bool {
    filters.iter().all(|filter| {
        let operand = FieldKey::parse(&filter.value);
        field_key(value, &filter.field_name)
            .map(|key| filter.comparator.accepts(compare_keys(&key, &operand)))
            .unwrap_or(false)
    })
}

fn compare_by_directives(a: &Value, b: &Value, sort: &[SortDirective]) -> Ordering {
    sort.iter()
        .map(|directive| {
            let left = field_key(a, &directive.field_name);
            let right = field_key(b, &directive.field_name);
            let ordering = match (left, right) {
                (Some(l), Some(r)) => compare_keys(&l, &r),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            match directive.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        })
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Pages are 1-based and only apply when a page size is given
fn page_window(page: Option<i64>, count: Option<u64>) -> (usize, usize) {
    let Some(count) = count else {
        return (0, usize::MAX);
    };
    let page = page.unwrap_or(1);
    if page < 1 {
        return (0, 0);
    }
    let count = usize::try_from(count).unwrap_or(usize::MAX);
    let skip = usize::try_from(page - 1)
        .unwrap_or(usize::MAX)
        .saturating_mul(count);
    (skip, count)
}
