use serde::{Deserialize, Serialize};

/// Structured form of the query parameters accepted by a collection listing.
///
/// Every component is independent: `None` or an empty vector means the
/// listing is unconstrained in that dimension, never "zero".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,

    /// Sort keys, primary key first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortDirective>,

    /// Conjunctive predicates on entity fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub property_filters: Vec<PropertyFilter>,
}

impl CollectionFilter {
    pub fn is_unconstrained(&self) -> bool {
        self.page.is_none()
            && self.count.is_none()
            && self.sort.is_empty()
            && self.property_filters.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDirective {
    pub order: SortOrder,
    pub field_name: String,
}

impl SortDirective {
    pub fn new(order: SortOrder, field_name: impl Into<String>) -> Self {
        Self {
            order,
            field_name: field_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    Lt,
    LtEq,
    Eq,
    Gt,
    GtEq,
}

impl Comparator {
    /// Whether an ordering of `field` relative to `value` satisfies this comparator
    pub fn accepts(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Comparator::Lt => ordering == Less,
            Comparator::LtEq => ordering != Greater,
            Comparator::Eq => ordering == Equal,
            Comparator::Gt => ordering == Greater,
            Comparator::GtEq => ordering != Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub comparator: Comparator,
    pub field_name: String,
    pub value: String,
}

impl PropertyFilter {
    pub fn new(
        comparator: Comparator,
        field_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            comparator,
            field_name: field_name.into(),
            value: value.into(),
        }
    }
}
