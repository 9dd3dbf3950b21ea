//! Lenient parsing of collection listing query strings.
//!
//! `?page=2&count=10&sort=asc.name,desc.age&status=eq.active`
//!
//! Malformed values never fail a request: each one is logged as a warning and
//! the affected filter component is left out.

use crate::model::{CollectionFilter, Comparator, PropertyFilter, SortDirective, SortOrder};

const PAGE_KEY: &str = "page";
const COUNT_KEY: &str = "count";
const SORT_KEY: &str = "sort";

const SORT_PREFIXES: &[(&str, SortOrder)] = &[("asc.", SortOrder::Asc), ("desc.", SortOrder::Desc)];

// Most specific first: a prefix must precede any shorter prefix it could be
// confused with.
const COMPARATOR_PREFIXES: &[(&str, Comparator)] = &[
    ("lteq.", Comparator::LtEq),
    ("gteq.", Comparator::GtEq),
    ("lt.", Comparator::Lt),
    ("eq.", Comparator::Eq),
    ("gt.", Comparator::Gt),
];

/// Multi-valued query parameters, keys kept in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: Vec<(String, Vec<String>)>,
}

impl QueryParams {
    /// Decode a raw (still percent-encoded) query string.
    pub fn parse(query: &str) -> Self {
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }
}

impl FromIterator<(String, String)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut params = QueryParams::default();
        for (key, value) in iter {
            match params.entries.iter_mut().find(|(k, _)| *k == key) {
                Some((_, values)) => values.push(value),
                None => params.entries.push((key, vec![value])),
            }
        }
        params
    }
}

/// Parse a raw query string into a `CollectionFilter`.
pub fn parse_query_string(query: Option<&str>) -> CollectionFilter {
    match query {
        Some(query) => parse_collection_filter(QueryParams::parse(query)),
        None => CollectionFilter::default(),
    }
}

pub fn parse_collection_filter(mut params: QueryParams) -> CollectionFilter {
    let mut filter = CollectionFilter::default();

    if let Some(raw) = params.first(PAGE_KEY) {
        match raw.parse::<i64>() {
            Ok(page) => filter.page = Some(page),
            Err(e) => log::warn!("failed to parse 'page' query parameter ({}): {}", raw, e),
        }
    }
    params.remove(PAGE_KEY);

    if let Some(raw) = params.first(COUNT_KEY) {
        match raw.parse::<u64>() {
            Ok(count) => filter.count = Some(count),
            Err(e) => log::warn!("failed to parse 'count' query parameter ({}): {}", raw, e),
        }
    }
    params.remove(COUNT_KEY);

    if let Some(raw) = params.first(SORT_KEY) {
        filter.sort = parse_sort(raw);
    }
    params.remove(SORT_KEY);

    filter.property_filters = parse_property_filters(&params);
    filter
}

/// Parse `asc.name,desc.age`; unrecognised elements are skipped.
pub fn parse_sort(raw: &str) -> Vec<SortDirective> {
    raw.split(',')
        .filter_map(|element| {
            let parsed = strip_known_prefix(element, SORT_PREFIXES)
                .map(|(order, field)| SortDirective::new(order, field));
            if parsed.is_none() {
                log::warn!("failed to parse 'sort' query parameter element ({})", element);
            }
            parsed
        })
        .collect()
}

fn parse_property_filters(params: &QueryParams) -> Vec<PropertyFilter> {
    let mut filters = Vec::new();
    for (field, values) in params.iter() {
        for value in values {
            match parse_comparison(value) {
                Some((comparator, operand)) => {
                    filters.push(PropertyFilter::new(comparator, field, operand))
                }
                None => log::warn!(
                    "failed to parse filter query parameter '{}' ({})",
                    field,
                    value
                ),
            }
        }
    }
    filters
}

/// Split `gteq.5` into its comparator and operand.
pub fn parse_comparison(raw: &str) -> Option<(Comparator, &str)> {
    strip_known_prefix(raw, COMPARATOR_PREFIXES)
}

fn strip_known_prefix<'a, T: Copy>(raw: &'a str, table: &[(&str, T)]) -> Option<(T, &'a str)> {
    table
        .iter()
        .find_map(|(prefix, tag)| raw.strip_prefix(prefix).map(|rest| (*tag, rest)))
}
