//! Derivation of the visible list from the loaded records.
//!
//! A view is always recomputed from `(items, filters, search, sort)`. Nothing is
//! patched incrementally; [`ViewCache`] only skips the recomputation when none of
//! the inputs changed.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::column::{Columns, SortKey};
use crate::record::{Field, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            Direction::Ascending => "▲",
            Direction::Descending => "▼",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortDirective<F> {
    pub field: F,
    pub direction: Direction,
}

impl<F: Field> SortDirective<F> {
    pub fn new(field: F, direction: Direction) -> Self {
        Self { field, direction }
    }

    pub fn ascending(field: F) -> Self {
        Self::new(field, Direction::Ascending)
    }

    pub fn descending(field: F) -> Self {
        Self::new(field, Direction::Descending)
    }
}

/// Per-field substring filters. An empty filter value is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterMap<F: Field> {
    entries: HashMap<F, String>,
}

impl<F: Field> Default for FilterMap<F> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<F: Field> FilterMap<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: F, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.entries.remove(&field);
        } else {
            self.entries.insert(field, value);
        }
    }

    pub fn with(mut self, field: F, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Current filter text, empty when the field is not filtered.
    pub fn get(&self, field: F) -> &str {
        self.entries.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (F, &str)> {
        self.entries.iter().map(|(f, v)| (*f, v.as_str()))
    }
}

/// The three pieces of list state a page owns next to its records.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewQuery<F: Field> {
    pub filters: FilterMap<F>,
    pub search: String,
    pub sort: SortDirective<F>,
}

impl<F: Field> ViewQuery<F> {
    pub fn new(default_sort: F) -> Self {
        Self {
            filters: FilterMap::new(),
            search: String::new(),
            sort: SortDirective::ascending(default_sort),
        }
    }
}

/// Filter and search text of a query, lowercased once per derivation.
struct Needles<F: Field> {
    filters: Vec<(F, String)>,
    search: String,
}

impl<F: Field> Needles<F> {
    fn new(query: &ViewQuery<F>) -> Self {
        Self {
            filters: query
                .filters
                .iter()
                .map(|(field, value)| (field, value.to_lowercase()))
                .collect(),
            search: query.search.to_lowercase(),
        }
    }

    /// Every active filter is a substring of its field.
    fn matches_filters<R: Record<Field = F>>(&self, item: &R) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| item.value(*field).contains_lowercase(value))
    }

    /// Any field contains the search term. An empty term matches everything.
    fn matches_search<R: Record<Field = F>>(&self, item: &R) -> bool {
        self.search.is_empty()
            || F::all()
                .iter()
                .any(|&field| item.value(field).contains_lowercase(&self.search))
    }
}

/// Indices into `items` of the records passing the query, in display order.
pub fn derive_rows<R: Record>(
    items: &[R],
    query: &ViewQuery<R::Field>,
    columns: &Columns<R>,
) -> Vec<usize> {
    let needles = Needles::new(query);
    let mut rows: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| needles.matches_filters(*item))
        .filter(|(_, item)| needles.matches_search(*item))
        .map(|(idx, _)| idx)
        .collect();

    let SortDirective { field, direction } = query.sort;
    match columns.sort_key(field) {
        SortKey::Raw => {
            // Create a vector of (row index, value) pairs so every value is built once
            let mut indexed_rows: Vec<(usize, _)> = rows
                .iter()
                .map(|&idx| (idx, items[idx].value(field)))
                .collect();
            indexed_rows.sort_by(|(_, a), (_, b)| direction.apply(a.raw_cmp(b)));
            rows = indexed_rows.into_iter().map(|(idx, _)| idx).collect();
        }
        SortKey::Custom(compare) => {
            rows.sort_by(|&a, &b| direction.apply(compare(&items[a], &items[b])));
        }
        SortKey::Unsortable => {}
    }

    trace!(
        "Derived {} of {} rows (filters: {}, search: {:?}, sort: {:?})",
        rows.len(),
        items.len(),
        query.filters.len(),
        query.search,
        query.sort
    );
    rows
}

/// The records passing the query, cloned into a new vector in display order.
pub fn derive<R: Record>(items: &[R], query: &ViewQuery<R::Field>, columns: &Columns<R>) -> Vec<R> {
    derive_rows(items, query, columns)
        .into_iter()
        .map(|idx| items[idx].clone())
        .collect()
}

/// Remembers the last derived rows together with the query they came from.
#[derive(Debug)]
pub struct ViewCache<F: Field> {
    key: Option<ViewQuery<F>>,
    rows: Arc<Vec<usize>>,
}

impl<F: Field> Default for ViewCache<F> {
    fn default() -> Self {
        Self {
            key: None,
            rows: Arc::new(Vec::new()),
        }
    }
}

impl<F: Field> ViewCache<F> {
    /// Call [`ViewCache::invalidate`] whenever `items` is replaced.
    pub fn rows<R: Record<Field = F>>(
        &mut self,
        items: &[R],
        query: &ViewQuery<F>,
        columns: &Columns<R>,
    ) -> Arc<Vec<usize>> {
        if self.key.as_ref() != Some(query) {
            self.rows = Arc::new(derive_rows(items, query, columns));
            self.key = Some(query.clone());
        }
        Arc::clone(&self.rows)
    }

    pub fn invalidate(&mut self) {
        self.key = None;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::column::ColumnSpec;
    use crate::record::{FieldKind, Value};

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct Person {
        pub name: &'static str,
        pub age: Option<i64>,
        pub city: Option<(&'static str, &'static str)>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) enum PersonField {
        Name,
        Age,
        City,
    }

    impl Field for PersonField {
        fn all() -> &'static [Self] {
            &[PersonField::Name, PersonField::Age, PersonField::City]
        }

        fn name(self) -> &'static str {
            match self {
                PersonField::Name => "name",
                PersonField::Age => "age",
                PersonField::City => "city",
            }
        }

        fn kind(self) -> FieldKind {
            match self {
                PersonField::City => FieldKind::Nested,
                _ => FieldKind::Primitive,
            }
        }
    }

    impl Record for Person {
        type Field = PersonField;

        fn value(&self, field: PersonField) -> Value {
            match field {
                PersonField::Name => Value::from(self.name),
                PersonField::Age => Value::from(self.age),
                PersonField::City => match self.city {
                    Some((name, zip)) => {
                        Value::Nested(vec![("name", Value::from(name)), ("zip", Value::from(zip))])
                    }
                    None => Value::Missing,
                },
            }
        }
    }

    pub(crate) fn person(name: &'static str, age: i64) -> Person {
        Person {
            name,
            age: Some(age),
            city: None,
        }
    }

    pub(crate) fn people() -> Vec<Person> {
        vec![person("Bob", 30), person("Ann", 25), person("Cid", 25)]
    }

    fn by_city(a: &Person, b: &Person) -> Ordering {
        a.city.map(|c| c.0).cmp(&b.city.map(|c| c.0))
    }

    pub(crate) fn person_columns() -> Columns<Person> {
        Columns::new(
            vec![
                ColumnSpec::new(PersonField::Name, "Name"),
                ColumnSpec::new(PersonField::Age, "Age"),
                ColumnSpec::new(PersonField::City, "City").sort_with(by_city),
            ],
            PersonField::Name,
        )
        .unwrap()
    }

    fn names(items: &[Person]) -> Vec<&'static str> {
        items.iter().map(|p| p.name).collect()
    }

    fn query(sort: SortDirective<PersonField>) -> ViewQuery<PersonField> {
        ViewQuery {
            filters: FilterMap::new(),
            search: String::new(),
            sort,
        }
    }

    #[test]
    fn sorts_by_age_keeping_ties_in_input_order() {
        let out = derive(
            &people(),
            &query(SortDirective::ascending(PersonField::Age)),
            &person_columns(),
        );
        assert_eq!(out, vec![person("Ann", 25), person("Cid", 25), person("Bob", 30)]);
    }

    #[test]
    fn name_filter_is_case_insensitive() {
        let mut q = query(SortDirective::ascending(PersonField::Name));
        q.filters.set(PersonField::Name, "A");
        let out = derive(&people(), &q, &person_columns());
        assert_eq!(out, vec![person("Ann", 25)]);
    }

    #[test]
    fn filters_combine_with_and() {
        let items = vec![person("Anna", 25), person("Dan", 30), person("Ann", 30)];
        let mut q = query(SortDirective::ascending(PersonField::Name));
        q.filters.set(PersonField::Name, "an");
        q.filters.set(PersonField::Age, "30");
        let out = derive(&items, &q, &person_columns());
        assert_eq!(names(&out), vec!["Ann", "Dan"]);
        for p in &items {
            let expected = p.name.to_lowercase().contains("an") && p.age == Some(30);
            assert_eq!(out.contains(p), expected, "{p:?}");
        }
    }

    #[test]
    fn search_matches_any_field() {
        let items = vec![person("Bob", 30), person("Ann", 25), person("Cid", 52)];
        let mut q = query(SortDirective::ascending(PersonField::Name));
        q.search = "5".to_string();
        assert_eq!(names(&derive(&items, &q, &person_columns())), vec!["Ann", "Cid"]);

        q.search = "BO".to_string();
        assert_eq!(names(&derive(&items, &q, &person_columns())), vec!["Bob"]);
    }

    #[test]
    fn search_and_filters_combine_with_and() {
        let items = vec![person("Bob", 25), person("Ann", 25), person("Abe", 30)];
        let mut q = query(SortDirective::ascending(PersonField::Name));
        q.filters.set(PersonField::Name, "b");
        q.search = "25".to_string();
        assert_eq!(names(&derive(&items, &q, &person_columns())), vec!["Bob"]);
    }

    #[test]
    fn search_sees_nested_values() {
        let mut items = people();
        items[2].city = Some(("Springfield", "49007"));
        let mut q = query(SortDirective::ascending(PersonField::Name));
        q.search = "spring".to_string();
        assert_eq!(names(&derive(&items, &q, &person_columns())), vec!["Cid"]);
        q.search = "4900".to_string();
        assert_eq!(names(&derive(&items, &q, &person_columns())), vec!["Cid"]);
    }

    #[test]
    fn empty_filters_and_search_keep_everything() {
        let items = people();
        let q = query(SortDirective::ascending(PersonField::Name));
        let rows = derive_rows(&items, &q, &person_columns());
        let mut sorted = rows.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2]);
    }

    #[test]
    fn empty_filter_value_has_no_effect() {
        let mut filters = FilterMap::new().with(PersonField::Name, "x");
        filters.set(PersonField::Name, "");
        assert!(filters.is_empty());
        assert_eq!(filters.get(PersonField::Name), "");
    }

    #[test]
    fn descending_is_the_reverse_without_ties() {
        let items = vec![person("Bob", 30), person("Ann", 25), person("Cid", 41), person("Dee", 19)];
        let cols = person_columns();
        let asc = derive(&items, &query(SortDirective::ascending(PersonField::Age)), &cols);
        let mut desc = derive(&items, &query(SortDirective::descending(PersonField::Age)), &cols);
        desc.reverse();
        assert_eq!(asc, desc);
    }

    #[test]
    fn descending_keeps_ties_in_input_order() {
        let out = derive(
            &people(),
            &query(SortDirective::descending(PersonField::Age)),
            &person_columns(),
        );
        assert_eq!(names(&out), vec!["Bob", "Ann", "Cid"]);
    }

    #[test]
    fn missing_values_sort_last_ascending() {
        let mut items = people();
        items[0].age = None;
        let cols = person_columns();
        let asc = derive(&items, &query(SortDirective::ascending(PersonField::Age)), &cols);
        assert_eq!(names(&asc), vec!["Ann", "Cid", "Bob"]);
        let desc = derive(&items, &query(SortDirective::descending(PersonField::Age)), &cols);
        assert_eq!(names(&desc), vec!["Bob", "Ann", "Cid"]);
    }

    #[test]
    fn nested_field_sorts_with_its_comparator() {
        let mut items = people();
        items[0].city = Some(("Zurich", "8000"));
        items[1].city = Some(("Bern", "3000"));
        items[2].city = Some(("Geneva", "1200"));
        let out = derive(
            &items,
            &query(SortDirective::ascending(PersonField::City)),
            &person_columns(),
        );
        assert_eq!(names(&out), vec!["Ann", "Cid", "Bob"]);
    }

    #[test]
    fn derivation_is_repeatable_and_leaves_input_alone() {
        let items = people();
        let before = items.clone();
        let mut q = query(SortDirective::descending(PersonField::Name));
        q.search = "b".to_string();
        let cols = person_columns();
        let first = derive(&items, &q, &cols);
        let second = derive(&items, &q, &cols);
        assert_eq!(first, second);
        assert_eq!(items, before);
    }

    #[test]
    fn cache_recomputes_only_on_change() {
        let items = people();
        let cols = person_columns();
        let mut cache = ViewCache::default();
        let mut q = query(SortDirective::ascending(PersonField::Age));

        let first = cache.rows(&items, &q, &cols);
        let again = cache.rows(&items, &q, &cols);
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(*first, vec![1, 2, 0]);

        q.sort = SortDirective::descending(PersonField::Age);
        let flipped = cache.rows(&items, &q, &cols);
        assert!(!Arc::ptr_eq(&first, &flipped));
        assert_eq!(*flipped, vec![0, 1, 2]);

        let stale = cache.rows(&items[..1], &q, &cols);
        assert!(Arc::ptr_eq(&flipped, &stale));
        cache.invalidate();
        let reloaded = cache.rows(&items[..1], &q, &cols);
        assert_eq!(*reloaded, vec![0]);
    }

    #[test]
    fn needles_are_lowercased_once() {
        let p = person("Ann", 25);
        let mut q = ViewQuery::new(PersonField::Name);
        assert!(Needles::new(&q).matches_search(&p));

        q.search = "NN".into();
        q.filters.set(PersonField::Age, "2");
        let needles = Needles::new(&q);
        assert_eq!(needles.search, "nn");
        assert!(needles.matches_search(&p));
        assert!(needles.matches_filters(&p));

        q.search = "zz".into();
        q.filters.set(PersonField::Age, "3");
        let needles = Needles::new(&q);
        assert!(!needles.matches_search(&p));
        assert!(!needles.matches_filters(&p));
    }
}
