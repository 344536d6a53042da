//! State of one list page.
//!
//! Each page owns its records and its search/filter/sort state. Nothing here is
//! shared between pages.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::column::{ColumnControl, ColumnHandler, Columns};
use crate::domain::AdmError;
use crate::record::{ListRecord, Record};
use crate::source::RecordSource;
use crate::view::{Direction, FilterMap, SortDirective, ViewCache, ViewQuery};

/// Loading lifecycle of a page's data.
#[derive(Debug, Clone, PartialEq)]
pub enum Load<T> {
    Loading,
    Loaded(T),
    NotFound,
}

impl<T> Load<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Load::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Load::Loading)
    }
}

pub struct ListPage<R: Record> {
    items: Load<Vec<R>>,
    columns: Columns<R>,
    query: ViewQuery<R::Field>,
    cache: ViewCache<R::Field>,
}

impl<R: ListRecord> ListPage<R> {
    pub fn for_kind() -> Result<Self, AdmError> {
        Ok(Self::new(R::columns()?))
    }

    /// Load the page's records. A source reporting a missing file leaves the page in
    /// [`Load::NotFound`]; every other error is returned.
    pub fn load(&mut self, source: &impl RecordSource<R>) -> Result<(), AdmError> {
        match source.fetch_all() {
            Ok(items) => {
                self.set_items(items);
                Ok(())
            }
            Err(AdmError::FileNotFound) => {
                warn!("No {} found", R::TITLE);
                self.items = Load::NotFound;
                self.cache.invalidate();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl<R: Record> ListPage<R> {
    pub fn new(columns: Columns<R>) -> Self {
        let query = ViewQuery::new(columns.default_sort());
        Self {
            items: Load::Loading,
            columns,
            query,
            cache: ViewCache::default(),
        }
    }

    pub fn set_items(&mut self, items: Vec<R>) {
        info!("Page holds {} records", items.len());
        self.items = Load::Loaded(items);
        self.cache.invalidate();
    }

    pub fn state(&self) -> &Load<Vec<R>> {
        &self.items
    }

    /// All loaded records, empty while loading or when nothing was found.
    pub fn items(&self) -> &[R] {
        self.items.loaded().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn columns(&self) -> &Columns<R> {
        &self.columns
    }

    pub fn query(&self) -> &ViewQuery<R::Field> {
        &self.query
    }

    pub fn filters(&self) -> &FilterMap<R::Field> {
        &self.query.filters
    }

    pub fn search(&self) -> &str {
        &self.query.search
    }

    pub fn sort(&self) -> SortDirective<R::Field> {
        self.query.sort
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.query.search = term.into();
        debug!("Search is now {:?}", self.query.search);
    }

    /// Back to page-load defaults. The records stay.
    pub fn reset(&mut self) {
        self.query = ViewQuery::new(self.columns.default_sort());
    }

    /// Row indices of the current view, recomputed only when something changed.
    pub fn rows(&mut self) -> Arc<Vec<usize>> {
        let items = self.items.loaded().map(Vec::as_slice).unwrap_or(&[]);
        self.cache.rows(items, &self.query, &self.columns)
    }

    pub fn view(&mut self) -> Vec<&R> {
        let rows = self.rows();
        let items = self.items();
        rows.iter().map(|&idx| &items[idx]).collect()
    }

    pub fn column_control(&self, column: usize) -> Option<ColumnControl<R::Field>> {
        self.columns
            .get(column)
            .map(|spec| ColumnControl::new(spec, &self.query.filters, &self.query.sort))
    }
}

impl<R: Record> ColumnHandler<R::Field> for ListPage<R> {
    fn on_sort(&mut self, field: R::Field, direction: Direction) {
        debug!("Sort by {:?} {:?}", field, direction);
        self.query.sort = SortDirective::new(field, direction);
    }

    fn on_filter(&mut self, field: R::Field, value: String) {
        debug!("Filter {:?} by {:?}", field, value);
        self.query.filters.set(field, value);
    }
}
