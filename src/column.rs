//! Column configuration and the per-column sort/filter control.

use std::cmp::Ordering;
use std::collections::HashSet;

use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, trace};

use crate::domain::ConfigError;
use crate::inputter::{InputResult, Inputter};
use crate::record::{Field, FieldKind, Record};
use crate::view::{Direction, FilterMap, SortDirective};

pub type Comparator<R> = fn(&R, &R) -> Ordering;

/// How a column orders records.
pub enum SortKey<R> {
    /// Compare the raw field values. Only valid for primitive fields.
    Raw,
    Custom(Comparator<R>),
    Unsortable,
}

impl<R> Clone for SortKey<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for SortKey<R> {}

impl<R> std::fmt::Debug for SortKey<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortKey::Raw => write!(f, "Raw"),
            SortKey::Custom(_) => write!(f, "Custom"),
            SortKey::Unsortable => write!(f, "Unsortable"),
        }
    }
}

pub struct ColumnSpec<R: Record> {
    pub field: R::Field,
    pub label: &'static str,
    pub filterable: bool,
    pub sort: SortKey<R>,
}

impl<R: Record> Clone for ColumnSpec<R> {
    fn clone(&self) -> Self {
        Self {
            field: self.field,
            label: self.label,
            filterable: self.filterable,
            sort: self.sort,
        }
    }
}

impl<R: Record> std::fmt::Debug for ColumnSpec<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnSpec")
            .field("field", &self.field)
            .field("label", &self.label)
            .field("filterable", &self.filterable)
            .field("sort", &self.sort)
            .finish()
    }
}

impl<R: Record> ColumnSpec<R> {
    /// A filterable column sorted by raw value.
    pub fn new(field: R::Field, label: &'static str) -> Self {
        Self {
            field,
            label,
            filterable: true,
            sort: SortKey::Raw,
        }
    }

    pub fn sort_with(mut self, compare: Comparator<R>) -> Self {
        self.sort = SortKey::Custom(compare);
        self
    }

    pub fn unsortable(mut self) -> Self {
        self.sort = SortKey::Unsortable;
        self
    }

    /// Hide the free-text filter input, e.g. for yes/no columns.
    pub fn without_filter(mut self) -> Self {
        self.filterable = false;
        self
    }

    pub fn is_sortable(&self) -> bool {
        !matches!(self.sort, SortKey::Unsortable)
    }
}

/// The validated column set of one list page.
#[derive(Debug, Clone)]
pub struct Columns<R: Record> {
    specs: Vec<ColumnSpec<R>>,
    default_sort: R::Field,
}

impl<R: Record> Columns<R> {
    pub fn new(specs: Vec<ColumnSpec<R>>, default_sort: R::Field) -> Result<Self, ConfigError> {
        if specs.is_empty() {
            return Err(ConfigError::NoColumns);
        }
        let mut seen = HashSet::new();
        for spec in specs.iter() {
            if !seen.insert(spec.field) {
                return Err(ConfigError::DuplicateColumn(spec.field.name()));
            }
            if matches!(spec.sort, SortKey::Raw) && spec.field.kind() == FieldKind::Nested {
                return Err(ConfigError::NonPrimitiveSortField(spec.field.name()));
            }
        }
        let default_sortable = specs
            .iter()
            .any(|s| s.field == default_sort && s.is_sortable());
        if !default_sortable {
            return Err(ConfigError::DefaultSortNotSortable(default_sort.name()));
        }
        debug!("Configured {} columns", specs.len());
        Ok(Self {
            specs,
            default_sort,
        })
    }

    pub fn default_sort(&self) -> R::Field {
        self.default_sort
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&ColumnSpec<R>> {
        self.specs.get(idx)
    }

    pub fn find(&self, field: R::Field) -> Option<&ColumnSpec<R>> {
        self.specs.iter().find(|s| s.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnSpec<R>> {
        self.specs.iter()
    }

    /// Sort key for `field`. Fields without a column fall back to raw comparison
    /// when primitive and keep their order otherwise.
    pub fn sort_key(&self, field: R::Field) -> SortKey<R> {
        match self.find(field) {
            Some(spec) => spec.sort,
            None if field.kind() == FieldKind::Primitive => SortKey::Raw,
            None => SortKey::Unsortable,
        }
    }
}

/// Receiver of the effects a [`ColumnControl`] emits.
pub trait ColumnHandler<F> {
    fn on_sort(&mut self, field: F, direction: Direction);
    fn on_filter(&mut self, field: F, value: String);
}

/// Snapshot of one column's sort and filter controls.
///
/// Built from the current filters and sort directive; all changes go through a
/// [`ColumnHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnControl<F: Field> {
    field: F,
    label: &'static str,
    sortable: bool,
    filterable: bool,
    filter: String,
    sort: SortDirective<F>,
}

impl<F: Field> ColumnControl<F> {
    pub fn new<R: Record<Field = F>>(
        spec: &ColumnSpec<R>,
        filters: &FilterMap<F>,
        sort: &SortDirective<F>,
    ) -> Self {
        Self {
            field: spec.field,
            label: spec.label,
            sortable: spec.is_sortable(),
            filterable: spec.filterable,
            filter: filters.get(spec.field).to_string(),
            sort: *sort,
        }
    }

    pub fn field(&self) -> F {
        self.field
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// A sort button is disabled when pressing it would not change anything.
    pub fn sort_disabled(&self, direction: Direction) -> bool {
        !self.sortable || self.sort == SortDirective::new(self.field, direction)
    }

    pub fn ascending_disabled(&self) -> bool {
        self.sort_disabled(Direction::Ascending)
    }

    pub fn descending_disabled(&self) -> bool {
        self.sort_disabled(Direction::Descending)
    }

    /// Direction of the active sort when it is on this column.
    pub fn sort_indicator(&self) -> Option<Direction> {
        (self.sort.field == self.field).then_some(self.sort.direction)
    }

    pub fn has_filter_input(&self) -> bool {
        self.filterable
    }

    pub fn filter_value(&self) -> &str {
        &self.filter
    }

    pub fn is_filtered(&self) -> bool {
        !self.filter.is_empty()
    }

    /// Returns whether the handler was invoked.
    pub fn press_sort(&self, direction: Direction, handler: &mut impl ColumnHandler<F>) -> bool {
        if self.sort_disabled(direction) {
            trace!("Sort {:?} {:?} is disabled", self.field, direction);
            return false;
        }
        handler.on_sort(self.field, direction);
        true
    }

    pub fn edit_filter(&self, value: impl Into<String>, handler: &mut impl ColumnHandler<F>) -> bool {
        if !self.filterable {
            return false;
        }
        handler.on_filter(self.field, value.into());
        true
    }

    pub fn clear_filter(&self, handler: &mut impl ColumnHandler<F>) -> bool {
        self.edit_filter(String::new(), handler)
    }
}

/// What a key press inside the column menu's filter input produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterInput {
    /// The text changed; push it to the filter.
    Edited(String),
    /// Editing stopped; the menu stays open.
    Done,
    Unchanged,
}

/// Disclosure state of a column menu plus its filter input.
#[derive(Default)]
pub struct ColumnMenu {
    column: Option<usize>,
    input: Inputter,
    input_focused: bool,
    last_input: InputResult,
}

impl ColumnMenu {
    pub fn open(&mut self, column: usize) {
        trace!("Open column menu for column {column}");
        self.column = Some(column);
        self.input_focused = false;
        self.input.clear();
        self.last_input = self.input.get();
    }

    pub fn close(&mut self) {
        trace!("Close column menu");
        self.column = None;
        self.input_focused = false;
    }

    pub fn is_open(&self) -> bool {
        self.column.is_some()
    }

    pub fn column(&self) -> Option<usize> {
        self.column
    }

    pub fn input_focused(&self) -> bool {
        self.input_focused
    }

    pub fn input_state(&self) -> &InputResult {
        &self.last_input
    }

    /// Focus the filter input, prefilled with the current filter text.
    /// Does nothing for columns without a filter input.
    pub fn focus_filter<F: Field>(&mut self, control: &ColumnControl<F>) -> bool {
        if !self.is_open() || !control.has_filter_input() {
            return false;
        }
        self.input.clear();
        self.input.set(control.filter_value());
        self.last_input = self.input.get();
        self.input_focused = true;
        true
    }

    /// Feed a key to the focused filter input. Keys never close the menu.
    pub fn input_key(&mut self, key: KeyEvent) -> FilterInput {
        if !self.input_focused {
            return FilterInput::Unchanged;
        }
        let before = self.last_input.input.clone();
        let result = self.input.read(key);
        if result.finished {
            self.input_focused = false;
            self.last_input = InputResult {
                input: before,
                ..result
            };
            return FilterInput::Done;
        }
        self.last_input = result;
        if self.last_input.input != before {
            FilterInput::Edited(self.last_input.input.clone())
        } else {
            FilterInput::Unchanged
        }
    }

    /// Show a cleared filter in the input.
    pub fn reset_input(&mut self) {
        self.input.clear();
        self.last_input = self.input.get();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::tests::{Person, PersonField};
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    #[derive(Default)]
    struct Recorder {
        sorts: Vec<(PersonField, Direction)>,
        filters: Vec<(PersonField, String)>,
    }

    impl ColumnHandler<PersonField> for Recorder {
        fn on_sort(&mut self, field: PersonField, direction: Direction) {
            self.sorts.push((field, direction));
        }

        fn on_filter(&mut self, field: PersonField, value: String) {
            self.filters.push((field, value));
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn control(spec: &ColumnSpec<Person>, sort: SortDirective<PersonField>) -> ColumnControl<PersonField> {
        ColumnControl::new(spec, &FilterMap::new().with(PersonField::Name, "an"), &sort)
    }

    #[test]
    fn nested_field_needs_comparator() {
        let err = Columns::<Person>::new(
            vec![
                ColumnSpec::new(PersonField::Name, "Name"),
                ColumnSpec::new(PersonField::City, "City"),
            ],
            PersonField::Name,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::NonPrimitiveSortField("city"));

        let ok = Columns::<Person>::new(
            vec![
                ColumnSpec::new(PersonField::Name, "Name"),
                ColumnSpec::new(PersonField::City, "City").unsortable(),
            ],
            PersonField::Name,
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn column_set_validation() {
        assert_eq!(
            Columns::<Person>::new(Vec::new(), PersonField::Name).unwrap_err(),
            ConfigError::NoColumns
        );
        assert_eq!(
            Columns::<Person>::new(
                vec![
                    ColumnSpec::new(PersonField::Name, "Name"),
                    ColumnSpec::new(PersonField::Name, "Again"),
                ],
                PersonField::Name,
            )
            .unwrap_err(),
            ConfigError::DuplicateColumn("name")
        );
        assert_eq!(
            Columns::<Person>::new(
                vec![ColumnSpec::new(PersonField::Name, "Name")],
                PersonField::Age,
            )
            .unwrap_err(),
            ConfigError::DefaultSortNotSortable("age")
        );
    }

    #[test]
    fn sort_buttons_disabled_only_for_the_active_directive() {
        let spec = ColumnSpec::<Person>::new(PersonField::Age, "Age");
        for current in [
            SortDirective::ascending(PersonField::Age),
            SortDirective::descending(PersonField::Age),
            SortDirective::ascending(PersonField::Name),
            SortDirective::descending(PersonField::Name),
        ] {
            let c = control(&spec, current);
            assert_eq!(
                c.ascending_disabled(),
                current == SortDirective::ascending(PersonField::Age)
            );
            assert_eq!(
                c.descending_disabled(),
                current == SortDirective::descending(PersonField::Age)
            );
        }
    }

    #[test]
    fn disabled_sort_does_not_call_handler() {
        let spec = ColumnSpec::<Person>::new(PersonField::Age, "Age");
        let c = control(&spec, SortDirective::ascending(PersonField::Age));
        let mut rec = Recorder::default();
        assert!(!c.press_sort(Direction::Ascending, &mut rec));
        assert!(c.press_sort(Direction::Descending, &mut rec));
        assert_eq!(rec.sorts, vec![(PersonField::Age, Direction::Descending)]);
        assert_eq!(c.sort_indicator(), Some(Direction::Ascending));
    }

    #[test]
    fn unsortable_column_has_both_buttons_disabled() {
        let spec = ColumnSpec::<Person>::new(PersonField::City, "City").unsortable();
        let c = control(&spec, SortDirective::ascending(PersonField::Name));
        assert!(c.ascending_disabled());
        assert!(c.descending_disabled());
    }

    #[test]
    fn filter_input_can_be_suppressed() {
        let spec = ColumnSpec::<Person>::new(PersonField::Age, "Age").without_filter();
        let c = control(&spec, SortDirective::ascending(PersonField::Name));
        let mut rec = Recorder::default();
        assert!(!c.has_filter_input());
        assert!(!c.edit_filter("3", &mut rec));
        assert!(rec.filters.is_empty());

        let mut menu = ColumnMenu::default();
        menu.open(1);
        assert!(!menu.focus_filter(&c));
    }

    #[test]
    fn filter_reads_and_clears_through_handler() {
        let spec = ColumnSpec::<Person>::new(PersonField::Name, "Name");
        let c = control(&spec, SortDirective::ascending(PersonField::Name));
        assert_eq!(c.filter_value(), "an");
        assert!(c.is_filtered());
        let mut rec = Recorder::default();
        assert!(c.clear_filter(&mut rec));
        assert_eq!(rec.filters, vec![(PersonField::Name, String::new())]);
    }

    #[test]
    fn typing_in_filter_keeps_menu_open() {
        let spec = ColumnSpec::<Person>::new(PersonField::Name, "Name");
        let c = control(&spec, SortDirective::ascending(PersonField::Name));
        let mut menu = ColumnMenu::default();
        menu.open(0);
        assert!(menu.focus_filter(&c));
        assert_eq!(menu.input_state().input, "an");

        assert_eq!(
            menu.input_key(key(KeyCode::Char('q'))),
            FilterInput::Edited("anq".to_string())
        );
        assert_eq!(menu.input_key(key(KeyCode::Esc)), FilterInput::Done);
        assert!(menu.is_open());
        assert!(!menu.input_focused());
        assert_eq!(menu.input_state().input, "anq");

        assert_eq!(menu.input_key(key(KeyCode::Char('x'))), FilterInput::Unchanged);
        menu.close();
        assert!(!menu.is_open());
    }
}
