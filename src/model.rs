use std::cmp::{max, min};
use std::sync::Arc;
use std::time::Instant;

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, error, trace};

use crate::column::{ColumnMenu, FilterInput};
use crate::domain::{AppConfig, HELP_TEXT, InputMode, Message};
use crate::inputter::{InputResult, Inputter};
use crate::page::{ListPage, Load};
use crate::record::{ListRecord, Value};
use crate::ui::{
    BORDER_WIDTH, CMDLINE_HEIGH, COLUMN_SPACING, COLUMN_WIDTH_MARGIN, SCROLLBAR_WIDTH,
    TABLE_HEADER_HEIGHT,
};
use crate::view::Direction;

#[derive(Debug, PartialEq)]
pub enum Status {
    Ready,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    Table,
    ColumnMenu,
    Search,
    Popup,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderView {
    pub label: String,
    pub width: usize,
    pub sort: Option<Direction>,
    pub filtered: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuView {
    pub label: String,
    pub visible_idx: Option<usize>, // Position among the rendered columns, if on screen
    pub ascending_disabled: bool,
    pub descending_disabled: bool,
    pub filterable: bool,
    pub filter: InputResult,
    pub input_focused: bool,
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width.saturating_sub(SCROLLBAR_WIDTH + BORDER_WIDTH),
            table_height: ui_height
                .saturating_sub(CMDLINE_HEIGH + TABLE_HEADER_HEIGHT + BORDER_WIDTH),
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

/// Everything the UI needs to draw one frame.
#[derive(Debug, Clone)]
pub struct UIData {
    pub name: String,
    pub headers: Vec<HeaderView>,
    pub rows: Vec<Vec<String>>,
    pub nrows: usize, // Rows in the current view
    pub total: usize, // Loaded records
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub search: String,
    pub search_input: Option<InputResult>,
    pub menu: Option<MenuView>,
    pub popup_message: Option<String>,
    pub status_message: String,
    pub layout: UILayout,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            headers: Vec::new(),
            rows: Vec::new(),
            nrows: 0,
            total: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            search: String::new(),
            search_input: None,
            menu: None,
            popup_message: None,
            status_message: String::new(),
            layout: UILayout::default(),
            last_update: Instant::now(),
        }
    }
}

pub struct Model<R: ListRecord> {
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    name: String,
    page: ListPage<R>,
    rows: Arc<Vec<usize>>, // Mapping of view row index to record index
    column_widths: Vec<usize>,
    visible_columns: Vec<usize>,
    curser_row: usize,
    offset_row: usize,
    curser_column: usize,
    offset_column: usize,
    uilayout: UILayout,
    uidata: UIData,
    search_input: Inputter,
    last_search_input: InputResult,
    search_before: String,
    menu: ColumnMenu,
    clipboard: Option<Clipboard>,
    popup_message: Option<String>,
    status_message: String,
}

impl<R: ListRecord> Model<R> {
    pub fn init(
        config: &AppConfig,
        name: impl Into<String>,
        mut page: ListPage<R>,
        ui_width: usize,
        ui_height: usize,
    ) -> Self {
        let rows = page.rows();
        let column_widths = Self::calculate_column_widths(&page, config.max_column_width);
        let status_message = match page.state() {
            Load::Loading => "Loading ...".to_string(),
            Load::NotFound => format!("No {} found", R::TITLE.to_lowercase()),
            Load::Loaded(items) => format!("Loaded {} {}", items.len(), R::TITLE.to_lowercase()),
        };
        let mut model = Self {
            status: Status::Ready,
            modus: Modus::Table,
            previous_modus: Modus::Table,
            name: name.into(),
            page,
            rows,
            column_widths,
            visible_columns: Vec::new(),
            curser_row: 0,
            offset_row: 0,
            curser_column: 0,
            offset_column: 0,
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            search_input: Inputter::default(),
            last_search_input: InputResult::default(),
            search_before: String::new(),
            menu: ColumnMenu::default(),
            clipboard: None,
            popup_message: None,
            status_message,
        };
        model.update_uidata();
        model
    }

    pub fn page(&self) -> &ListPage<R> {
        &self.page
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    /// The text line that currently owns the keyboard, if any.
    pub fn input_mode(&self) -> Option<InputMode> {
        match self.modus {
            Modus::Search => Some(InputMode::Search),
            Modus::ColumnMenu if self.menu.input_focused() => Some(InputMode::Filter),
            _ => None,
        }
    }

    pub fn raw_keyevents(&self) -> bool {
        self.input_mode().is_some()
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    pub fn update(&mut self, message: Message) {
        trace!("Update: Modus {:?}, Message {:?}", self.modus, message);
        match self.modus {
            Modus::Table => match message {
                Message::Quit => self.quit(),
                Message::MoveDown => self.move_selection_down(1),
                Message::MoveUp => self.move_selection_up(1),
                Message::MoveLeft => self.move_selection_left(),
                Message::MoveRight => self.move_selection_right(),
                Message::MovePageUp => self.move_selection_up(self.uilayout.table_height.max(1)),
                Message::MovePageDown => {
                    self.move_selection_down(self.uilayout.table_height.max(1))
                }
                Message::MoveBeginning => self.select_row(0),
                Message::MoveEnd => self.select_row(self.rows.len().saturating_sub(1)),
                Message::Search => self.enter_search(),
                Message::ColumnMenu | Message::Enter => self.open_column_menu(),
                Message::ResetView => self.reset_view(),
                Message::CopyRow => self.copy_row(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::ColumnMenu => match message {
                Message::RawKey(key) => self.filter_input(key),
                Message::Quit => self.quit(),
                Message::Exit | Message::ColumnMenu => self.close_column_menu(),
                Message::SortAscending => self.sort_menu_column(Direction::Ascending),
                Message::SortDescending => self.sort_menu_column(Direction::Descending),
                Message::FocusFilter | Message::Enter => self.focus_filter(),
                Message::ClearFilter => self.clear_filter(),
                Message::MoveLeft => {
                    self.move_selection_left();
                    self.menu.open(self.curser_column);
                }
                Message::MoveRight => {
                    self.move_selection_right();
                    self.menu.open(self.curser_column);
                }
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::Search => match message {
                Message::RawKey(key) => self.search_key(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::Popup => match message {
                Message::Quit => self.quit(),
                Message::Exit | Message::Enter | Message::Help => self.close_popup(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        self.update_uidata();
    }

    // -------------------- Control handling functions ---------------------- //

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
        self.popup_message = Some(HELP_TEXT.to_string());
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::Popup;
        self.popup_message = None;
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.select_row(self.offset_row + self.curser_row);
    }

    fn enter_search(&mut self) {
        trace!("Entering search ...");
        self.previous_modus = self.modus;
        self.modus = Modus::Search;
        self.search_before = self.page.search().to_string();
        self.search_input.clear();
        self.search_input.set(&self.search_before);
        self.last_search_input = self.search_input.get();
    }

    fn search_key(&mut self, key: KeyEvent) {
        self.last_search_input = self.search_input.read(key);
        let input = self.last_search_input.clone();
        if input.canceled {
            let previous = std::mem::take(&mut self.search_before);
            self.page.set_search(previous);
            self.refresh_view();
        } else if input.input != self.page.search() {
            self.page.set_search(input.input.clone());
            self.refresh_view();
        }
        if input.finished {
            self.modus = Modus::Table;
            self.previous_modus = Modus::Search;
            self.set_status_message(format!("{} matching rows", self.rows.len()));
        }
    }

    fn open_column_menu(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::ColumnMenu;
        self.menu.open(self.curser_column);
    }

    fn close_column_menu(&mut self) {
        self.menu.close();
        self.modus = Modus::Table;
        self.previous_modus = Modus::ColumnMenu;
    }

    fn menu_column(&self) -> usize {
        self.menu.column().unwrap_or(self.curser_column)
    }

    fn sort_menu_column(&mut self, direction: Direction) {
        let Some(control) = self.page.column_control(self.menu_column()) else {
            return;
        };
        if control.press_sort(direction, &mut self.page) {
            self.set_status_message(format!("Sorted by {} {}", control.label(), direction.arrow()));
            self.refresh_view();
        } else {
            self.set_status_message(format!(
                "{} is already sorted {}",
                control.label(),
                direction.arrow()
            ));
        }
    }

    fn focus_filter(&mut self) {
        let Some(control) = self.page.column_control(self.menu_column()) else {
            return;
        };
        if !self.menu.focus_filter(&control) {
            self.set_status_message(format!("{} has no text filter", control.label()));
        }
    }

    fn filter_input(&mut self, key: KeyEvent) {
        let Some(control) = self.page.column_control(self.menu_column()) else {
            return;
        };
        match self.menu.input_key(key) {
            FilterInput::Edited(value) => {
                control.edit_filter(value, &mut self.page);
                self.refresh_view();
            }
            FilterInput::Done => {
                self.set_status_message(format!("{} matching rows", self.rows.len()));
            }
            FilterInput::Unchanged => {}
        }
    }

    fn clear_filter(&mut self) {
        let Some(control) = self.page.column_control(self.menu_column()) else {
            return;
        };
        if control.clear_filter(&mut self.page) {
            self.menu.reset_input();
            self.refresh_view();
        }
    }

    fn reset_view(&mut self) {
        self.page.reset();
        self.set_status_message("Search and filters cleared");
        self.refresh_view();
    }

    fn copy_row(&mut self) {
        let Some(&ridx) = self.rows.get(self.offset_row + self.curser_row) else {
            return;
        };
        let record = &self.page.items()[ridx];
        let text = self
            .page
            .columns()
            .iter()
            .map(|spec| record.value(spec.field).to_string())
            .collect::<Vec<String>>()
            .join("\t");

        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    error!("Could not open clipboard: {e}");
                    self.set_status_message(format!("Clipboard unavailable: {e}"));
                    return;
                }
            }
        }
        let copied = self.clipboard.as_mut().map(|c| c.set_text(text));
        match copied {
            Some(Ok(())) => self.set_status_message("Copied row to clipboard"),
            Some(Err(e)) => {
                error!("Copy failed: {e}");
                self.set_status_message(format!("Copy failed: {e}"));
            }
            None => {}
        }
    }

    /// Re-derive the view after the query changed and jump back to the top.
    fn refresh_view(&mut self) {
        self.rows = self.page.rows();
        debug!("View holds {} rows", self.rows.len());
        self.select_row(0);
    }

    fn select_row(&mut self, row: usize) {
        let height = self.uilayout.table_height.max(1);
        let row = min(row, self.rows.len().saturating_sub(1));
        if row < self.offset_row {
            self.offset_row = row;
        } else if row >= self.offset_row + height {
            self.offset_row = row + 1 - height;
        }
        self.curser_row = row - self.offset_row;
    }

    fn move_selection_down(&mut self, size: usize) {
        self.select_row(self.offset_row + self.curser_row + size);
    }

    fn move_selection_up(&mut self, size: usize) {
        self.select_row((self.offset_row + self.curser_row).saturating_sub(size));
    }

    fn move_selection_left(&mut self) {
        self.curser_column = self.curser_column.saturating_sub(1);
    }

    fn move_selection_right(&mut self) {
        if self.curser_column + 1 < self.column_widths.len() {
            self.curser_column += 1;
        }
    }

    // -------------------------- View building ----------------------------- //

    fn cell_text(value: Value) -> String {
        match value {
            Value::Missing => String::from("∅"),
            v => v.to_string().replace("\r\n", " ↵ ").replace('\n', " ↵ "),
        }
    }

    fn calculate_column_widths(page: &ListPage<R>, max_column_width: usize) -> Vec<usize> {
        page.columns()
            .iter()
            .map(|spec| {
                let max_width = page
                    .items()
                    .iter()
                    .map(|item| Self::cell_text(item.value(spec.field)).chars().count())
                    .max()
                    .unwrap_or(0);
                // Room for the sort and filter markers
                let header_width = spec.label.chars().count() + 4;
                min(max(header_width, max_width) + COLUMN_WIDTH_MARGIN, max_column_width)
            })
            .collect()
    }

    fn fit_columns(&self, offset: usize) -> Vec<usize> {
        let mut visible = Vec::new();
        let mut used = 0;
        for (cidx, width) in self.column_widths.iter().enumerate().skip(offset) {
            if used + width + COLUMN_SPACING > self.uilayout.table_width && !visible.is_empty() {
                break;
            }
            visible.push(cidx);
            used += width + COLUMN_SPACING;
        }
        visible
    }

    fn update_visible_columns(&mut self) {
        if self.curser_column < self.offset_column {
            self.offset_column = self.curser_column;
        }
        loop {
            let visible = self.fit_columns(self.offset_column);
            if visible.contains(&self.curser_column) || self.offset_column >= self.curser_column {
                self.visible_columns = visible;
                break;
            }
            self.offset_column += 1;
        }
    }

    fn update_uidata(&mut self) {
        self.update_visible_columns();

        let items = self.page.items();
        let columns = self.page.columns();
        let rbegin = min(self.offset_row, self.rows.len());
        let rend = min(rbegin + self.uilayout.table_height, self.rows.len());

        let headers = self
            .visible_columns
            .iter()
            .filter_map(|&cidx| {
                let control = self.page.column_control(cidx)?;
                Some(HeaderView {
                    label: control.label().to_string(),
                    width: self.column_widths[cidx],
                    sort: control.sort_indicator(),
                    filtered: control.is_filtered(),
                })
            })
            .collect();

        let rows = self.rows[rbegin..rend]
            .iter()
            .map(|&ridx| {
                self.visible_columns
                    .iter()
                    .filter_map(|&cidx| columns.get(cidx))
                    .map(|spec| Self::cell_text(items[ridx].value(spec.field)))
                    .collect()
            })
            .collect();

        let menu = self.menu.column().and_then(|cidx| {
            let control = self.page.column_control(cidx)?;
            Some(MenuView {
                label: control.label().to_string(),
                visible_idx: self.visible_columns.iter().position(|&c| c == cidx),
                ascending_disabled: control.ascending_disabled(),
                descending_disabled: control.descending_disabled(),
                filterable: control.has_filter_input(),
                filter: if self.menu.input_focused() {
                    self.menu.input_state().clone()
                } else {
                    InputResult {
                        input: control.filter_value().to_string(),
                        ..InputResult::default()
                    }
                },
                input_focused: self.menu.input_focused(),
            })
        });

        self.uidata = UIData {
            name: format!("{} [{}]", R::TITLE, self.name),
            headers,
            rows,
            nrows: self.rows.len(),
            total: items.len(),
            selected_row: self.curser_row,
            selected_column: self
                .visible_columns
                .iter()
                .position(|&c| c == self.curser_column)
                .unwrap_or(0),
            abs_selected_row: self.offset_row + self.curser_row,
            search: self.page.search().to_string(),
            search_input: (self.modus == Modus::Search).then(|| self.last_search_input.clone()),
            menu,
            popup_message: self.popup_message.clone(),
            status_message: self.status_message.clone(),
            layout: self.uilayout.clone(),
            last_update: Instant::now(),
        };
    }
}
