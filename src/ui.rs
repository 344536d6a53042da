use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Cell, Clear, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState,
        Table, TableState,
    },
};

use crate::model::{MenuView, UIData};

pub const CMDLINE_HEIGH: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const BORDER_WIDTH: usize = 2;
pub const SCROLLBAR_WIDTH: usize = 1;
pub const COLUMN_SPACING: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

const MENU_WIDTH: u16 = 34;
const FILTER_PREFIX: &str = "Filter: ";

#[derive(Debug, Default)]
pub struct TableUI;

impl TableUI {
    pub fn new() -> Self {
        Self
    }

    pub fn draw(&self, uidata: &UIData, frame: &mut Frame) {
        let [table_area, cmd_area] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(frame.area());

        self.render_table(uidata, frame, table_area);
        self.render_cmdline(uidata, frame, cmd_area);
        if let Some(menu) = &uidata.menu {
            self.render_menu(uidata, menu, frame, table_area);
        }
        if let Some(message) = &uidata.popup_message {
            self.render_popup(message, frame);
        }
    }

    fn render_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let header = Row::new(uidata.headers.iter().map(|h| {
            let mut label = h.label.clone();
            if let Some(direction) = h.sort {
                label.push(' ');
                label.push_str(direction.arrow());
            }
            if h.filtered {
                label.push_str(" ≈");
            }
            Cell::from(label)
        }))
        .style(Style::new().bold().underlined());

        let rows = uidata.rows.iter().enumerate().map(|(ridx, row)| {
            Row::new(row.iter().enumerate().map(|(cidx, value)| {
                let cell = Cell::from(value.as_str());
                if ridx == uidata.selected_row && cidx == uidata.selected_column {
                    cell.style(Style::new().reversed())
                } else {
                    cell
                }
            }))
        });
        let widths = uidata
            .headers
            .iter()
            .map(|h| Constraint::Length(h.width as u16));

        let title = Line::from(Span::styled(
            format!(" {} ", uidata.name),
            Style::new().bold(),
        ));
        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(COLUMN_SPACING as u16)
            .row_highlight_style(Style::new().bg(Color::DarkGray))
            .block(Block::bordered().title(title.centered()));

        let mut state = TableState::default().with_selected(Some(uidata.selected_row));
        frame.render_stateful_widget(table, area, &mut state);

        let mut scrollbar_state =
            ScrollbarState::new(uidata.nrows).position(uidata.abs_selected_row);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }

    fn render_cmdline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let line = match &uidata.search_input {
            Some(input) => {
                let x = area.x + 1 + cursor_offset(&input.input, input.cursor_pos);
                frame.set_cursor_position((x, area.y));
                Line::from(vec![Span::from("/").bold(), Span::from(input.input.as_str())])
            }
            None => {
                let mut spans = vec![
                    Span::from(format!(" {}/{} rows ", uidata.nrows, uidata.total)).reversed(),
                ];
                if !uidata.search.is_empty() {
                    spans.push(Span::from(format!(" /{} ", uidata.search)).italic());
                }
                spans.push(Span::from(format!(" {}", uidata.status_message)));
                Line::from(spans)
            }
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_menu(&self, uidata: &UIData, menu: &MenuView, frame: &mut Frame, area: Rect) {
        // Open the menu right below the header of its column
        let column_x: usize = uidata
            .headers
            .iter()
            .take(menu.visible_idx.unwrap_or(0))
            .map(|h| h.width + COLUMN_SPACING)
            .sum();
        let popup = popup_rect(
            frame.area(),
            area.x + 1 + column_x as u16,
            area.y + 1 + TABLE_HEADER_HEIGHT as u16,
            MENU_WIDTH,
            6,
        );

        let sort_line = |key: &'static str, text: &'static str, disabled: bool| {
            let line = Line::from(vec![Span::from(format!("[{key}] ")).bold(), Span::from(text)]);
            if disabled { line.dim() } else { line }
        };
        let filter_line = if menu.filterable {
            Line::from(vec![
                Span::from(FILTER_PREFIX),
                Span::from(menu.filter.input.as_str()).underlined(),
            ])
        } else {
            Line::from("No text filter".dim())
        };
        let hint = match (menu.filterable, menu.input_focused) {
            (_, true) => "Enter/Esc: done",
            (true, false) => "i: edit  x: clear  Esc: close",
            (false, false) => "Esc: close",
        };
        let text = Text::from(vec![
            sort_line("a", "Sort ascending", menu.ascending_disabled),
            sort_line("d", "Sort descending", menu.descending_disabled),
            filter_line,
            Line::from(hint.dim()),
        ]);

        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(text).block(Block::bordered().title(format!(" {} ", menu.label))),
            popup,
        );
        if menu.input_focused {
            frame.set_cursor_position((
                popup.x
                    + 1
                    + FILTER_PREFIX.len() as u16
                    + cursor_offset(&menu.filter.input, menu.filter.cursor_pos),
                popup.y + 3,
            ));
        }
    }

    fn render_popup(&self, message: &str, frame: &mut Frame) {
        let area = frame.area();
        let height = message.lines().count() as u16 + 2;
        let width = 60;
        let popup = popup_rect(
            area,
            area.x + area.width.saturating_sub(width) / 2,
            area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
        );
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(message).block(Block::bordered().title(" Help ")),
            popup,
        );
    }
}

/// A `w` x `h` rectangle at (x, y), shifted and shrunk to stay inside `area`.
fn popup_rect(area: Rect, x: u16, y: u16, w: u16, h: u16) -> Rect {
    let w = w.min(area.width);
    let h = h.min(area.height);
    let x = x.min(area.right().saturating_sub(w));
    let y = y.min(area.bottom().saturating_sub(h));
    Rect::new(x, y, w, h)
}

/// Display width of the first `cursor_pos` chars of `input`.
fn cursor_offset(input: &str, cursor_pos: usize) -> u16 {
    let end = input
        .char_indices()
        .nth(cursor_pos)
        .map(|(idx, _)| idx)
        .unwrap_or(input.len());
    Span::raw(&input[..end]).width() as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AppConfig, Message};
    use crate::model::Model;
    use crate::page::ListPage;
    use crate::records::Applicant;
    use crate::records::tests::applicant;
    use ratatui::{Terminal, backend::TestBackend};

    fn render(model: &Model<Applicant>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        let ui = TableUI::new();
        terminal.draw(|f| ui.draw(model.get_uidata(), f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn cursor_offset_counts_display_columns() {
        assert_eq!(cursor_offset("abc", 2), 2);
        assert_eq!(cursor_offset("abc", 9), 3);
        assert_eq!(cursor_offset("日本x", 2), 4);
        assert_eq!(cursor_offset("日本x", 3), 5);
    }

    fn model() -> Model<Applicant> {
        let mut page = ListPage::<Applicant>::for_kind().unwrap();
        page.set_items(vec![
            applicant("Ann", Some("North Hall"), true),
            applicant("Bob", None, false),
        ]);
        Model::init(&AppConfig::default(), "applicants.csv", page, 100, 20)
    }

    #[test]
    fn renders_rows_and_sorted_header() {
        let screen = render(&model());
        assert!(screen.contains("Applicants [applicants.csv]"));
        assert!(screen.contains("Name ▲"));
        assert!(screen.contains("North Hall"));
        assert!(screen.contains("2/2 rows"));
    }

    #[test]
    fn renders_column_menu() {
        let mut m = model();
        m.update(Message::ColumnMenu);
        let screen = render(&m);
        assert!(screen.contains("Sort descending"));
        assert!(screen.contains(FILTER_PREFIX.trim_end()));
    }

    #[test]
    fn popup_stays_inside_the_frame() {
        let area = Rect::new(0, 0, 40, 10);
        let r = popup_rect(area, 35, 8, 20, 6);
        assert_eq!(r, Rect::new(20, 4, 20, 6));
    }
}
