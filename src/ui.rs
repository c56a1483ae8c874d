use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Position, Rect},
    style::{Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, Cell, Clear, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState, Table,
        Wrap,
    },
};

use unicode_width::UnicodeWidthStr;

use crate::domain::CVConfig;
use crate::model::{FILL_COLUMN, Model, UIData};

pub const FILTERLINE_HEIGHT: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const SCROLLBAR_WIDTH: usize = 1;
const COLUMN_SPACING: u16 = 1;
const FILTER_PROMPT: &str = "Filter: ";

#[derive(Debug)]
pub struct TableUI {
    config: CVConfig,
}

impl TableUI {
    pub fn new(config: &CVConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [filter_area, table_area, status_area] = Layout::vertical([
            Constraint::Length(FILTERLINE_HEIGHT as u16),
            Constraint::Fill(1),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        self.draw_filterline(uidata, filter_area, frame);
        self.draw_table(uidata, table_area, frame);
        self.draw_statusline(uidata, status_area, frame);

        if uidata.show_popup {
            self.draw_popup(uidata, frame);
        }
    }

    fn draw_filterline(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let filter = &uidata.filter;
        let line = if uidata.active_filterinput || !filter.input.is_empty() {
            Line::from(vec![
                FILTER_PROMPT.bold().blue(),
                Span::raw(filter.input.as_str()),
            ])
        } else {
            Line::from(vec![
                FILTER_PROMPT.bold().blue(),
                "press / to filter, ? for help".dark_gray(),
            ])
        };
        frame.render_widget(Paragraph::new(line), area);

        if uidata.active_filterinput {
            let before: String = filter.input.chars().take(filter.curser_pos).collect();
            let x = area.x + (FILTER_PROMPT.width() + before.width()) as u16;
            let x = x.min(area.right().saturating_sub(1));
            frame.set_cursor_position(Position::new(x, area.y));
        }
    }

    fn draw_table(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let [table_area, scrollbar_area] = Layout::horizontal([
            Constraint::Fill(1),
            Constraint::Length(SCROLLBAR_WIDTH as u16),
        ])
        .areas(area);

        let widths = uidata
            .column_widths
            .iter()
            .enumerate()
            .map(|(cidx, &w)| {
                if cidx == FILL_COLUMN {
                    Constraint::Fill(1)
                } else {
                    Constraint::Length(w as u16)
                }
            })
            .collect::<Vec<Constraint>>();

        let header = Row::new(
            uidata
                .header
                .iter()
                .enumerate()
                .map(|(cidx, h)| Self::aligned_cell(cidx, h.as_str()).bold()),
        )
        .style(Style::new().reversed())
        .height(TABLE_HEADER_HEIGHT as u16);

        // Rows in the render buffer and rows cut by the viewport edge are skipped
        let rows = uidata
            .rows
            .iter()
            .filter(|r| uidata.window.whole.contains(&r.position))
            .map(|r| {
                let row = Row::new(
                    r.cells
                        .iter()
                        .enumerate()
                        .map(|(cidx, c)| Self::aligned_cell(cidx, c.as_str())),
                )
                .height(uidata.row_height);
                if r.position % 2 == 1 {
                    row.on_black()
                } else {
                    row
                }
            });

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(COLUMN_SPACING);
        frame.render_widget(table, table_area);

        let viewport_height = uidata.layout.table_height;
        let mut scrollbar_state =
            ScrollbarState::new(uidata.window.total_extent.saturating_sub(viewport_height))
                .position(uidata.window.offset)
                .viewport_content_length(viewport_height);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(None)
                .end_symbol(None),
            Rect {
                y: scrollbar_area.y + TABLE_HEADER_HEIGHT as u16,
                height: scrollbar_area
                    .height
                    .saturating_sub(TABLE_HEADER_HEIGHT as u16),
                ..scrollbar_area
            },
            &mut scrollbar_state,
        );
    }

    fn aligned_cell(cidx: usize, content: &str) -> Cell<'_> {
        // Rank and the numeric columns read better right aligned
        let alignment = if cidx == 0 || cidx >= 3 {
            Alignment::Right
        } else {
            Alignment::Left
        };
        Cell::from(Line::from(content).alignment(alignment))
    }

    fn draw_statusline(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let window = &uidata.window;
        let range = if window.is_empty() {
            "-".to_string()
        } else {
            format!("{}-{}", window.visible.start + 1, window.visible.end)
        };
        let mut spans = vec![
            Span::raw(format!(" {} ", uidata.name)).reversed(),
            Span::raw(format!(" {}/{} records ", uidata.nrows, uidata.ntotal)),
            Span::raw(format!("| rows {range} ")),
        ];
        if !uidata.status_message.is_empty() {
            spans.push(Span::raw(format!("| {}", uidata.status_message)).yellow());
        }
        if self.config.render_buffer > 0 {
            spans.push(Span::raw(format!(" [{} rendered]", window.rendered.len())).dark_gray());
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn draw_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let area = popup_area(frame.area(), 60, 80);
        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .title_bottom(Line::from(" <Esc> close ".blue()).centered());
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(uidata.popup_message.as_str())
                .wrap(Wrap { trim: false })
                .block(block),
            area,
        );
    }
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}
