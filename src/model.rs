use std::time::Instant;
use tracing::{debug, info, trace};

use crate::dataset::{COLUMNS, Dataset, NCOLUMNS};
use crate::domain::{CVConfig, CVError, HELP_TEXT, Message};
use crate::filter::{Query, filter_rows};
use crate::inputter::{InputResult, Inputter};
use crate::ui::{FILTERLINE_HEIGHT, STATUSLINE_HEIGHT, TABLE_HEADER_HEIGHT};
use crate::viewport::{Viewport, ViewportWindow};

/// Column that takes up the width left over by the others.
pub const FILL_COLUMN: usize = 1;

#[derive(Debug, PartialEq)]
pub enum Status {
    LOADING,
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    FILTERINPUT,
}

/// One materialized row: its position in the filtered rows and its dataset index.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub position: usize,
    pub idx: usize,
    pub cells: Vec<String>,
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let table_height = ui_height
            .saturating_sub(FILTERLINE_HEIGHT)
            .saturating_sub(STATUSLINE_HEIGHT)
            .saturating_sub(TABLE_HEADER_HEIGHT);

        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_height,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

/// Everything the UI needs for one frame.
pub struct UIData {
    pub name: String,
    pub header: Vec<String>,
    pub column_widths: Vec<usize>,
    pub rows: Vec<RowView>,
    pub row_height: u16,
    pub nrows: usize,  // Rows matching the filter
    pub ntotal: usize, // Rows in the dataset
    pub window: ViewportWindow,
    pub filter: InputResult,
    pub active_filterinput: bool,
    pub show_popup: bool,
    pub popup_message: String,
    pub layout: UILayout,
    pub status_message: String,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            header: COLUMNS.iter().map(|c| c.to_string()).collect(),
            column_widths: vec![0; NCOLUMNS],
            rows: Vec::new(),
            row_height: 1,
            nrows: 0,
            ntotal: 0,
            window: ViewportWindow::default(),
            filter: InputResult::default(),
            active_filterinput: false,
            show_popup: false,
            popup_message: String::new(),
            layout: UILayout::default(),
            status_message: String::new(),
            last_update: Instant::now(),
        }
    }
}

pub struct Model {
    config: CVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    dataset: Dataset,
    query: Query,
    rows: Vec<usize>, // Dataset indices matching the query, in dataset order
    viewport: Viewport,
    scroll_offset: usize,
    window: ViewportWindow,
    column_widths: Vec<usize>,
    uilayout: UILayout,
    uidata: UIData,
    input: Inputter,
    last_input: InputResult,
    status_message: String,
}

impl Model {
    pub fn init(config: &CVConfig, ui_width: usize, ui_height: usize) -> Result<Self, CVError> {
        let uilayout = UILayout::from_values(ui_width, ui_height);
        let viewport = Viewport::new(config.row_height as usize, uilayout.table_height)
            .with_buffer(config.render_buffer);
        let mut model = Self {
            config: config.clone(),
            status: Status::LOADING,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            dataset: Dataset::from_records("", Vec::new()),
            query: Query::default(),
            rows: Vec::new(),
            viewport,
            scroll_offset: 0,
            window: ViewportWindow::default(),
            column_widths: vec![0; NCOLUMNS],
            uilayout,
            uidata: UIData::empty(),
            input: Inputter::default(),
            last_input: InputResult::default(),
            status_message: String::new(),
        };
        model.set_status_message("Loading ...");
        model.update_uidata();
        Ok(model)
    }

    pub fn load_dataset(&mut self, dataset: Dataset) {
        info!(
            "Showing dataset {} with {} records",
            dataset.name(),
            dataset.len()
        );
        self.column_widths = dataset
            .max_widths()
            .iter()
            .map(|w| {
                std::cmp::min(
                    w + self.config.column_width_margin,
                    self.config.max_column_width,
                )
            })
            .collect();
        self.dataset = dataset;
        self.rows = filter_rows(&self.dataset, &self.query);
        self.scroll_offset = 0;
        self.status = Status::READY;
        if self.dataset.is_empty() {
            self.set_status_message("Dataset has no records");
        } else {
            self.set_status_message(format!("Loaded {} records", self.dataset.len()));
        }
        self.update_window();
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::FILTERINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Message) -> Result<(), CVError> {
        trace!("Update: Modus {:?}, Message {:?}", self.modus, message);
        match self.modus {
            Modus::TABLE => match message {
                Message::Quit | Message::ForceQuit => self.quit(),
                Message::MoveDown => self.scroll_items(1),
                Message::MoveUp => self.scroll_items(-1),
                Message::MovePageDown => self.scroll_items(self.viewport.page_items() as i64),
                Message::MovePageUp => self.scroll_items(-(self.viewport.page_items() as i64)),
                Message::MoveBeginning => self.scroll_to(0),
                Message::MoveEnd => self.scroll_to(self.viewport.max_offset(self.rows.len())),
                Message::Scroll(rows) => self.scroll_items(rows as i64),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Filter => self.enter_filter_mode(),
                Message::Help => self.show_help(),
                Message::Exit => self.exit(),
                _ => (),
            },
            Modus::POPUP => match message {
                Message::ForceQuit => self.quit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit | Message::Enter | Message::Help | Message::Quit => self.exit(),
                _ => (),
            },
            Modus::FILTERINPUT => match message {
                Message::ForceQuit => self.quit(),
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Scroll(rows) => self.scroll_items(rows as i64),
                _ => (),
            },
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        match self.modus {
            Modus::TABLE => {
                // Leaving the table only drops a kept filter, quitting is explicit
                if !self.query.is_empty() {
                    self.input.clear();
                    self.last_input = self.input.get();
                    self.apply_filter("");
                }
            }
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
                self.update_uidata();
            }
            Modus::FILTERINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.update_uidata();
    }

    fn enter_filter_mode(&mut self) {
        trace!("Entering filter mode ...");
        self.previous_modus = self.modus;
        self.modus = Modus::FILTERINPUT;
        let current = self.last_input.input.clone();
        self.input.start(&current);
        self.last_input = self.input.get();
        self.update_uidata();
    }

    fn raw_input(&mut self, key: ratatui::crossterm::event::KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.changed {
            let term = self.last_input.input.clone();
            self.apply_filter(&term);
        }
        if self.last_input.canceled {
            trace!("Filter canceled");
        }
        if self.last_input.finished {
            trace!("Leaving filter mode with \"{}\"", self.last_input.input);
            self.modus = self.previous_modus;
            self.previous_modus = Modus::FILTERINPUT;
        }
        self.update_uidata();
    }

    /// Recomputes the filtered rows and re-clamps the scroll position against them.
    fn apply_filter(&mut self, term: &str) {
        let start_time = Instant::now();
        self.query = Query::new(term);
        self.rows = filter_rows(&self.dataset, &self.query);
        debug!(
            "Filter \"{}\" left {}/{} rows in {}ms",
            term,
            self.rows.len(),
            self.dataset.len(),
            start_time.elapsed().as_millis()
        );

        if self.query.is_empty() {
            self.set_status_message("");
        } else if self.rows.is_empty() {
            self.set_status_message("Found no matches!");
        } else if let Some(first) = self.dataset.record(self.rows[0]) {
            let noun = if self.rows.len() == 1 {
                "match"
            } else {
                "matches"
            };
            self.set_status_message(format!(
                "Found {} {}, first {} ({})",
                self.rows.len(),
                noun,
                first.name,
                first.symbol
            ));
        }
        self.update_window();
    }

    fn scroll_items(&mut self, items: i64) {
        self.scroll_lines(items * self.viewport.item_height() as i64);
    }

    fn scroll_lines(&mut self, lines: i64) {
        let target = (self.scroll_offset as i64 + lines).max(0) as usize;
        self.scroll_to(target);
    }

    fn scroll_to(&mut self, offset: usize) {
        self.scroll_offset = offset;
        self.update_window();
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        self.viewport.set_viewport_height(self.uilayout.table_height);
        self.update_window();
    }

    fn update_window(&mut self) {
        self.window = self.viewport.window(self.rows.len(), self.scroll_offset);
        // Store the clamped offset so scrolling back starts from what is shown
        self.scroll_offset = self.window.offset;
        self.update_uidata();
    }

    fn update_uidata(&mut self) {
        let rows = self
            .window
            .rendered
            .clone()
            .map(|position| {
                let idx = self.rows[position];
                RowView {
                    position,
                    idx,
                    cells: self.dataset.cells(idx).to_vec(),
                }
            })
            .collect();

        self.uidata = UIData {
            name: self.dataset.name().to_string(),
            header: COLUMNS.iter().map(|c| c.to_string()).collect(),
            column_widths: self.column_widths.clone(),
            rows,
            row_height: self.config.row_height,
            nrows: self.rows.len(),
            ntotal: self.dataset.len(),
            window: self.window.clone(),
            filter: self.last_input.clone(),
            active_filterinput: self.modus == Modus::FILTERINPUT,
            show_popup: self.modus == Modus::POPUP,
            popup_message: HELP_TEXT.to_string(),
            layout: self.uilayout.clone(),
            status_message: self.status_message.clone(),
            last_update: Instant::now(),
        };
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_update = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Record, fixture_path};
    use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn coins(n: usize) -> Dataset {
        let records = (0..n)
            .map(|i| Record {
                rank: i as u32 + 1,
                name: format!("Coin {i}"),
                symbol: format!("C{i}"),
                price: 1.5,
                market_cap: 1000.0,
                volume_24h: 10.0,
            })
            .collect();
        Dataset::from_records("generated", records)
    }

    // 24 terminal lines leave 21 table lines
    fn model_with(dataset: Dataset, cfg: &CVConfig) -> Model {
        let mut model = Model::init(cfg, 80, 24).unwrap();
        model.load_dataset(dataset);
        model
    }

    fn type_filter(model: &mut Model, term: &str) {
        model.update(Message::Filter).unwrap();
        for c in term.chars() {
            let key = KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE);
            model.update(Message::RawKey(key)).unwrap();
        }
    }

    // Dataset indices of the rendered rows
    fn shown(model: &Model) -> Vec<usize> {
        model.get_uidata().rows.iter().map(|r| r.idx).collect()
    }

    fn press(model: &mut Model, code: KeyCode) {
        let key = KeyEvent::new(code, KeyModifiers::NONE);
        model.update(Message::RawKey(key)).unwrap();
    }

    #[test]
    fn loading_then_ready() {
        let cfg = CVConfig::default();
        let mut model = Model::init(&cfg, 80, 24).unwrap();
        assert_eq!(model.status, Status::LOADING);
        assert!(model.get_uidata().rows.is_empty());

        model.load_dataset(Dataset::load(fixture_path("coins_small.json")).unwrap());
        assert_eq!(model.status, Status::READY);
        assert_eq!(shown(&model), vec![0, 1, 2]);
        assert_eq!(model.get_uidata().ntotal, 3);

        model.update(Message::Quit).unwrap();
        assert_eq!(model.status, Status::QUITTING);
    }

    #[test]
    fn empty_dataset_is_ready_and_empty() {
        let cfg = CVConfig::default();
        let model = model_with(Dataset::from_records("none", Vec::new()), &cfg);
        assert_eq!(model.status, Status::READY);
        assert!(model.get_uidata().window.is_empty());
        assert_eq!(model.get_uidata().status_message, "Dataset has no records");
    }

    #[test]
    fn layout_reserves_filter_status_and_header_lines() {
        let layout = UILayout::from_values(80, 24);
        assert_eq!(layout.table_height, 21);
        assert_eq!(UILayout::from_values(0, 1).table_height, 0);
    }

    #[test]
    fn typing_filters_on_every_keystroke() {
        let cfg = CVConfig::default();
        let mut model = model_with(Dataset::load(fixture_path("coins_small.json")).unwrap(), &cfg);

        model.update(Message::Filter).unwrap();
        assert!(model.raw_keyevents());
        press(&mut model, KeyCode::Char('e'));
        // Only Ethereum has an "e"
        assert_eq!(shown(&model), vec![1]);
        press(&mut model, KeyCode::Backspace);
        assert_eq!(shown(&model), vec![0, 1, 2]);
        press(&mut model, KeyCode::Char('A'));
        assert_eq!(shown(&model), vec![2]);
        assert_eq!(model.get_uidata().rows.len(), 1);
        assert_eq!(model.get_uidata().rows[0].cells[1], "Cardano");
    }

    #[test]
    fn enter_keeps_filter_and_escape_clears_it() {
        let cfg = CVConfig::default();
        let mut model = model_with(Dataset::load(fixture_path("coins_small.json")).unwrap(), &cfg);

        type_filter(&mut model, "btc");
        press(&mut model, KeyCode::Enter);
        assert!(!model.raw_keyevents());
        assert_eq!(model.get_uidata().filter.input, "btc");
        assert_eq!(shown(&model), vec![0]);
        assert_eq!(
            model.get_uidata().status_message,
            "Found 1 match, first Bitcoin (BTC)"
        );

        // Re-entering continues from the kept text
        model.update(Message::Filter).unwrap();
        assert_eq!(model.get_uidata().filter.input, "btc");
        press(&mut model, KeyCode::Esc);
        assert!(!model.raw_keyevents());
        assert_eq!(model.get_uidata().filter.input, "");
        assert_eq!(shown(&model), vec![0, 1, 2]);
    }

    #[test]
    fn escape_in_table_drops_kept_filter() {
        let cfg = CVConfig::default();
        let mut model = model_with(Dataset::load(fixture_path("coins_small.json")).unwrap(), &cfg);
        type_filter(&mut model, "ada");
        press(&mut model, KeyCode::Enter);
        assert_eq!(shown(&model), vec![2]);

        model.update(Message::Exit).unwrap();
        assert_eq!(shown(&model), vec![0, 1, 2]);
        assert_eq!(model.status, Status::READY);
    }

    #[test]
    fn no_match_gives_empty_window() {
        let cfg = CVConfig::default();
        let mut model = model_with(coins(500), &cfg);
        type_filter(&mut model, "no such coin");
        assert_eq!(model.get_uidata().nrows, 0);
        assert!(model.get_uidata().window.is_empty());
        assert!(model.get_uidata().rows.is_empty());
        assert_eq!(model.get_uidata().status_message, "Found no matches!");
    }

    #[test]
    fn scrolling_moves_and_clamps_window() {
        let cfg = CVConfig::default().with_render_buffer(0);
        let mut model = model_with(coins(100), &cfg);
        assert_eq!(model.get_uidata().window.visible, 0..21);

        model.update(Message::MoveDown).unwrap();
        assert_eq!(model.get_uidata().window.visible, 1..22);
        model.update(Message::MovePageDown).unwrap();
        assert_eq!(model.get_uidata().window.visible, 22..43);
        model.update(Message::MoveEnd).unwrap();
        assert_eq!(model.get_uidata().window.visible, 79..100);
        model.update(Message::MoveDown).unwrap();
        assert_eq!(model.get_uidata().window.visible, 79..100);
        model.update(Message::Scroll(-3)).unwrap();
        assert_eq!(model.get_uidata().window.visible, 76..97);
        model.update(Message::MoveBeginning).unwrap();
        model.update(Message::MoveUp).unwrap();
        assert_eq!(model.get_uidata().window.visible, 0..21);
    }

    #[test]
    fn shrinking_filter_pulls_offset_back() {
        let cfg = CVConfig::default().with_render_buffer(0);
        let mut model = model_with(coins(1000), &cfg);
        model.update(Message::MoveEnd).unwrap();
        assert_eq!(model.get_uidata().window.visible, 979..1000);

        // "Coin 9" matches 9 and 90..99 and 900..999: 111 rows
        type_filter(&mut model, "coin 9");
        assert_eq!(model.get_uidata().nrows, 111);
        assert_eq!(model.get_uidata().window.visible, 90..111);
        assert_eq!(model.get_uidata().window.offset, 90);

        // Fewer rows than lines
        press(&mut model, KeyCode::Char('9'));
        assert_eq!(model.get_uidata().nrows, 11);
        assert_eq!(model.get_uidata().window.visible, 0..11);
        assert_eq!(model.get_uidata().window.offset, 0);
    }

    #[test]
    fn rendered_rows_carry_buffer_and_dataset_index() {
        let cfg = CVConfig::default().with_render_buffer(2);
        let mut model = model_with(coins(100), &cfg);
        model.update(Message::Scroll(10)).unwrap();
        let uidata = model.get_uidata();
        assert_eq!(uidata.window.visible, 10..31);
        assert_eq!(uidata.window.rendered, 8..33);
        assert_eq!(uidata.rows.len(), 25);
        assert_eq!(uidata.rows[0].position, 8);
        assert_eq!(uidata.rows[0].idx, 8);
        assert_eq!(uidata.rows[0].cells[1], "Coin 8");
    }

    #[test]
    fn taller_rows_scroll_by_item() {
        let cfg = CVConfig::default().with_row_height(3).with_render_buffer(0);
        let mut model = model_with(coins(100), &cfg);
        // 21 lines hold 7 rows of 3 lines
        assert_eq!(model.get_uidata().window.visible, 0..7);
        model.update(Message::MoveDown).unwrap();
        assert_eq!(model.get_uidata().window.offset, 3);
        assert_eq!(model.get_uidata().window.visible, 1..8);
        assert_eq!(model.get_uidata().window.total_extent, 300);
    }

    #[test]
    fn resize_changes_viewport() {
        let cfg = CVConfig::default().with_render_buffer(0);
        let mut model = model_with(coins(100), &cfg);
        model.update(Message::Resize(80, 13)).unwrap();
        assert_eq!(model.get_uidata().window.visible, 0..10);
        assert_eq!(model.get_uidata().layout.table_height, 10);
    }

    #[test]
    fn help_popup_blocks_table_keys() {
        let cfg = CVConfig::default();
        let mut model = model_with(coins(100), &cfg);
        model.update(Message::Help).unwrap();
        assert!(model.get_uidata().show_popup);
        model.update(Message::MoveDown).unwrap();
        assert_eq!(model.get_uidata().window.offset, 0);
        model.update(Message::Exit).unwrap();
        assert!(!model.get_uidata().show_popup);
        model.update(Message::MoveDown).unwrap();
        assert_eq!(model.get_uidata().window.offset, 1);
    }

    #[test]
    fn popup_closes_on_enter_and_q() {
        let cfg = CVConfig::default();
        let mut model = model_with(coins(100), &cfg);
        model.update(Message::Help).unwrap();
        model.update(Message::Enter).unwrap();
        assert!(!model.get_uidata().show_popup);

        model.update(Message::Help).unwrap();
        model.update(Message::Quit).unwrap();
        assert!(!model.get_uidata().show_popup);
        assert_eq!(model.status, Status::READY);

        model.update(Message::Help).unwrap();
        model.update(Message::ForceQuit).unwrap();
        assert_eq!(model.status, Status::QUITTING);
    }

    #[test]
    fn ctrl_c_quits_while_editing_filter() {
        let cfg = CVConfig::default();
        let mut model = model_with(coins(100), &cfg);
        type_filter(&mut model, "q");
        assert_eq!(model.get_uidata().filter.input, "q");
        assert_eq!(model.status, Status::READY);
        model.update(Message::ForceQuit).unwrap();
        assert_eq!(model.status, Status::QUITTING);
    }

    #[test]
    fn status_message_counts_matches() {
        let cfg = CVConfig::default();
        let mut model = model_with(coins(100), &cfg);
        // "Coin 1" and "Coin 10" .. "Coin 19"
        type_filter(&mut model, "coin 1");
        assert_eq!(
            model.get_uidata().status_message,
            "Found 11 matches, first Coin 1 (C1)"
        );
        type_filter(&mut model, "5");
        assert_eq!(
            model.get_uidata().status_message,
            "Found 1 match, first Coin 15 (C15)"
        );
    }

    #[test]
    fn taller_rows_never_clip_the_last_row() {
        let cfg = CVConfig::default().with_row_height(2).with_render_buffer(0);
        let mut model = model_with(coins(100), &cfg);
        model.update(Message::MoveEnd).unwrap();
        let window = &model.get_uidata().window;
        assert_eq!(window.offset, 179);
        assert_eq!(window.visible, 89..100);
        // Row 89 is cut at the top, ten whole rows fill 20 of the 21 lines
        assert_eq!(window.whole, 90..100);

        // The wheel moves whole rows
        model.update(Message::Scroll(-3)).unwrap();
        assert_eq!(model.get_uidata().window.offset, 173);
        assert_eq!(model.get_uidata().window.whole, 87..97);
    }

    #[test]
    fn column_widths_are_capped() {
        let cfg = CVConfig::default().with_max_column_width(8);
        let model = model_with(Dataset::load(fixture_path("coins_small.json")).unwrap(), &cfg);
        let widths = &model.get_uidata().column_widths;
        // "#" header and single digit ranks plus margin
        assert_eq!(widths[0], 2);
        assert!(widths.iter().all(|&w| w <= 8));
    }
}
