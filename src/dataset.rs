use serde::Deserialize;
use std::fs;
use std::io::{BufReader, ErrorKind};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::domain::CVError;

pub const BUNDLED_NAME: &str = "cryptocurrencies.json";
const BUNDLED_DATA: &str = include_str!("../data/cryptocurrencies.json");

pub const NCOLUMNS: usize = 6;
pub const COLUMNS: [&str; NCOLUMNS] = ["#", "Name", "Symbol", "Price", "Market Cap", "Volume (24h)"];

/// One row of the dataset. The shape is fixed and checked by the typed parse at load.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Record {
    pub rank: u32,
    pub name: String,
    pub symbol: String,
    pub price: f64,
    #[serde(alias = "marketCap")]
    pub market_cap: f64,
    #[serde(alias = "volume24h")]
    pub volume_24h: f64,
}

impl Record {
    /// String form of every field, in column order.
    pub fn cells(&self) -> [String; NCOLUMNS] {
        [
            self.rank.to_string(),
            self.name.clone(),
            self.symbol.clone(),
            self.price.to_string(),
            self.market_cap.to_string(),
            self.volume_24h.to_string(),
        ]
    }
}

#[derive(Debug)]
pub struct Dataset {
    name: String,
    records: Vec<Record>,
    cells: Vec<[String; NCOLUMNS]>,
    search_cells: Vec<[String; NCOLUMNS]>,
    max_widths: [usize; NCOLUMNS],
}

impl Dataset {
    pub fn from_records(name: impl Into<String>, records: Vec<Record>) -> Self {
        let cells: Vec<[String; NCOLUMNS]> = records.iter().map(Record::cells).collect();
        let search_cells = cells
            .iter()
            .map(|row| row.clone().map(|c| c.to_lowercase()))
            .collect();

        let mut max_widths = COLUMNS.map(|h| h.chars().count());
        for row in cells.iter() {
            for (w, c) in max_widths.iter_mut().zip(row.iter()) {
                *w = std::cmp::max(*w, c.chars().count());
            }
        }

        Dataset {
            name: name.into(),
            records,
            cells,
            search_cells,
            max_widths,
        }
    }

    /// The dataset compiled into the binary.
    pub fn bundled() -> Result<Self, CVError> {
        Self::parse(BUNDLED_NAME, BUNDLED_DATA.as_bytes())
    }

    pub fn load(path: PathBuf) -> Result<Self, CVError> {
        let path = Self::check_file(path)?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        let file = fs::File::open(&path)?;
        Self::parse(&name, BufReader::new(file))
    }

    #[instrument(skip(reader))]
    fn parse<R: std::io::Read>(name: &str, reader: R) -> Result<Self, CVError> {
        let start_time = Instant::now();
        let records: Vec<Record> = serde_json::from_reader(reader)?;
        let dataset = Self::from_records(name, records);
        info!(
            "Loaded {} records in {}ms ...",
            dataset.len(),
            start_time.elapsed().as_millis()
        );
        debug!("Column widths: {:?}", dataset.max_widths);
        Ok(dataset)
    }

    fn check_file(path: PathBuf) -> Result<PathBuf, CVError> {
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CVError::FileNotFound,
            ErrorKind::PermissionDenied => CVError::PermissionDenied,
            _ => CVError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(CVError::LoadingFailed(format!(
                "{} is not a file!",
                path.display()
            )));
        }
        Ok(path)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, idx: usize) -> Option<&Record> {
        self.records.get(idx)
    }

    pub fn cells(&self, idx: usize) -> &[String; NCOLUMNS] {
        &self.cells[idx]
    }

    /// Lowercased cells, what the filter predicate compares against.
    pub(crate) fn search_cells(&self) -> &[[String; NCOLUMNS]] {
        &self.search_cells
    }

    /// Widest rendering per column, header included.
    pub fn max_widths(&self) -> &[usize; NCOLUMNS] {
        &self.max_widths
    }
}

#[cfg(test)]
pub(crate) fn fixture_path(name: &str) -> PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}
