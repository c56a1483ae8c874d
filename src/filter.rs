//! Substring filter across all columns of the dataset.
//!
//! Matching is case-insensitive: both the query and the cell renderings are
//! lowercased with `str::to_lowercase`. Whitespace in the query is kept as is,
//! so `" "` only matches cells that contain a space.

use rayon::prelude::*;
use std::time::Instant;
use tracing::trace;

use crate::dataset::Dataset;

/// A lowercased query, ready to be matched against lowercased cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    needle: String,
}

impl Query {
    pub fn new(term: &str) -> Self {
        Query {
            needle: term.to_lowercase(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.needle
    }
}

/// True if the query is contained in at least one cell. `cells` must already be lowercased.
pub fn matches<S: AsRef<str>>(cells: &[S], query: &Query) -> bool {
    query.is_empty() || cells.iter().any(|c| c.as_ref().contains(query.as_str()))
}

/// Dataset indices of all matching records, in dataset order.
pub fn filter_rows(dataset: &Dataset, query: &Query) -> Vec<usize> {
    if query.is_empty() {
        return (0..dataset.len()).collect();
    }

    let start_time = Instant::now();
    let rows: Vec<usize> = dataset
        .search_cells()
        .par_iter()
        .enumerate()
        .filter(|(_, cells)| matches(&cells[..], query))
        .map(|(idx, _)| idx)
        .collect();

    trace!(
        "Filter \"{}\" matched {}/{} rows in {}us",
        query.as_str(),
        rows.len(),
        dataset.len(),
        start_time.elapsed().as_micros()
    );
    rows
}
