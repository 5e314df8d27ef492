//! Result grid state
//!
//! Owns one dataset plus the active filters and sort. The visible view is kept
//! as a list of row indices and rebuilt from the full dataset on every change,
//! so the dataset itself is never reordered or trimmed.

use std::fmt;

use super::filter::{ColumnPredicate, FilterState};
use super::sort::SortState;
use crate::result::TabularDataset;

/// Filterable, sortable view over a [`TabularDataset`]
#[derive(Debug, Clone, Default)]
pub struct ResultGrid {
    dataset: TabularDataset,
    filters: FilterState,
    sort: Option<SortState>,
    /// Indices into `dataset.rows()`, in display order
    visible: Vec<usize>,
    revision: u64,
}

impl ResultGrid {
    /// Install a dataset with no filters and no sort
    pub fn new(dataset: TabularDataset) -> Self {
        let mut grid = Self {
            dataset,
            ..Self::default()
        };
        grid.recompute();
        grid
    }

    pub fn dataset(&self) -> &TabularDataset {
        &self.dataset
    }

    pub fn columns(&self) -> &[String] {
        self.dataset.columns()
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn sort(&self) -> Option<SortState> {
        self.sort
    }

    /// Bumped on every state change; renderers can poll it
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Rows after filtering and sorting, in display order
    pub fn visible_rows(&self) -> impl ExactSizeIterator<Item = &[String]> + '_ {
        let rows = self.dataset.rows();
        self.visible.iter().map(move |&i| rows[i].as_slice())
    }

    pub fn visible_row(&self, position: usize) -> Option<&[String]> {
        self.visible
            .get(position)
            .and_then(|&i| self.dataset.row(i))
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn record_count(&self) -> RecordCount {
        RecordCount {
            visible: self.visible.len(),
            total: self.dataset.len(),
        }
    }

    /// Show only rows where some cell contains `text`; empty text matches all
    pub fn set_global_filter(&mut self, text: impl Into<String>) {
        self.filters.set_global(text);
        self.recompute();
    }

    /// Replace the predicate on one column; an empty value clears it
    pub fn set_column_filter(&mut self, index: usize, predicate: ColumnPredicate) {
        if !self.check_column(index) {
            return;
        }
        if predicate.value.is_empty() {
            self.clear_column_filter(index);
            return;
        }
        tracing::debug!(column = index, filter = %predicate, "Column filter set");
        self.filters.set_column(index, predicate);
        self.recompute();
    }

    pub fn clear_column_filter(&mut self, index: usize) {
        if self.filters.clear_column(index).is_some() {
            self.recompute();
        }
    }

    /// Sort the filtered rows by one column; replaces any previous sort
    pub fn sort_by(&mut self, index: usize, ascending: bool) {
        if !self.check_column(index) {
            return;
        }
        self.sort = Some(SortState::new(index, ascending));
        self.recompute();
    }

    pub fn clear_sort(&mut self) {
        if self.sort.take().is_some() {
            self.recompute();
        }
    }

    /// Drop every filter and the sort, restoring server order
    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.sort = None;
        self.recompute();
    }

    /// Owned copy of the current view, safe to hand to another task
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            columns: self.columns().to_vec(),
            rows: self.visible_rows().map(<[String]>::to_vec).collect(),
            total: self.dataset.len(),
        }
    }

    fn check_column(&self, index: usize) -> bool {
        let valid = index < self.dataset.column_count();
        if !valid {
            tracing::warn!(
                column = index,
                columns = self.dataset.column_count(),
                "Ignoring out-of-range column"
            );
        }
        valid
    }

    fn recompute(&mut self) {
        let rows = self.dataset.rows();

        let mut visible: Vec<usize> = (0..rows.len())
            .filter(|&i| self.filters.matches(&rows[i]))
            .collect();

        // Stable: ties keep server order
        if let Some(sort) = self.sort {
            visible.sort_by(|&a, &b| sort.compare(&rows[a], &rows[b]));
        }

        self.visible = visible;
        self.revision += 1;
    }
}

/// Visible and total row counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordCount {
    pub visible: usize,
    pub total: usize,
}

impl RecordCount {
    pub fn is_filtered(&self) -> bool {
        self.visible != self.total
    }

    /// Status-bar wording
    pub fn status_label(&self) -> String {
        if self.total == 0 {
            "No records".to_string()
        } else if self.is_filtered() {
            format!("{} of {} records (filtered)", self.visible, self.total)
        } else {
            format!("{} records fetched", self.total)
        }
    }
}

impl fmt::Display for RecordCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_filtered() {
            write!(f, "{} of {} records", self.visible, self.total)
        } else {
            write!(f, "{} records", self.total)
        }
    }
}

/// Detached copy of a grid's visible view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSnapshot {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Row count of the underlying dataset
    pub total: usize,
}
