//! Result Grid
//!
//! In-memory view over a query result with a global filter, per-column
//! predicates and a single-column sort. The visible rows are always derived as
//! `sort(filter(rows))` from the untouched dataset.

mod filter;
mod sort;
mod state;

pub use filter::{ColumnPredicate, FilterKind, FilterState};
pub use sort::{SortDirection, SortState};
pub use state::{GridSnapshot, RecordCount, ResultGrid};
