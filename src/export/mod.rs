//! Export
//!
//! Serializes the grid's visible rows. Export is pure: the caller decides
//! where the text goes.

pub mod csv;

use thiserror::Error;

pub use self::csv::{default_filename, export, export_grid, export_snapshot, write_file};

/// Errors that can occur while exporting
#[derive(Error, Debug)]
pub enum ExportError {
    /// The visible view is empty
    #[error("No data to export. Run a query first or relax the filters.")]
    NothingToExport,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;
