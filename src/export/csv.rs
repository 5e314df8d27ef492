//! CSV export of the visible grid rows

use std::path::Path;

use super::{ExportError, ExportResult};
use crate::grid::{GridSnapshot, ResultGrid};

/// Serialize headers and rows
///
/// Headers are always quoted. A cell is quoted only when it contains a comma,
/// a double quote or a newline, with inner quotes doubled. Zero rows still
/// produce the header line.
pub fn export<'a, I>(columns: &[String], rows: I) -> String
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut csv = String::new();

    // Header
    let header: Vec<String> = columns
        .iter()
        .map(|c| format!("\"{}\"", c.replace('"', "\"\"")))
        .collect();
    csv.push_str(&header.join(","));
    csv.push('\n');

    // Rows
    for row in rows {
        let cells: Vec<String> = row.iter().map(|cell| escape_cell(cell)).collect();
        csv.push_str(&cells.join(","));
        csv.push('\n');
    }

    csv
}

/// Export the grid's current view
pub fn export_grid(grid: &ResultGrid) -> ExportResult<String> {
    if grid.visible_len() == 0 {
        return Err(ExportError::NothingToExport);
    }
    Ok(export(grid.columns(), grid.visible_rows()))
}

/// Export a detached view, e.g. from a background task
pub fn export_snapshot(snapshot: &GridSnapshot) -> ExportResult<String> {
    if snapshot.rows.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    Ok(export(
        &snapshot.columns,
        snapshot.rows.iter().map(Vec::as_slice),
    ))
}

/// Suggested file name for an export of `count` rows
pub fn default_filename(count: usize) -> String {
    format!("influxdb_export_{}_records.csv", count)
}

/// Write exported text to disk, creating parent directories
pub fn write_file(path: &Path, contents: &str) -> ExportResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)?;
    tracing::info!(path = ?path, bytes = contents.len(), "CSV exported");
    Ok(())
}

fn escape_cell(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
