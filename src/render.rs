//! Plain-text table rendering for the terminal

use crate::grid::ResultGrid;

/// Widest a rendered column may get before cells are cut
pub const MAX_COLUMN_WIDTH: usize = 40;

/// Render the grid's visible rows, at most `limit` of them
pub fn render_grid(grid: &ResultGrid, limit: Option<usize>) -> String {
    let shown = limit.unwrap_or(usize::MAX).min(grid.visible_len());
    let rows: Vec<&[String]> = grid.visible_rows().take(shown).collect();

    let mut out = render_table(grid.columns(), &rows);

    if shown < grid.visible_len() {
        out.push_str(&format!("... {} more rows\n", grid.visible_len() - shown));
    }
    out.push_str(&format!("{}\n", grid.record_count()));
    out
}

/// Render headers and rows with aligned columns
pub fn render_table(columns: &[String], rows: &[&[String]]) -> String {
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| display_width(cell))
                .chain(std::iter::once(display_width(header)))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let mut out = String::new();

    // Header
    out.push_str(&format_line(columns.iter().map(String::as_str), &widths));

    // Separator
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&separator.join("-+-"));
    out.push('\n');

    // Data rows
    for row in rows {
        out.push_str(&format_line(row.iter().map(String::as_str), &widths));
    }

    out
}

fn format_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| {
            let cell = fit(cell, *width);
            let pad = width.saturating_sub(display_width(&cell));
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect();

    let mut line = padded.join(" | ");
    line.truncate(line.trim_end().len());
    line.push('\n');
    line
}

/// Single-line form of a cell, cut to `width` characters
fn fit(cell: &str, width: usize) -> String {
    let flat: String = cell
        .chars()
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .collect();

    if display_width(&flat) <= width {
        return flat;
    }
    let mut cut: String = flat.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

fn display_width(s: &str) -> usize {
    s.chars().count()
}
