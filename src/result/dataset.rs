//! Tabular query result

/// Column names and string rows from the first series of a result
///
/// Every row holds exactly `columns.len()` cells and rows keep the order the
/// server returned them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabularDataset {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TabularDataset {
    /// Build a dataset, padding short rows with empty cells and truncating long ones
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look a column up by name, case-insensitively
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rows_normalized_to_column_count() {
        let dataset = TabularDataset::new(
            strings(&["time", "host", "value"]),
            vec![strings(&["1", "a"]), strings(&["2", "b", "3", "extra"])],
        );

        assert_eq!(dataset.row(0).unwrap(), &["1", "a", ""]);
        assert_eq!(dataset.row(1).unwrap(), &["2", "b", "3"]);
        assert!(dataset.rows().iter().all(|r| r.len() == dataset.column_count()));
    }

    #[test]
    fn test_column_index() {
        let dataset = TabularDataset::new(strings(&["time", "Host"]), vec![]);
        assert_eq!(dataset.column_index("Host"), Some(1));
        assert_eq!(dataset.column_index("host"), Some(1));
        assert_eq!(dataset.column_index("value"), None);
        assert!(dataset.is_empty());
    }
}
