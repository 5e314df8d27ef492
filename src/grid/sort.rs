//! Single-column sort

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The one active sort, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: usize,
    pub ascending: bool,
}

impl SortState {
    pub fn new(column: usize, ascending: bool) -> Self {
        Self { column, ascending }
    }

    /// Case-insensitive lexicographic comparison of the sort column
    ///
    /// Values are compared as text, so `"10"` sorts before `"2"`.
    pub fn compare(&self, a: &[String], b: &[String]) -> Ordering {
        let ordering = match (a.get(self.column), b.get(self.column)) {
            (Some(x), Some(y)) => compare_ignore_case(x, y),
            _ => Ordering::Equal,
        };

        if self.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    }
}

impl fmt::Display for SortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.ascending { "asc" } else { "desc" };
        write!(f, "column {} {}", self.column, direction)
    }
}

fn compare_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Sort direction as typed on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn is_ascending(&self) -> bool {
        matches!(self, Self::Ascending)
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "asc" | "ascending" | "up" => Ok(Self::Ascending),
            "desc" | "descending" | "down" => Ok(Self::Descending),
            other => Err(format!("Invalid sort direction: {} (use asc or desc)", other)),
        }
    }
}
