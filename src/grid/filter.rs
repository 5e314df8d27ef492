//! Row filters
//!
//! A global substring filter plus one predicate per column. All comparisons
//! are case-insensitive and all active filters are AND-ed together.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Comparison applied by a column predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Contains,
    StartsWith,
    EndsWith,
    Equals,
    NotEquals,
}

impl FilterKind {
    /// Both arguments must already be lowercased
    fn matches(&self, cell: &str, value: &str) -> bool {
        match self {
            Self::Contains => cell.contains(value),
            Self::StartsWith => cell.starts_with(value),
            Self::EndsWith => cell.ends_with(value),
            Self::Equals => cell == value,
            Self::NotEquals => cell != value,
        }
    }
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "contains" | "~" => Ok(Self::Contains),
            "starts-with" | "starts_with" | "startswith" | "^" => Ok(Self::StartsWith),
            "ends-with" | "ends_with" | "endswith" | "$" => Ok(Self::EndsWith),
            "equals" | "eq" | "=" | "==" => Ok(Self::Equals),
            "not-equals" | "not_equals" | "ne" | "!=" | "<>" => Ok(Self::NotEquals),
            other => Err(format!(
                "Unknown filter kind '{}' (use contains, starts-with, ends-with, equals, not-equals)",
                other
            )),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contains => write!(f, "contains"),
            Self::StartsWith => write!(f, "starts with"),
            Self::EndsWith => write!(f, "ends with"),
            Self::Equals => write!(f, "equals"),
            Self::NotEquals => write!(f, "not equals"),
        }
    }
}

/// A filter scoped to one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPredicate {
    pub kind: FilterKind,
    pub value: String,
    /// Lowercased `value`, computed once
    needle: String,
}

impl ColumnPredicate {
    pub fn new(kind: FilterKind, value: impl Into<String>) -> Self {
        let value = value.into();
        let needle = value.to_lowercase();
        Self {
            kind,
            value,
            needle,
        }
    }

    pub fn contains(value: impl Into<String>) -> Self {
        Self::new(FilterKind::Contains, value)
    }

    pub fn equals(value: impl Into<String>) -> Self {
        Self::new(FilterKind::Equals, value)
    }

    pub fn matches(&self, cell: &str) -> bool {
        self.kind.matches(&cell.to_lowercase(), &self.needle)
    }
}

impl fmt::Display for ColumnPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\"", self.kind, self.value)
    }
}

impl FromStr for ColumnPredicate {
    type Err = String;

    /// `KIND:VALUE`, e.g. `starts-with:server`; the value may contain colons
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid filter '{}', expected KIND:VALUE", s))?;
        Ok(Self::new(kind.parse()?, value))
    }
}

/// Global and per-column predicates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    global: String,
    global_needle: String,
    per_column: BTreeMap<usize, ColumnPredicate>,
}

impl FilterState {
    pub fn global(&self) -> &str {
        &self.global
    }

    pub fn set_global(&mut self, text: impl Into<String>) {
        self.global = text.into();
        self.global_needle = self.global.to_lowercase();
    }

    pub fn column(&self, index: usize) -> Option<&ColumnPredicate> {
        self.per_column.get(&index)
    }

    pub fn columns(&self) -> impl Iterator<Item = (usize, &ColumnPredicate)> {
        self.per_column.iter().map(|(i, p)| (*i, p))
    }

    pub fn set_column(&mut self, index: usize, predicate: ColumnPredicate) {
        self.per_column.insert(index, predicate);
    }

    pub fn clear_column(&mut self, index: usize) -> Option<ColumnPredicate> {
        self.per_column.remove(&index)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// No predicate would reject any row
    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.per_column.is_empty()
    }

    /// Global predicate AND every column predicate
    pub fn matches(&self, row: &[String]) -> bool {
        self.matches_global(row) && self.matches_columns(row)
    }

    fn matches_global(&self, row: &[String]) -> bool {
        self.global_needle.is_empty()
            || row
                .iter()
                .any(|cell| cell.to_lowercase().contains(&self.global_needle))
    }

    fn matches_columns(&self, row: &[String]) -> bool {
        self.per_column.iter().all(|(index, predicate)| {
            row.get(*index)
                .map(|cell| predicate.matches(cell))
                .unwrap_or(false)
        })
    }
}
