//! Response parser
//!
//! Turns a [`RawResponse`] into a [`TabularDataset`]. The JSON is classified
//! once into a [`ParsedResult`]; only the first statement result and its first
//! series are ever turned into a table.

use serde::Deserialize;
use serde_json::Value;

use super::dataset::TabularDataset;
use super::error::{QueryError, QueryResult};
use crate::client::RawResponse;

/// Top-level response body
#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<Value>,
}

/// One statement result; later statements are never deserialized
#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Option<Vec<Value>>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    columns: Option<Vec<String>>,
    #[serde(default)]
    values: Option<Vec<Vec<Value>>>,
    #[serde(default)]
    error: Option<Value>,
}

/// Shape of a response body, decided once
#[derive(Debug)]
enum ParsedResult {
    Table(Series),
    QueryFailed(String),
    Empty,
    NoData,
}

/// Interpret a raw response
pub fn parse(raw: &RawResponse) -> QueryResult<TabularDataset> {
    match raw {
        RawResponse::TransportError(message) => Err(QueryError::Transport(message.clone())),
        RawResponse::HttpError { status, body } => Err(QueryError::Http {
            status: *status,
            message: body.clone(),
        }),
        RawResponse::Ok(body) => parse_body(body),
    }
}

/// Interpret a 200 response body
pub fn parse_body(body: &str) -> QueryResult<TabularDataset> {
    match classify(body)? {
        ParsedResult::Table(series) => build_dataset(series),
        ParsedResult::QueryFailed(message) => Err(QueryError::Query(message)),
        ParsedResult::Empty => Err(QueryError::Empty("no results".to_string())),
        ParsedResult::NoData => Err(QueryError::NoData),
    }
}

fn classify(body: &str) -> QueryResult<ParsedResult> {
    let response: QueryResponse = serde_json::from_str(body)?;

    let first = match response.results.into_iter().next() {
        Some(first) => first,
        None => return Ok(ParsedResult::Empty),
    };
    let statement: StatementResult = serde_json::from_value(first)?;

    match statement.series {
        Some(series) => {
            if series.len() > 1 {
                tracing::debug!(ignored = series.len() - 1, "Only the first series is shown");
            }
            let first = match series.into_iter().next() {
                Some(first) => first,
                None => return Ok(ParsedResult::NoData),
            };
            let series: Series = serde_json::from_value(first)?;

            match &series.error {
                Some(error) => Ok(ParsedResult::QueryFailed(cell_text(error))),
                None => Ok(ParsedResult::Table(series)),
            }
        }
        None => match statement.error {
            Some(error) => Ok(ParsedResult::QueryFailed(cell_text(&error))),
            None => Ok(ParsedResult::NoData),
        },
    }
}

fn build_dataset(series: Series) -> QueryResult<TabularDataset> {
    let columns = series
        .columns
        .ok_or_else(|| QueryError::Malformed("series has no \"columns\" field".to_string()))?;
    let values = series
        .values
        .ok_or_else(|| QueryError::Malformed("series has no \"values\" field".to_string()))?;

    let rows = values
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let dataset = TabularDataset::new(columns, rows);
    tracing::debug!(
        series = series.name.as_deref().unwrap_or("-"),
        columns = dataset.column_count(),
        rows = dataset.len(),
        "Parsed result table"
    );
    Ok(dataset)
}

/// String form of one JSON cell; null becomes an empty string
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
