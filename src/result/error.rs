//! Query error types
//!
//! Every way a single execution can end without a table.

use thiserror::Error;

/// Errors that can occur while executing or interpreting a query
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// DNS, connect, timeout or TLS failure before any status was obtained
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-200 HTTP status
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// The response carried an empty `results` array
    #[error("Empty response: {0}")]
    Empty(String),

    /// The server executed the query and reported a failure
    #[error("Query error: {0}")]
    Query(String),

    /// Valid execution that produced no series
    #[error("Query executed successfully but returned no data")]
    NoData,

    /// HTTP 200 but not the expected JSON shape
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl QueryError {
    /// `NoData` is an empty state to display, not a failure to report
    pub fn is_informational(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::Malformed(err.to_string())
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::Http {
            status: 401,
            message: "unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 401: unauthorized");

        let err = QueryError::Query("database not found: foo".to_string());
        assert_eq!(err.to_string(), "Query error: database not found: foo");
    }

    #[test]
    fn test_informational() {
        assert!(QueryError::NoData.is_informational());
        assert!(!QueryError::Empty("no results".into()).is_informational());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: QueryError = json_err.into();
        assert!(matches!(err, QueryError::Malformed(_)));
    }
}
