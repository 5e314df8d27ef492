//! Query Session
//!
//! Glue between the pipeline and whatever drives it (the CLI shell, a UI).
//! Queries run on tokio tasks; their completions come back over a channel and
//! are applied by the owner of the session, so the grid is only ever touched
//! from one logical thread.
//!
//! Completions are applied in arrival order. If two queries overlap, the one
//! that finishes last replaces the other's table even if it was issued first.
//! There is no cancellation and no request sequencing.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::client::{ConnectionParams, QueryRequest, QueryTransport, RawResponse};
use crate::grid::{RecordCount, ResultGrid};
use crate::result::{self, QueryError, QueryResult, TabularDataset};

/// Query used to check that a connection works
pub const TEST_QUERY: &str = "SHOW MEASUREMENTS";

/// A finished execution, ready to be applied
#[derive(Debug)]
pub struct Completion {
    pub query: String,
    pub raw: RawResponse,
    pub result: QueryResult<TabularDataset>,
    pub elapsed: Duration,
    pub finished_at: DateTime<Utc>,
}

/// What applying a completion did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// A new table is installed
    Table(RecordCount),
    /// Valid execution with nothing to show
    NoData,
    Failed(QueryError),
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(count) => write!(f, "Query completed: {}", count),
            Self::NoData => write!(f, "Query executed successfully but returned no data"),
            Self::Failed(e) => write!(f, "Query failed: {}", e),
        }
    }
}

/// Run one query and parse the result
pub async fn run_query<T>(transport: &T, request: QueryRequest) -> Completion
where
    T: QueryTransport + ?Sized,
{
    let started = Instant::now();
    let raw = transport.execute(&request).await;
    let result = result::parse(&raw);
    let elapsed = started.elapsed();

    match &result {
        Ok(dataset) => tracing::info!(
            rows = dataset.len(),
            columns = dataset.column_count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Query finished"
        ),
        Err(e) if e.is_informational() => tracing::info!("Query returned no data"),
        Err(e) => tracing::warn!(error = %e, "Query failed"),
    }

    Completion {
        query: request.query,
        raw,
        result,
        elapsed,
        finished_at: Utc::now(),
    }
}

/// Check a connection by running `SHOW MEASUREMENTS`
///
/// An empty database still counts as a working connection.
pub async fn test_connection<T>(transport: &T, connection: &ConnectionParams) -> QueryResult<()>
where
    T: QueryTransport + ?Sized,
{
    let completion = run_query(transport, QueryRequest::new(connection.clone(), TEST_QUERY)).await;
    match completion.result {
        Ok(_) | Err(QueryError::NoData) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Owns the current grid and the stream of query completions
pub struct QuerySession<T: QueryTransport + 'static> {
    transport: Arc<T>,
    connection: ConnectionParams,
    grid: Option<ResultGrid>,
    last_raw: Option<String>,
    last_query: Option<String>,
    in_flight: usize,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl<T: QueryTransport + 'static> QuerySession<T> {
    pub fn new(transport: Arc<T>, connection: ConnectionParams) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            connection,
            grid: None,
            last_raw: None,
            last_query: None,
            in_flight: 0,
            completions_tx,
            completions_rx,
        }
    }

    pub fn connection(&self) -> &ConnectionParams {
        &self.connection
    }

    /// Current table, if the last applied query produced one
    pub fn grid(&self) -> Option<&ResultGrid> {
        self.grid.as_ref()
    }

    pub fn grid_mut(&mut self) -> Option<&mut ResultGrid> {
        self.grid.as_mut()
    }

    /// Raw body or error text of the last applied query
    pub fn raw_text(&self) -> Option<&str> {
        self.last_raw.as_deref()
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// Queries submitted but not yet applied
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Start a query on a background task
    pub fn submit(&mut self, query: impl Into<String>) -> JoinHandle<()> {
        let request = QueryRequest::new(self.connection.clone(), query);
        let transport = Arc::clone(&self.transport);
        let tx = self.completions_tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let completion = run_query(&*transport, request).await;
            // Receiver lives as long as the session
            let _ = tx.send(completion);
        })
    }

    /// Wait for the next completion; `None` when nothing is in flight
    pub async fn next_completion(&mut self) -> Option<Completion> {
        if self.in_flight == 0 {
            return None;
        }
        self.completions_rx.recv().await
    }

    /// Install a completion's result, replacing the previous table and its
    /// filter and sort state
    pub fn apply(&mut self, completion: Completion) -> QueryOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.last_raw = Some(completion.raw.raw_text());
        self.last_query = Some(completion.query);

        match completion.result {
            Ok(dataset) => {
                let grid = ResultGrid::new(dataset);
                let count = grid.record_count();
                self.grid = Some(grid);
                QueryOutcome::Table(count)
            }
            Err(QueryError::NoData) => {
                self.grid = None;
                QueryOutcome::NoData
            }
            Err(e) => {
                self.grid = None;
                QueryOutcome::Failed(e)
            }
        }
    }

    /// Run a query to completion and apply it
    pub async fn execute(&mut self, query: impl Into<String>) -> QueryOutcome {
        let request = QueryRequest::new(self.connection.clone(), query);
        self.in_flight += 1;
        let completion = run_query(&*self.transport, request).await;
        self.apply(completion)
    }

    pub async fn test_connection(&self) -> QueryResult<()> {
        test_connection(&*self.transport, &self.connection).await
    }

    /// Forget the current table and raw text
    pub fn clear(&mut self) {
        self.grid = None;
        self.last_raw = None;
        self.last_query = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Scheme;
    use crate::grid::ColumnPredicate;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Answers each query text with a canned response after a delay
    #[derive(Default)]
    struct FakeTransport {
        responses: HashMap<String, (Duration, RawResponse)>,
    }

    impl FakeTransport {
        fn respond(mut self, query: &str, delay_ms: u64, raw: RawResponse) -> Self {
            self.responses
                .insert(query.to_string(), (Duration::from_millis(delay_ms), raw));
            self
        }
    }

    #[async_trait]
    impl QueryTransport for FakeTransport {
        async fn execute(&self, request: &QueryRequest) -> RawResponse {
            match self.responses.get(&request.query) {
                Some((delay, raw)) => {
                    tokio::time::sleep(*delay).await;
                    raw.clone()
                }
                None => RawResponse::TransportError("no canned response".to_string()),
            }
        }
    }

    fn table(column: &str, values: &[&str]) -> RawResponse {
        let rows: Vec<serde_json::Value> = values.iter().map(|v| serde_json::json!([v])).collect();
        RawResponse::Ok(
            serde_json::json!({
                "results": [{"series": [{"name": "m", "columns": [column], "values": rows}]}]
            })
            .to_string(),
        )
    }

    fn connection() -> ConnectionParams {
        ConnectionParams::new(Scheme::Http, "localhost:8086", "telegraf", "token")
    }

    fn session(transport: FakeTransport) -> QuerySession<FakeTransport> {
        QuerySession::new(Arc::new(transport), connection())
    }

    #[tokio::test]
    async fn test_execute_installs_table() {
        let mut session = session(FakeTransport::default().respond(
            "SELECT * FROM cpu",
            0,
            table("host", &["a", "b", "c"]),
        ));

        let outcome = session.execute("SELECT * FROM cpu").await;

        assert_eq!(outcome, QueryOutcome::Table(RecordCount { visible: 3, total: 3 }));
        assert_eq!(session.grid().unwrap().columns(), &["host"]);
        assert_eq!(session.last_query(), Some("SELECT * FROM cpu"));
        assert!(session.raw_text().unwrap().contains("\"results\""));
        assert_eq!(session.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_new_result_resets_filters() {
        let mut session = session(
            FakeTransport::default()
                .respond("first", 0, table("host", &["a", "b"]))
                .respond("second", 0, table("host", &["x", "y", "z"])),
        );

        session.execute("first").await;
        let grid = session.grid_mut().unwrap();
        grid.set_column_filter(0, ColumnPredicate::equals("a"));
        grid.sort_by(0, false);
        assert_eq!(grid.visible_len(), 1);

        session.execute("second").await;
        let grid = session.grid().unwrap();
        assert!(grid.filters().is_empty());
        assert!(grid.sort().is_none());
        assert_eq!(grid.visible_len(), 3);
    }

    #[tokio::test]
    async fn test_failures_clear_table() {
        let mut session = session(
            FakeTransport::default()
                .respond("ok", 0, table("host", &["a"]))
                .respond("bad", 0, RawResponse::Ok(r#"{"results":[{"error":"boom"}]}"#.into()))
                .respond("empty", 0, RawResponse::Ok(r#"{"results":[{}]}"#.into())),
        );

        session.execute("ok").await;
        assert!(session.grid().is_some());

        let outcome = session.execute("bad").await;
        assert_eq!(outcome, QueryOutcome::Failed(QueryError::Query("boom".into())));
        assert!(session.grid().is_none());

        session.execute("ok").await;
        assert_eq!(session.execute("empty").await, QueryOutcome::NoData);
        assert!(session.grid().is_none());

        let outcome = session.execute("unknown").await;
        assert!(matches!(outcome, QueryOutcome::Failed(QueryError::Transport(_))));
        assert_eq!(session.raw_text(), Some("Error: no canned response"));
    }

    #[tokio::test]
    async fn test_last_arrival_wins() {
        let mut session = session(
            FakeTransport::default()
                .respond("slow", 150, table("from", &["slow"]))
                .respond("fast", 5, table("from", &["fast"])),
        );

        session.submit("slow");
        session.submit("fast");
        assert_eq!(session.in_flight(), 2);

        let first = session.next_completion().await.unwrap();
        assert_eq!(first.query, "fast");
        session.apply(first);

        let second = session.next_completion().await.unwrap();
        assert_eq!(second.query, "slow");
        session.apply(second);

        // Issued first, arrived last: its table is the one left standing
        let grid = session.grid().unwrap();
        assert_eq!(grid.visible_row(0).unwrap(), &["slow"]);
        assert_eq!(session.in_flight(), 0);
        assert!(session.next_completion().await.is_none());
    }

    #[tokio::test]
    async fn test_connection_check() {
        let ok = FakeTransport::default().respond(TEST_QUERY, 0, table("name", &["cpu"]));
        assert!(test_connection(&ok, &connection()).await.is_ok());

        let empty = FakeTransport::default()
            .respond(TEST_QUERY, 0, RawResponse::Ok(r#"{"results":[{}]}"#.into()));
        assert!(test_connection(&empty, &connection()).await.is_ok());

        let missing_db = FakeTransport::default().respond(
            TEST_QUERY,
            0,
            RawResponse::Ok(r#"{"results":[{"error":"database not found: nope"}]}"#.into()),
        );
        assert_eq!(
            test_connection(&missing_db, &connection()).await,
            Err(QueryError::Query("database not found: nope".into()))
        );

        let denied = FakeTransport::default().respond(
            TEST_QUERY,
            0,
            RawResponse::HttpError {
                status: 401,
                body: "unauthorized".into(),
            },
        );
        let session = session(denied);
        assert_eq!(
            session.test_connection().await,
            Err(QueryError::Http {
                status: 401,
                message: "unauthorized".into()
            })
        );
    }

    #[tokio::test]
    async fn test_clear() {
        let mut session = session(FakeTransport::default().respond("q", 0, table("a", &["1"])));
        session.execute("q").await;
        session.clear();
        assert!(session.grid().is_none());
        assert!(session.raw_text().is_none());
    }

    #[test]
    fn test_outcome_display() {
        let outcome = QueryOutcome::Table(RecordCount { visible: 2, total: 2 });
        assert_eq!(outcome.to_string(), "Query completed: 2 records");
        assert_eq!(
            QueryOutcome::Failed(QueryError::Query("x".into())).to_string(),
            "Query failed: Query error: x"
        );
    }
}
