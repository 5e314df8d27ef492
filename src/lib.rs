//! # fluxgrid
//!
//! Ad-hoc query runner for InfluxDB-compatible HTTP `/query` endpoints.
//! Executes a query, turns the first series of the response into a table,
//! and lets the caller filter, sort and export the visible rows as CSV.
//!
//! ## Modules
//!
//! - [`client`]: request construction and HTTP execution
//! - [`result`]: response parsing into a [`TabularDataset`]
//! - [`grid`]: filter and sort state over a dataset
//! - [`export`]: CSV serialization of the visible view
//! - [`session`]: applies query completions from background tasks
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fluxgrid::{ConnectionParams, QueryClient, QuerySession, QueryOutcome, Scheme};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connection = ConnectionParams::new(Scheme::Http, "localhost:8086", "telegraf", "my-token");
//!     let mut session = QuerySession::new(Arc::new(QueryClient::default()), connection);
//!
//!     if let QueryOutcome::Table(count) = session.execute("SELECT * FROM cpu LIMIT 100").await {
//!         println!("{}", count);
//!     }
//!
//!     if let Some(grid) = session.grid_mut() {
//!         grid.set_global_filter("server01");
//!         grid.sort_by(0, false);
//!         let csv = fluxgrid::export::export_grid(grid)?;
//!         println!("{}", csv);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod export;
pub mod grid;
pub mod logging;
pub mod render;
pub mod result;
pub mod session;

// Re-export top-level types for convenience
pub use client::{
    ClientSettings, ConnectionParams, QueryClient, QueryRequest, QueryTransport, RawResponse,
    Scheme,
};

pub use result::{QueryError, QueryResult, TabularDataset};

pub use grid::{
    ColumnPredicate, FilterKind, FilterState, GridSnapshot, RecordCount, ResultGrid,
    SortDirection, SortState,
};

pub use export::{ExportError, ExportResult};

pub use session::{Completion, QueryOutcome, QuerySession};

pub use config::{Config, ConfigError, ConnectionConfig, LoggingConfig};
