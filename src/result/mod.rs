//! Query Results
//!
//! Interprets `/query` response bodies as tables.
//!
//! ## Response shapes
//!
//! - `results[0].series[0]` with `columns`/`values`: a table
//! - `results[0].error` or `results[0].series[0].error`: query failure
//! - `results[0]` without `series`, or an empty `series`: no data
//! - empty `results`: empty response
//! - anything else: malformed

mod dataset;
mod error;
mod parser;

pub use dataset::TabularDataset;
pub use error::{QueryError, QueryResult};
pub use parser::{parse, parse_body};
