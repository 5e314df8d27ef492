//! Query Client
//!
//! Builds the wire request for the `/query` endpoint, performs the HTTP call
//! and classifies the outcome.
//!
//! ## Architecture
//!
//! - **ConnectionParams**: scheme, host, database, token, TLS policy
//! - **QueryRequest**: one connection plus one query string
//! - **QueryClient**: reqwest-based HTTP client
//! - **RawResponse**: success body, HTTP error, or transport error

mod connection;
mod http;
mod response;

use async_trait::async_trait;

pub use connection::{mask_token, ConnectionParams, QueryRequest, Scheme};
pub use http::{ClientSettings, QueryClient};
pub use response::{synthesize_http_message, RawResponse};

/// Anything that can turn a [`QueryRequest`] into a [`RawResponse`]
///
/// Implemented by [`QueryClient`]; sessions are generic over it so they can
/// be driven without a network.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    async fn execute(&self, request: &QueryRequest) -> RawResponse;
}
