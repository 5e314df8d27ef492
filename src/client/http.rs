//! HTTP query client
//!
//! Issues `GET /query` against an InfluxDB-compatible endpoint and classifies
//! the outcome into a [`RawResponse`]. Failures are never retried.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use std::time::Duration;
use tokio::time::timeout;
use tracing::Instrument;
use uuid::Uuid;

use super::connection::{ConnectionParams, QueryRequest};
use super::response::{synthesize_http_message, RawResponse};
use super::QueryTransport;

/// Transport settings shared by every query
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Time allowed to establish the TCP/TLS connection
    pub connect_timeout: Duration,
    /// Longest wait for the response headers or for any one body chunk
    pub read_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
            user_agent: format!("fluxgrid/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Query endpoint client
///
/// A fresh reqwest client is built per call so that TLS settings stay scoped
/// to the connection that asked for them.
#[derive(Debug, Clone, Default)]
pub struct QueryClient {
    settings: ClientSettings,
}

impl QueryClient {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Execute one query and classify the outcome
    pub async fn execute(&self, request: &QueryRequest) -> RawResponse {
        let span = tracing::info_span!(
            "query",
            request_id = %Uuid::new_v4(),
            host = %request.connection.host,
            database = %request.connection.database,
        );

        self.execute_inner(request).instrument(span).await
    }

    async fn execute_inner(&self, request: &QueryRequest) -> RawResponse {
        let connection = &request.connection;

        let client = match self.build_client(connection) {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create HTTP client");
                return RawResponse::TransportError(format!("Failed to create HTTP client: {}", e));
            }
        };

        tracing::debug!(
            endpoint = %connection.endpoint(),
            token = %connection.masked_token(),
            query = %request.query,
            "Sending query"
        );
        if connection.skips_verification() {
            tracing::warn!("Certificate validation disabled for this connection");
        }

        let read_timeout = self.settings.read_timeout;
        let send = client
            .get(request.url())
            .header(ACCEPT, "application/json")
            .send();

        let response = match timeout(read_timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let message = describe_transport_error(&e);
                tracing::warn!(error = %message, "Query transport failed");
                return RawResponse::TransportError(message);
            }
            Err(_) => {
                let message = read_timeout_message(read_timeout);
                tracing::warn!(error = %message, "Query transport failed");
                return RawResponse::TransportError(message);
            }
        };

        let status = response.status().as_u16();
        tracing::debug!(status, "Response received");

        if status == 200 {
            match read_body(response, read_timeout).await {
                Ok(body) => {
                    tracing::info!(bytes = body.len(), "Query succeeded");
                    RawResponse::Ok(body)
                }
                Err(message) => {
                    tracing::warn!(error = %message, "Failed to read response body");
                    RawResponse::TransportError(format!(
                        "Failed to read response body: {}",
                        message
                    ))
                }
            }
        } else {
            let body = match read_body(response, read_timeout).await {
                Ok(text) if !text.trim().is_empty() => text,
                Ok(_) => synthesize_http_message(status),
                Err(message) => {
                    tracing::warn!(error = %message, "Failed to read error body");
                    format!("HTTP {} Error - Unable to read error details", status)
                }
            };
            tracing::warn!(status, body = %body, "Query returned HTTP error");
            RawResponse::HttpError { status, body }
        }
    }

    fn build_client(&self, connection: &ConnectionParams) -> Result<Client, reqwest::Error> {
        // No overall timeout: reads are bounded one at a time in `execute_inner`
        let mut builder = Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .user_agent(self.settings.user_agent.as_str());

        if connection.skips_verification() {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        builder.build()
    }
}

#[async_trait]
impl QueryTransport for QueryClient {
    async fn execute(&self, request: &QueryRequest) -> RawResponse {
        QueryClient::execute(self, request).await
    }
}

/// Collect the body chunk by chunk; each chunk must arrive within `read_timeout`
async fn read_body(mut response: Response, read_timeout: Duration) -> Result<String, String> {
    let mut body = Vec::new();
    loop {
        match timeout(read_timeout, response.chunk()).await {
            Ok(Ok(Some(chunk))) => body.extend_from_slice(&chunk),
            Ok(Ok(None)) => break,
            Ok(Err(e)) => return Err(describe_transport_error(&e)),
            Err(_) => return Err(read_timeout_message(read_timeout)),
        }
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

fn read_timeout_message(read_timeout: Duration) -> String {
    format!("Request timed out: no data received for {:?}", read_timeout)
}

fn describe_transport_error(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "Request timed out"
    } else if err.is_connect() {
        "Connection failed"
    } else if err.is_builder() {
        "Invalid request"
    } else {
        "Request failed"
    };

    let mut message = format!("{}: {}", kind, err);
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(&format!(": {}", cause));
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Scheme;
    use axum::{
        extract::Query,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::get,
        Json, Router,
    };
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn fake_query(
        Query(params): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> Response {
        match params.get("db").map(String::as_str) {
            Some("unauthorized") => StatusCode::UNAUTHORIZED.into_response(),
            Some("broken") => (
                StatusCode::BAD_REQUEST,
                r#"{"error":"error parsing query: found EOF"}"#,
            )
                .into_response(),
            Some("slow") => {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "{}".into_response()
            }
            Some("stall") => {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                r#"{"results":[{}]}"#.into_response()
            }
            _ => Json(serde_json::json!({
                "p": params.get("p"),
                "db": params.get("db"),
                "q": params.get("q"),
                "accept": headers.get("accept").and_then(|v| v.to_str().ok()),
                "user_agent": headers.get("user-agent").and_then(|v| v.to_str().ok()),
            }))
            .into_response(),
        }
    }

    async fn spawn_fake_server() -> SocketAddr {
        let app = Router::new().route("/query", get(fake_query));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn request(addr: SocketAddr, database: &str, query: &str) -> QueryRequest {
        let connection =
            ConnectionParams::new(Scheme::Http, addr.to_string(), database, "tok en&=");
        QueryRequest::new(connection, query)
    }

    #[tokio::test]
    async fn test_success_returns_body() {
        let addr = spawn_fake_server().await;
        let client = QueryClient::default();

        let raw = client
            .execute(&request(addr, "telegraf", "SELECT * FROM \"cpu\" WHERE a='b&c'"))
            .await;

        let body = match raw {
            RawResponse::Ok(body) => body,
            other => panic!("expected Ok, got {:?}", other),
        };
        let echoed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(echoed["p"], "tok en&=");
        assert_eq!(echoed["db"], "telegraf");
        assert_eq!(echoed["q"], "SELECT * FROM \"cpu\" WHERE a='b&c'");
        assert_eq!(echoed["accept"], "application/json");
        assert!(echoed["user_agent"].as_str().unwrap().starts_with("fluxgrid/"));
    }

    #[tokio::test]
    async fn test_empty_error_body_is_synthesized() {
        let addr = spawn_fake_server().await;
        let client = QueryClient::default();

        let raw = client.execute(&request(addr, "unauthorized", "SHOW MEASUREMENTS")).await;

        assert_eq!(
            raw,
            RawResponse::HttpError {
                status: 401,
                body: "HTTP 401 Error - Unauthorized. Check your API token.".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_error_body_is_passed_through() {
        let addr = spawn_fake_server().await;
        let client = QueryClient::default();

        let raw = client.execute(&request(addr, "broken", "SELECT")).await;

        match raw {
            RawResponse::HttpError { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("found EOF"));
            }
            other => panic!("expected HttpError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = QueryClient::default();
        let raw = client.execute(&request(addr, "telegraf", "SHOW DATABASES")).await;

        assert!(matches!(raw, RawResponse::TransportError(_)));
    }

    #[tokio::test]
    async fn test_read_timeout_is_transport_error() {
        let addr = spawn_fake_server().await;
        let client = QueryClient::new(ClientSettings {
            connect_timeout: Duration::from_millis(500),
            read_timeout: Duration::from_millis(200),
            ..ClientSettings::default()
        });

        let raw = client.execute(&request(addr, "slow", "SELECT 1")).await;

        match raw {
            RawResponse::TransportError(message) => {
                assert!(message.starts_with("Request timed out"))
            }
            other => panic!("expected TransportError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_header_stall_longer_than_read_timeout() {
        let addr = spawn_fake_server().await;
        // connect + read exceeds the stall, read alone does not
        let client = QueryClient::new(ClientSettings {
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_millis(500),
            ..ClientSettings::default()
        });

        let started = Instant::now();
        let raw = client.execute(&request(addr, "stall", "SELECT 1")).await;

        match raw {
            RawResponse::TransportError(message) => {
                assert!(message.starts_with("Request timed out"), "{}", message)
            }
            other => panic!("expected TransportError, got {:?}", other),
        }
        assert!(started.elapsed() < Duration::from_millis(1400));
    }

    /// Serves one chunked 200 response, pausing before every chunk
    async fn spawn_chunked_server(chunks: &'static [&'static str], pause: Duration) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;

            let head = "HTTP/1.1 200 OK\r\n\
                        Content-Type: application/json\r\n\
                        Transfer-Encoding: chunked\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            for chunk in chunks {
                tokio::time::sleep(pause).await;
                let framed = format!("{:x}\r\n{}\r\n", chunk.len(), chunk);
                if socket.write_all(framed.as_bytes()).await.is_err() {
                    return;
                }
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        });
        addr
    }

    #[tokio::test]
    async fn test_slow_steady_body_is_not_cut_off() {
        const CHUNKS: &[&str] = &["{\"results\"", ":[", "{\"series\"", ":[]", "}", "]}"];
        let addr = spawn_chunked_server(CHUNKS, Duration::from_millis(200)).await;
        // Whole transfer takes longer than connect + read
        let client = QueryClient::new(ClientSettings {
            connect_timeout: Duration::from_millis(300),
            read_timeout: Duration::from_millis(500),
            ..ClientSettings::default()
        });

        let raw = client.execute(&request(addr, "telegraf", "SELECT 1")).await;

        assert_eq!(raw, RawResponse::Ok(CHUNKS.concat()));
    }

    #[tokio::test]
    async fn test_body_stall_is_transport_error() {
        const CHUNKS: &[&str] = &["{\"results\":", "[{}]}"];
        let addr = spawn_chunked_server(CHUNKS, Duration::from_millis(900)).await;
        let client = QueryClient::new(ClientSettings {
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_millis(300),
            ..ClientSettings::default()
        });

        let raw = client.execute(&request(addr, "telegraf", "SELECT 1")).await;

        match raw {
            RawResponse::TransportError(message) => {
                assert!(message.contains("Request timed out"), "{}", message)
            }
            other => panic!("expected TransportError, got {:?}", other),
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = ClientSettings::default();
        assert_eq!(settings.connect_timeout, Duration::from_secs(10));
        assert_eq!(settings.read_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_insecure_client_builds() {
        let client = QueryClient::default();
        let connection =
            ConnectionParams::new(Scheme::Https, "localhost", "db", "t").insecure(true);
        assert!(client.build_client(&connection).is_ok());
    }
}
