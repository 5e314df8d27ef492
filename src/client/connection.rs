//! Connection parameters and request URL construction

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// URL scheme for the query endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(format!("Unsupported scheme: {} (expected http or https)", other)),
        }
    }
}

/// Everything needed to reach one database
///
/// Supplied by the caller and never modified while a query is in flight.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub scheme: Scheme,
    /// Host with optional port, e.g. `localhost:8086`
    pub host: String,
    pub database: String,
    /// Opaque API token, sent as the `p` parameter
    pub token: String,
    /// Skip certificate and hostname validation (https only)
    pub insecure_skip_verify: bool,
}

impl ConnectionParams {
    pub fn new(
        scheme: Scheme,
        host: impl Into<String>,
        database: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            scheme,
            host: host.into(),
            database: database.into(),
            token: token.into(),
            insecure_skip_verify: false,
        }
    }

    pub fn insecure(mut self, skip_verify: bool) -> Self {
        self.insecure_skip_verify = skip_verify;
        self
    }

    /// `{scheme}://{host}/query`
    pub fn endpoint(&self) -> String {
        format!("{}://{}/query", self.scheme, self.host.trim_end_matches('/'))
    }

    /// Whether certificate validation is actually bypassed for this connection
    pub fn skips_verification(&self) -> bool {
        self.scheme == Scheme::Https && self.insecure_skip_verify
    }

    /// Token prefix safe for logs
    pub fn masked_token(&self) -> String {
        mask_token(&self.token)
    }
}

// Keep the token out of debug output
impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("database", &self.database)
            .field("token", &self.masked_token())
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .finish()
    }
}

/// Show at most the first four characters of a token
pub fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return "<empty>".to_string();
    }
    let prefix: String = token.chars().take(4).collect();
    format!("{}...", prefix)
}

/// One query execution against one connection
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub connection: ConnectionParams,
    pub query: String,
}

impl QueryRequest {
    pub fn new(connection: ConnectionParams, query: impl Into<String>) -> Self {
        Self {
            connection,
            query: query.into(),
        }
    }

    /// Full request URL with `p`, `db` and `q` percent-encoded in that order
    pub fn url(&self) -> String {
        format!(
            "{}?p={}&db={}&q={}",
            self.connection.endpoint(),
            urlencoding::encode(&self.connection.token),
            urlencoding::encode(&self.connection.database),
            urlencoding::encode(&self.query),
        )
    }
}
