//! Raw outcome of one HTTP exchange

/// What came back from the query endpoint, before any JSON is looked at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawResponse {
    /// HTTP 200 with the full response body
    Ok(String),
    /// Any other status, with the server's body or a synthesized message
    HttpError { status: u16, body: String },
    /// No status was obtained (connect, timeout, TLS, bad URL)
    TransportError(String),
}

impl RawResponse {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Text suitable for a "raw result" view
    pub fn raw_text(&self) -> String {
        match self {
            Self::Ok(body) => body.clone(),
            Self::HttpError { status, body } => format!("ERROR {}: {}", status, body),
            Self::TransportError(message) => format!("Error: {}", message),
        }
    }
}

/// Message used when a non-200 response carried no body
pub fn synthesize_http_message(status: u16) -> String {
    let hint = match status {
        401 => Some("Unauthorized. Check your API token."),
        403 => Some("Forbidden. Check your permissions."),
        404 => Some("Not Found. Check the endpoint URL."),
        s if s >= 500 => Some("Server Error. Try again later."),
        _ => None,
    };

    match hint {
        Some(hint) => format!("HTTP {} Error - {}", status, hint),
        None => format!("HTTP {} Error", status),
    }
}
