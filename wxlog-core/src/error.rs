use std::path::PathBuf;

use thiserror::Error;

/// Errors from the upstream geocoding and weather endpoints.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The geocoding lookup returned no match for the query.
    #[error("no geocoding match for '{0}'")]
    NotFound(String),

    /// Non-2xx response from the upstream API.
    #[error("{url} returned status {status}: {body}")]
    Http {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("request to {url} failed")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not the JSON shape we expect.
    #[error("failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from the per-city CSV store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
