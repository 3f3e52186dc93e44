//! Path network source.
//!
//! The network is obtained once at startup: read from a local JSON file
//! when `source.path` is set, otherwise fetched with a single GET against
//! `source.url`. Feature services report failures as a `200 OK` carrying
//! an `{"error": {...}}` document, so the body is inspected before it is
//! decoded. Every failure here is fatal; there are no retries.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use trackstream_core::config::SourceConfig;
use trackstream_types::PathNetwork;
use tracing::info;

/// Errors that can occur while obtaining the path network.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The HTTP request could not be built or sent.
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("{url} returned {status}: {body}")]
    Status {
        /// The queried URL.
        url: String,
        /// The HTTP status.
        status: u16,
        /// The response body, or a placeholder if unreadable.
        body: String,
    },

    /// The feature service returned an error document.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The body was not a path network.
    #[error("undecodable path network: {0}")]
    Decode(#[from] serde_json::Error),

    /// The local file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file that was read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Obtain the path network described by `config`.
///
/// # Errors
///
/// Returns a [`SourceError`] for any fetch, read, or decode failure.
pub async fn load_network(config: &SourceConfig) -> Result<PathNetwork, SourceError> {
    let body = match &config.path {
        Some(path) => read_file(Path::new(path)).await?,
        None => fetch(&config.url, Duration::from_millis(config.timeout_ms)).await?,
    };
    let network = parse_network(body)?;
    info!(
        features = network.features.len(),
        paths = network.path_count(),
        vertices = network.vertex_count(),
        "Path network loaded"
    );
    Ok(network)
}

/// Decode a feature-service response body into a [`PathNetwork`].
///
/// # Errors
///
/// Returns [`SourceError::Upstream`] for an `error` document and
/// [`SourceError::Decode`] when the body has the wrong shape.
pub fn parse_network(body: Value) -> Result<PathNetwork, SourceError> {
    if let Some(error) = body.get("error") {
        return Err(SourceError::Upstream(describe_upstream_error(error)));
    }
    Ok(serde_json::from_value(body)?)
}

fn describe_upstream_error(error: &Value) -> String {
    let code = error.get("code").and_then(Value::as_i64);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("no message");
    match code {
        Some(code) => format!("{code} {message}"),
        None => message.to_owned(),
    }
}

async fn fetch(url: &str, timeout: Duration) -> Result<Value, SourceError> {
    info!(url, timeout_ms = timeout.as_millis(), "Fetching path network");

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SourceError::Request(format!("client build failed: {e}")))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| SourceError::Request(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error body".to_owned());
        return Err(SourceError::Status {
            url: url.to_owned(),
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SourceError::Request(format!("body read failed: {e}")))?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn read_file(path: &Path) -> Result<Value, SourceError> {
    info!(path = %path.display(), "Reading path network");
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(serde_json::from_str(&contents)?)
}
