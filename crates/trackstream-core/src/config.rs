//! Configuration loading and typed config structures for Trackstream.
//!
//! The canonical configuration lives in `trackstream-config.yaml` next to
//! the binary's working directory. Every section and field has a default,
//! so an empty or missing file yields a runnable service.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
///
/// Mirrors the structure of `trackstream-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrackstreamConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Simulation and broadcast settings.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Where the path network comes from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TrackstreamConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override file values:
    /// - `TRACKSTREAM_PORT` overrides `server.port`
    /// - `TRACKSTREAM_SOURCE_URL` overrides `source.url`
    /// - `TRACKSTREAM_SOURCE_PATH` overrides `source.path`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse_yaml(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string. Environment
    /// overrides are not applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config = Self::parse_yaml(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn parse_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `TRACKSTREAM_PORT` is not a port number.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `TRACKSTREAM_PORT` is not a port number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("TRACKSTREAM_PORT") {
            self.server.port = port.trim().parse().map_err(|e| ConfigError::Invalid {
                field: "server.port",
                reason: format!("TRACKSTREAM_PORT={port}: {e}"),
            })?;
        }
        if let Some(url) = lookup("TRACKSTREAM_SOURCE_URL") {
            self.source.url = url;
        }
        if let Some(path) = lookup("TRACKSTREAM_SOURCE_PATH") {
            self.source.path = Some(path);
        }
        Ok(())
    }

    /// Check every range constraint.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::Invalid`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stream.validate()
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Address to bind (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port for the stream socket and status API.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Simulation and broadcast parameters. Immutable for a run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamConfig {
    /// Number of simulated assets.
    #[serde(default = "default_tracked_assets")]
    pub tracked_assets: u32,

    /// Assets per broadcast page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Fraction of one path segment an asset moves per advance, in (0, 1).
    #[serde(default = "default_distance_step")]
    pub distance_step: f64,

    /// Stream square polygons instead of points.
    #[serde(default)]
    pub extrude_polygons: bool,

    /// Per-client ceiling on bytes queued but not yet written.
    #[serde(default = "default_max_buffered_bytes")]
    pub max_buffered_bytes: usize,

    /// Milliseconds between broadcasts.
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,
}

impl StreamConfig {
    /// Check range constraints on the stream parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tracked_assets == 0 {
            return Err(invalid("stream.tracked_assets", "must be positive"));
        }
        if self.page_size == 0 {
            return Err(invalid("stream.page_size", "must be positive"));
        }
        if !(self.distance_step > 0.0 && self.distance_step < 1.0) {
            return Err(invalid(
                "stream.distance_step",
                &format!("must be in (0, 1), got {}", self.distance_step),
            ));
        }
        if self.broadcast_interval_ms == 0 {
            return Err(invalid("stream.broadcast_interval_ms", "must be positive"));
        }
        Ok(())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tracked_assets: default_tracked_assets(),
            page_size: default_page_size(),
            distance_step: default_distance_step(),
            extrude_polygons: false,
            max_buffered_bytes: default_max_buffered_bytes(),
            broadcast_interval_ms: default_broadcast_interval_ms(),
        }
    }
}

/// Path network source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    /// Feature-service query URL returning polylines as JSON.
    #[serde(default = "default_source_url")]
    pub url: String,

    /// Local JSON file to read instead of fetching `url`.
    #[serde(default)]
    pub path: Option<String>,

    /// HTTP timeout for the fetch, in milliseconds.
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
            path: None,
            timeout_ms: default_source_timeout_ms(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_owned(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8000
}

const fn default_tracked_assets() -> u32 {
    24_000
}

const fn default_page_size() -> u32 {
    8_000
}

const fn default_distance_step() -> f64 {
    0.15
}

const fn default_max_buffered_bytes() -> usize {
    256 * 1024
}

const fn default_broadcast_interval_ms() -> u64 {
    200
}

fn default_source_url() -> String {
    concat!(
        "https://services2.arcgis.com/FiaPA4ga0iQKduv3/arcgis/rest/services/",
        "Transportation_v1/FeatureServer/9/query",
        "?where=BASENAME%3D%27Seaboard+Coast+Line%27",
        "&outFields=*&returnGeometry=true&resultOffset=0&resultRecordCount=8000",
        "&returnExceededLimitFeatures=true&f=json",
    )
    .to_owned()
}

const fn default_source_timeout_ms() -> u64 {
    30_000
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = TrackstreamConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.stream.tracked_assets, 24_000);
        assert_eq!(config.stream.page_size, 8_000);
        assert!((config.stream.distance_step - 0.15).abs() < f64::EPSILON);
        assert!(!config.stream.extrude_polygons);
        assert_eq!(config.stream.max_buffered_bytes, 262_144);
        assert_eq!(config.stream.broadcast_interval_ms, 200);
        assert!(config.source.path.is_none());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 9001

stream:
  tracked_assets: 300
  page_size: 100
  distance_step: 0.25
  extrude_polygons: true
  max_buffered_bytes: 4096
  broadcast_interval_ms: 50

source:
  url: "http://localhost:9999/query"
  path: "fixtures/network.json"
  timeout_ms: 1000

logging:
  level: "debug"
  json: true
"#;

        let config = TrackstreamConfig::parse(yaml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.stream.tracked_assets, 300);
        assert_eq!(config.stream.page_size, 100);
        assert!(config.stream.extrude_polygons);
        assert_eq!(config.stream.max_buffered_bytes, 4096);
        assert_eq!(config.source.path.as_deref(), Some("fixtures/network.json"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = TrackstreamConfig::parse("stream:\n  page_size: 500\n").unwrap();
        assert_eq!(config.stream.page_size, 500);
        assert_eq!(config.stream.tracked_assets, 24_000);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = TrackstreamConfig::parse("");
        assert_eq!(config.ok(), Some(TrackstreamConfig::default()));
    }

    #[test]
    fn rejects_out_of_range_values() {
        for yaml in [
            "stream:\n  tracked_assets: 0\n",
            "stream:\n  page_size: 0\n",
            "stream:\n  distance_step: 1.0\n",
            "stream:\n  distance_step: 0.0\n",
            "stream:\n  broadcast_interval_ms: 0\n",
        ] {
            let result = TrackstreamConfig::parse(yaml);
            assert!(
                matches!(result, Err(ConfigError::Invalid { .. })),
                "{yaml} -> {result:?}"
            );
        }
    }

    #[test]
    fn rejects_bad_yaml() {
        let result = TrackstreamConfig::parse("stream: [1, 2");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = TrackstreamConfig::default();
        let applied = config.apply_overrides(|key| match key {
            "TRACKSTREAM_PORT" => Some("8123".to_owned()),
            "TRACKSTREAM_SOURCE_PATH" => Some("/tmp/net.json".to_owned()),
            _ => None,
        });
        assert!(applied.is_ok());
        assert_eq!(config.server.port, 8123);
        assert_eq!(config.source.path.as_deref(), Some("/tmp/net.json"));
        assert_eq!(config.source.url, default_source_url());
    }

    #[test]
    fn bad_port_override_is_invalid() {
        let mut config = TrackstreamConfig::default();
        let applied = config.apply_overrides(|key| {
            (key == "TRACKSTREAM_PORT").then(|| "eighty".to_owned())
        });
        assert!(matches!(
            applied,
            Err(ConfigError::Invalid {
                field: "server.port",
                ..
            })
        ));
    }
}
