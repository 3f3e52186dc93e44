//! JSON messages exchanged with stream clients.
//!
//! Three families of messages cross the socket:
//!
//! - the one-time handshake ([`HandshakeRequest`] / [`HandshakeResponse`])
//! - the periodic page broadcast ([`FeatureResult`])
//! - post-handshake client commands ([`ClientCommand`])

use serde::{Deserialize, Serialize};

use crate::ids::{ObjectId, TrackId};

/// The only spatial reference the service streams in (Web Mercator).
pub const SUPPORTED_WKID: u32 = 102_100;

/// Attributes carried by every streamed feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureAttributes {
    /// Per-observation identity, reissued on every update.
    #[serde(rename = "OBJECTID")]
    pub object_id: ObjectId,
    /// Stable per-asset identity.
    #[serde(rename = "TRACKID")]
    pub track_id: TrackId,
}

/// Point geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    /// Easting.
    pub x: f64,
    /// Northing.
    pub y: f64,
}

/// Polygon geometry as a list of rings of `[x, y]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonGeometry {
    /// Closed rings; the first vertex of each ring equals the last.
    pub rings: Vec<Vec<[f64; 2]>>,
}

/// A streamed point feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointFeature {
    /// Identity attributes.
    pub attributes: FeatureAttributes,
    /// Current position.
    pub geometry: PointGeometry,
}

/// A streamed polygon feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonFeature {
    /// Identity attributes.
    pub attributes: FeatureAttributes,
    /// Extruded footprint.
    pub geometry: PolygonGeometry,
}

/// Either shape of streamed feature. Serialized without a tag; the
/// geometry keys (`x`/`y` vs `rings`) tell them apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamFeature {
    /// Point output.
    Point(PointFeature),
    /// Extruded quad output.
    Polygon(PolygonFeature),
}

/// One broadcast page: `{ "type": "featureResult", "features": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "featureResult")]
pub struct FeatureResult {
    /// The page's features.
    pub features: Vec<StreamFeature>,
}

/// Output encoding negotiated during the handshake. JSON is the only one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// JSON text frames.
    #[default]
    Json,
}

/// `{ "wkid": <int> }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialReference {
    /// Well-known id of the spatial reference.
    pub wkid: u32,
}

/// The first message a client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeRequest {
    /// Requested output encoding.
    #[serde(default)]
    pub format: WireFormat,
    /// Requested output spatial reference.
    pub spatial_reference: SpatialReference,
    /// Requested attribute fields. Accepted and ignored: every feature
    /// carries `OBJECTID` and `TRACKID`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_fields: Option<Vec<String>>,
}

/// The server's reply to an accepted handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeResponse {
    /// Negotiated output encoding.
    pub format: WireFormat,
    /// Negotiated spatial reference.
    pub spatial_reference: SpatialReference,
}

impl HandshakeResponse {
    /// Echo the negotiated properties of an accepted request.
    pub const fn accept(request: &HandshakeRequest) -> Self {
        Self {
            format: request.format,
            spatial_reference: request.spatial_reference,
        }
    }
}

/// A post-handshake command, dispatched on its `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// Reply with the whole message.
    Echo(serde_json::Value),
    /// Reply with the message's `data` field alone.
    EchoData(serde_json::Value),
}

/// Reasons a client command cannot be interpreted.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The payload was not valid JSON.
    #[error("malformed command: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The payload had no string `type` field.
    #[error("command has no type")]
    MissingType,
    /// The `type` field named a command the service does not know.
    #[error("unknown command type: {0}")]
    Unknown(String),
}

impl ClientCommand {
    /// Parse a command from a text frame.
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let mut value: serde_json::Value = serde_json::from_str(text)?;
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or(CommandError::MissingType)?
            .to_owned();
        match kind.as_str() {
            "echo" => Ok(Self::Echo(value)),
            "echo-data" => {
                let data = value
                    .get_mut("data")
                    .map(serde_json::Value::take)
                    .unwrap_or_default();
                Ok(Self::EchoData(data))
            }
            _ => Err(CommandError::Unknown(kind)),
        }
    }

    /// The JSON value to send back to the client.
    pub const fn reply(&self) -> &serde_json::Value {
        match self {
            Self::Echo(value) | Self::EchoData(value) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn handshake_parses_with_and_without_format() {
        let full: Result<HandshakeRequest, _> = serde_json::from_str(
            r#"{"format":"json","spatialReference":{"wkid":102100},"outFields":["*"]}"#,
        );
        assert!(full.is_ok());
        let bare: Result<HandshakeRequest, _> =
            serde_json::from_str(r#"{"spatialReference":{"wkid":4326}}"#);
        let bare = bare.ok();
        assert_eq!(bare.as_ref().map(|r| r.format), Some(WireFormat::Json));
        assert_eq!(bare.map(|r| r.spatial_reference.wkid), Some(4326));
    }

    #[test]
    fn handshake_rejects_unknown_format() {
        let parsed: Result<HandshakeRequest, _> =
            serde_json::from_str(r#"{"format":"pbf","spatialReference":{"wkid":102100}}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn handshake_response_shape() {
        let request = HandshakeRequest {
            format: WireFormat::Json,
            spatial_reference: SpatialReference {
                wkid: SUPPORTED_WKID,
            },
            out_fields: Some(vec![String::from("*")]),
        };
        let value = serde_json::to_value(HandshakeResponse::accept(&request)).ok();
        assert_eq!(
            value,
            Some(json!({"format": "json", "spatialReference": {"wkid": 102_100}}))
        );
    }

    #[test]
    fn feature_result_is_tagged() {
        let page = FeatureResult {
            features: vec![StreamFeature::Point(PointFeature {
                attributes: FeatureAttributes {
                    object_id: ObjectId(3),
                    track_id: TrackId(0),
                },
                geometry: PointGeometry { x: 1.5, y: -2.0 },
            })],
        };
        let value = serde_json::to_value(&page).ok();
        assert_eq!(
            value,
            Some(json!({
                "type": "featureResult",
                "features": [
                    {"attributes": {"OBJECTID": 3, "TRACKID": 0}, "geometry": {"x": 1.5, "y": -2.0}}
                ]
            }))
        );
    }

    #[test]
    fn commands_dispatch_on_type() {
        let echo = ClientCommand::parse(r#"{"type":"echo","n":1}"#).ok();
        assert_eq!(
            echo.as_ref().map(ClientCommand::reply),
            Some(&json!({"type": "echo", "n": 1}))
        );

        let data = ClientCommand::parse(r#"{"type":"echo-data","data":{"k":[1,2]}}"#).ok();
        assert_eq!(
            data.as_ref().map(ClientCommand::reply),
            Some(&json!({"k": [1, 2]}))
        );

        let no_data = ClientCommand::parse(r#"{"type":"echo-data"}"#).ok();
        assert_eq!(
            no_data.as_ref().map(ClientCommand::reply),
            Some(&serde_json::Value::Null)
        );
    }

    #[test]
    fn echo_serializes_keys_in_received_order() {
        let text = r#"{"type":"echo","zeta":1,"alpha":{"y":2,"b":3}}"#;
        let echo = ClientCommand::parse(text).ok();
        let out = echo
            .as_ref()
            .and_then(|c| serde_json::to_string(c.reply()).ok());
        assert_eq!(out.as_deref(), Some(text));

        let data = ClientCommand::parse(r#"{"data":{"z":0,"a":1},"type":"echo-data"}"#).ok();
        let out = data
            .as_ref()
            .and_then(|c| serde_json::to_string(c.reply()).ok());
        assert_eq!(out.as_deref(), Some(r#"{"z":0,"a":1}"#));
    }

    #[test]
    fn bad_commands_are_errors() {
        assert!(matches!(
            ClientCommand::parse("{not json"),
            Err(CommandError::Malformed(_))
        ));
        assert!(matches!(
            ClientCommand::parse(r#"{"kind":"echo"}"#),
            Err(CommandError::MissingType)
        ));
        assert!(matches!(
            ClientCommand::parse(r#"{"type":"subscribe"}"#),
            Err(CommandError::Unknown(kind)) if kind == "subscribe"
        ));
    }
}
