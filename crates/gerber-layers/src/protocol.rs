//! Message types exchanged between the interactive thread and the parsing
//! worker. Serialized as JSON text over `postMessage`; replies for distinct
//! requests may interleave, replies for one request arrive in send order.

use serde::{Deserialize, Serialize};

use crate::types::{
    BoardLayer, BoardSide, ComponentCenter, DrillHole, LayerStatus, PolygonSet,
};

/// One unit of work shipped to the background context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequest {
    pub id: u32,
    pub origin_tag: String,
    pub input: WorkInput,
}

/// Either a zipped archive or pre-extracted named files (or both).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkInput {
    #[serde(rename = "zipBuffer", default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<NamedFile>>,
}

impl WorkInput {
    pub fn from_zip(bytes: Vec<u8>) -> Self {
        Self {
            zip: Some(bytes),
            files: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedFile {
    pub file_name: String,
    pub content: String,
}

/// Tagged reply correlated back to a request by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkReply {
    pub id: u32,
    pub output: WorkOutput,
}

/// One reply payload. `File` updates stream incrementally, one or more per
/// contained file; `Done` closes the request after every file has reached a
/// terminal status, letting the dispatcher retire its callback entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorkOutput {
    File(FileUpdate),
    Done { files: usize },
}

/// Partial, incremental update for one file. Absent optional fields mean
/// "keep the previous value".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpdate {
    pub file_name: String,
    pub status: LayerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<BoardSide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<BoardLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<PolygonSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drill_holes: Option<Vec<DrillHole>>,
    #[serde(
        rename = "componentCenters",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub centers: Option<Vec<ComponentCenter>>,
    #[serde(
        rename = "exceptionMessage",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub exception: Option<String>,
    #[serde(
        rename = "unzipDurationMs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub unzip_ms: Option<f64>,
    #[serde(
        rename = "renderDurationMs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub render_ms: Option<f64>,
}

impl FileUpdate {
    /// Bare status update carrying nothing else.
    pub fn status(file_name: impl Into<String>, status: LayerStatus) -> Self {
        Self {
            file_name: file_name.into(),
            status,
            side: None,
            layer: None,
            content: None,
            geometry: None,
            drill_holes: None,
            centers: None,
            exception: None,
            unzip_ms: None,
            render_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bounds;

    #[test]
    fn request_round_trip() {
        let request = WorkRequest {
            id: 3,
            origin_tag: "https://example.org".into(),
            input: WorkInput::from_zip(vec![0x50, 0x4b]),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"originTag\""));
        assert!(json.contains("\"zipBuffer\""));
        let back: WorkRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn file_update_wire_names() {
        let mut update = FileUpdate::status("a.gtl", LayerStatus::Done);
        update.side = Some(BoardSide::Top);
        update.layer = Some(BoardLayer::Copper);
        update.geometry = Some(PolygonSet {
            solids: vec![vec![0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0]],
            strokes: vec![],
            bounds: Some(Bounds::new(0.0, 0.0, 10.0, 10.0)),
        });
        update.render_ms = Some(12.5);
        let reply = WorkReply {
            id: 0,
            output: WorkOutput::File(update),
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains("\"kind\":\"file\""));
        assert!(json.contains("\"fileName\":\"a.gtl\""));
        assert!(json.contains("\"status\":\"done\""));
        assert!(json.contains("\"solidPolygons\""));
        assert!(json.contains("\"minX\":0.0"));
        assert!(json.contains("\"renderDurationMs\""));
        let back: WorkReply = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reply);
    }

    #[test]
    fn absent_optionals_stay_absent() {
        let update = FileUpdate::status("b.drl", LayerStatus::Rendering);
        let json = serde_json::to_string(&update).unwrap();
        assert!(!json.contains("geometry"));
        assert!(!json.contains("drillHoles"));
        assert!(!json.contains("exceptionMessage"));
        let back: FileUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(back.geometry, None);
        assert_eq!(back.drill_holes, None);
    }

    #[test]
    fn done_round_trip() {
        let reply = WorkReply {
            id: 7,
            output: WorkOutput::Done { files: 4 },
        };
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains("\"kind\":\"done\""));
        let back: WorkReply = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reply);
    }
}
