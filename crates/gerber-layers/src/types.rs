use serde::{Deserialize, Serialize};

/// Physical location of a fabrication layer in the board stackup.
///
/// The discriminant order is fixed; it is part of the wire contract and of
/// the paint-order rule for [`BoardLayer`] (see below), so new variants go
/// at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardSide {
    Top,
    Bottom,
    Internal,
    Both,
    Unknown,
    Internal1,
    Internal2,
}

impl BoardSide {
    pub const ALL: [BoardSide; 7] = [
        BoardSide::Top,
        BoardSide::Bottom,
        BoardSide::Internal,
        BoardSide::Both,
        BoardSide::Unknown,
        BoardSide::Internal1,
        BoardSide::Internal2,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BoardSide::Top => "Top",
            BoardSide::Bottom => "Bottom",
            BoardSide::Internal => "Internal",
            BoardSide::Both => "Both",
            BoardSide::Unknown => "Unknown",
            BoardSide::Internal1 => "Internal1",
            BoardSide::Internal2 => "Internal2",
        }
    }

    pub fn from_name(name: &str) -> Option<BoardSide> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }
}

/// Function of a fabrication layer.
///
/// Multi-layer composition paints records in ascending discriminant order,
/// so the variants are declared bottom-of-stack first: copper ends up under
/// soldermask which ends up under silk, and drill holes land on top,
/// regardless of selection order. The wire format carries variant names,
/// never discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardLayer {
    Copper,
    Paste,
    SolderMask,
    Silk,
    Carbon,
    Mill,
    Mechanical,
    Assembly,
    Notes,
    Outline,
    Drill,
    Unknown,
}

impl BoardLayer {
    pub const ALL: [BoardLayer; 12] = [
        BoardLayer::Copper,
        BoardLayer::Paste,
        BoardLayer::SolderMask,
        BoardLayer::Silk,
        BoardLayer::Carbon,
        BoardLayer::Mill,
        BoardLayer::Mechanical,
        BoardLayer::Assembly,
        BoardLayer::Notes,
        BoardLayer::Outline,
        BoardLayer::Drill,
        BoardLayer::Unknown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BoardLayer::Copper => "Copper",
            BoardLayer::Paste => "Paste",
            BoardLayer::SolderMask => "SolderMask",
            BoardLayer::Silk => "Silk",
            BoardLayer::Carbon => "Carbon",
            BoardLayer::Mill => "Mill",
            BoardLayer::Mechanical => "Mechanical",
            BoardLayer::Assembly => "Assembly",
            BoardLayer::Notes => "Notes",
            BoardLayer::Outline => "Outline",
            BoardLayer::Drill => "Drill",
            BoardLayer::Unknown => "Unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<BoardLayer> {
        Self::ALL.iter().copied().find(|l| l.name() == name)
    }

    /// Paint-order key, ascending.
    pub fn paint_order(self) -> u8 {
        self as u8
    }

    /// Default render color (0xRRGGBB).
    pub fn default_color(self) -> u32 {
        match self {
            BoardLayer::Copper => 0xC87533,
            BoardLayer::SolderMask => 0x0B6E4F,
            BoardLayer::Silk => 0xE8E8E8,
            BoardLayer::Paste => 0x9E9E9E,
            BoardLayer::Drill => 0x222222,
            BoardLayer::Outline => 0x101010,
            BoardLayer::Mill | BoardLayer::Mechanical => 0x4A90D9,
            _ => 0x888888,
        }
    }
}

/// Broad content category of one input file, decided by a header sniff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardFileType {
    Gerber,
    Drill,
    Unsupported,
}

/// Closed axis-aligned rectangle; `min <= max` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Drawable output of the external geometry converter for one layer file.
///
/// Polygons are flat `[x0, y0, x1, y1, ...]` coordinate runs: `solids` are
/// filled regions, `strokes` are outlines rendered as hairlines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonSet {
    #[serde(rename = "solidPolygons", default)]
    pub solids: Vec<Vec<f64>>,
    #[serde(rename = "strokePolygons", default)]
    pub strokes: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
}

impl PolygonSet {
    /// True when no polygon carries at least two points.
    pub fn is_empty(&self) -> bool {
        self.solids
            .iter()
            .chain(self.strokes.iter())
            .all(|p| p.len() < 4)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrillHole {
    pub x: f64,
    pub y: f64,
    pub diameter: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentCenter {
    pub x: f64,
    pub y: f64,
}

/// Processing state of one layer record.
///
/// Advances monotonically; `Error` is terminal. `Queued` is the birth state
/// on the interactive side and never crosses the wire; `Unzipping` is spelled
/// `"Processing"` on the wire for compatibility with the reply format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerStatus {
    Queued,
    #[serde(rename = "Processing")]
    Unzipping,
    Rendering,
    #[serde(rename = "done")]
    Done,
    #[serde(rename = "empty")]
    Empty,
    #[serde(rename = "error")]
    Error,
}

impl LayerStatus {
    fn rank(self) -> u8 {
        match self {
            LayerStatus::Queued => 0,
            LayerStatus::Unzipping => 1,
            LayerStatus::Rendering => 2,
            LayerStatus::Done | LayerStatus::Empty | LayerStatus::Error => 3,
        }
    }

    /// Next status after seeing `next` in a reply; never regresses and never
    /// leaves `Error`.
    pub fn advance(self, next: LayerStatus) -> LayerStatus {
        if self == LayerStatus::Error {
            self
        } else if next.rank() >= self.rank() {
            next
        } else {
            self
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 3
    }

    /// Human-readable label for the layer list.
    pub fn label(self) -> &'static str {
        match self {
            LayerStatus::Queued => "queued",
            LayerStatus::Unzipping => "unzipping",
            LayerStatus::Rendering => "rendering",
            LayerStatus::Done => "done",
            LayerStatus::Empty => "empty",
            LayerStatus::Error => "error",
        }
    }
}
