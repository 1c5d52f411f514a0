//! One parsing session: expand the input, classify every file, drive the
//! external geometry converter, and stream partial replies back.
//!
//! The pump is generic over [`GeometryRenderer`] and the clock so the whole
//! per-file state machine runs under native tests with a fake converter.

use log::{debug, warn};

use gerber_layers::archive;
use gerber_layers::classify;
use gerber_layers::protocol::{FileUpdate, NamedFile, WorkOutput, WorkReply, WorkRequest};
use gerber_layers::types::{
    BoardFileType, BoardLayer, Bounds, ComponentCenter, DrillHole, LayerStatus, PolygonSet,
};
use gerber_layers::LayerError;

/// Output of the external converter for one Gerber file.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedLayer {
    pub geometry: PolygonSet,
    pub centers: Vec<ComponentCenter>,
}

/// The external-collaborator seam: turns fabrication text into drawable
/// geometry. The production implementation binds the host-side converter
/// library; tests substitute a fake.
pub trait GeometryRenderer {
    fn render_gerber(&self, content: &str) -> Result<RenderedLayer, LayerError>;
    fn render_drill(&self, content: &str) -> Result<Vec<DrillHole>, LayerError>;
}

/// Pseudo file name used when the archive itself cannot be expanded and
/// there is no per-file record to attach the failure to.
const ARCHIVE_RECORD: &str = "(archive)";

/// Run one request to completion, emitting replies as they are produced.
/// Per-file failures never abort the session; only the reply for that file
/// carries the error.
pub fn run<R: GeometryRenderer>(
    request: &WorkRequest,
    renderer: &R,
    now: impl Fn() -> f64,
    mut emit: impl FnMut(WorkReply),
) {
    let id = request.id;
    let mut send = |output: WorkOutput| emit(WorkReply { id, output });

    let unzip_start = now();
    let files = match archive::expand_input(&request.input) {
        Ok(files) => files,
        Err(err) => {
            warn!("request {id}: cannot expand input: {err}");
            let mut update = FileUpdate::status(ARCHIVE_RECORD, LayerStatus::Error);
            update.exception = Some(err.to_string());
            send(WorkOutput::File(update));
            send(WorkOutput::Done { files: 0 });
            return;
        }
    };
    let unzip_ms = now() - unzip_start;

    let mut kept: Vec<(NamedFile, BoardFileType)> = Vec::new();
    for file in files {
        let (side, layer, file_type) = classify::resolve(&file.file_name, &file.content);
        if file_type == BoardFileType::Unsupported && layer == BoardLayer::Unknown {
            debug!("request {id}: ignoring {}", file.file_name);
            continue;
        }
        let mut update = FileUpdate::status(&file.file_name, LayerStatus::Unzipping);
        update.side = Some(side);
        update.layer = Some(layer);
        update.content = Some(file.content.clone());
        update.unzip_ms = Some(unzip_ms);
        send(WorkOutput::File(update));
        kept.push((file, file_type));
    }

    let count = kept.len();
    for (file, file_type) in kept {
        send(WorkOutput::File(FileUpdate::status(
            &file.file_name,
            LayerStatus::Rendering,
        )));

        let render_start = now();
        let mut terminal = match file_type {
            BoardFileType::Drill => drill_update(&file, renderer),
            _ => gerber_update(&file, renderer),
        };
        terminal.render_ms = Some(now() - render_start);
        send(WorkOutput::File(terminal));
    }

    send(WorkOutput::Done { files: count });
}

fn gerber_update<R: GeometryRenderer>(file: &NamedFile, renderer: &R) -> FileUpdate {
    match renderer.render_gerber(&file.content) {
        Ok(rendered) => {
            if rendered.geometry.is_empty() {
                FileUpdate::status(&file.file_name, LayerStatus::Empty)
            } else {
                let mut update = FileUpdate::status(&file.file_name, LayerStatus::Done);
                update.geometry = Some(rendered.geometry);
                if !rendered.centers.is_empty() {
                    update.centers = Some(rendered.centers);
                }
                update
            }
        }
        Err(err) => error_update(&file.file_name, err),
    }
}

fn drill_update<R: GeometryRenderer>(file: &NamedFile, renderer: &R) -> FileUpdate {
    match renderer.render_drill(&file.content) {
        Ok(holes) if holes.is_empty() => {
            FileUpdate::status(&file.file_name, LayerStatus::Empty)
        }
        Ok(holes) => {
            let mut update = FileUpdate::status(&file.file_name, LayerStatus::Done);
            // Drill hits carry no polygons; synthesize bounds so selections
            // containing only a drill layer still frame correctly.
            update.geometry = Some(PolygonSet {
                solids: vec![],
                strokes: vec![],
                bounds: hole_bounds(&holes),
            });
            update.drill_holes = Some(holes);
            update
        }
        Err(err) => error_update(&file.file_name, err),
    }
}

fn error_update(file_name: &str, err: LayerError) -> FileUpdate {
    let mut update = FileUpdate::status(file_name, LayerStatus::Error);
    update.exception = Some(err.to_string());
    update
}

fn hole_bounds(holes: &[DrillHole]) -> Option<Bounds> {
    holes
        .iter()
        .map(|h| {
            let r = h.diameter / 2.0;
            Bounds::new(h.x - r, h.y - r, h.x + r, h.y + r)
        })
        .reduce(|a, b| a.union(&b))
}
