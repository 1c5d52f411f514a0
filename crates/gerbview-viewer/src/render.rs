//! Canvas-side half of the viewport: cached `Path2d` construction, the
//! raster cache, and the two drawing tiers (cheap transform-only replay
//! while a gesture is live, full vector repaint on settle).

use std::f64::consts::PI;

use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, Path2d};

use gerber_layers::store::{LayerRecord, LayerStore, PathPair};
use gerber_layers::types::{BoardLayer, PolygonSet};
use gerber_layers::view::{self, Mapping, Transient, ViewState};

/// Checkerboard tile size for the empty-canvas backdrop, in device pixels.
const BACKDROP_BLOCK: f64 = 10.0;

/// Cross-marker arm length for component centers, in device pixels.
const CENTER_MARKER: f64 = 4.0;

pub fn color_to_css(color: u32) -> String {
    format!("#{:06x}", color & 0x00FF_FFFF)
}

pub fn css_to_color(css: &str) -> Option<u32> {
    u32::from_str_radix(css.strip_prefix('#')?, 16).ok()
}

fn polygons_to_path(polygons: &[Vec<f64>], close: bool) -> Option<Path2d> {
    let path = Path2d::new().ok()?;
    let mut any = false;
    for polygon in polygons.iter().filter(|p| p.len() >= 4) {
        path.move_to(polygon[0], polygon[1]);
        for pair in polygon[2..].chunks_exact(2) {
            path.line_to(pair[0], pair[1]);
        }
        if close {
            path.close_path();
        }
        any = true;
    }
    any.then_some(path)
}

/// Build the cached drawable paths for one record's geometry. Expensive for
/// dense layers, which is why the store runs it only on first arrival.
pub fn build_paths(geometry: &PolygonSet) -> PathPair<Path2d> {
    PathPair {
        solid: polygons_to_path(&geometry.solids, true),
        stroke: polygons_to_path(&geometry.strokes, false),
    }
}

fn context_2d(canvas: &HtmlCanvasElement) -> CanvasRenderingContext2d {
    canvas
        .get_context("2d")
        .unwrap()
        .unwrap()
        .dyn_into::<CanvasRenderingContext2d>()
        .unwrap()
}

struct DragPointer {
    last_x: f64,
    last_y: f64,
}

/// The interactive viewport over the current selection. All state lives on
/// the UI thread; nothing here is touched from the worker.
pub struct Viewport {
    canvas: HtmlCanvasElement,
    cache: Option<HtmlCanvasElement>,
    pub mapping: Mapping,
    pub view: ViewState,
    pub transient: Transient,
    drag: Option<DragPointer>,
}

impl Viewport {
    pub fn new(canvas: HtmlCanvasElement) -> Self {
        Self {
            canvas,
            cache: None,
            mapping: Mapping::identity(),
            view: ViewState::default(),
            transient: Transient::default(),
            drag: None,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.invalidate();
    }

    /// Drop the raster cache and any in-gesture delta.
    pub fn invalidate(&mut self) {
        self.cache = None;
        self.transient = Transient::default();
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.drag = Some(DragPointer {
            last_x: x,
            last_y: y,
        });
    }

    /// Pan by the pointer delta; replays the cache only. Returns false when
    /// no drag is live.
    pub fn pointer_move(&mut self, x: f64, y: f64, dpr: f64) -> bool {
        let Some(drag) = self.drag.as_mut() else {
            return false;
        };
        let dx = x - drag.last_x;
        let dy = y - drag.last_y;
        drag.last_x = x;
        drag.last_y = y;
        self.transient.drag(dx * dpr, dy * dpr);
        self.replay();
        true
    }

    /// Ends a drag. Returns true when a drag was live, in which case the
    /// caller schedules the debounced fine redraw (which folds the transient
    /// into the committed view state).
    pub fn pointer_up(&mut self) -> bool {
        self.drag.take().is_some()
    }

    /// Cursor-anchored zoom step; replays the cache only.
    pub fn wheel(&mut self, x: f64, y: f64, delta_y: f64, dpr: f64) {
        self.transient.wheel_zoom(x * dpr, y * dpr, delta_y);
        self.replay();
    }

    /// Fast tier: composite the last raster under the transient transform.
    /// No path is walked, so this stays sub-frame however dense the layers.
    pub fn replay(&self) {
        let ctx = context_2d(&self.canvas);
        let width = self.canvas.width() as f64;
        let height = self.canvas.height() as f64;
        ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0).unwrap();
        ctx.clear_rect(0.0, 0.0, width, height);
        if let Some(cache) = &self.cache {
            let t = &self.transient;
            ctx.set_transform(t.scale, 0.0, 0.0, t.scale, t.dx, t.dy)
                .unwrap();
            let _ = ctx.draw_image_with_html_canvas_element(cache, 0.0, 0.0);
            ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0).unwrap();
        }
    }

    /// Slow tier: fold the transient into the committed view state, repaint
    /// every selected layer from its cached vector paths in stackup order,
    /// and snapshot the result into the raster cache.
    pub fn fine_redraw(&mut self, store: &LayerStore<Path2d>) {
        self.view.commit(&mut self.transient);

        let ctx = context_2d(&self.canvas);
        let width = self.canvas.width() as f64;
        let height = self.canvas.height() as f64;
        ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0).unwrap();
        ctx.clear_rect(0.0, 0.0, width, height);
        draw_backdrop(&ctx, width, height);

        let selected = store.selected_sorted();
        let Some(bounds) = store.selection_bounds() else {
            self.cache = None;
            return;
        };
        self.mapping = Mapping::fit(
            &bounds,
            width,
            height,
            view::CANVAS_MARGIN,
            self.view.h_flip,
            self.view.v_flip,
        );

        let a = self.view.scale * self.mapping.sx;
        let d = self.view.scale * self.mapping.sy;
        let e = self.view.scale * self.mapping.tx + self.view.offset_x;
        let f = self.view.scale * self.mapping.ty + self.view.offset_y;
        ctx.set_transform(a, 0.0, 0.0, d, e, f).unwrap();

        let effective = (self.view.scale * self.mapping.pixels_per_unit()).max(f64::EPSILON);
        let hairline = 1.0 / effective;
        ctx.set_line_cap("round");
        ctx.set_line_join("round");

        let outline_clip = selected
            .iter()
            .filter(|r| r.layer == BoardLayer::Outline)
            .find_map(|r| r.cached.stroke.as_ref().or(r.cached.solid.as_ref()));

        // Substrate-colored backing so a multi-layer composite reads as a
        // board rather than floating artwork.
        if selected.len() > 1 {
            if let Some(path) = outline_clip {
                ctx.set_global_alpha(1.0);
                ctx.set_fill_style_str(&color_to_css(view::SUBSTRATE_COLOR));
                ctx.fill_with_path_2d(path);
            }
        }

        for record in &selected {
            let css = color_to_css(record.color);
            let masked = record.layer == BoardLayer::SolderMask && outline_clip.is_some();

            if masked {
                // Mask paint exists only inside the board outline.
                ctx.save();
                ctx.clip_with_path_2d(outline_clip.unwrap());
                ctx.set_global_alpha(record.opacity * view::MASK_ALPHA);
            } else {
                ctx.set_global_alpha(record.opacity);
            }
            if let Some(solid) = &record.cached.solid {
                ctx.set_fill_style_str(&css);
                ctx.fill_with_path_2d(solid);
            }
            if let Some(stroke) = &record.cached.stroke {
                ctx.set_stroke_style_str(&css);
                ctx.set_line_width(hairline);
                ctx.stroke_with_path(stroke);
            }
            if masked {
                ctx.restore();
                ctx.set_global_alpha(record.opacity);
            }

            draw_drill_holes(&ctx, record, &css);
            draw_centers(&ctx, record, &css, hairline);
        }

        ctx.set_global_alpha(1.0);
        ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0).unwrap();
        self.snapshot();
    }

    fn snapshot(&mut self) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let cache: HtmlCanvasElement = match document
            .create_element("canvas")
            .map(|el| el.dyn_into::<HtmlCanvasElement>())
        {
            Ok(Ok(canvas)) => canvas,
            _ => return,
        };
        cache.set_width(self.canvas.width());
        cache.set_height(self.canvas.height());
        let ctx = context_2d(&cache);
        let _ = ctx.draw_image_with_html_canvas_element(&self.canvas, 0.0, 0.0);
        self.cache = Some(cache);
    }
}

fn draw_backdrop(ctx: &CanvasRenderingContext2d, width: f64, height: f64) {
    ctx.set_fill_style_str("#d0d0d0");
    let blocks_x = (width / BACKDROP_BLOCK).round() as i32;
    let blocks_y = (height / BACKDROP_BLOCK).round() as i32;
    for bx in 0..blocks_x {
        for by in 0..blocks_y {
            if (bx + by) % 2 == 1 {
                ctx.fill_rect(
                    bx as f64 * BACKDROP_BLOCK,
                    by as f64 * BACKDROP_BLOCK,
                    BACKDROP_BLOCK,
                    BACKDROP_BLOCK,
                );
            }
        }
    }
}

fn draw_drill_holes(ctx: &CanvasRenderingContext2d, record: &LayerRecord<Path2d>, css: &str) {
    if record.drill_holes.is_empty() {
        return;
    }
    ctx.set_fill_style_str(css);
    for hole in &record.drill_holes {
        ctx.begin_path();
        let _ = ctx.arc(hole.x, hole.y, hole.diameter / 2.0, 0.0, 2.0 * PI);
        ctx.close_path();
        ctx.fill();
    }
}

fn draw_centers(
    ctx: &CanvasRenderingContext2d,
    record: &LayerRecord<Path2d>,
    css: &str,
    hairline: f64,
) {
    if record.centers.is_empty() {
        return;
    }
    let arm = CENTER_MARKER * hairline;
    ctx.set_stroke_style_str(css);
    ctx.set_line_width(hairline);
    for center in &record.centers {
        ctx.begin_path();
        ctx.move_to(center.x - arm, center.y);
        ctx.line_to(center.x + arm, center.y);
        ctx.move_to(center.x, center.y - arm);
        ctx.line_to(center.x, center.y + arm);
        ctx.stroke();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_color_round_trip() {
        assert_eq!(color_to_css(0xC87533), "#c87533");
        assert_eq!(css_to_color("#c87533"), Some(0xC87533));
        assert_eq!(css_to_color("#000000"), Some(0));
        assert_eq!(css_to_color("oops"), None);
    }
}
