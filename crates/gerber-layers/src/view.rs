//! Viewport transform math, kept free of any canvas type so the gesture
//! invariants are testable off-browser.
//!
//! Composition, innermost first:
//!
//! ```text
//! screen = Transient( ViewState( Mapping(world) ) )
//! ```
//!
//! [`Mapping`] letterboxes the selection bounds into the canvas with the
//! fixed Y-flip convention (world +Y is up, screen +Y is down) and absorbs
//! the axis flips. [`ViewState`] is the committed user transform; the
//! [`Transient`] delta accumulates during a drag or zoom gesture and is only
//! ever composed for raster-cache replay, then folded into the committed
//! state when the interaction settles.

/// Multiplicative zoom step per wheel notch.
pub const WHEEL_ZOOM_STEP: f64 = 0.05;

/// Settle window before a full re-render of the vector layers.
pub const FINE_REDRAW_DELAY_MS: u32 = 500;

/// Letterbox margin around the fitted content, in device pixels.
pub const CANVAS_MARGIN: f64 = 10.0;

/// Alpha applied to soldermask layers composited over the substrate.
pub const MASK_ALPHA: f64 = 0.75;

/// Backing fill used under multi-layer compositions (0xRRGGBB).
pub const SUBSTRATE_COLOR: u32 = 0x1B4332;

/// Committed user transform; only updated when an interaction settles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub h_flip: bool,
    pub v_flip: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            h_flip: false,
            v_flip: false,
        }
    }
}

impl ViewState {
    /// Back to scale 1 / zero offset; flips are toggled separately.
    pub fn reset(&mut self) {
        self.scale = 1.0;
        self.offset_x = 0.0;
        self.offset_y = 0.0;
    }

    /// Fold the transient delta in (multiplying scale, composing offsets)
    /// and reset it to identity.
    pub fn commit(&mut self, transient: &mut Transient) {
        self.scale *= transient.scale;
        self.offset_x = transient.scale * self.offset_x + transient.dx;
        self.offset_y = transient.scale * self.offset_y + transient.dy;
        *transient = Transient::default();
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.scale * x + self.offset_x,
            self.scale * y + self.offset_y,
        )
    }
}

/// In-gesture delta over the committed transform; identity when idle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transient {
    pub scale: f64,
    pub dx: f64,
    pub dy: f64,
}

impl Default for Transient {
    fn default() -> Self {
        Self {
            scale: 1.0,
            dx: 0.0,
            dy: 0.0,
        }
    }
}

impl Transient {
    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.dx == 0.0 && self.dy == 0.0
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.scale * x + self.dx, self.scale * y + self.dy)
    }

    /// Accumulate a pointer drag, already converted to device pixels.
    pub fn drag(&mut self, dx: f64, dy: f64) {
        self.dx += dx;
        self.dy += dy;
    }

    /// One wheel notch around `(cursor_x, cursor_y)` (device pixels).
    /// `delta_y < 0` zooms in by `1 + WHEEL_ZOOM_STEP`, `delta_y > 0` zooms
    /// out by `1 - WHEEL_ZOOM_STEP`; the screen point under the cursor is a
    /// fixed point of the step.
    pub fn wheel_zoom(&mut self, cursor_x: f64, cursor_y: f64, delta_y: f64) {
        if delta_y == 0.0 {
            return;
        }
        let m = if delta_y < 0.0 {
            1.0 + WHEEL_ZOOM_STEP
        } else {
            1.0 - WHEEL_ZOOM_STEP
        };
        self.scale *= m;
        self.dx = cursor_x - m * (cursor_x - self.dx);
        self.dy = cursor_y - m * (cursor_y - self.dy);
    }
}

/// World-to-screen affine `(sx*x + tx, sy*y + ty)` fitting a bounds
/// rectangle into a canvas. `sy` is negative unless the vertical flip is
/// active (the Y-flip convention); the horizontal flip negates `sx`. Flips
/// mirror about the content center so the board stays in frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mapping {
    pub sx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Mapping {
    pub fn identity() -> Self {
        Self {
            sx: 1.0,
            sy: 1.0,
            tx: 0.0,
            ty: 0.0,
        }
    }

    pub fn fit(
        bounds: &crate::types::Bounds,
        width: f64,
        height: f64,
        margin: f64,
        h_flip: bool,
        v_flip: bool,
    ) -> Self {
        let avail_w = (width - 2.0 * margin).max(1.0);
        let avail_h = (height - 2.0 * margin).max(1.0);
        let mut scale = (avail_w / bounds.width()).min(avail_h / bounds.height());
        if !scale.is_finite() || scale <= 0.0 {
            scale = 1.0;
        }
        let (cx, cy) = bounds.center();
        let sx = if h_flip { -scale } else { scale };
        let sy = if v_flip { scale } else { -scale };
        Self {
            sx,
            sy,
            tx: width / 2.0 - sx * cx,
            ty: height / 2.0 - sy * cy,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.sx * x + self.tx, self.sy * y + self.ty)
    }

    /// Device pixels per world unit, before the user transform.
    pub fn pixels_per_unit(&self) -> f64 {
        self.sx.abs()
    }
}

/// Full forward composition, transient included.
pub fn world_to_screen(
    mapping: &Mapping,
    view: &ViewState,
    transient: &Transient,
    x: f64,
    y: f64,
) -> (f64, f64) {
    let (fx, fy) = mapping.apply(x, y);
    let (vx, vy) = view.apply(fx, fy);
    transient.apply(vx, vy)
}

/// Inverse of [`world_to_screen`].
pub fn screen_to_world(
    mapping: &Mapping,
    view: &ViewState,
    transient: &Transient,
    x: f64,
    y: f64,
) -> (f64, f64) {
    let ux = (x - transient.dx) / transient.scale;
    let uy = (y - transient.dy) / transient.scale;
    let fx = (ux - view.offset_x) / view.scale;
    let fy = (uy - view.offset_y) / view.scale;
    ((fx - mapping.tx) / mapping.sx, (fy - mapping.ty) / mapping.sy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bounds;
    use approx::assert_relative_eq;

    fn sample_mapping() -> Mapping {
        Mapping::fit(
            &Bounds::new(0.0, 0.0, 40.0, 20.0),
            820.0,
            420.0,
            CANVAS_MARGIN,
            false,
            false,
        )
    }

    #[test]
    fn fit_centers_and_flips_y() {
        let mapping = sample_mapping();
        // 800x400 available for 40x20 content: 20 px per unit.
        assert_relative_eq!(mapping.sx, 20.0);
        assert_relative_eq!(mapping.sy, -20.0);
        let (cx, cy) = mapping.apply(20.0, 10.0);
        assert_relative_eq!(cx, 410.0);
        assert_relative_eq!(cy, 210.0);
        // World +Y goes up on screen.
        let (_, top) = mapping.apply(20.0, 20.0);
        assert!(top < cy);
    }

    #[test]
    fn fit_survives_degenerate_bounds() {
        let mapping = Mapping::fit(
            &Bounds::new(5.0, 5.0, 5.0, 5.0),
            820.0,
            420.0,
            CANVAS_MARGIN,
            false,
            false,
        );
        assert!(mapping.sx.is_finite());
        let (x, y) = mapping.apply(5.0, 5.0);
        assert_relative_eq!(x, 410.0);
        assert_relative_eq!(y, 210.0);
    }

    #[test]
    fn horizontal_flip_mirrors_about_center() {
        let bounds = Bounds::new(0.0, 0.0, 40.0, 20.0);
        let plain = Mapping::fit(&bounds, 820.0, 420.0, CANVAS_MARGIN, false, false);
        let flipped = Mapping::fit(&bounds, 820.0, 420.0, CANVAS_MARGIN, true, false);
        let (x0, y0) = plain.apply(0.0, 0.0);
        let (x1, y1) = flipped.apply(40.0, 0.0);
        assert_relative_eq!(x0, x1);
        assert_relative_eq!(y0, y1);
    }

    #[test]
    fn round_trip_screen_world() {
        let mapping = sample_mapping();
        let view = ViewState {
            scale: 1.7,
            offset_x: -31.0,
            offset_y: 12.0,
            ..Default::default()
        };
        let transient = Transient {
            scale: 0.9,
            dx: 4.0,
            dy: -2.5,
        };
        let (sx, sy) = world_to_screen(&mapping, &view, &transient, 13.0, 7.0);
        let (wx, wy) = screen_to_world(&mapping, &view, &transient, sx, sy);
        assert_relative_eq!(wx, 13.0, epsilon = 1e-9);
        assert_relative_eq!(wy, 7.0, epsilon = 1e-9);
    }

    #[test]
    fn wheel_zoom_anchors_cursor() {
        let mapping = sample_mapping();
        let view = ViewState::default();
        let mut transient = Transient::default();
        let cursor = (600.0, 150.0);

        let before = screen_to_world(&mapping, &view, &transient, cursor.0, cursor.1);
        transient.wheel_zoom(cursor.0, cursor.1, -120.0);
        let after = screen_to_world(&mapping, &view, &transient, cursor.0, cursor.1);
        assert_relative_eq!(before.0, after.0, epsilon = 1e-9);
        assert_relative_eq!(before.1, after.1, epsilon = 1e-9);

        // Still anchored through several notches in both directions.
        transient.wheel_zoom(cursor.0, cursor.1, -120.0);
        transient.wheel_zoom(cursor.0, cursor.1, 120.0);
        let later = screen_to_world(&mapping, &view, &transient, cursor.0, cursor.1);
        assert_relative_eq!(before.0, later.0, epsilon = 1e-9);
        assert_relative_eq!(before.1, later.1, epsilon = 1e-9);
    }

    #[test]
    fn wheel_zoom_commits_five_percent_steps() {
        // Scenario D: one notch in, then the settle commit.
        let mut view = ViewState::default();
        let mut transient = Transient::default();
        transient.wheel_zoom(100.0, 100.0, -3.0);
        view.commit(&mut transient);
        assert_relative_eq!(view.scale, 1.05);
        assert!(transient.is_identity());

        transient.wheel_zoom(100.0, 100.0, 3.0);
        view.commit(&mut transient);
        assert_relative_eq!(view.scale, 1.05 * 0.95);
    }

    #[test]
    fn commit_preserves_screen_positions() {
        let mapping = sample_mapping();
        let mut view = ViewState {
            scale: 1.3,
            offset_x: 10.0,
            offset_y: -4.0,
            ..Default::default()
        };
        let mut transient = Transient::default();
        transient.wheel_zoom(300.0, 200.0, -120.0);
        transient.drag(14.0, -9.0);

        let world = (11.0, 3.0);
        let before = world_to_screen(&mapping, &view, &transient, world.0, world.1);
        view.commit(&mut transient);
        let after = world_to_screen(&mapping, &view, &transient, world.0, world.1);
        assert_relative_eq!(before.0, after.0, epsilon = 1e-9);
        assert_relative_eq!(before.1, after.1, epsilon = 1e-9);
    }

    #[test]
    fn drag_accumulates() {
        let mut transient = Transient::default();
        transient.drag(5.0, 2.0);
        transient.drag(-1.0, 3.0);
        assert_relative_eq!(transient.dx, 4.0);
        assert_relative_eq!(transient.dy, 5.0);
    }

    #[test]
    fn reset_keeps_flips() {
        let mut view = ViewState {
            scale: 3.0,
            offset_x: 50.0,
            offset_y: 60.0,
            h_flip: true,
            v_flip: false,
        };
        view.reset();
        assert_eq!(view.scale, 1.0);
        assert_eq!(view.offset_x, 0.0);
        assert!(view.h_flip);
    }
}
