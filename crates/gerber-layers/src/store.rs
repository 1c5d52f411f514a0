//! The authoritative per-session list of layer records and the merge rules
//! for folding incremental worker replies into it.
//!
//! Generic over the drawable path handle `P` so the merge logic runs under
//! native tests; the browser frontend instantiates `P = Path2d`.

use log::debug;

use crate::protocol::FileUpdate;
use crate::types::{
    BoardLayer, BoardSide, Bounds, ComponentCenter, DrillHole, LayerStatus, PolygonSet,
};

/// Cached drawable paths for one record; built once per geometry arrival.
#[derive(Debug, Clone)]
pub struct PathPair<P> {
    pub solid: Option<P>,
    pub stroke: Option<P>,
}

impl<P> Default for PathPair<P> {
    fn default() -> Self {
        Self {
            solid: None,
            stroke: None,
        }
    }
}

impl<P> PathPair<P> {
    pub fn is_empty(&self) -> bool {
        self.solid.is_none() && self.stroke.is_none()
    }
}

/// One classified input file. Identity is the file name, unique within a
/// session. Records are replaced wholesale on update, never mutated
/// field-by-field from the outside.
#[derive(Debug, Clone)]
pub struct LayerRecord<P> {
    pub file_name: String,
    pub side: BoardSide,
    pub layer: BoardLayer,
    pub status: LayerStatus,
    pub content: Option<String>,
    pub geometry: Option<PolygonSet>,
    pub drill_holes: Vec<DrillHole>,
    pub centers: Vec<ComponentCenter>,
    pub exception: Option<String>,
    pub selected: bool,
    /// Render opacity in `[0, 1]`.
    pub opacity: f64,
    /// Render color, `0xRRGGBB`.
    pub color: u32,
    pub cached: PathPair<P>,
}

impl<P> LayerRecord<P> {
    fn new(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            side: BoardSide::Unknown,
            layer: BoardLayer::Unknown,
            status: LayerStatus::Queued,
            content: None,
            geometry: None,
            drill_holes: Vec::new(),
            centers: Vec::new(),
            exception: None,
            selected: false,
            opacity: 1.0,
            color: BoardLayer::Unknown.default_color(),
            cached: PathPair::default(),
        }
    }

    /// Bounds this record contributes to the selection fold.
    pub fn bounds(&self) -> Option<Bounds> {
        self.geometry.as_ref().and_then(|g| g.bounds)
    }

    pub fn has_drawable_paths(&self) -> bool {
        !self.cached.is_empty()
    }
}

/// Session-scoped owner of all [`LayerRecord`]s.
#[derive(Debug, Default)]
pub struct LayerStore<P> {
    records: Vec<LayerRecord<P>>,
}

impl<P> LayerStore<P> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[LayerRecord<P>] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, file_name: &str) -> Option<&LayerRecord<P>> {
        self.records.iter().find(|r| r.file_name == file_name)
    }

    /// Drop every record; called when a new input supersedes the session.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Fold one incremental reply into the list. Creates the record on first
    /// sight; otherwise merges field-wise: status always (subject to the
    /// monotone/terminal rules), optional fields only when present.
    ///
    /// `build_paths` constructs the drawable path pair from newly arrived
    /// geometry; it is skipped when the record already carries non-empty
    /// cached paths, so re-applying a reply is a no-op.
    pub fn apply_update(
        &mut self,
        update: &FileUpdate,
        build_paths: impl FnOnce(&PolygonSet) -> PathPair<P>,
    ) {
        let index = match self
            .records
            .iter()
            .position(|r| r.file_name == update.file_name)
        {
            Some(i) => i,
            None => {
                debug!("new layer record {}", update.file_name);
                self.records.push(LayerRecord::new(&update.file_name));
                self.records.len() - 1
            }
        };

        let old = std::mem::replace(
            &mut self.records[index],
            LayerRecord::new(&update.file_name),
        );
        let was_queued = old.status == LayerStatus::Queued;
        let mut next = LayerRecord {
            file_name: old.file_name,
            side: update.side.unwrap_or(old.side),
            layer: update.layer.unwrap_or(old.layer),
            status: old.status.advance(update.status),
            content: update.content.clone().or(old.content),
            geometry: update.geometry.clone().or(old.geometry),
            drill_holes: update.drill_holes.clone().unwrap_or(old.drill_holes),
            centers: update.centers.clone().unwrap_or(old.centers),
            exception: update.exception.clone().or(old.exception),
            selected: old.selected,
            opacity: old.opacity,
            color: old.color,
            cached: old.cached,
        };

        // First classification fixes the default color; a later manual layer
        // change keeps whatever the user picked.
        if was_queued {
            if let Some(layer) = update.layer {
                next.color = layer.default_color();
            }
        }

        if next.cached.is_empty() {
            if let Some(geometry) = update.geometry.as_ref() {
                next.cached = build_paths(geometry);
            }
        }

        self.records[index] = next;
    }

    /// Flip selection for one record; returns the refolded selection bounds.
    pub fn toggle_selected(&mut self, file_name: &str) -> Option<Bounds> {
        if let Some(record) = self
            .records
            .iter_mut()
            .find(|r| r.file_name == file_name)
        {
            record.selected = !record.selected;
        }
        self.selection_bounds()
    }

    pub fn set_opacity(&mut self, file_name: &str, opacity: f64) {
        if let Some(record) = self
            .records
            .iter_mut()
            .find(|r| r.file_name == file_name)
        {
            record.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    pub fn set_color(&mut self, file_name: &str, color: u32) {
        if let Some(record) = self
            .records
            .iter_mut()
            .find(|r| r.file_name == file_name)
        {
            record.color = color;
        }
    }

    pub fn set_side(&mut self, file_name: &str, side: BoardSide) {
        if let Some(record) = self
            .records
            .iter_mut()
            .find(|r| r.file_name == file_name)
        {
            record.side = side;
        }
    }

    pub fn set_layer(&mut self, file_name: &str, layer: BoardLayer) {
        if let Some(record) = self
            .records
            .iter_mut()
            .find(|r| r.file_name == file_name)
        {
            record.layer = layer;
        }
    }

    pub fn any_selected(&self) -> bool {
        self.records.iter().any(|r| r.selected)
    }

    /// Min/max fold over the selected records' bounds. Commutative, so the
    /// result is independent of record order; `None` when nothing selected
    /// contributes geometry.
    pub fn selection_bounds(&self) -> Option<Bounds> {
        self.records
            .iter()
            .filter(|r| r.selected)
            .filter_map(|r| r.bounds())
            .reduce(|a, b| a.union(&b))
    }

    /// Selected records in ascending board-layer paint order.
    pub fn selected_sorted(&self) -> Vec<&LayerRecord<P>> {
        let mut selected: Vec<&LayerRecord<P>> =
            self.records.iter().filter(|r| r.selected).collect();
        selected.sort_by_key(|r| r.layer.paint_order());
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bounds;

    fn counting_builder(count: std::rc::Rc<std::cell::Cell<u32>>) -> impl Fn(&PolygonSet) -> PathPair<u32> {
        move |set| {
            count.set(count.get() + 1);
            PathPair {
                solid: (!set.solids.is_empty()).then_some(count.get()),
                stroke: (!set.strokes.is_empty()).then_some(count.get()),
            }
        }
    }

    fn square_update(name: &str) -> FileUpdate {
        let mut update = FileUpdate::status(name, LayerStatus::Done);
        update.side = Some(BoardSide::Top);
        update.layer = Some(BoardLayer::Copper);
        update.geometry = Some(PolygonSet {
            solids: vec![vec![0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0]],
            strokes: vec![],
            bounds: Some(Bounds::new(0.0, 0.0, 10.0, 10.0)),
        });
        update
    }

    #[test]
    fn done_reply_creates_record_with_paths_and_bounds() {
        // Scenario A from the reply contract.
        let mut store: LayerStore<u32> = LayerStore::new();
        let count = std::rc::Rc::new(std::cell::Cell::new(0));
        store.apply_update(&square_update("a.gtl"), counting_builder(count.clone()));

        let record = store.get("a.gtl").unwrap();
        assert_eq!(record.status, LayerStatus::Done);
        assert_eq!(record.layer, BoardLayer::Copper);
        assert!(record.has_drawable_paths());

        let bounds = store.toggle_selected("a.gtl").unwrap();
        assert_eq!(bounds, Bounds::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn reapplying_same_reply_is_idempotent() {
        let mut store: LayerStore<u32> = LayerStore::new();
        let count = std::rc::Rc::new(std::cell::Cell::new(0));
        let update = square_update("a.gtl");
        store.apply_update(&update, counting_builder(count.clone()));
        store.apply_update(&update, counting_builder(count.clone()));

        assert_eq!(store.records().len(), 1);
        // Path construction ran exactly once.
        assert_eq!(count.get(), 1);
        let record = store.get("a.gtl").unwrap();
        assert_eq!(record.status, LayerStatus::Done);
        assert_eq!(record.cached.solid, Some(1));
    }

    #[test]
    fn partial_update_keeps_absent_fields() {
        let mut store: LayerStore<u32> = LayerStore::new();
        let count = std::rc::Rc::new(std::cell::Cell::new(0));
        store.apply_update(&square_update("a.gtl"), counting_builder(count.clone()));

        // A later bare status reply must not wipe classification or geometry.
        let bare = FileUpdate::status("a.gtl", LayerStatus::Done);
        store.apply_update(&bare, counting_builder(count.clone()));
        let record = store.get("a.gtl").unwrap();
        assert_eq!(record.side, BoardSide::Top);
        assert_eq!(record.layer, BoardLayer::Copper);
        assert!(record.geometry.is_some());
    }

    #[test]
    fn status_sequence_narrows() {
        let mut store: LayerStore<u32> = LayerStore::new();
        let build = |_: &PolygonSet| PathPair::default();
        let mut update = FileUpdate::status("b.gbs", LayerStatus::Unzipping);
        update.side = Some(BoardSide::Bottom);
        update.layer = Some(BoardLayer::SolderMask);
        store.apply_update(&update, build);
        assert_eq!(store.get("b.gbs").unwrap().status, LayerStatus::Unzipping);

        store.apply_update(&FileUpdate::status("b.gbs", LayerStatus::Rendering), build);
        assert_eq!(store.get("b.gbs").unwrap().status, LayerStatus::Rendering);

        // Stale Processing reply after Rendering must not regress.
        store.apply_update(&FileUpdate::status("b.gbs", LayerStatus::Unzipping), build);
        assert_eq!(store.get("b.gbs").unwrap().status, LayerStatus::Rendering);

        let mut failed = FileUpdate::status("b.gbs", LayerStatus::Error);
        failed.exception = Some("bad aperture".into());
        store.apply_update(&failed, build);
        let record = store.get("b.gbs").unwrap();
        assert_eq!(record.status, LayerStatus::Error);
        assert_eq!(record.exception.as_deref(), Some("bad aperture"));

        // Error is terminal.
        store.apply_update(&FileUpdate::status("b.gbs", LayerStatus::Done), build);
        assert_eq!(store.get("b.gbs").unwrap().status, LayerStatus::Error);
    }

    #[test]
    fn bounds_fold_is_order_independent() {
        // Scenario B, under every insertion permutation.
        let square = |name: &str, min: f64, max: f64| {
            let mut update = FileUpdate::status(name, LayerStatus::Done);
            update.geometry = Some(PolygonSet {
                solids: vec![vec![min, min, max, max]],
                strokes: vec![],
                bounds: Some(Bounds::new(min, min, max, max)),
            });
            update
        };
        let updates = [
            square("a", 0.0, 10.0),
            square("b", 5.0, 20.0),
            square("c", -3.0, 1.0),
        ];
        let expected = Bounds::new(-3.0, -3.0, 20.0, 20.0);

        let permutations: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        for order in permutations {
            let mut store: LayerStore<u32> = LayerStore::new();
            for i in order {
                store.apply_update(&updates[i], |_| PathPair::default());
            }
            for name in ["a", "b", "c"] {
                store.toggle_selected(name);
            }
            assert_eq!(store.selection_bounds(), Some(expected));
        }
    }

    #[test]
    fn empty_selection_has_no_bounds() {
        let mut store: LayerStore<u32> = LayerStore::new();
        store.apply_update(&square_update("a.gtl"), |_| PathPair::default());
        assert_eq!(store.selection_bounds(), None);
        store.toggle_selected("a.gtl");
        assert!(store.selection_bounds().is_some());
        store.toggle_selected("a.gtl");
        assert_eq!(store.selection_bounds(), None);
    }

    #[test]
    fn selected_sorted_by_paint_order() {
        let mut store: LayerStore<u32> = LayerStore::new();
        for (name, layer) in [
            ("silk.gto", BoardLayer::Silk),
            ("mask.gts", BoardLayer::SolderMask),
            ("copper.gtl", BoardLayer::Copper),
        ] {
            let mut update = FileUpdate::status(name, LayerStatus::Done);
            update.layer = Some(layer);
            store.apply_update(&update, |_| PathPair::default());
            store.toggle_selected(name);
        }
        let layers: Vec<BoardLayer> = store
            .selected_sorted()
            .iter()
            .map(|r| r.layer)
            .collect();
        assert_eq!(
            layers,
            vec![BoardLayer::Copper, BoardLayer::SolderMask, BoardLayer::Silk]
        );
    }

    #[test]
    fn clear_drops_session() {
        let mut store: LayerStore<u32> = LayerStore::new();
        store.apply_update(&square_update("a.gtl"), |_| PathPair::default());
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn mediated_mutations() {
        let mut store: LayerStore<u32> = LayerStore::new();
        store.apply_update(&square_update("a.gtl"), |_| PathPair::default());
        store.set_opacity("a.gtl", 2.0);
        assert_eq!(store.get("a.gtl").unwrap().opacity, 1.0);
        store.set_opacity("a.gtl", 0.25);
        assert_eq!(store.get("a.gtl").unwrap().opacity, 0.25);
        store.set_color("a.gtl", 0x123456);
        store.set_layer("a.gtl", BoardLayer::Silk);
        let record = store.get("a.gtl").unwrap();
        // Reassigning the layer keeps the user-picked color.
        assert_eq!(record.color, 0x123456);
        assert_eq!(record.layer, BoardLayer::Silk);
    }
}
