//! Bindings to the host-side geometry converter library.
//!
//! The converter is an external collaborator loaded by the worker bootstrap
//! script (`importScripts`) and exposed on the worker global as
//! `self.grbconvert`. Both entry points take raw fabrication text and return
//! JSON: `gerberToPolygons` yields
//! `{solidPolygons, strokePolygons, bounds, componentCenters?}` and
//! `drillToHoles` yields `[{x, y, diameter}]`. A thrown JS exception maps to
//! [`LayerError::Render`] and ends up as an `"error"` reply for that file
//! only.

use serde::Deserialize;
use wasm_bindgen::prelude::*;

use gerber_layers::types::{ComponentCenter, DrillHole, PolygonSet};
use gerber_layers::LayerError;

use crate::session::{GeometryRenderer, RenderedLayer};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = grbconvert, js_name = gerberToPolygons)]
    fn gerber_to_polygons(content: &str) -> Result<String, JsValue>;

    #[wasm_bindgen(catch, js_namespace = grbconvert, js_name = drillToHoles)]
    fn drill_to_holes(content: &str) -> Result<String, JsValue>;
}

#[derive(Deserialize)]
struct ConvertedLayer {
    #[serde(flatten)]
    geometry: PolygonSet,
    #[serde(rename = "componentCenters", default)]
    centers: Vec<ComponentCenter>,
}

fn js_error(value: JsValue) -> LayerError {
    let message = value
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(&value, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| "converter failed".to_string());
    LayerError::Render(message)
}

/// [`GeometryRenderer`] backed by the host converter library.
pub struct JsRenderer;

impl GeometryRenderer for JsRenderer {
    fn render_gerber(&self, content: &str) -> Result<RenderedLayer, LayerError> {
        let json = gerber_to_polygons(content).map_err(js_error)?;
        let converted: ConvertedLayer = serde_json::from_str(&json)?;
        Ok(RenderedLayer {
            geometry: converted.geometry,
            centers: converted.centers,
        })
    }

    fn render_drill(&self, content: &str) -> Result<Vec<DrillHole>, LayerError> {
        let json = drill_to_holes(content).map_err(js_error)?;
        Ok(serde_json::from_str(&json)?)
    }
}
