mod dispatch;
mod render;

use std::cell::RefCell;
use std::rc::Rc;

use gloo::events::EventListener;
use gloo::timers::callback::Timeout;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Event, HtmlCanvasElement, HtmlElement, HtmlInputElement, HtmlSelectElement, KeyboardEvent,
};
use yew::prelude::*;

use gerber_layers::protocol::{NamedFile, WorkInput, WorkOutput};
use gerber_layers::store::LayerStore;
use gerber_layers::types::{BoardLayer, BoardSide, LayerStatus};
use gerber_layers::view::{self, ViewState};

use dispatch::ParserDispatch;
use render::Viewport;

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    yew::Renderer::<App>::new().render();
}

// ─── App State ──────────────────────────────────────────────────────

/// Everything the event handlers share. Single-threaded; the worker only
/// ever reaches this through the dispatcher's reply callback.
struct AppCore {
    store: LayerStore<web_sys::Path2d>,
    viewport: Option<Viewport>,
    dispatch: Option<ParserDispatch>,
    /// Single-slot debounce for the fine redraw; replacing it cancels the
    /// previous timer.
    pending_redraw: Option<Timeout>,
}

impl AppCore {
    fn new() -> Self {
        Self {
            store: LayerStore::new(),
            viewport: None,
            dispatch: None,
            pending_redraw: None,
        }
    }
}

type Shared = Rc<RefCell<AppCore>>;

fn device_pixel_ratio() -> f64 {
    web_sys::window()
        .map(|w| w.device_pixel_ratio())
        .unwrap_or(1.0)
}

/// Arm (or re-arm) the settle timer for a full vector repaint.
fn schedule_fine_redraw(app: &Shared) {
    let handle = Rc::clone(app);
    let timeout = Timeout::new(view::FINE_REDRAW_DELAY_MS, move || {
        let mut core = handle.borrow_mut();
        core.pending_redraw = None;
        let AppCore {
            store, viewport, ..
        } = &mut *core;
        if let Some(viewport) = viewport {
            viewport.fine_redraw(store);
        }
    });
    app.borrow_mut().pending_redraw = Some(timeout);
}

/// Selection or bounds changed: the raster cache is stale, so repaint
/// immediately; an emptied selection also resets the committed view.
fn selection_changed(core: &mut AppCore) {
    core.pending_redraw = None;
    let AppCore {
        store, viewport, ..
    } = core;
    if let Some(viewport) = viewport {
        viewport.invalidate();
        if !store.any_selected() {
            viewport.view = ViewState::default();
        }
        viewport.fine_redraw(store);
    }
}

fn handle_key(core: &mut AppCore, key: &str) {
    let AppCore {
        store,
        viewport,
        pending_redraw,
        ..
    } = core;
    let Some(viewport) = viewport else {
        return;
    };
    match key {
        "z" => viewport.view.reset(),
        "h" | "f" => viewport.view.h_flip = !viewport.view.h_flip,
        "v" => viewport.view.v_flip = !viewport.view.v_flip,
        _ => return,
    }
    *pending_redraw = None;
    viewport.invalidate();
    viewport.fine_redraw(store);
}

fn fit_canvas_to_container(core: &mut AppCore) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let Some(container) = document.get_element_by_id("canvascontainer") else {
        return;
    };
    let container: HtmlElement = match container.dyn_into() {
        Ok(el) => el,
        Err(_) => return,
    };
    let dpr = device_pixel_ratio();
    let width = container.client_width() as f64 * dpr;
    let height = container.client_height() as f64 * dpr;
    if width <= 0.0 || height <= 0.0 {
        return;
    }
    let AppCore {
        store, viewport, ..
    } = core;
    if let Some(viewport) = viewport {
        viewport.resize(width as u32, height as u32);
        viewport.fine_redraw(store);
    }
}

/// Kick off a new parsing session, superseding any in-progress one. The old
/// worker is terminated first, so its in-flight replies are never delivered.
fn start_session(app: &Shared, input: WorkInput, version: UseStateHandle<u32>) {
    let mut core_ref = app.borrow_mut();
    let core = &mut *core_ref;
    if let Some(mut old) = core.dispatch.take() {
        old.terminate();
    }
    core.store.clear();
    core.pending_redraw = None;
    if let Some(viewport) = core.viewport.as_mut() {
        viewport.invalidate();
        viewport.view = ViewState::default();
        viewport.fine_redraw(&core.store);
    }

    let mut dispatcher = match ParserDispatch::new() {
        Ok(dispatcher) => dispatcher,
        Err(err) => {
            log::error!("cannot start parsing worker: {err:?}");
            return;
        }
    };

    let handle = Rc::clone(app);
    let result = dispatcher.schedule(input, move |output| {
        let mut core = handle.borrow_mut();
        match output {
            WorkOutput::File(update) => {
                let was_selected = core
                    .store
                    .get(&update.file_name)
                    .is_some_and(|r| r.selected);
                let grew_geometry = update.geometry.is_some();
                core.store.apply_update(&update, render::build_paths);
                if was_selected && grew_geometry {
                    selection_changed(&mut core);
                }
            }
            WorkOutput::Done { files } => {
                log::info!("parsing session complete: {files} files");
            }
        }
        drop(core);
        version.set(*version + 1);
    });
    if let Err(err) = result {
        log::error!("schedule failed: {err:?}");
        return;
    }
    core.dispatch = Some(dispatcher);
}

// ─── Layer list row data (snapshotted out of the RefCell for rendering) ──

#[derive(Clone, PartialEq)]
struct RowData {
    file_name: String,
    side: BoardSide,
    layer: BoardLayer,
    status: LayerStatus,
    exception: Option<String>,
    selected: bool,
    selectable: bool,
    opacity: f64,
    color: u32,
}

fn snapshot_rows(store: &LayerStore<web_sys::Path2d>) -> Vec<RowData> {
    store
        .records()
        .iter()
        .map(|r| RowData {
            file_name: r.file_name.clone(),
            side: r.side,
            layer: r.layer,
            status: r.status,
            exception: r.exception.clone(),
            selected: r.selected,
            selectable: r.has_drawable_paths() || !r.drill_holes.is_empty(),
            opacity: r.opacity,
            color: r.color,
        })
        .collect()
}

// ─── App Component ──────────────────────────────────────────────────

#[function_component(App)]
fn app() -> Html {
    let core: Shared = use_mut_ref(AppCore::new);
    let version = use_state(|| 0u32);

    // Canvas, resize listener, and key bindings on mount.
    {
        let core = Rc::clone(&core);
        use_effect_with((), move |_| {
            let document = web_sys::window().unwrap().document().unwrap();
            let canvas: HtmlCanvasElement = document
                .get_element_by_id("viewport")
                .unwrap()
                .dyn_into()
                .unwrap();
            core.borrow_mut().viewport = Some(Viewport::new(canvas));
            fit_canvas_to_container(&mut core.borrow_mut());

            let resize_core = Rc::clone(&core);
            let resize = EventListener::new(&web_sys::window().unwrap(), "resize", move |_| {
                fit_canvas_to_container(&mut resize_core.borrow_mut());
            });

            let key_core = Rc::clone(&core);
            let keydown = EventListener::new(&document, "keydown", move |event: &Event| {
                if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
                    handle_key(&mut key_core.borrow_mut(), &event.key());
                }
            });

            move || {
                drop(resize);
                drop(keydown);
            }
        });
    }

    // ─── File picker ────────────────────────────────────────────────

    let on_file_change = {
        let core = Rc::clone(&core);
        let version = version.clone();
        Callback::from(move |e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            let Some(file) = input.files().and_then(|files| files.get(0)) else {
                return;
            };
            let reader = match web_sys::FileReader::new() {
                Ok(reader) => reader,
                Err(_) => return,
            };
            let reader_handle = reader.clone();
            let core = Rc::clone(&core);
            let version = version.clone();
            let file_name = file.name();
            let onload = Closure::once_into_js(move |_: web_sys::ProgressEvent| {
                let Ok(result) = reader_handle.result() else {
                    return;
                };
                let buffer: js_sys::ArrayBuffer = result.unchecked_into();
                let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
                let input = if file_name.to_lowercase().ends_with(".zip") {
                    WorkInput::from_zip(bytes)
                } else {
                    // A loose Gerber/drill file skips the unzip step.
                    WorkInput {
                        zip: None,
                        files: Some(vec![NamedFile {
                            file_name,
                            content: String::from_utf8_lossy(&bytes).into_owned(),
                        }]),
                    }
                };
                start_session(&core, input, version);
            });
            reader.set_onload(Some(onload.unchecked_ref()));
            if reader.read_as_array_buffer(&file).is_err() {
                log::error!("cannot read dropped file");
            }
        })
    };

    // ─── Canvas gestures ────────────────────────────────────────────

    let on_pointer_down = {
        let core = Rc::clone(&core);
        Callback::from(move |e: PointerEvent| {
            if e.button() != 0 {
                return;
            }
            e.prevent_default();
            if let Some(target) = e.target().and_then(|t| t.dyn_into::<HtmlElement>().ok()) {
                let _ = target.set_pointer_capture(e.pointer_id());
            }
            if let Some(viewport) = core.borrow_mut().viewport.as_mut() {
                viewport.pointer_down(e.offset_x() as f64, e.offset_y() as f64);
            }
        })
    };

    let on_pointer_move = {
        let core = Rc::clone(&core);
        Callback::from(move |e: PointerEvent| {
            let dpr = device_pixel_ratio();
            if let Some(viewport) = core.borrow_mut().viewport.as_mut() {
                if viewport.pointer_move(e.offset_x() as f64, e.offset_y() as f64, dpr) {
                    e.prevent_default();
                }
            }
        })
    };

    let on_pointer_up = {
        let core = Rc::clone(&core);
        Callback::from(move |_: PointerEvent| {
            let ended = core
                .borrow_mut()
                .viewport
                .as_mut()
                .is_some_and(|viewport| viewport.pointer_up());
            if ended {
                schedule_fine_redraw(&core);
            }
        })
    };

    let on_wheel = {
        let core = Rc::clone(&core);
        Callback::from(move |e: WheelEvent| {
            e.prevent_default();
            let mut delta = e.delta_y();
            // Line/page delta modes arrive in rows, not pixels.
            if e.delta_mode() == 1 {
                delta *= 30.0;
            } else if e.delta_mode() == 2 {
                delta *= 300.0;
            }
            let dpr = device_pixel_ratio();
            {
                let mut borrow = core.borrow_mut();
                if !borrow.store.any_selected() {
                    return;
                }
                if let Some(viewport) = borrow.viewport.as_mut() {
                    viewport.wheel(e.offset_x() as f64, e.offset_y() as f64, delta, dpr);
                }
            }
            schedule_fine_redraw(&core);
        })
    };

    // ─── Layer list callbacks ───────────────────────────────────────

    let on_toggle = {
        let core = Rc::clone(&core);
        let version = version.clone();
        Callback::from(move |file_name: String| {
            let mut borrow = core.borrow_mut();
            borrow.store.toggle_selected(&file_name);
            selection_changed(&mut borrow);
            drop(borrow);
            version.set(*version + 1);
        })
    };

    let on_side_change = {
        let core = Rc::clone(&core);
        let version = version.clone();
        Callback::from(move |(file_name, side): (String, BoardSide)| {
            core.borrow_mut().store.set_side(&file_name, side);
            version.set(*version + 1);
        })
    };

    let on_layer_change = {
        let core = Rc::clone(&core);
        let version = version.clone();
        Callback::from(move |(file_name, layer): (String, BoardLayer)| {
            let mut borrow = core.borrow_mut();
            borrow.store.set_layer(&file_name, layer);
            let selected = borrow.store.get(&file_name).is_some_and(|r| r.selected);
            if selected {
                // Paint order and mask compositing both hang off the layer.
                selection_changed(&mut borrow);
            }
            drop(borrow);
            version.set(*version + 1);
        })
    };

    let on_opacity_change = {
        let core = Rc::clone(&core);
        let version = version.clone();
        Callback::from(move |(file_name, opacity): (String, f64)| {
            let mut borrow = core.borrow_mut();
            borrow.store.set_opacity(&file_name, opacity);
            let selected = borrow.store.get(&file_name).is_some_and(|r| r.selected);
            if selected {
                selection_changed(&mut borrow);
            }
            drop(borrow);
            version.set(*version + 1);
        })
    };

    let on_color_change = {
        let core = Rc::clone(&core);
        let version = version.clone();
        Callback::from(move |(file_name, color): (String, u32)| {
            let mut borrow = core.borrow_mut();
            borrow.store.set_color(&file_name, color);
            let selected = borrow.store.get(&file_name).is_some_and(|r| r.selected);
            if selected {
                selection_changed(&mut borrow);
            }
            drop(borrow);
            version.set(*version + 1);
        })
    };

    // ─── Render ─────────────────────────────────────────────────────

    let rows = snapshot_rows(&core.borrow().store);
    let oncontextmenu = Callback::from(|e: MouseEvent| e.prevent_default());

    html! {
        <div id="topmostdiv" class="topmostdiv">
            <div id="canvascontainer"
                onwheel={on_wheel}
                onpointerdown={on_pointer_down}
                onpointermove={on_pointer_move}
                onpointerup={on_pointer_up.clone()}
                onpointercancel={on_pointer_up}
                oncontextmenu={oncontextmenu}>
                <canvas id="viewport" style="position: absolute; left: 0; top: 0; width: 100%; height: 100%;"></canvas>
            </div>

            <div class="sidebar layer-sidebar">
                <div class="sidebar-header">
                    <span class="sidebar-title">{"Layers"}</span>
                    <label class="file-button">
                        {"Open archive"}
                        <input type="file" accept=".zip,.gbr,.ger,.drl" onchange={on_file_change} />
                    </label>
                </div>
                <div class="sidebar-hint">
                    {"drag to pan, wheel to zoom, z to reset, h/f and v to flip"}
                </div>
                <table class="layer-table">
                    <thead>
                        <tr>
                            <th></th>
                            <th>{"File Name"}</th>
                            <th>{"Side"}</th>
                            <th>{"Layer"}</th>
                            <th>{"Status"}</th>
                            <th>{"Opacity"}</th>
                            <th>{"Color"}</th>
                        </tr>
                    </thead>
                    <tbody>
                        {for rows.iter().map(|row| layer_row(
                            row,
                            &on_toggle,
                            &on_side_change,
                            &on_layer_change,
                            &on_opacity_change,
                            &on_color_change,
                        ))}
                        if rows.is_empty() {
                            <tr><td colspan="7" class="empty-hint">{"No gerber data found"}</td></tr>
                        }
                    </tbody>
                </table>
            </div>
        </div>
    }
}

#[allow(clippy::too_many_arguments)]
fn layer_row(
    row: &RowData,
    on_toggle: &Callback<String>,
    on_side_change: &Callback<(String, BoardSide)>,
    on_layer_change: &Callback<(String, BoardLayer)>,
    on_opacity_change: &Callback<(String, f64)>,
    on_color_change: &Callback<(String, u32)>,
) -> Html {
    let name = row.file_name.clone();

    let toggle = {
        let cb = on_toggle.clone();
        let name = name.clone();
        let selectable = row.selectable;
        Callback::from(move |_: Event| {
            if selectable {
                cb.emit(name.clone());
            }
        })
    };

    let side = {
        let cb = on_side_change.clone();
        let name = name.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            if let Some(side) = BoardSide::from_name(&select.value()) {
                cb.emit((name.clone(), side));
            }
        })
    };

    let layer = {
        let cb = on_layer_change.clone();
        let name = name.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            if let Some(layer) = BoardLayer::from_name(&select.value()) {
                cb.emit((name.clone(), layer));
            }
        })
    };

    let opacity = {
        let cb = on_opacity_change.clone();
        let name = name.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            if let Ok(percent) = input.value().parse::<f64>() {
                cb.emit((name.clone(), percent / 100.0));
            }
        })
    };

    let color = {
        let cb = on_color_change.clone();
        let name = name.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            if let Some(color) = render::css_to_color(&input.value()) {
                cb.emit((name.clone(), color));
            }
        })
    };

    let status_cell = if row.status == LayerStatus::Error {
        html! {
            <td class="status-error" title={row.exception.clone().unwrap_or_default()}>
                {row.status.label()}
            </td>
        }
    } else {
        html! { <td>{row.status.label()}</td> }
    };

    html! {
        <tr key={row.file_name.clone()} class={classes!(row.selected.then_some("selected"))}>
            <td>
                <input type="checkbox"
                    checked={row.selected}
                    disabled={!row.selectable}
                    onchange={toggle} />
            </td>
            <td class="file-name">{&row.file_name}</td>
            <td>
                <select onchange={side}>
                    {for BoardSide::ALL.iter().map(|s| html! {
                        <option value={s.name()} selected={*s == row.side}>{s.name()}</option>
                    })}
                </select>
            </td>
            <td>
                <select onchange={layer}>
                    {for BoardLayer::ALL.iter().map(|l| html! {
                        <option value={l.name()} selected={*l == row.layer}>{l.name()}</option>
                    })}
                </select>
            </td>
            {status_cell}
            <td>
                <input type="range" min="0" max="100"
                    value={((row.opacity * 100.0) as i32).to_string()}
                    oninput={opacity} />
            </td>
            <td>
                <input type="color"
                    value={render::color_to_css(row.color)}
                    oninput={color} />
            </td>
        </tr>
    }
}
