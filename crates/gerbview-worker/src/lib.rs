//! Background execution context for fabrication-archive parsing.
//!
//! Compiled to wasm and loaded as a dedicated worker; the interactive
//! thread talks to it exclusively through the JSON message protocol in
//! `gerber_layers::protocol`.

pub mod bindings;
pub mod session;

use log::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{DedicatedWorkerGlobalScope, MessageEvent};

use gerber_layers::protocol::{WorkReply, WorkRequest};

#[wasm_bindgen(start)]
pub fn start() {
    wasm_logger::init(wasm_logger::Config::default());

    let scope: DedicatedWorkerGlobalScope = js_sys::global().unchecked_into();
    let post_scope = scope.clone();

    let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
        let Some(text) = event.data().as_string() else {
            warn!("dropping non-text message");
            return;
        };
        let request: WorkRequest = match serde_json::from_str(&text) {
            Ok(request) => request,
            Err(err) => {
                warn!("undecodable work request: {err}");
                return;
            }
        };
        log::debug!(
            "request {} from {}: starting session",
            request.id,
            request.origin_tag
        );
        let scope = post_scope.clone();
        session::run(
            &request,
            &bindings::JsRenderer,
            js_sys::Date::now,
            move |reply: WorkReply| {
                match serde_json::to_string(&reply) {
                    Ok(json) => {
                        if let Err(err) = scope.post_message(&JsValue::from_str(&json)) {
                            warn!("post_message failed: {err:?}");
                        }
                    }
                    Err(err) => warn!("unencodable reply: {err}"),
                }
            },
        );
    });

    scope.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    onmessage.forget();
}
