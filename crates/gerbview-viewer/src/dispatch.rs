//! The background dispatcher: owns the parsing worker for the current
//! session, correlates streamed replies back to the scheduling call-site,
//! and cancels in-flight work when the session is superseded.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{MessageEvent, Worker};

use gerber_layers::protocol::{WorkInput, WorkOutput, WorkReply, WorkRequest};

/// Bootstrap script for the background context; loads the converter library
/// and the `gerbview-worker` wasm module.
pub const WORKER_SCRIPT: &str = "parse-worker.js";

type ReplyCallback = Rc<dyn Fn(WorkOutput)>;
type CallbackMap = Rc<RefCell<HashMap<u32, ReplyCallback>>>;

pub struct ParserDispatch {
    worker: Worker,
    callbacks: CallbackMap,
    next_id: u32,
    _onmessage: Closure<dyn FnMut(MessageEvent)>,
}

impl ParserDispatch {
    /// Spin up a fresh worker. At most one dispatcher may be live per
    /// session; the owner terminates the previous one first.
    pub fn new() -> Result<Self, JsValue> {
        let worker = Worker::new(WORKER_SCRIPT)?;
        let callbacks: CallbackMap = Rc::new(RefCell::new(HashMap::new()));

        let map = Rc::clone(&callbacks);
        let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            let Some(text) = event.data().as_string() else {
                log::warn!("dropping non-text worker message");
                return;
            };
            match serde_json::from_str::<WorkReply>(&text) {
                Ok(reply) => deliver(&map, reply),
                Err(err) => log::warn!("undecodable worker reply: {err}"),
            }
        });
        worker.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));

        Ok(Self {
            worker,
            callbacks,
            next_id: 0,
            _onmessage: onmessage,
        })
    }

    /// Queue one unit of work. The callback fires once per streamed reply
    /// and is retired when the request's `Done` summary arrives.
    pub fn schedule(
        &mut self,
        input: WorkInput,
        on_reply: impl Fn(WorkOutput) + 'static,
    ) -> Result<(), JsValue> {
        let id = self.next_id;
        self.next_id += 1;
        self.callbacks.borrow_mut().insert(id, Rc::new(on_reply));

        let request = WorkRequest {
            id,
            origin_tag: page_origin(),
            input,
        };
        let json = serde_json::to_string(&request)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        self.worker.post_message(&JsValue::from_str(&json))?;
        log::debug!("scheduled work {id}");
        Ok(())
    }

    /// Hard cancellation: kill the worker and drop every pending callback.
    /// Replies already in flight are never delivered.
    pub fn terminate(&mut self) {
        self.worker.terminate();
        self.callbacks.borrow_mut().clear();
    }
}

impl Drop for ParserDispatch {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Route one decoded reply to its registered callback. Exactly one callback
/// sees it, exactly once; the map entry is removed when the request closes.
fn deliver(map: &CallbackMap, reply: WorkReply) {
    let callback = map.borrow().get(&reply.id).cloned();
    let Some(callback) = callback else {
        log::debug!("reply for retired request {}", reply.id);
        return;
    };
    if matches!(reply.output, WorkOutput::Done { .. }) {
        map.borrow_mut().remove(&reply.id);
    }
    callback(reply.output);
}

fn page_origin() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_else(|| "*".to_string())
}
