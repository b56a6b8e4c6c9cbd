//! Browser bindings for the cursor trail.
//!
//! A page calls `mount()` when its layout mounts and `unmount()` when it goes
//! away. Neither takes arguments, returns anything, or throws: a browser that
//! cannot draw the trail simply shows nothing.
use std::cell::RefCell;
use std::rc::Rc;

use embertrail_core::EngineConfig;
use embertrail_overlay::{attach, TrailHandle};
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;

mod canvas;
mod host;
pub use crate::canvas::CanvasContext;
pub use crate::host::WebHost;

thread_local! {
    static MOUNTED: RefCell<Option<TrailHandle<WebHost>>> = const { RefCell::new(None) };
}

/// Installs the panic hook and routes `tracing` output to the browser console.
#[wasm_bindgen(start)]
pub fn start() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            console_error_panic_hook::set_once();
            console_log::init_with_level(log::Level::Info).ok();
        }
    }
}

#[wasm_bindgen]
pub fn mount() {
    mount_config(EngineConfig::default());
}

/// Like [`mount`], with a JSON-encoded trail config. An invalid config is
/// logged and ignored.
#[wasm_bindgen(js_name = mountWithConfig)]
pub fn mount_with_config(json: &str) {
    match EngineConfig::from_json_str(json) {
        Ok(config) => mount_config(config),
        Err(err) => warn!("cursor trail config rejected: {err}"),
    }
}

#[wasm_bindgen]
pub fn unmount() {
    let handle = MOUNTED.with(|slot| slot.borrow_mut().take());
    if let Some(mut handle) = handle {
        handle.detach();
    }
}

fn mount_config(config: EngineConfig) {
    MOUNTED.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.as_ref().is_some_and(TrailHandle::is_active) {
            debug!("cursor trail already mounted");
            return;
        }
        let host = match WebHost::new() {
            Ok(host) => Rc::new(host),
            Err(err) => {
                warn!("cursor trail has no browser host: {err}");
                return;
            }
        };
        let handle = attach(host, config);
        if handle.is_active() {
            *slot = Some(handle);
        }
    });
}
