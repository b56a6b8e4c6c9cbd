use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use embertrail_core::OverlayStyle;
use embertrail_platform::{
    AttachFlag, EventHandler, EventKind, FrameCallback, FrameToken, HostEnvironment, HostError, HostEvent,
    ListenerId, Result, Viewport,
};
use glam::DVec2;
use tracing::warn;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, Document, Event, EventTarget, HtmlCanvasElement, MouseEvent, Window};

use crate::canvas::CanvasContext;

thread_local! {
    // One trail per page, however many hosts get constructed.
    static PAGE_FLAG: Rc<AttachFlag> = Rc::new(AttachFlag::new());
}

struct Registration {
    target: EventTarget,
    name: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

type PendingFrames = Rc<RefCell<Vec<(FrameToken, FrameCallback)>>>;

/// Browser host: the overlay is a `<canvas>` appended to `<body>`, pointer
/// events come from the document element, and frames ride
/// `requestAnimationFrame`.
pub struct WebHost {
    window: Window,
    document: Document,
    flag: Rc<AttachFlag>,
    listeners: RefCell<HashMap<ListenerId, Registration>>,
    pending: PendingFrames,
    raf_id: Rc<Cell<Option<i32>>>,
    pump: Closure<dyn FnMut(f64)>,
    next_id: Cell<u64>,
}

impl WebHost {
    pub fn new() -> Result<Self> {
        let window = web_sys::window().ok_or(HostError::NoDocument)?;
        let document = window.document().ok_or(HostError::NoDocument)?;
        let pending: PendingFrames = Rc::new(RefCell::new(Vec::new()));
        let raf_id = Rc::new(Cell::new(None));
        let pump = {
            let pending = Rc::clone(&pending);
            let raf_id = Rc::clone(&raf_id);
            Closure::wrap(Box::new(move |_timestamp: f64| {
                raf_id.set(None);
                let due = std::mem::take(&mut *pending.borrow_mut());
                for (_, callback) in due {
                    callback();
                }
            }) as Box<dyn FnMut(f64)>)
        };
        Ok(Self {
            window,
            document,
            flag: PAGE_FLAG.with(Rc::clone),
            listeners: RefCell::new(HashMap::new()),
            pending,
            raf_id,
            pump,
            next_id: Cell::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn event_source(&self, kind: EventKind) -> Result<(EventTarget, &'static str)> {
        let name = match kind {
            EventKind::PointerMove => "mousemove",
            EventKind::PointerEnter => "mouseenter",
            EventKind::PointerLeave => "mouseleave",
            EventKind::Resize => return Ok((self.window.clone().into(), "resize")),
        };
        let root = self
            .document
            .document_element()
            .ok_or_else(|| HostError::Listener("document has no root element".into()))?;
        Ok((root.into(), name))
    }
}

fn inner_viewport(window: &Window) -> Viewport {
    let dimension = |value: std::result::Result<JsValue, JsValue>| {
        value.ok().and_then(|v| v.as_f64()).map_or(0, |v| v.max(0.0) as u32)
    };
    Viewport::new(dimension(window.inner_width()), dimension(window.inner_height()))
}

fn translate(kind: EventKind, event: &Event, window: &Window) -> Option<HostEvent> {
    match kind {
        EventKind::PointerMove => {
            let mouse = event.dyn_ref::<MouseEvent>()?;
            Some(HostEvent::PointerMove(DVec2::new(
                f64::from(mouse.client_x()),
                f64::from(mouse.client_y()),
            )))
        }
        EventKind::PointerEnter => Some(HostEvent::PointerEnter),
        EventKind::PointerLeave => Some(HostEvent::PointerLeave),
        EventKind::Resize => Some(HostEvent::Resize(inner_viewport(window))),
    }
}

impl HostEnvironment for WebHost {
    type Overlay = HtmlCanvasElement;
    type Context = CanvasContext;

    fn attach_flag(&self) -> &AttachFlag {
        &self.flag
    }

    fn create_overlay(&self, style: &OverlayStyle) -> Result<HtmlCanvasElement> {
        let body = self.document.body().ok_or(HostError::NoDocument)?;
        let canvas = self
            .document
            .create_element("canvas")
            .map_err(|err| HostError::Overlay(format!("{err:?}")))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| HostError::Overlay("created element is not a canvas".into()))?;
        canvas
            .set_attribute("style", &style.to_css())
            .map_err(|err| HostError::Overlay(format!("{err:?}")))?;
        canvas
            .set_attribute("aria-hidden", "true")
            .map_err(|err| HostError::Overlay(format!("{err:?}")))?;
        body.append_child(&canvas)
            .map_err(|err| HostError::Overlay(format!("could not append overlay: {err:?}")))?;
        Ok(canvas)
    }

    fn context_2d(&self, overlay: &HtmlCanvasElement) -> Result<CanvasContext> {
        let ctx = overlay
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|object| object.dyn_into::<CanvasRenderingContext2d>().ok())
            .ok_or(HostError::ContextUnavailable)?;
        Ok(CanvasContext::new(ctx))
    }

    fn remove_overlay(&self, overlay: HtmlCanvasElement) {
        overlay.remove();
    }

    fn resize_overlay(&self, overlay: &HtmlCanvasElement, viewport: Viewport) -> Result<()> {
        overlay.set_width(viewport.width);
        overlay.set_height(viewport.height);
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        inner_viewport(&self.window)
    }

    fn listen(&self, kind: EventKind, mut handler: EventHandler) -> Result<ListenerId> {
        let (target, name) = self.event_source(kind)?;
        let window = self.window.clone();
        let closure = Closure::wrap(Box::new(move |event: Event| {
            if let Some(event) = translate(kind, &event, &window) {
                handler(event);
            }
        }) as Box<dyn FnMut(Event)>);
        target
            .add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
            .map_err(|err| HostError::Listener(format!("{name}: {err:?}")))?;
        let id = ListenerId(self.next_id());
        self.listeners.borrow_mut().insert(id, Registration { target, name, closure });
        Ok(id)
    }

    fn unlisten(&self, id: ListenerId) {
        let Some(registration) = self.listeners.borrow_mut().remove(&id) else {
            return;
        };
        let Registration { target, name, closure } = registration;
        if let Err(err) = target.remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref()) {
            warn!("could not remove {name} listener: {err:?}");
        }
    }

    fn request_frame(&self, callback: FrameCallback) -> Result<FrameToken> {
        let token = FrameToken(self.next_id());
        self.pending.borrow_mut().push((token, callback));
        if self.raf_id.get().is_none() {
            let id = self
                .window
                .request_animation_frame(self.pump.as_ref().unchecked_ref())
                .map_err(|err| {
                    self.pending.borrow_mut().retain(|(pending, _)| *pending != token);
                    HostError::Scheduler(format!("{err:?}"))
                })?;
            self.raf_id.set(Some(id));
        }
        Ok(token)
    }

    fn cancel_frame(&self, token: FrameToken) {
        let mut pending = self.pending.borrow_mut();
        pending.retain(|(queued, _)| *queued != token);
        if pending.is_empty() {
            if let Some(id) = self.raf_id.take() {
                if let Err(err) = self.window.cancel_animation_frame(id) {
                    warn!("cancelAnimationFrame failed: {err:?}");
                }
            }
        }
    }
}
