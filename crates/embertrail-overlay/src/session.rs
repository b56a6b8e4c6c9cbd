use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use embertrail_core::TrailEngine;
use embertrail_platform::{
    DrawContext, EventKind, FrameToken, HostEnvironment, HostEvent, ListenerId, Result,
};
use tracing::{info, warn};

/// Live state of one attached trail. Host callbacks only hold [`Weak`]
/// references, so the owning handle alone decides how long it lives.
pub(crate) struct Session<H: HostEnvironment> {
    host: Rc<H>,
    engine: RefCell<TrailEngine>,
    overlay: RefCell<Option<H::Overlay>>,
    context: RefCell<Option<H::Context>>,
    listeners: RefCell<Vec<ListenerId>>,
    pending_frame: Cell<Option<FrameToken>>,
    live: Cell<bool>,
}

impl<H: HostEnvironment + 'static> Session<H> {
    /// Takes over an overlay whose context is ready; the attach flag must
    /// already be claimed.
    pub(crate) fn new(host: Rc<H>, engine: TrailEngine, overlay: H::Overlay, context: H::Context) -> Rc<Self> {
        Rc::new(Self {
            host,
            engine: RefCell::new(engine),
            overlay: RefCell::new(Some(overlay)),
            context: RefCell::new(Some(context)),
            listeners: RefCell::new(Vec::new()),
            pending_frame: Cell::new(None),
            live: Cell::new(true),
        })
    }

    pub(crate) fn is_live(&self) -> bool {
        self.live.get()
    }

    pub(crate) fn engine(&self) -> &RefCell<TrailEngine> {
        &self.engine
    }

    pub(crate) fn listen_all(self: &Rc<Self>) -> Result<()> {
        for kind in EventKind::ALL {
            let weak = Rc::downgrade(self);
            let id = self.host.listen(
                kind,
                Box::new(move |event: HostEvent| {
                    if let Some(session) = weak.upgrade() {
                        session.handle_event(event);
                    }
                }),
            )?;
            self.listeners.borrow_mut().push(id);
        }
        Ok(())
    }

    pub(crate) fn schedule(self: &Rc<Self>) -> Result<()> {
        let weak = Rc::downgrade(self);
        let token = self.host.request_frame(Box::new(move || run_frame(&weak)))?;
        self.pending_frame.set(Some(token));
        Ok(())
    }

    fn handle_event(&self, event: HostEvent) {
        if !self.live.get() {
            return;
        }
        match event {
            HostEvent::PointerMove(pos) => self.engine.borrow_mut().pointer_moved(pos),
            HostEvent::PointerEnter => self.engine.borrow_mut().pointer_entered(),
            HostEvent::PointerLeave => self.engine.borrow_mut().pointer_left(),
            HostEvent::Resize(viewport) => {
                if let Some(overlay) = self.overlay.borrow().as_ref() {
                    if let Err(err) = self.host.resize_overlay(overlay, viewport) {
                        warn!("trail overlay resize to {}x{} failed: {err}", viewport.width, viewport.height);
                    }
                }
                self.engine.borrow_mut().resize(viewport.width, viewport.height);
            }
        }
    }

    fn draw_frame(&self) -> Result<()> {
        let commands = self.engine.borrow_mut().frame();
        let mut context = self.context.borrow_mut();
        let Some(context) = context.as_mut() else {
            return Ok(());
        };
        commands.iter().try_for_each(|command| context.draw(command))
    }

    /// Releases everything the session acquired. Safe to call repeatedly.
    pub(crate) fn teardown(&self) {
        if !self.live.replace(false) {
            return;
        }
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        for id in listeners {
            self.host.unlisten(id);
        }
        if let Some(token) = self.pending_frame.take() {
            self.host.cancel_frame(token);
        }
        drop(self.context.borrow_mut().take());
        if let Some(overlay) = self.overlay.borrow_mut().take() {
            self.host.remove_overlay(overlay);
        }
        self.host.attach_flag().release();
        info!("cursor trail detached");
    }
}

fn run_frame<H: HostEnvironment + 'static>(weak: &Weak<Session<H>>) {
    let Some(session) = weak.upgrade() else {
        return;
    };
    session.pending_frame.set(None);
    if !session.live.get() {
        return;
    }
    if let Err(err) = session.draw_frame() {
        warn!("cursor trail frame failed, stopping: {err}");
        session.teardown();
        return;
    }
    if !session.live.get() {
        return;
    }
    if let Err(err) = session.schedule() {
        warn!("cursor trail could not schedule its next frame, stopping: {err}");
        session.teardown();
    }
}
