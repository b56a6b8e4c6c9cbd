//! In-process host for the cursor trail: a software framebuffer, a queued
//! event source, and a frame scheduler that only advances when told to.
//!
//! The demo app renders PNG frames through it and the lifecycle tests use it
//! as their fake environment.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::rc::Rc;

use crossbeam_channel::{Receiver, Sender};
use embertrail_core::{DrawCommand, OverlayStyle};
use embertrail_platform::{
    AttachFlag, DrawContext, EventHandler, EventKind, FrameCallback, FrameToken, HostEnvironment, HostError,
    HostEvent, ListenerId, Result, Viewport,
};
use thiserror::Error;
use tracing::debug;

mod raster;
pub use crate::raster::{Framebuffer, Rgba8};

#[derive(Debug, Error)]
pub enum HeadlessError {
    #[error("no overlay is attached to the headless host")]
    NoOverlay,
    #[error("framebuffer could not be converted to an image")]
    Snapshot,
    #[error("failed to write snapshot: {0}")]
    Image(#[from] image::ImageError),
}

/// Overlay handle returned by [`HeadlessHost::create_overlay`].
pub struct HeadlessOverlay {
    id: u64,
    buffer: Rc<RefCell<Framebuffer>>,
}

pub struct HeadlessContext {
    buffer: Rc<RefCell<Framebuffer>>,
    log: Rc<RefCell<Vec<DrawCommand>>>,
    fail_draws: Rc<Cell<bool>>,
}

impl DrawContext for HeadlessContext {
    fn draw(&mut self, command: &DrawCommand) -> Result<()> {
        if self.fail_draws.get() {
            return Err(HostError::Draw("injected draw failure".into()));
        }
        self.buffer.borrow_mut().execute(command);
        self.log.borrow_mut().push(command.clone());
        Ok(())
    }
}

pub struct HeadlessHost {
    flag: AttachFlag,
    viewport: Cell<Viewport>,
    overlay_supported: bool,
    context_supported: bool,
    fail_draws: Rc<Cell<bool>>,
    overlays: RefCell<BTreeMap<u64, Rc<RefCell<Framebuffer>>>>,
    draw_log: Rc<RefCell<Vec<DrawCommand>>>,
    listeners: RefCell<BTreeMap<ListenerId, (EventKind, EventHandler)>>,
    dispatching: RefCell<Vec<ListenerId>>,
    removed_listeners: RefCell<HashSet<ListenerId>>,
    frames: RefCell<Vec<(FrameToken, FrameCallback)>>,
    next_id: Cell<u64>,
    events_tx: Sender<HostEvent>,
    events_rx: Receiver<HostEvent>,
}

impl HeadlessHost {
    pub fn new(viewport: Viewport) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            flag: AttachFlag::new(),
            viewport: Cell::new(viewport),
            overlay_supported: true,
            context_supported: true,
            fail_draws: Rc::new(Cell::new(false)),
            overlays: RefCell::new(BTreeMap::new()),
            draw_log: Rc::new(RefCell::new(Vec::new())),
            listeners: RefCell::new(BTreeMap::new()),
            dispatching: RefCell::new(Vec::new()),
            removed_listeners: RefCell::new(HashSet::new()),
            frames: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            events_tx,
            events_rx,
        }
    }

    /// Host that refuses to create overlays.
    pub fn without_overlay(mut self) -> Self {
        self.overlay_supported = false;
        self
    }

    /// Host whose overlays never yield a 2D context.
    pub fn without_context_2d(mut self) -> Self {
        self.context_supported = false;
        self
    }

    /// Makes every subsequent draw call fail.
    pub fn fail_draws(&self, fail: bool) {
        self.fail_draws.set(fail);
    }

    /// Sender for events produced off the render thread; drained by
    /// [`HeadlessHost::pump_events`].
    pub fn event_sender(&self) -> Sender<HostEvent> {
        self.events_tx.clone()
    }

    pub fn pump_events(&self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.dispatch(event);
            delivered += 1;
        }
        delivered
    }

    /// Delivers `event` to every listener of its kind. Resize events also
    /// update the host viewport.
    pub fn dispatch(&self, event: HostEvent) {
        if let HostEvent::Resize(viewport) = event {
            self.viewport.set(viewport);
        }
        let kind = event.kind();
        let ids: Vec<ListenerId> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, (listener_kind, _))| *listener_kind == kind)
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            // Taken out so the handler may call back into the host.
            let Some((listener_kind, mut handler)) = self.listeners.borrow_mut().remove(&id) else {
                continue;
            };
            self.dispatching.borrow_mut().push(id);
            handler(event);
            self.dispatching.borrow_mut().pop();
            if !self.removed_listeners.borrow_mut().remove(&id) {
                self.listeners.borrow_mut().insert(id, (listener_kind, handler));
            }
        }
    }

    /// Runs every frame callback that was pending when called. Callbacks they
    /// schedule wait for the next call.
    pub fn advance_frame(&self) -> usize {
        let due = std::mem::take(&mut *self.frames.borrow_mut());
        let ran = due.len();
        for (_, callback) in due {
            callback();
        }
        ran
    }

    pub fn advance_frames(&self, count: usize) {
        for _ in 0..count {
            self.advance_frame();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.borrow().len()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn is_claimed(&self) -> bool {
        self.flag.is_claimed()
    }

    pub fn draw_log(&self) -> Vec<DrawCommand> {
        self.draw_log.borrow().clone()
    }

    /// Draw calls since the most recent clear, i.e. the last frame drawn.
    pub fn last_frame(&self) -> Vec<DrawCommand> {
        let log = self.draw_log.borrow();
        let start = log
            .iter()
            .rposition(|command| matches!(command, DrawCommand::Clear { .. }))
            .unwrap_or(0);
        log[start..].to_vec()
    }

    /// Copy of the most recently created live overlay.
    pub fn framebuffer(&self) -> Option<Framebuffer> {
        let overlays = self.overlays.borrow();
        overlays.values().next_back().map(|buffer| buffer.borrow().clone())
    }

    pub fn snapshot(&self) -> std::result::Result<image::RgbaImage, HeadlessError> {
        let buffer = self.framebuffer().ok_or(HeadlessError::NoOverlay)?;
        buffer.to_image().ok_or(HeadlessError::Snapshot)
    }

    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> std::result::Result<(), HeadlessError> {
        self.snapshot()?.save(path.as_ref())?;
        Ok(())
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

impl HostEnvironment for HeadlessHost {
    type Overlay = HeadlessOverlay;
    type Context = HeadlessContext;

    fn attach_flag(&self) -> &AttachFlag {
        &self.flag
    }

    fn create_overlay(&self, style: &OverlayStyle) -> Result<HeadlessOverlay> {
        if !self.overlay_supported {
            return Err(HostError::Overlay("headless host has overlays disabled".into()));
        }
        let viewport = self.viewport.get();
        let buffer = Rc::new(RefCell::new(Framebuffer::new(viewport.width, viewport.height)));
        let id = self.next_id();
        self.overlays.borrow_mut().insert(id, Rc::clone(&buffer));
        debug!("headless overlay {id} created (z-index {})", style.z_index);
        Ok(HeadlessOverlay { id, buffer })
    }

    fn context_2d(&self, overlay: &HeadlessOverlay) -> Result<HeadlessContext> {
        if !self.context_supported {
            return Err(HostError::ContextUnavailable);
        }
        Ok(HeadlessContext {
            buffer: Rc::clone(&overlay.buffer),
            log: Rc::clone(&self.draw_log),
            fail_draws: Rc::clone(&self.fail_draws),
        })
    }

    fn remove_overlay(&self, overlay: HeadlessOverlay) {
        self.overlays.borrow_mut().remove(&overlay.id);
        debug!("headless overlay {} removed", overlay.id);
    }

    fn resize_overlay(&self, overlay: &HeadlessOverlay, viewport: Viewport) -> Result<()> {
        overlay.buffer.borrow_mut().resize(viewport.width, viewport.height);
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        self.viewport.get()
    }

    fn listen(&self, kind: EventKind, handler: EventHandler) -> Result<ListenerId> {
        let id = ListenerId(self.next_id());
        self.listeners.borrow_mut().insert(id, (kind, handler));
        Ok(id)
    }

    fn unlisten(&self, id: ListenerId) {
        if self.listeners.borrow_mut().remove(&id).is_some() {
            return;
        }
        // Handlers are out of the map while they run; `dispatch` drops it.
        if self.dispatching.borrow().contains(&id) {
            self.removed_listeners.borrow_mut().insert(id);
        }
    }

    fn request_frame(&self, callback: FrameCallback) -> Result<FrameToken> {
        let token = FrameToken(self.next_id());
        self.frames.borrow_mut().push((token, callback));
        Ok(token)
    }

    fn cancel_frame(&self, token: FrameToken) {
        self.frames.borrow_mut().retain(|(pending, _)| *pending != token);
    }
}
