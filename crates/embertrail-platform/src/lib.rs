//! Host capability traits so `embertrail-core` stays platform-agnostic.
//!
//! A host supplies exactly what the trail needs: an overlay it can draw on,
//! document-wide pointer and resize events, and a display-synchronized frame
//! scheduler. Callbacks registered through [`HostEnvironment::listen`] and
//! [`HostEnvironment::request_frame`] must never be invoked synchronously from
//! inside those calls.

use std::cell::Cell;

use embertrail_core::{DrawCommand, OverlayStyle};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HostError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("host has no document to attach an overlay to")]
    NoDocument,
    #[error("overlay could not be created: {0}")]
    Overlay(String),
    #[error("2D drawing context unavailable")]
    ContextUnavailable,
    #[error("event subscription failed: {0}")]
    Listener(String),
    #[error("frame scheduling failed: {0}")]
    Scheduler(String),
    #[error("draw call failed: {0}")]
    Draw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerMove,
    PointerEnter,
    PointerLeave,
    Resize,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::PointerMove,
        EventKind::PointerEnter,
        EventKind::PointerLeave,
        EventKind::Resize,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    /// Pointer position in viewport pixels.
    PointerMove(DVec2),
    PointerEnter,
    PointerLeave,
    Resize(Viewport),
}

impl HostEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            HostEvent::PointerMove(_) => EventKind::PointerMove,
            HostEvent::PointerEnter => EventKind::PointerEnter,
            HostEvent::PointerLeave => EventKind::PointerLeave,
            HostEvent::Resize(_) => EventKind::Resize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameToken(pub u64);

pub type EventHandler = Box<dyn FnMut(HostEvent)>;
pub type FrameCallback = Box<dyn FnOnce()>;

/// Marks a host as carrying an attached trail. At most one claim succeeds
/// until it is released.
#[derive(Debug, Default)]
pub struct AttachFlag(Cell<bool>);

impl AttachFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the flag was already claimed.
    pub fn try_claim(&self) -> bool {
        !self.0.replace(true)
    }

    pub fn release(&self) {
        self.0.set(false);
    }

    pub fn is_claimed(&self) -> bool {
        self.0.get()
    }
}

/// Immediate-mode 2D context bound to one overlay.
pub trait DrawContext {
    fn draw(&mut self, command: &DrawCommand) -> Result<()>;
}

/// Everything the trail consumes from its host platform.
pub trait HostEnvironment {
    type Overlay: 'static;
    type Context: DrawContext + 'static;

    fn attach_flag(&self) -> &AttachFlag;

    /// Inserts a full-viewport, input-transparent overlay above page content.
    fn create_overlay(&self, style: &OverlayStyle) -> Result<Self::Overlay>;
    fn context_2d(&self, overlay: &Self::Overlay) -> Result<Self::Context>;
    fn remove_overlay(&self, overlay: Self::Overlay);
    /// Sets the overlay's backing pixel size.
    fn resize_overlay(&self, overlay: &Self::Overlay, viewport: Viewport) -> Result<()>;
    fn viewport(&self) -> Viewport;

    fn listen(&self, kind: EventKind, handler: EventHandler) -> Result<ListenerId>;
    fn unlisten(&self, id: ListenerId);

    /// Runs `callback` once before the next repaint.
    fn request_frame(&self, callback: FrameCallback) -> Result<FrameToken>;
    fn cancel_frame(&self, token: FrameToken);
}
