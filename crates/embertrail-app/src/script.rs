use embertrail_platform::{HostEvent, Viewport};
use glam::DVec2;

/// Scripted pointer: enters, sweeps a Lissajous curve across the viewport,
/// and leaves for the last quarter of the run so the trail can fade out.
pub struct PointerScript {
    viewport: Viewport,
    frames: usize,
}

impl PointerScript {
    pub fn new(viewport: Viewport, frames: usize) -> Self {
        Self { viewport, frames }
    }

    fn leave_at(&self) -> usize {
        self.frames - self.frames / 4
    }

    /// Events to deliver before drawing `frame`.
    pub fn events_for(&self, frame: usize) -> Vec<HostEvent> {
        let leave_at = self.leave_at();
        if frame > leave_at {
            return Vec::new();
        }
        if frame == leave_at {
            return vec![HostEvent::PointerLeave];
        }
        let mut events = Vec::with_capacity(2);
        if frame == 0 {
            events.push(HostEvent::PointerEnter);
        }
        events.push(HostEvent::PointerMove(self.position(frame)));
        events
    }

    fn position(&self, frame: usize) -> DVec2 {
        let t = frame as f64 / 40.0;
        let half = DVec2::new(f64::from(self.viewport.width), f64::from(self.viewport.height)) * 0.5;
        half + DVec2::new((3.0 * t).sin(), (2.0 * t).cos()) * half * 0.8
    }
}
