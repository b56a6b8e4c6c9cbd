//! Attach/detach lifecycle for the cursor trail on any [`HostEnvironment`].
//!
//! [`attach`] never fails loudly: when the host cannot carry a trail the
//! returned [`TrailHandle`] is inert and its [`AttachOutcome`] says why.
use std::rc::Rc;

use embertrail_core::{EngineConfig, TrailEngine};
use embertrail_platform::{HostEnvironment, HostError};
use tracing::{debug, info, warn};

mod session;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachOutcome {
    Attached,
    /// Another trail already holds the host's attach flag.
    AlreadyAttached,
    /// The config turned the trail off.
    Disabled,
    /// The host could not supply an overlay, context, listener, or frame.
    Unsupported(HostError),
}

/// Snapshot of a running trail, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailStats {
    pub particles: usize,
    pub pointer_active: bool,
    pub surface: (u32, u32),
}

/// Owner of an attached trail. Dropping it detaches.
pub struct TrailHandle<H: HostEnvironment + 'static> {
    session: Option<Rc<Session<H>>>,
    outcome: AttachOutcome,
}

impl<H: HostEnvironment + 'static> TrailHandle<H> {
    fn inert(outcome: AttachOutcome) -> Self {
        Self {
            session: None,
            outcome,
        }
    }

    pub fn outcome(&self) -> &AttachOutcome {
        &self.outcome
    }

    /// `false` once detached, or after the loop stopped itself on a fault.
    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|session| session.is_live())
    }

    pub fn stats(&self) -> Option<TrailStats> {
        let session = self.session.as_ref().filter(|session| session.is_live())?;
        let engine = session.engine().borrow();
        Some(TrailStats {
            particles: engine.particle_count(),
            pointer_active: engine.pointer_active(),
            surface: engine.surface_size(),
        })
    }

    /// Removes listeners and the overlay, stops the frame chain, and frees the
    /// host for a later [`attach`]. Calling it again is a no-op.
    pub fn detach(&mut self) {
        if let Some(session) = self.session.take() {
            session.teardown();
        }
    }
}

impl<H: HostEnvironment + 'static> Drop for TrailHandle<H> {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Binds a cursor trail to `host`.
pub fn attach<H: HostEnvironment + 'static>(host: Rc<H>, config: EngineConfig) -> TrailHandle<H> {
    if !config.enabled {
        debug!("cursor trail disabled by config");
        return TrailHandle::inert(AttachOutcome::Disabled);
    }
    if !host.attach_flag().try_claim() {
        debug!("cursor trail already attached; ignoring second attach");
        return TrailHandle::inert(AttachOutcome::AlreadyAttached);
    }

    let overlay = match host.create_overlay(&config.overlay) {
        Ok(overlay) => overlay,
        Err(err) => return unsupported(&*host, err),
    };
    let context = match host.context_2d(&overlay) {
        Ok(context) => context,
        Err(err) => {
            host.remove_overlay(overlay);
            return unsupported(&*host, err);
        }
    };
    let viewport = host.viewport();
    if let Err(err) = host.resize_overlay(&overlay, viewport) {
        host.remove_overlay(overlay);
        return unsupported(&*host, err);
    }

    let mut engine = TrailEngine::new(config);
    engine.resize(viewport.width, viewport.height);
    let preset = engine.config().preset.name.clone();
    let session = Session::new(Rc::clone(&host), engine, overlay, context);
    if let Err(err) = session.listen_all().and_then(|()| session.schedule()) {
        session.teardown();
        return refused(err);
    }

    info!(
        "cursor trail attached: preset `{preset}`, viewport {}x{}",
        viewport.width, viewport.height
    );
    TrailHandle {
        session: Some(session),
        outcome: AttachOutcome::Attached,
    }
}

fn unsupported<H: HostEnvironment + 'static>(host: &H, err: HostError) -> TrailHandle<H> {
    host.attach_flag().release();
    refused(err)
}

fn refused<H: HostEnvironment + 'static>(err: HostError) -> TrailHandle<H> {
    warn!("cursor trail unavailable on this host: {err}");
    TrailHandle::inert(AttachOutcome::Unsupported(err))
}
