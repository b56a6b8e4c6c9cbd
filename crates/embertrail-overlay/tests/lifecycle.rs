use std::rc::Rc;

use embertrail_core::{DrawCommand, EngineConfig};
use embertrail_headless::HeadlessHost;
use embertrail_overlay::{attach, AttachOutcome};
use embertrail_platform::{HostError, HostEvent, Viewport};
use glam::DVec2;

fn host() -> Rc<HeadlessHost> {
    Rc::new(HeadlessHost::new(Viewport::new(320, 240)))
}

fn config() -> EngineConfig {
    EngineConfig {
        seed: Some(9),
        ..EngineConfig::default()
    }
}

fn move_to(host: &HeadlessHost, x: f64, y: f64) {
    host.dispatch(HostEvent::PointerMove(DVec2::new(x, y)));
}

#[test]
fn attach_installs_overlay_listeners_and_first_frame() {
    let host = host();
    let handle = attach(Rc::clone(&host), config());

    assert_eq!(handle.outcome(), &AttachOutcome::Attached);
    assert!(handle.is_active());
    assert!(host.is_claimed());
    assert_eq!(host.overlay_count(), 1);
    assert_eq!(host.listener_count(), 4);
    assert_eq!(host.pending_frames(), 1);
    assert_eq!(handle.stats().unwrap().surface, (320, 240));
}

#[test]
fn detach_releases_everything_and_allows_reattach() {
    let host = host();
    let mut handle = attach(Rc::clone(&host), config());
    host.advance_frames(3);
    handle.detach();

    assert!(!handle.is_active());
    assert_eq!(host.listener_count(), 0);
    assert_eq!(host.overlay_count(), 0);
    assert_eq!(host.pending_frames(), 0);
    assert!(!host.is_claimed());
    assert_eq!(host.advance_frame(), 0);

    let again = attach(Rc::clone(&host), config());
    assert_eq!(again.outcome(), &AttachOutcome::Attached);
    assert_eq!(host.overlay_count(), 1);
}

#[test]
fn second_attach_is_refused() {
    let host = host();
    let first = attach(Rc::clone(&host), config());
    let mut second = attach(Rc::clone(&host), config());

    assert_eq!(second.outcome(), &AttachOutcome::AlreadyAttached);
    assert!(!second.is_active());
    assert_eq!(host.overlay_count(), 1);
    assert_eq!(host.listener_count(), 4);
    assert_eq!(host.pending_frames(), 1);

    second.detach();
    drop(second);
    assert!(first.is_active());
    assert!(host.is_claimed());
    assert_eq!(host.advance_frame(), 1);
}

#[test]
fn detach_twice_is_a_no_op() {
    let host = host();
    let mut handle = attach(Rc::clone(&host), config());
    handle.detach();
    handle.detach();
    assert_eq!(host.overlay_count(), 0);

    // A newer trail must survive a stale handle being detached again.
    let fresh = attach(Rc::clone(&host), config());
    handle.detach();
    assert!(fresh.is_active());
    assert!(host.is_claimed());
}

#[test]
fn dropping_the_handle_detaches() {
    let host = host();
    {
        let _handle = attach(Rc::clone(&host), config());
        assert_eq!(host.overlay_count(), 1);
    }
    assert_eq!(host.overlay_count(), 0);
    assert_eq!(host.listener_count(), 0);
    assert!(!host.is_claimed());
}

#[test]
fn missing_context_leaves_no_overlay() {
    let host = Rc::new(HeadlessHost::new(Viewport::new(100, 100)).without_context_2d());
    let mut handle = attach(Rc::clone(&host), config());

    assert_eq!(handle.outcome(), &AttachOutcome::Unsupported(HostError::ContextUnavailable));
    assert!(!handle.is_active());
    assert_eq!(host.overlay_count(), 0);
    assert_eq!(host.listener_count(), 0);
    assert_eq!(host.pending_frames(), 0);
    assert!(!host.is_claimed());
    handle.detach();
    handle.detach();
}

#[test]
fn missing_overlay_is_unsupported() {
    let host = Rc::new(HeadlessHost::new(Viewport::new(100, 100)).without_overlay());
    let handle = attach(Rc::clone(&host), config());
    assert!(matches!(handle.outcome(), AttachOutcome::Unsupported(HostError::Overlay(_))));
    assert!(!host.is_claimed());
}

#[test]
fn disabled_config_never_touches_the_host() {
    let host = host();
    let handle = attach(
        Rc::clone(&host),
        EngineConfig {
            enabled: false,
            ..config()
        },
    );
    assert_eq!(handle.outcome(), &AttachOutcome::Disabled);
    assert_eq!(host.overlay_count(), 0);
    assert!(!host.is_claimed());
}

#[test]
fn rapid_moves_cap_the_pool_at_twenty() {
    let host = host();
    let handle = attach(Rc::clone(&host), config());
    for i in 0..25 {
        move_to(&host, 10.0 + i as f64 * 4.0, 50.0);
    }
    assert_eq!(handle.stats().unwrap().particles, 20);
}

#[test]
fn idle_frames_drain_the_trail() {
    let host = host();
    let handle = attach(Rc::clone(&host), config());
    for i in 0..25 {
        move_to(&host, i as f64, i as f64);
    }
    host.advance_frames(50);
    assert_eq!(handle.stats().unwrap().particles, 0);
    assert_eq!(host.pending_frames(), 1);
}

#[test]
fn pointer_leave_drops_glow_but_keeps_particles_moving() {
    let host = host();
    let handle = attach(Rc::clone(&host), config());
    move_to(&host, 100.0, 100.0);
    move_to(&host, 110.0, 100.0);
    host.advance_frame();
    assert!(host.last_frame().iter().any(DrawCommand::is_glow));

    host.dispatch(HostEvent::PointerLeave);
    host.advance_frame();

    let frame = host.last_frame();
    assert!(!frame.iter().any(DrawCommand::is_glow));
    assert_eq!(frame.iter().filter(|c| c.is_dot()).count(), 2);
    assert!(!handle.stats().unwrap().pointer_active);

    host.dispatch(HostEvent::PointerEnter);
    host.advance_frame();
    assert!(host.last_frame().iter().any(DrawCommand::is_glow));
}

#[test]
fn resize_updates_surface_and_keeps_particles() {
    let host = host();
    let handle = attach(Rc::clone(&host), config());
    move_to(&host, 5.0, 5.0);
    host.dispatch(HostEvent::Resize(Viewport::new(640, 480)));

    let stats = handle.stats().unwrap();
    assert_eq!(stats.surface, (640, 480));
    assert_eq!(stats.particles, 1);
    assert_eq!(host.framebuffer().map(|fb| (fb.width(), fb.height())), Some((640, 480)));

    host.advance_frame();
    assert_eq!(host.last_frame()[0], DrawCommand::Clear { width: 640, height: 480 });
}

#[test]
fn frames_render_pixels_near_the_pointer() {
    let host = host();
    let _handle = attach(Rc::clone(&host), config());
    move_to(&host, 160.0, 120.0);
    host.advance_frame();

    let fb = host.framebuffer().unwrap();
    assert!(fb.pixel(160, 120).unwrap().a > 0);
    assert_eq!(fb.pixel(0, 0).unwrap().a, 0);
}

#[test]
fn draw_fault_stops_the_loop_like_detach() {
    let host = host();
    let mut handle = attach(Rc::clone(&host), config());
    host.advance_frame();
    host.fail_draws(true);
    host.advance_frame();

    assert!(!handle.is_active());
    assert!(handle.stats().is_none());
    assert_eq!(host.pending_frames(), 0);
    assert_eq!(host.overlay_count(), 0);
    assert_eq!(host.listener_count(), 0);
    assert!(!host.is_claimed());
    handle.detach();

    host.fail_draws(false);
    assert_eq!(attach(Rc::clone(&host), config()).outcome(), &AttachOutcome::Attached);
}

#[test]
fn queued_events_feed_the_trail() {
    let host = host();
    let handle = attach(Rc::clone(&host), config());
    let sender = host.event_sender();
    sender.send(HostEvent::PointerEnter).unwrap();
    sender.send(HostEvent::PointerMove(DVec2::new(30.0, 40.0))).unwrap();

    assert_eq!(handle.stats().unwrap().particles, 0);
    assert_eq!(host.pump_events(), 2);
    let stats = handle.stats().unwrap();
    assert_eq!(stats.particles, 1);
    assert!(stats.pointer_active);
}

#[test]
fn fastest_valid_speed_spawns_and_draws() {
    let config = EngineConfig::from_toml_str("seed = 3\n[preset]\nmax_speed = 1e300").unwrap();
    let host = host();
    let handle = attach(Rc::clone(&host), config);
    move_to(&host, 100.0, 100.0);
    host.advance_frames(3);
    assert!(handle.is_active());
    assert_eq!(handle.stats().unwrap().particles, 1);
}

#[test]
fn largest_valid_pool_attaches_and_fills() {
    let config = EngineConfig::from_toml_str("seed = 3\n[preset]\nmax_particles = 4096").unwrap();
    let host = host();
    let handle = attach(Rc::clone(&host), config);
    assert_eq!(handle.outcome(), &AttachOutcome::Attached);
    for i in 0..4100 {
        move_to(&host, f64::from(i % 320), 10.0);
    }
    assert_eq!(handle.stats().unwrap().particles, 4096);
}
