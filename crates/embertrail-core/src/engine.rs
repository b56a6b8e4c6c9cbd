use glam::DVec2;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::EngineConfig;
use crate::draw::DrawCommand;
use crate::particle::{Particle, ParticlePool};

/// Pointer, pool and surface state for one attached trail.
///
/// Input handlers and [`TrailEngine::frame`] may interleave arbitrarily; every
/// handler only writes state that the next frame reads.
pub struct TrailEngine {
    config: EngineConfig,
    pool: ParticlePool,
    pointer: DVec2,
    pointer_active: bool,
    surface: (u32, u32),
    rng: SmallRng,
}

impl TrailEngine {
    pub fn new(config: EngineConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            pool: ParticlePool::with_capacity(config.preset.max_particles as usize),
            config,
            pointer: DVec2::ZERO,
            pointer_active: false,
            surface: (0, 0),
            rng,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pointer(&self) -> DVec2 {
        self.pointer
    }

    pub fn pointer_active(&self) -> bool {
        self.pointer_active
    }

    pub fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    pub fn particle_count(&self) -> usize {
        self.pool.len()
    }

    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.pool.iter()
    }

    /// Records the pointer and spawns one particle if the pool has room.
    pub fn pointer_moved(&mut self, pos: DVec2) {
        self.pointer = pos;
        self.pointer_active = true;
        if !self.pool.is_full() {
            let particle = Particle::spawn(pos, &self.config.preset, &mut self.rng);
            self.pool.try_push(particle);
        }
    }

    pub fn pointer_entered(&mut self) {
        self.pointer_active = true;
    }

    pub fn pointer_left(&mut self) {
        self.pointer_active = false;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface = (width, height);
    }

    /// Advances the simulation one frame and returns what to draw, in order.
    pub fn frame(&mut self) -> Vec<DrawCommand> {
        let (width, height) = self.surface;
        let mut commands = Vec::with_capacity(self.pool.len() + 2);
        commands.push(DrawCommand::Clear { width, height });

        if self.pointer_active {
            let glow = &self.config.glow;
            commands.push(DrawCommand::Glow {
                center: self.pointer,
                radius: glow.radius,
                extent: glow.extent,
                color: glow.color,
                alpha: glow.alpha,
            });
        }

        let preset = &self.config.preset;
        let color = preset.color;
        self.pool.step(preset.life_decay, preset.friction, |particle| {
            commands.push(DrawCommand::Dot {
                center: particle.pos,
                radius: particle.radius(),
                color,
                alpha: particle.life.min(1.0),
            });
        });
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> TrailEngine {
        let mut engine = TrailEngine::new(EngineConfig {
            seed: Some(42),
            ..EngineConfig::default()
        });
        engine.resize(800, 600);
        engine
    }

    #[test]
    fn rapid_moves_cap_at_twenty() {
        let mut engine = engine();
        for i in 0..25 {
            engine.pointer_moved(DVec2::new(i as f64 * 7.0, 100.0 + i as f64));
            assert!(engine.particle_count() <= 20);
        }
        assert_eq!(engine.particle_count(), 20);
        assert_eq!(engine.pointer(), DVec2::new(24.0 * 7.0, 124.0));
    }

    #[test]
    fn idle_frames_drain_the_pool() {
        let mut engine = engine();
        for i in 0..25 {
            engine.pointer_moved(DVec2::new(i as f64, i as f64));
        }
        for _ in 0..50 {
            engine.frame();
        }
        assert_eq!(engine.particle_count(), 0);
    }

    #[test]
    fn pool_frees_slots_as_particles_decay() {
        let mut engine = engine();
        for _ in 0..20 {
            engine.pointer_moved(DVec2::new(5.0, 5.0));
        }
        for _ in 0..50 {
            engine.frame();
        }
        engine.pointer_moved(DVec2::new(6.0, 6.0));
        assert_eq!(engine.particle_count(), 1);
    }

    #[test]
    fn frame_starts_with_full_clear() {
        let mut engine = engine();
        let commands = engine.frame();
        assert_eq!(commands[0], DrawCommand::Clear { width: 800, height: 600 });
    }

    #[test]
    fn leave_suppresses_glow_but_particles_keep_decaying() {
        let mut engine = engine();
        engine.pointer_moved(DVec2::new(50.0, 50.0));
        engine.pointer_moved(DVec2::new(60.0, 50.0));
        let before: Vec<f64> = engine.particles().map(|p| p.life).collect();

        engine.pointer_left();
        let commands = engine.frame();

        assert!(!commands.iter().any(DrawCommand::is_glow));
        assert_eq!(commands.iter().filter(|c| c.is_dot()).count(), 2);
        let after: Vec<f64> = engine.particles().map(|p| p.life).collect();
        assert!(after.iter().zip(&before).all(|(a, b)| a < b));
    }

    #[test]
    fn enter_restores_glow_at_last_pointer() {
        let mut engine = engine();
        engine.pointer_moved(DVec2::new(12.0, 34.0));
        engine.pointer_left();
        engine.pointer_entered();
        let glow = engine.frame().into_iter().find(DrawCommand::is_glow).unwrap();
        match glow {
            DrawCommand::Glow { center, radius, extent, alpha, .. } => {
                assert_eq!(center, DVec2::new(12.0, 34.0));
                assert_eq!(radius, 30.0);
                assert_eq!(extent, 40.0);
                assert_eq!(alpha, 0.3);
            }
            other => panic!("expected glow, got {other:?}"),
        }
    }

    #[test]
    fn no_glow_before_first_pointer_event() {
        let mut engine = engine();
        assert_eq!(engine.frame().len(), 1);
    }

    #[test]
    fn dot_opacity_tracks_remaining_life() {
        let mut engine = engine();
        engine.pointer_moved(DVec2::ZERO);
        let commands = engine.frame();
        let alpha = commands.iter().find_map(|c| match c {
            DrawCommand::Dot { alpha, .. } => Some(*alpha),
            _ => None,
        });
        assert_eq!(alpha, Some(1.0 - 0.02));
    }

    #[test]
    fn resize_keeps_particles() {
        let mut engine = engine();
        engine.pointer_moved(DVec2::new(1.0, 1.0));
        engine.resize(1024, 768);
        assert_eq!(engine.particle_count(), 1);
        assert_eq!(engine.frame()[0], DrawCommand::Clear { width: 1024, height: 768 });
    }

    #[test]
    fn seeded_engines_are_reproducible() {
        let mut a = engine();
        let mut b = engine();
        for i in 0..5 {
            a.pointer_moved(DVec2::splat(i as f64));
            b.pointer_moved(DVec2::splat(i as f64));
        }
        assert_eq!(a.frame(), b.frame());
    }
}
