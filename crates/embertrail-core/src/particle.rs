use glam::DVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::TrailPreset;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub pos: DVec2,
    pub vel: DVec2,
    /// Starts at 1.0 and doubles as draw opacity.
    pub life: f64,
    radius: f64,
}

impl Particle {
    pub fn new(pos: DVec2, vel: DVec2, radius: f64) -> Self {
        Self {
            pos,
            vel,
            life: 1.0,
            radius,
        }
    }

    pub fn spawn<R: Rng + ?Sized>(pos: DVec2, preset: &TrailPreset, rng: &mut R) -> Self {
        let vel = DVec2::new(
            sample(rng, -preset.max_speed, preset.max_speed),
            sample(rng, -preset.max_speed, preset.max_speed),
        );
        let radius = sample(rng, preset.radius_min, preset.radius_max);
        Self::new(pos, vel, radius)
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn is_alive(&self) -> bool {
        self.life > 0.0
    }

    /// One frame of motion: integrate, decay, then damp.
    pub fn advance(&mut self, decay: f64, friction: f64) {
        self.pos += self.vel;
        self.life -= decay;
        self.vel *= friction;
    }
}

fn sample<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}

const INITIAL_RESERVE: usize = 64;

/// Bounded particle storage. A full pool refuses new particles instead of
/// evicting old ones.
#[derive(Debug, Clone, Default)]
pub struct ParticlePool {
    particles: Vec<Particle>,
    capacity: usize,
}

impl ParticlePool {
    /// Storage grows on demand up to `capacity`; only a small prefix is
    /// reserved up front.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            particles: Vec::with_capacity(capacity.min(INITIAL_RESERVE)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.particles.len() >= self.capacity
    }

    /// Returns `false` when the pool is at capacity.
    pub fn try_push(&mut self, particle: Particle) -> bool {
        if self.is_full() {
            return false;
        }
        self.particles.push(particle);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    /// Advances every particle once, hands the survivors to `visit`, and drops
    /// the ones whose life ran out.
    pub fn step(&mut self, decay: f64, friction: f64, mut visit: impl FnMut(&Particle)) {
        self.particles.retain_mut(|particle| {
            particle.advance(decay, friction);
            if particle.is_alive() {
                visit(particle);
                true
            } else {
                false
            }
        });
    }
}
