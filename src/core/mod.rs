use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::{
    aggregate::CloudData,
    config::{self, PhysicsParams},
    render,
    types::{Extent, Particle, ParticleSnapshot, Vec2},
};

/// Reasons a simulation does not start. Neither is fatal: the view shows a
/// placeholder and tries again later.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum StartError {
    #[error("no terms to lay out")]
    NoTerms,
    #[error("viewport {width}x{height} cannot be measured")]
    Unmeasured { width: f32, height: f32 },
}

pub struct Simulation {
    particles: Vec<Particle>,
    extent: Extent,
    params: PhysicsParams,
    ticks: u64,
}

impl Simulation {
    pub fn start<R: Rng + ?Sized>(
        data: &CloudData,
        extent: Extent,
        params: PhysicsParams,
        rng: &mut R,
    ) -> Result<Self, StartError> {
        if data.terms.is_empty() {
            return Err(StartError::NoTerms);
        }
        if !extent.is_measurable() {
            return Err(StartError::Unmeasured {
                width: extent.width,
                height: extent.height,
            });
        }
        let particles = spawn_particles(data, extent, rng);
        debug!(
            particles = particles.len(),
            width = extent.width,
            height = extent.height,
            "simulation started"
        );
        Self::from_particles(particles, extent, params)
    }

    pub fn from_particles(
        particles: Vec<Particle>,
        extent: Extent,
        params: PhysicsParams,
    ) -> Result<Self, StartError> {
        if particles.is_empty() {
            return Err(StartError::NoTerms);
        }
        if !extent.is_measurable() {
            return Err(StartError::Unmeasured {
                width: extent.width,
                height: extent.height,
            });
        }
        Ok(Self {
            particles,
            extent,
            params,
            ticks: 0,
        })
    }

    pub fn tick(&mut self) {
        let extent = self.extent;
        let params = self.params;
        for p in &mut self.particles {
            fade_in(p, &params);
            cushion(p, extent, &params);
            integrate(p, &params);
            collide_floor(p, extent, &params);
            collide_walls(p, extent, &params);
        }
        self.interact_pairs();
        self.ticks += 1;
    }

    /// Resizes the bounds for the following ticks. Unmeasurable extents are
    /// ignored and the previous bounds stay in force.
    pub fn set_extent(&mut self, extent: Extent) {
        if extent.is_measurable() {
            self.extent = extent;
        }
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn max_speed(&self) -> f32 {
        self.particles
            .iter()
            .map(|p| p.vel.length())
            .fold(0.0, f32::max)
    }

    pub fn is_resting(&self, epsilon: f32) -> bool {
        self.max_speed() < epsilon
    }

    pub fn snapshot(&self, out: &mut Vec<ParticleSnapshot>) {
        out.clear();
        out.extend(self.particles.iter().map(|p| ParticleSnapshot {
            text: p.text.clone(),
            count: p.count,
            category: p.category.clone(),
            palette: p.palette,
            ratio: p.ratio,
            color_index: render::color_index(p.ratio),
            pos: p.pos,
            radius: p.radius,
            opacity: p.opacity,
            rotation: p.rotation,
        }));
    }

    fn interact_pairs(&mut self) {
        let attraction = self.params.attraction;
        let repulsion = self.params.repulsion;
        let padding = self.params.pair_padding;

        for i in 0..self.particles.len() {
            for j in (i + 1)..self.particles.len() {
                let (left, right) = self.particles.split_at_mut(j);
                let a = &mut left[i];
                let b = &mut right[0];

                let dist = a.pos.distance(b.pos);
                let min_dist = a.radius + b.radius + padding;
                let dir = (b.pos - a.pos).normalize_or(Vec2::new(1.0, 0.0));

                if a.category == b.category && dist > min_dist {
                    a.vel += dir * attraction;
                    b.vel -= dir * attraction;
                }

                if dist < min_dist {
                    let overlap = min_dist - dist;
                    let impulse = dir * (overlap * repulsion);
                    a.vel -= impulse;
                    b.vel += impulse;
                    let shift = dir * (overlap * 0.5);
                    a.pos -= shift;
                    b.pos += shift;
                }
            }
        }
    }
}

pub fn particle_radius(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * (font_size * config::GLYPH_PX) / 2.0 + config::RADIUS_PAD
}

fn spawn_particles<R: Rng + ?Sized>(data: &CloudData, extent: Extent, rng: &mut R) -> Vec<Particle> {
    let max_count = data.terms.iter().map(|t| t.count).max().unwrap_or(0).max(1) as f32;

    let mut lanes: Vec<&str> = Vec::new();
    for term in &data.terms {
        if !lanes.contains(&term.category.as_str()) {
            lanes.push(&term.category);
        }
    }
    let lane_center = |category: &str| {
        let idx = lanes.iter().position(|c| *c == category).unwrap_or(0);
        extent.width * config::LANE_INSET
            + (idx as f32 / lanes.len() as f32) * (extent.width * config::LANE_SPAN)
    };

    data.terms
        .iter()
        .enumerate()
        .map(|(idx, term)| {
            let ratio = term.count as f32 / max_count;
            let font_size = config::FONT_SIZE_BASE + ratio * config::FONT_SIZE_SCALE;
            let jitter = centered(rng, config::SPAWN_JITTER);
            Particle {
                text: term.text.clone(),
                count: term.count,
                category: term.category.clone(),
                palette: data.palettes.resolve(&term.category),
                ratio,
                pos: Vec2::new(
                    lane_center(&term.category) + jitter,
                    config::SPAWN_TOP - idx as f32 * config::SPAWN_STAGGER,
                ),
                vel: Vec2::new(
                    centered(rng, config::SPAWN_VX),
                    config::SPAWN_VY_MIN + rng.gen_range(0.0f32..1.0) * config::SPAWN_VY_RANGE,
                ),
                radius: particle_radius(&term.text, font_size),
                opacity: 0.0,
                rotation: centered(rng, config::SPAWN_ROTATION),
            }
        })
        .collect()
}

/// Uniform sample in `[-span / 2, span / 2)`.
fn centered<R: Rng + ?Sized>(rng: &mut R, span: f32) -> f32 {
    (rng.gen_range(0.0f32..1.0) - 0.5) * span
}

fn fade_in(p: &mut Particle, params: &PhysicsParams) {
    if p.opacity < 1.0 {
        p.opacity = (p.opacity + params.fade_step).min(1.0);
    }
}

fn cushion(p: &mut Particle, extent: Extent, params: &PhysicsParams) {
    let dist_to_floor = extent.height - p.bottom();
    if p.vel.y > 0.0 && dist_to_floor > 0.0 && dist_to_floor < params.cushion_zone {
        let depth = 1.0 - dist_to_floor / params.cushion_zone;
        p.vel.y *= 1.0 - depth * params.cushion_strength;
    }
}

fn integrate(p: &mut Particle, params: &PhysicsParams) {
    p.vel.y += params.gravity;
    p.vel = p.vel * params.friction;
    p.pos += p.vel;
}

fn collide_floor(p: &mut Particle, extent: Extent, params: &PhysicsParams) {
    if p.bottom() > extent.height {
        p.pos.y = extent.height - p.radius;
        p.vel.y *= -params.ground_elasticity;
        p.vel.x *= params.ground_friction;
        if p.vel.y.abs() < params.rest_speed {
            p.vel.y = 0.0;
        }
    }
}

fn collide_walls(p: &mut Particle, extent: Extent, params: &PhysicsParams) {
    let margin = params.wall_margin;
    if 2.0 * (p.radius + margin) >= extent.width {
        p.pos.x = extent.width / 2.0;
        p.vel.x = 0.0;
    } else if p.pos.x - p.radius < margin {
        p.pos.x = p.radius + margin;
        p.vel.x *= -params.wall_damping;
    } else if p.pos.x + p.radius > extent.width - margin {
        p.pos.x = extent.width - p.radius - margin;
        p.vel.x *= -params.wall_damping;
    }
}
