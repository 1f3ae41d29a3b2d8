/*
 * Boid Module
 *
 * This module defines the Boid struct and its per-frame behavior.
 * Each frame a boid runs four steering stages in a fixed priority order:
 * 1. Wall avoidance: turn back when outside the world bounds
 * 2. Separation: move away from crowding neighbors
 * 3. Obstacle avoidance: resolve collisions, steer around the closest threat
 * 4. Alignment: match the heading of neighbors (skipped when 3 fired)
 *
 * The fired steering vectors are summed into the acceleration, which is
 * integrated with a velocity drift term and a hard speed clamp.
 */

use nannou::prelude::*;
use slotmap::{new_key_type, SlotMap};

use crate::error::SimulationError;
use crate::math::{self, normalize_or_zero};
use crate::obstacle::ObstacleSet;
use crate::params::{SteeringParams, WorldBounds};
use crate::spatial_grid::{ChunkKey, SpatialIndex};

new_key_type! {
    /// Stable handle to an agent.
    pub struct AgentId;
}

pub type AgentMap = SlotMap<AgentId, Boid>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boid {
    pub position: Point2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    /// Chunk currently listing this boid. Owned by the spatial index.
    pub chunk: Option<ChunkKey>,
}

/// Everything a boid reads while steering, besides the spatial index.
pub struct StepContext<'a> {
    /// The shared population. The entry for the stepping boid itself is stale.
    pub agents: &'a AgentMap,
    pub obstacles: &'a ObstacleSet,
    pub params: &'a SteeringParams,
    pub bounds: WorldBounds,
    pub dt: f32,
}

/// What the steering stages did for one boid in one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// Force accumulator right before integration.
    pub force: Vec2,
    pub wall_avoided: bool,
    pub separation_neighbors: usize,
    pub collisions: usize,
    pub obstacle_avoided: bool,
    pub alignment_evaluated: bool,
    pub alignment_neighbors: usize,
}

impl Boid {
    pub fn new(position: Point2, velocity: Vec2) -> Self {
        Self {
            position,
            velocity,
            acceleration: Vec2::ZERO,
            chunk: None,
        }
    }

    // Apply a force to the boid
    #[inline]
    pub fn apply_force(&mut self, force: Vec2) {
        self.acceleration += force;
    }

    // Direction of travel in radians
    pub fn heading(&self) -> f32 {
        math::heading_angle(self.velocity)
    }

    pub fn is_finite(&self) -> bool {
        math::is_finite(self.position) && math::is_finite(self.velocity)
    }

    /// Steer, integrate and re-register with the spatial index.
    ///
    /// On a non-finite result the boid is left out of the index and the
    /// error is returned; the caller decides whether to keep the state.
    pub fn step(
        &mut self,
        id: AgentId,
        ctx: &StepContext,
        index: &mut SpatialIndex,
    ) -> Result<StepReport, SimulationError> {
        let report = self.steer(id, ctx, index);
        self.integrate(ctx.dt, ctx.params.max_speed);

        if !self.is_finite() {
            return Err(SimulationError::NonFiniteState {
                agent: id,
                position: self.position,
                velocity: self.velocity,
            });
        }

        index.update_membership(id, self)?;
        Ok(report)
    }

    /// Run the four steering stages, accumulating their forces.
    ///
    /// Collision resolution may also move the boid onto an obstacle's rim.
    pub fn steer(&mut self, id: AgentId, ctx: &StepContext, index: &SpatialIndex) -> StepReport {
        let mut report = StepReport::default();

        if let Some(steer) = self.avoid_walls(ctx.bounds, ctx.params) {
            self.apply_force(steer);
            report.wall_avoided = true;
        }

        let (separation, neighbors) = self.separation(id, ctx.agents, index, ctx.params);
        report.separation_neighbors = neighbors;
        if let Some(steer) = separation {
            self.apply_force(steer);
        }

        let (avoidance, collisions) = self.avoid_obstacles(ctx.obstacles, ctx.params);
        report.collisions = collisions;
        match avoidance {
            Some(steer) => {
                self.apply_force(steer);
                report.obstacle_avoided = true;
            }
            None => {
                report.alignment_evaluated = true;
                let (alignment, neighbors) = self.alignment(id, ctx.agents, index, ctx.params);
                report.alignment_neighbors = neighbors;
                if let Some(steer) = alignment {
                    self.apply_force(steer);
                }
            }
        }

        report.force = self.acceleration;
        report
    }

    // Update velocity and position from the accumulated acceleration
    pub fn integrate(&mut self, dt: f32, max_speed: f32) {
        // The velocity term is a deliberate drift on top of the steering
        self.velocity += (self.acceleration + self.velocity) * dt;

        // Reset acceleration
        self.acceleration = Vec2::ZERO;

        // Limit speed
        if self.velocity.length() > max_speed {
            self.velocity = normalize_or_zero(self.velocity) * max_speed;
        }

        self.position += self.velocity * dt;
    }

    /// Turn back toward the world when outside its bounds.
    ///
    /// Axes are checked in the order +x, -x, +y, -y and each violation
    /// replaces the previous one, so only the last violated axis steers.
    pub fn avoid_walls(&self, bounds: WorldBounds, params: &SteeringParams) -> Option<Vec2> {
        let mut steer = None;

        if self.position.x > bounds.half_width {
            steer = Some(vec2(-params.max_speed, self.velocity.y) - self.velocity);
        }
        if self.position.x < -bounds.half_width {
            steer = Some(vec2(params.max_speed, self.velocity.y) - self.velocity);
        }
        if self.position.y > bounds.half_height {
            steer = Some(vec2(self.velocity.x, -params.max_speed) - self.velocity);
        }
        if self.position.y < -bounds.half_height {
            steer = Some(vec2(self.velocity.x, params.max_speed) - self.velocity);
        }

        steer.map(|s| normalize_or_zero(s) * params.wall_force)
    }

    // Calculate separation force (avoid crowding neighbors)
    pub fn separation(
        &self,
        id: AgentId,
        agents: &AgentMap,
        index: &SpatialIndex,
        params: &SteeringParams,
    ) -> (Option<Vec2>, usize) {
        let desired_separation = params.desired_separation();
        let mut sum = Vec2::ZERO;
        let mut count = 0;

        for other_id in index.neighbors_of(self) {
            if other_id == id {
                continue;
            }
            let other = match agents.get(other_id) {
                Some(other) => other,
                None => continue,
            };

            let d = params.separation_metric.distance(self.position, other.position);

            // Coincident boids have no direction to push along
            if d > 0.0 && d < desired_separation {
                let away = normalize_or_zero(self.position - other.position);
                sum += away * (1.0 / (d * 10.0));
                count += 1;
            }
        }

        if count == 0 {
            return (None, 0);
        }

        sum /= count as f32;
        let desired = normalize_or_zero(sum) * params.max_speed;
        let steer = normalize_or_zero(desired - self.velocity) * params.separate_force;
        (Some(steer), count)
    }

    /// Resolve collisions and steer around the closest obstacle ahead.
    ///
    /// Collision forces are applied directly; the returned vector is the
    /// anticipation steer, present only when that tier fired. The second
    /// value counts the obstacles the boid was found inside.
    pub fn avoid_obstacles(&mut self, obstacles: &ObstacleSet, params: &SteeringParams) -> (Option<Vec2>, usize) {
        let mut closest: Option<(Vec2, f32)> = None;
        let mut minimum_distance = params.obstacle_search_radius;
        let mut collisions = 0;

        for (_, obstacle) in obstacles.iter() {
            let to_obstacle = obstacle.position() - self.position;
            let distance = to_obstacle.length();
            let encounter_radius = math::reject(to_obstacle, self.velocity).length();

            if distance < obstacle.radius() {
                self.apply_force(-to_obstacle * params.collision_force);

                // Push out to the rim along the line through the center
                let outward = if distance > 0.0 {
                    -to_obstacle / distance
                } else if self.velocity.length_squared() > 0.0 {
                    -normalize_or_zero(self.velocity)
                } else {
                    vec2(1.0, 0.0)
                };
                self.position = obstacle.position() + outward * obstacle.radius();
                collisions += 1;
            } else if distance < minimum_distance
                && to_obstacle.dot(self.velocity) > 0.0
                && encounter_radius <= obstacle.radius() + params.avoidance_margin
            {
                closest = Some((to_obstacle, obstacle.radius()));
                minimum_distance = distance;
            }
        }

        let (direction, radius) = match closest {
            Some(found) => found,
            None => return (None, collisions),
        };

        let normal = math::reject(direction, self.velocity);
        let clearance = radius + params.avoidance_margin;
        if normal.length() > clearance {
            return (None, collisions);
        }

        let normal = normalize_or_zero(normal) * clearance;
        let steer = normalize_or_zero(self.velocity - normal) * params.obstacle_force;
        (Some(steer), collisions)
    }

    // Calculate alignment force (steer towards average heading of neighbors)
    pub fn alignment(
        &self,
        id: AgentId,
        agents: &AgentMap,
        index: &SpatialIndex,
        params: &SteeringParams,
    ) -> (Option<Vec2>, usize) {
        let mut sum = Vec2::ZERO;
        let mut count = 0;

        for other_id in index.neighbors_of(self) {
            if other_id == id {
                continue;
            }
            if let Some(other) = agents.get(other_id) {
                if params.alignment_metric.distance(self.position, other.position) < params.neighbor_distance {
                    sum += other.velocity;
                    count += 1;
                }
            }
        }

        if count == 0 {
            return (None, 0);
        }

        sum /= count as f32;
        let desired = normalize_or_zero(sum) * params.max_speed;
        let steer = normalize_or_zero(desired - self.velocity) * params.align_force;
        (Some(steer), count)
    }
}
