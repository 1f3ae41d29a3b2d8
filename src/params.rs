/*
 * Simulation Parameters Module
 *
 * This module defines the tunable constants of the flocking model
 * (SteeringParams), the run configuration (SimulationParams) and the
 * world bounds handed in by the rendering layer every frame.
 * SimulationParams also keeps the snapshot/change-detection helpers the
 * UI uses to react to slider edits.
 */

use nannou::prelude::*;

use crate::error::SimulationError;
use crate::math::manhattan;

/// Distance used by a neighbor-scanning stage for its threshold test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    Euclidean,
    Manhattan,
}

impl DistanceMetric {
    #[inline]
    pub fn distance(self, a: Vec2, b: Vec2) -> f32 {
        match self {
            DistanceMetric::Euclidean => a.distance(b),
            DistanceMetric::Manhattan => manhattan(a, b),
        }
    }
}

/// Force constants and interaction radii shared by every agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringParams {
    pub max_speed: f32,
    pub separate_force: f32,
    pub align_force: f32,
    pub obstacle_force: f32,
    pub wall_force: f32,
    pub collision_force: f32,
    /// Obstacles farther than this are ignored by the anticipation tier.
    pub obstacle_search_radius: f32,
    /// Clearance added to an obstacle's radius when predicting a close pass.
    pub avoidance_margin: f32,
    pub agent_scale: f32,
    pub separation_factor: f32,
    pub neighbor_distance: f32,
    pub separation_metric: DistanceMetric,
    pub alignment_metric: DistanceMetric,
}

impl Default for SteeringParams {
    fn default() -> Self {
        Self {
            max_speed: 350.0,
            separate_force: 2500.0,
            align_force: 1500.0,
            obstacle_force: 2000.0,
            wall_force: 2000.0,
            collision_force: 100_000.0,
            obstacle_search_radius: 500.0,
            avoidance_margin: 200.0,
            agent_scale: 20.0,
            separation_factor: 2.2,
            neighbor_distance: 200.0,
            separation_metric: DistanceMetric::Manhattan,
            alignment_metric: DistanceMetric::Euclidean,
        }
    }
}

impl SteeringParams {
    #[inline]
    pub fn desired_separation(&self) -> f32 {
        self.agent_scale * self.separation_factor
    }

    // Largest radius any neighbor-scanning stage looks at
    pub fn max_interaction_radius(&self) -> f32 {
        f32::max(self.desired_separation(), self.neighbor_distance)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        let positive = [
            self.max_speed,
            self.agent_scale,
            self.separation_factor,
            self.neighbor_distance,
            self.obstacle_search_radius,
        ];
        if positive.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(SimulationError::InvalidConfig(
                "speeds, scales and radii must be finite and positive",
            ));
        }

        let forces = [
            self.separate_force,
            self.align_force,
            self.obstacle_force,
            self.wall_force,
            self.collision_force,
            self.avoidance_margin,
        ];
        if forces.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
            return Err(SimulationError::InvalidConfig(
                "forces and margins must be finite and non-negative",
            ));
        }

        Ok(())
    }
}

/// Half extents of the visible world, supplied by the rendering layer each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub half_width: f32,
    pub half_height: f32,
}

impl WorldBounds {
    pub fn new(half_width: f32, half_height: f32) -> Self {
        Self { half_width, half_height }
    }

    // Fixed world width, height follows the viewport aspect ratio
    pub fn from_viewport(world_width: f32, aspect: f32) -> Self {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        Self::new(world_width / 2.0, world_width / aspect / 2.0)
    }

    // Half extents must be finite and non-negative to sample positions inside
    pub fn validate(&self) -> Result<(), SimulationError> {
        let usable = |v: f32| v.is_finite() && v >= 0.0;
        if usable(self.half_width) && usable(self.half_height) {
            Ok(())
        } else {
            Err(SimulationError::InvalidConfig(
                "world bounds must be finite and non-negative",
            ))
        }
    }

    pub fn width(&self) -> f32 {
        self.half_width * 2.0
    }

    pub fn height(&self) -> f32 {
        self.half_height * 2.0
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x.abs() <= self.half_width && point.y.abs() <= self.half_height
    }
}

// Run configuration, adjustable via UI
pub struct SimulationParams {
    pub num_agents: usize,
    pub chunk_size: f32,
    pub world_width: f32,
    /// Elapsed time per frame is capped here to stay stable across stalls.
    pub max_frame_dt: f32,
    /// Evict chunks empty for more than this many frames; `None` keeps them forever.
    pub chunk_eviction_frames: Option<u32>,
    pub steering: SteeringParams,
    pub show_chunks: bool,
    pub show_debug: bool,
    pub pause_simulation: bool,

    // Internal state for tracking changes
    previous_values: Option<ParamSnapshot>,
}

// A snapshot of parameter values used for change detection
#[derive(Clone, Copy)]
struct ParamSnapshot {
    num_agents: usize,
    max_speed: f32,
    show_chunks: bool,
    show_debug: bool,
    pause_simulation: bool,
}

/// What the UI changed since the last snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamChanges {
    pub num_agents_changed: bool,
    pub any_changed: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            num_agents: 1500,
            chunk_size: 75.0,
            world_width: 4500.0,
            max_frame_dt: 0.1,
            chunk_eviction_frames: None,
            steering: SteeringParams::default(),
            show_chunks: false,
            show_debug: false,
            pause_simulation: false,
            previous_values: None,
        }
    }
}

impl SimulationParams {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if !(self.chunk_size.is_finite() && self.chunk_size > 0.0) {
            return Err(SimulationError::InvalidConfig("chunk_size must be finite and positive"));
        }
        if !(self.world_width.is_finite() && self.world_width > 0.0) {
            return Err(SimulationError::InvalidConfig("world_width must be finite and positive"));
        }
        if !(self.max_frame_dt.is_finite() && self.max_frame_dt > 0.0) {
            return Err(SimulationError::InvalidConfig("max_frame_dt must be finite and positive"));
        }
        self.steering.validate()
    }

    // Take a snapshot of current parameter values for change detection
    pub fn take_snapshot(&mut self) {
        self.previous_values = Some(ParamSnapshot {
            num_agents: self.num_agents,
            max_speed: self.steering.max_speed,
            show_chunks: self.show_chunks,
            show_debug: self.show_debug,
            pause_simulation: self.pause_simulation,
        });
    }

    // Check if any parameters have changed since the last snapshot
    pub fn detect_changes(&self) -> ParamChanges {
        let mut changes = ParamChanges::default();

        // Without a snapshot nothing has changed
        if let Some(prev) = &self.previous_values {
            if self.num_agents != prev.num_agents {
                changes.num_agents_changed = true;
                changes.any_changed = true;
            }

            if self.steering.max_speed != prev.max_speed
                || self.show_chunks != prev.show_chunks
                || self.show_debug != prev.show_debug
                || self.pause_simulation != prev.pause_simulation
            {
                changes.any_changed = true;
            }
        }

        changes
    }

    // Get parameter ranges for UI sliders
    pub fn get_num_agents_range() -> std::ops::RangeInclusive<usize> {
        0..=10000
    }

    pub fn get_max_speed_range() -> std::ops::RangeInclusive<f32> {
        50.0..=1000.0
    }
}
