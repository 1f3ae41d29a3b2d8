/*
 * Boid Swarm - Module Definitions
 *
 * This file defines the module structure of the flocking engine and its
 * nannou front-end. The engine (math, spatial_grid, obstacle, boid,
 * physics, params, error) has no window dependencies beyond the vector
 * types; the remaining modules draw it and route input into it.
 */

// Re-export key components for easier access
pub use boid::{AgentId, Boid, StepReport};
pub use camera::Camera;
pub use error::SimulationError;
pub use obstacle::{Obstacle, ObstacleId, ObstacleSet};
pub use params::{DistanceMetric, SimulationParams, SteeringParams, WorldBounds};
pub use physics::{FrameReport, Simulation};
pub use spatial_grid::{CellCoord, ChunkKey, SpatialIndex};
pub use debug::DebugInfo;
pub use app::Model;

// Define modules
pub mod math;
pub mod error;
pub mod boid;
pub mod camera;
pub mod spatial_grid;
pub mod obstacle;
pub mod params;
pub mod debug;
pub mod app;
pub mod ui;
pub mod physics;
pub mod renderer;
pub mod input;

// Constants
pub const AGENT_SIZE: f32 = 20.0;
/// Obstacles spawned around the origin at start-up.
pub const START_OBSTACLES: usize = 1;
pub const START_OBSTACLE_SPREAD: f32 = 200.0;
