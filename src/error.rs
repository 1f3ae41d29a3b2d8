/*
 * Error Module
 *
 * Errors surfaced by the flocking core. Normal operation never produces
 * them; they guard configuration mistakes, invalid UI input and broken
 * numeric invariants.
 */

use nannou::prelude::*;
use thiserror::Error;

use crate::boid::AgentId;
use crate::obstacle::ObstacleId;

/// Errors emitted by the simulation core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    /// A configuration value cannot be used (e.g. non-positive chunk size).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Obstacle radii must be finite and strictly positive.
    #[error("obstacle radius must be finite and positive, got {0}")]
    InvalidRadius(f32),

    #[error("position must be finite, got {0:?}")]
    InvalidPosition(Vec2),

    #[error("time step must be finite, got {0}")]
    InvalidTimeStep(f32),

    /// The position maps to a cell that cannot be keyed (non-finite or beyond i32).
    #[error("no grid cell for position {0:?}")]
    CellOutOfRange(Vec2),

    /// Integration produced NaN/Inf; the agent is not re-indexed.
    #[error("agent {agent:?} reached non-finite state (position {position:?}, velocity {velocity:?})")]
    NonFiniteState {
        agent: AgentId,
        position: Vec2,
        velocity: Vec2,
    },

    #[error("unknown agent {0:?}")]
    UnknownAgent(AgentId),

    #[error("unknown obstacle {0:?}")]
    UnknownObstacle(ObstacleId),
}
