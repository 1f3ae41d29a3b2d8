/*
 * Obstacle Module
 *
 * Circular obstacles the flock steers around. The set is edited by the UI
 * between frames and only read during a simulation step. Selection of the
 * obstacle being dragged is UI state and is kept out of here.
 */

use nannou::prelude::*;
use slotmap::{new_key_type, SlotMap};

use crate::error::SimulationError;
use crate::math;

new_key_type! {
    /// Stable handle to an obstacle in an [`ObstacleSet`].
    pub struct ObstacleId;
}

pub const DEFAULT_OBSTACLE_RADIUS: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    position: Vec2,
    radius: f32,
}

fn check_radius(radius: f32) -> Result<f32, SimulationError> {
    if radius.is_finite() && radius > 0.0 {
        Ok(radius)
    } else {
        Err(SimulationError::InvalidRadius(radius))
    }
}

fn check_position(position: Vec2) -> Result<Vec2, SimulationError> {
    if math::is_finite(position) {
        Ok(position)
    } else {
        Err(SimulationError::InvalidPosition(position))
    }
}

impl Obstacle {
    pub fn new(position: Vec2, radius: f32) -> Result<Self, SimulationError> {
        Ok(Self {
            position: check_position(position)?,
            radius: check_radius(radius)?,
        })
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn contains(&self, point: Vec2) -> bool {
        self.position.distance(point) < self.radius
    }
}

#[derive(Default)]
pub struct ObstacleSet {
    obstacles: SlotMap<ObstacleId, Obstacle>,
}

impl ObstacleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, position: Vec2, radius: f32) -> Result<ObstacleId, SimulationError> {
        let obstacle = Obstacle::new(position, radius)?;
        let id = self.obstacles.insert(obstacle);
        log::debug!("added obstacle {:?} at {:?} with radius {}", id, position, radius);
        Ok(id)
    }

    pub fn add_default(&mut self, position: Vec2) -> Result<ObstacleId, SimulationError> {
        self.add(position, DEFAULT_OBSTACLE_RADIUS)
    }

    pub fn remove(&mut self, id: ObstacleId) -> Option<Obstacle> {
        let removed = self.obstacles.remove(id);
        if removed.is_some() {
            log::debug!("removed obstacle {:?}", id);
        }
        removed
    }

    pub fn reposition(&mut self, id: ObstacleId, position: Vec2) -> Result<(), SimulationError> {
        let position = check_position(position)?;
        let obstacle = self
            .obstacles
            .get_mut(id)
            .ok_or(SimulationError::UnknownObstacle(id))?;
        obstacle.position = position;
        Ok(())
    }

    pub fn resize(&mut self, id: ObstacleId, radius: f32) -> Result<(), SimulationError> {
        let radius = check_radius(radius)?;
        let obstacle = self
            .obstacles
            .get_mut(id)
            .ok_or(SimulationError::UnknownObstacle(id))?;
        obstacle.radius = radius;
        Ok(())
    }

    pub fn get(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObstacleId, &Obstacle)> {
        self.obstacles.iter()
    }

    /// Obstacle under `point`; when several overlap the last one in set order wins.
    pub fn hit_test(&self, point: Vec2) -> Option<ObstacleId> {
        self.obstacles
            .iter()
            .filter(|(_, obstacle)| obstacle.contains(point))
            .map(|(id, _)| id)
            .last()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn clear(&mut self) {
        self.obstacles.clear();
    }
}
