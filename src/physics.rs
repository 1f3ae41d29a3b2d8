/*
 * Physics Module
 *
 * This module owns the simulation state and runs the per-frame update:
 * every boid is stepped exactly once, in place, against the live spatial
 * index and obstacle set. A boid stepped later in the pass therefore sees
 * the already-updated state of boids stepped before it; the pass order is
 * the agent map's key order.
 *
 * Also provides population management (seeding, spawning, removal,
 * resizing) and the read-only queries the rendering layer consumes.
 */

use nannou::prelude::*;
use rand::Rng;
use std::f32::consts::TAU;

use crate::boid::{AgentId, AgentMap, Boid, StepContext, StepReport};
use crate::error::SimulationError;
use crate::math;
use crate::obstacle::ObstacleSet;
use crate::params::{SimulationParams, WorldBounds};
use crate::spatial_grid::SpatialIndex;

/// Aggregate of one simulation frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    /// Time step actually used, after capping.
    pub dt: f32,
    pub agents_stepped: usize,
    pub wall_avoidances: usize,
    pub collisions: usize,
    pub obstacle_avoidances: usize,
    pub alignments_evaluated: usize,
    pub chunk_count: usize,
    pub evicted_chunks: usize,
}

impl FrameReport {
    fn record(&mut self, step: &StepReport) {
        self.agents_stepped += 1;
        self.collisions += step.collisions;
        if step.wall_avoided {
            self.wall_avoidances += 1;
        }
        if step.obstacle_avoided {
            self.obstacle_avoidances += 1;
        }
        if step.alignment_evaluated {
            self.alignments_evaluated += 1;
        }
    }
}

pub struct Simulation {
    agents: AgentMap,
    obstacles: ObstacleSet,
    index: SpatialIndex,
    pub params: SimulationParams,
    // Reused every frame to hold the pass order
    order: Vec<AgentId>,
    // Live agents, oldest first
    spawned: Vec<AgentId>,
    frame: u64,
}

impl Simulation {
    pub fn new(params: SimulationParams) -> Result<Self, SimulationError> {
        params.validate()?;
        let index = SpatialIndex::new(params.chunk_size)?;

        let reach = params.steering.max_interaction_radius();
        if params.chunk_size < reach {
            log::info!(
                "chunk size {} is below the interaction radius {}; neighbor scans are approximate",
                params.chunk_size,
                reach
            );
        }

        Ok(Self {
            agents: AgentMap::with_capacity_and_key(params.num_agents),
            obstacles: ObstacleSet::new(),
            index,
            order: Vec::with_capacity(params.num_agents),
            spawned: Vec::with_capacity(params.num_agents),
            params,
            frame: 0,
        })
    }

    /// Advance every agent by one frame.
    ///
    /// Agents are stepped in place in the agent map's key order. Freed slots
    /// are reused, so this is not spawn order: an agent spawned after a
    /// removal can be stepped before older ones, and every agent reads the
    /// already-updated state of those stepped before it.
    ///
    /// `dt` is clamped into `[0, max_frame_dt]`. Stops at the first agent
    /// whose state turns non-finite.
    pub fn step(&mut self, dt: f32, bounds: WorldBounds) -> Result<FrameReport, SimulationError> {
        let dt = self.cap_dt(dt)?;

        let mut order = std::mem::take(&mut self.order);
        order.clear();
        order.extend(self.agents.keys());

        let mut report = FrameReport {
            dt,
            ..FrameReport::default()
        };

        for &id in &order {
            match self.step_one(id, dt, bounds) {
                Ok(step) => report.record(&step),
                Err(err) => {
                    log::error!("frame {} aborted: {}", self.frame, err);
                    self.order = order;
                    return Err(err);
                }
            }
        }
        self.order = order;

        if let Some(max_idle) = self.params.chunk_eviction_frames {
            report.evicted_chunks = self.index.evict_idle_chunks(max_idle);
        }
        report.chunk_count = self.index.chunk_count();

        self.frame += 1;
        log::trace!(
            "frame {}: {} agents, {} collisions, {} avoidances, {} chunks",
            self.frame,
            report.agents_stepped,
            report.collisions,
            report.obstacle_avoidances,
            report.chunk_count
        );
        Ok(report)
    }

    /// Step a single agent with the same semantics as one slot of [`Simulation::step`].
    pub fn step_agent(&mut self, id: AgentId, dt: f32, bounds: WorldBounds) -> Result<StepReport, SimulationError> {
        let dt = self.cap_dt(dt)?;
        self.step_one(id, dt, bounds)
    }

    fn cap_dt(&self, dt: f32) -> Result<f32, SimulationError> {
        if !dt.is_finite() {
            return Err(SimulationError::InvalidTimeStep(dt));
        }
        Ok(dt.clamp(0.0, self.params.max_frame_dt))
    }

    fn step_one(&mut self, id: AgentId, dt: f32, bounds: WorldBounds) -> Result<StepReport, SimulationError> {
        let mut boid = *self.agents.get(id).ok_or(SimulationError::UnknownAgent(id))?;

        let ctx = StepContext {
            agents: &self.agents,
            obstacles: &self.obstacles,
            params: &self.params.steering,
            bounds,
            dt,
        };
        let report = boid.step(id, &ctx, &mut self.index)?;

        self.agents[id] = boid;
        Ok(report)
    }

    pub fn spawn(&mut self, position: Point2, velocity: Vec2) -> Result<AgentId, SimulationError> {
        if !math::is_finite(position) {
            return Err(SimulationError::InvalidPosition(position));
        }
        if !math::is_finite(velocity) {
            return Err(SimulationError::InvalidConfig("spawn velocity must be finite"));
        }

        let id = self.agents.insert(Boid::new(position, velocity));
        if let Err(err) = self.index.update_membership(id, &mut self.agents[id]) {
            self.agents.remove(id);
            return Err(err);
        }
        self.spawned.push(id);
        Ok(id)
    }

    pub fn remove_agent(&mut self, id: AgentId) -> Option<Boid> {
        let boid = self.forget(id)?;
        if let Some(at) = self.spawned.iter().rposition(|&spawned| spawned == id) {
            self.spawned.remove(at);
        }
        Some(boid)
    }

    // Drop an agent from the map and the index, leaving the spawn order alone
    fn forget(&mut self, id: AgentId) -> Option<Boid> {
        let mut boid = self.agents.remove(id)?;
        self.index.remove(id, &mut boid);
        Some(boid)
    }

    /// Add `count` agents at uniform positions inside `bounds`, each heading
    /// in a random direction at full speed.
    pub fn populate<R: Rng>(&mut self, count: usize, bounds: WorldBounds, rng: &mut R) -> Result<(), SimulationError> {
        bounds.validate()?;
        let max_speed = self.params.steering.max_speed;

        for _ in 0..count {
            let x = rng.gen_range(-bounds.half_width..=bounds.half_width);
            let y = rng.gen_range(-bounds.half_height..=bounds.half_height);
            let angle = rng.gen_range(0.0..TAU);
            self.spawn(pt2(x, y), vec2(angle.cos(), angle.sin()) * max_speed)?;
        }

        Ok(())
    }

    // Grow or shrink the population; the newest agents are removed first
    pub fn resize_population<R: Rng>(&mut self, count: usize, bounds: WorldBounds, rng: &mut R) -> Result<(), SimulationError> {
        let current = self.agents.len();

        if count > current {
            self.populate(count - current, bounds, rng)?;
        } else if count < current {
            while self.spawned.len() > count {
                if let Some(id) = self.spawned.pop() {
                    self.forget(id);
                }
            }
        }

        log::debug!("population resized from {} to {}", current, self.agents.len());
        Ok(())
    }

    /// Drop obstacles of the default radius at random points within `spread` of the origin.
    pub fn scatter_obstacles<R: Rng>(&mut self, count: usize, spread: f32, rng: &mut R) -> Result<(), SimulationError> {
        if !spread.is_finite() {
            return Err(SimulationError::InvalidConfig("obstacle spread must be finite"));
        }
        let spread = spread.abs();
        for _ in 0..count {
            let position = vec2(rng.gen_range(-spread..=spread), rng.gen_range(-spread..=spread));
            self.obstacles.add_default(position)?;
        }
        Ok(())
    }

    pub fn agents(&self) -> impl Iterator<Item = (AgentId, &Boid)> {
        self.agents.iter()
    }

    pub fn agent(&self, id: AgentId) -> Option<&Boid> {
        self.agents.get(id)
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }

    pub fn obstacles_mut(&mut self) -> &mut ObstacleSet {
        &mut self.obstacles
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn density(&self) -> f32 {
        self.index.density()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Corner quads of every chunk, or nothing while the chunk view is off.
    pub fn chunk_outlines(&self) -> impl Iterator<Item = [Vec2; 4]> + '_ {
        let chunk_size = self.index.chunk_size();
        let enabled = self.params.show_chunks;
        self.index
            .chunks()
            .filter(move |_| enabled)
            .map(move |chunk| chunk.corners(chunk_size))
    }

    /// Remove every agent and forget all chunks. Obstacles stay.
    pub fn clear_agents(&mut self) {
        self.agents.clear();
        self.spawned.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bounds() -> WorldBounds {
        WorldBounds::new(1000.0, 1000.0)
    }

    #[test]
    fn rejects_invalid_params() {
        let mut params = SimulationParams::default();
        params.max_frame_dt = 0.0;
        assert!(Simulation::new(params).is_err());
    }

    #[test]
    fn dt_is_capped() {
        let mut sim = Simulation::new(SimulationParams::default()).unwrap();
        sim.spawn(Vec2::ZERO, vec2(100.0, 0.0)).unwrap();

        assert_eq!(sim.step(5.0, bounds()).unwrap().dt, 0.1);
        assert_eq!(sim.step(-1.0, bounds()).unwrap().dt, 0.0);
        assert_eq!(sim.step(0.02, bounds()).unwrap().dt, 0.02);
    }

    #[test]
    fn nan_time_step_is_rejected() {
        let mut sim = Simulation::new(SimulationParams::default()).unwrap();
        assert!(matches!(sim.step(f32::NAN, bounds()), Err(SimulationError::InvalidTimeStep(_))));
        assert_eq!(sim.frame(), 0);
    }

    #[test]
    fn spawn_rejects_non_finite_position() {
        let mut sim = Simulation::new(SimulationParams::default()).unwrap();
        assert!(sim.spawn(vec2(f32::NAN, 0.0), Vec2::ZERO).is_err());
        assert_eq!(sim.agent_count(), 0);
        assert_eq!(sim.index().chunk_count(), 0);
    }

    #[test]
    fn step_counts_every_agent_once() {
        let mut sim = Simulation::new(SimulationParams::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        sim.populate(200, bounds(), &mut rng).unwrap();

        let report = sim.step(1.0 / 60.0, bounds()).unwrap();
        assert_eq!(report.agents_stepped, 200);
        assert_eq!(sim.frame(), 1);
        assert!(report.chunk_count > 0);
    }

    #[test]
    fn remove_agent_leaves_index() {
        let mut sim = Simulation::new(SimulationParams::default()).unwrap();
        let id = sim.spawn(vec2(10.0, 10.0), Vec2::ZERO).unwrap();

        let removed = sim.remove_agent(id).unwrap();
        assert!(removed.chunk.is_none());
        assert!(sim.agent(id).is_none());
        assert!(sim.index().chunks().all(|chunk| !chunk.contains(id)));
        assert!(sim.remove_agent(id).is_none());
        assert_eq!(
            sim.step_agent(id, 0.016, bounds()),
            Err(SimulationError::UnknownAgent(id))
        );
    }

    #[test]
    fn resize_population_both_ways() {
        let mut sim = Simulation::new(SimulationParams::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(11);

        sim.resize_population(50, bounds(), &mut rng).unwrap();
        assert_eq!(sim.agent_count(), 50);

        sim.resize_population(20, bounds(), &mut rng).unwrap();
        assert_eq!(sim.agent_count(), 20);
        let indexed: usize = sim.index().chunks().map(|chunk| chunk.len()).sum();
        assert_eq!(indexed, 20);
    }

    #[test]
    fn populated_agents_start_at_full_speed() {
        let mut sim = Simulation::new(SimulationParams::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        sim.populate(25, bounds(), &mut rng).unwrap();

        for (_, boid) in sim.agents() {
            assert!((boid.velocity.length() - 350.0).abs() < 1e-2);
            assert!(bounds().contains(boid.position));
        }
    }

    #[test]
    fn scattered_obstacles_use_default_radius() {
        let mut sim = Simulation::new(SimulationParams::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        sim.scatter_obstacles(3, 200.0, &mut rng).unwrap();

        assert_eq!(sim.obstacles().len(), 3);
        for (_, obstacle) in sim.obstacles().iter() {
            assert_eq!(obstacle.radius(), crate::obstacle::DEFAULT_OBSTACLE_RADIUS);
            assert!(obstacle.position().x.abs() <= 200.0);
            assert!(obstacle.position().y.abs() <= 200.0);
        }
    }

    #[test]
    fn chunk_outlines_follow_toggle() {
        let mut sim = Simulation::new(SimulationParams::default()).unwrap();
        sim.spawn(vec2(10.0, 10.0), Vec2::ZERO).unwrap();
        assert_eq!(sim.chunk_outlines().count(), 0);

        sim.params.show_chunks = true;
        let outlines: Vec<[Vec2; 4]> = sim.chunk_outlines().collect();
        assert_eq!(outlines, vec![[vec2(0.0, 0.0), vec2(75.0, 0.0), vec2(75.0, 75.0), vec2(0.0, 75.0)]]);
    }

    #[test]
    fn clear_agents_keeps_obstacles() {
        let mut sim = Simulation::new(SimulationParams::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        sim.populate(10, bounds(), &mut rng).unwrap();
        sim.scatter_obstacles(2, 100.0, &mut rng).unwrap();
        sim.step(0.016, bounds()).unwrap();

        sim.clear_agents();
        assert_eq!(sim.agent_count(), 0);
        assert_eq!(sim.obstacles().len(), 2);
        assert_eq!(sim.index().chunk_count(), 0);

        // Spawn order starts over as well
        sim.resize_population(3, bounds(), &mut rng).unwrap();
        sim.resize_population(1, bounds(), &mut rng).unwrap();
        assert_eq!(sim.agent_count(), 1);
    }

    #[test]
    fn shrinking_removes_newest_even_in_reused_slots() {
        let mut sim = Simulation::new(SimulationParams::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let ids: Vec<AgentId> = (0..5)
            .map(|i| sim.spawn(vec2(i as f32 * 10.0, 0.0), Vec2::ZERO).unwrap())
            .collect();

        sim.remove_agent(ids[1]).unwrap();
        let newest = sim.spawn(vec2(-50.0, 0.0), Vec2::ZERO).unwrap();

        sim.resize_population(4, bounds(), &mut rng).unwrap();
        assert!(sim.agent(newest).is_none());
        for &id in &[ids[0], ids[2], ids[3], ids[4]] {
            assert!(sim.agent(id).is_some());
        }

        sim.resize_population(2, bounds(), &mut rng).unwrap();
        assert!(sim.agent(ids[0]).is_some());
        assert!(sim.agent(ids[2]).is_some());
        assert_eq!(sim.agent_count(), 2);
        let indexed: usize = sim.index().chunks().map(|chunk| chunk.len()).sum();
        assert_eq!(indexed, 2);
    }

    #[test]
    fn populate_rejects_unusable_bounds() {
        let mut sim = Simulation::new(SimulationParams::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(6);

        assert!(matches!(
            sim.populate(3, WorldBounds::new(-10.0, 10.0), &mut rng),
            Err(SimulationError::InvalidConfig(_))
        ));
        assert!(sim.populate(3, WorldBounds::new(10.0, f32::NAN), &mut rng).is_err());
        assert!(sim.resize_population(3, WorldBounds::new(-1.0, -1.0), &mut rng).is_err());
        assert_eq!(sim.agent_count(), 0);
    }

    #[test]
    fn scatter_rejects_non_finite_spread() {
        let mut sim = Simulation::new(SimulationParams::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(8);

        assert!(matches!(
            sim.scatter_obstacles(1, f32::NAN, &mut rng),
            Err(SimulationError::InvalidConfig(_))
        ));
        assert!(sim.scatter_obstacles(1, f32::INFINITY, &mut rng).is_err());
        assert!(sim.obstacles().is_empty());

        // A negative spread is read as its magnitude
        sim.scatter_obstacles(2, -50.0, &mut rng).unwrap();
        assert_eq!(sim.obstacles().len(), 2);
    }

    #[test]
    fn eviction_runs_when_configured() {
        let mut params = SimulationParams::default();
        params.chunk_eviction_frames = Some(0);
        let mut sim = Simulation::new(params).unwrap();
        sim.spawn(vec2(74.0, 10.0), vec2(350.0, 0.0)).unwrap();

        // The boid leaves chunk (0,0) this frame; the empty chunk goes right away
        let report = sim.step(0.1, bounds()).unwrap();
        assert_eq!(report.evicted_chunks, 1);
        assert_eq!(report.chunk_count, 1);
    }
}
