use boid_swarm::spatial_grid::pair_key;
use boid_swarm::{Simulation, SimulationParams, WorldBounds};
use nannou::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

const DT: f32 = 1.0 / 60.0;

fn simulation() -> Simulation {
    Simulation::new(SimulationParams::default()).unwrap()
}

fn open_world() -> WorldBounds {
    WorldBounds::new(5000.0, 5000.0)
}

fn assert_membership(sim: &Simulation) {
    let index = sim.index();

    for (id, boid) in sim.agents() {
        let cell = index.cell_of(boid.position).unwrap();
        assert_eq!(boid.chunk, Some(pair_key(cell)), "agent {:?} points at the wrong chunk", id);

        let holders = index.chunks().filter(|chunk| chunk.contains(id)).count();
        assert_eq!(holders, 1, "agent {:?} is listed in {} chunks", id, holders);
        assert_eq!(index.chunk_at(cell).map(|chunk| chunk.contains(id)), Some(true));
    }

    let listed: usize = index.chunks().map(|chunk| chunk.len()).sum();
    assert_eq!(listed, sim.agent_count());
}

#[test]
fn membership_and_speed_hold_over_many_frames() {
    let mut sim = simulation();
    let bounds = WorldBounds::new(600.0, 400.0);
    let mut rng = StdRng::seed_from_u64(42);
    sim.populate(300, bounds, &mut rng).unwrap();
    sim.scatter_obstacles(2, 200.0, &mut rng).unwrap();
    assert_membership(&sim);

    let max_speed = sim.params.steering.max_speed;
    for _ in 0..120 {
        sim.step(DT, bounds).unwrap();
        assert_membership(&sim);
        for (_, boid) in sim.agents() {
            assert!(boid.velocity.length() <= max_speed + 1e-2);
            assert_eq!(boid.acceleration, Vec2::ZERO);
        }
    }
}

#[test]
fn close_pair_separates() {
    let mut sim = simulation();
    let a = sim.spawn(vec2(0.0, 0.0), Vec2::ZERO).unwrap();
    let b = sim.spawn(vec2(20.0, 0.0), Vec2::ZERO).unwrap();

    let distance = |sim: &Simulation| {
        sim.agent(a)
            .unwrap()
            .position
            .distance(sim.agent(b).unwrap().position)
    };

    let start = distance(&sim);
    let mut previous = start;
    for _ in 0..10 {
        sim.step(DT, open_world()).unwrap();
        let current = distance(&sim);
        assert!(current >= previous - 1e-4, "pair drew closer: {} -> {}", previous, current);
        previous = current;
    }
    assert!(previous > start);
}

#[test]
fn collision_never_leaves_agent_inside() {
    let mut sim = simulation();
    let obstacle = sim.obstacles_mut().add(vec2(0.0, 0.0), 100.0).unwrap();
    let id = sim.spawn(vec2(10.0, 0.0), Vec2::ZERO).unwrap();

    let report = sim.step_agent(id, DT, open_world()).unwrap();
    assert_eq!(report.collisions, 1);

    let radius = sim.obstacles().get(obstacle).unwrap().radius();
    let position = sim.agent(id).unwrap().position;
    assert!(position.length() >= radius - 1e-3);
    assert!(position.x > 0.0);
}

#[test]
fn wall_turns_agent_back() {
    let mut sim = simulation();
    let id = sim.spawn(vec2(150.0, 0.0), vec2(50.0, 0.0)).unwrap();

    let report = sim.step_agent(id, DT, WorldBounds::new(100.0, 100.0)).unwrap();
    assert!(report.wall_avoided);
    assert!(report.force.x < 0.0);
    assert!((report.force.x + sim.params.steering.wall_force).abs() < 1e-2);
}

#[test]
fn obstacle_ahead_suppresses_alignment() {
    let mut sim = simulation();
    sim.obstacles_mut().add(vec2(300.0, 20.0), 50.0).unwrap();
    let id = sim.spawn(vec2(0.0, 0.0), vec2(100.0, 0.0)).unwrap();
    sim.spawn(vec2(30.0, 30.0), vec2(0.0, 200.0)).unwrap();

    let report = sim.step_agent(id, DT, open_world()).unwrap();
    assert!(report.obstacle_avoided);
    assert!(!report.alignment_evaluated);
    assert_eq!(report.alignment_neighbors, 0);
    assert!(report.force.length() > 0.0);
}

#[test]
fn isolated_agent_feels_no_force() {
    let mut sim = simulation();
    let id = sim.spawn(vec2(10.0, 10.0), vec2(100.0, 50.0)).unwrap();
    // Far outside the 3x3 window
    sim.spawn(vec2(1000.0, 1000.0), vec2(-100.0, 0.0)).unwrap();

    let report = sim.step_agent(id, DT, open_world()).unwrap();
    assert_eq!(report.force, Vec2::ZERO);
    assert!(report.alignment_evaluated);
    assert_eq!(report.alignment_neighbors, 0);
    assert_eq!(report.separation_neighbors, 0);
}

#[test]
fn large_frame_times_are_capped() {
    let mut sim = simulation();
    let id = sim.spawn(vec2(0.0, 0.0), vec2(100.0, 0.0)).unwrap();

    let report = sim.step(3.0, open_world()).unwrap();
    assert_eq!(report.dt, 0.1);

    // v = 100 + 100 * 0.1, position advances by v * dt
    let boid = sim.agent(id).unwrap();
    assert!((boid.velocity.x - 110.0).abs() < 1e-3);
    assert!((boid.position.x - 11.0).abs() < 1e-3);
}

#[test]
fn population_changes_keep_index_consistent() {
    let mut sim = simulation();
    let bounds = WorldBounds::new(500.0, 500.0);
    let mut rng = StdRng::seed_from_u64(9);

    sim.resize_population(120, bounds, &mut rng).unwrap();
    for _ in 0..5 {
        sim.step(DT, bounds).unwrap();
    }
    sim.resize_population(40, bounds, &mut rng).unwrap();
    assert_eq!(sim.agent_count(), 40);
    assert_membership(&sim);

    sim.resize_population(90, bounds, &mut rng).unwrap();
    sim.step(DT, bounds).unwrap();
    assert_eq!(sim.agent_count(), 90);
    assert_membership(&sim);
}

#[test]
fn eviction_bounds_chunk_growth() {
    let mut params = SimulationParams::default();
    params.chunk_eviction_frames = Some(2);
    let mut sim = Simulation::new(params).unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let bounds = WorldBounds::new(800.0, 800.0);
    sim.populate(50, bounds, &mut rng).unwrap();

    let mut evicted = 0;
    for _ in 0..200 {
        evicted += sim.step(DT, bounds).unwrap().evicted_chunks;
    }
    assert!(evicted > 0);

    // Agents cross at most one chunk per frame, so every surviving chunk is
    // occupied or was emptied within the last three frames
    let occupied = sim.index().chunks().filter(|chunk| !chunk.is_empty()).count();
    assert!(occupied <= 50);
    assert!(sim.index().chunk_count() <= 50 * 4);
    assert_membership(&sim);
}

#[test]
fn chunk_view_toggles_outlines() {
    let mut sim = simulation();
    sim.spawn(vec2(-10.0, 10.0), Vec2::ZERO).unwrap();
    assert_eq!(sim.chunk_outlines().count(), 0);

    sim.params.show_chunks = true;
    let outlines: Vec<[Vec2; 4]> = sim.chunk_outlines().collect();
    assert_eq!(outlines.len(), 1);
    assert_eq!(outlines[0][0], vec2(-75.0, 0.0));
    assert_eq!(outlines[0][2], vec2(0.0, 75.0));
}

// Alignment steer toward `neighbor_velocity`, as seen by an agent moving at `velocity`
fn expected_alignment(sim: &Simulation, neighbor_velocity: Vec2, velocity: Vec2) -> Vec2 {
    let steering = &sim.params.steering;
    let desired = neighbor_velocity.normalize() * steering.max_speed;
    (desired - velocity).normalize() * steering.align_force
}

#[test]
fn later_agents_read_same_frame_updates() {
    // Within alignment range, outside separation range, in one chunk
    let setup = || {
        let mut sim = simulation();
        let first = sim.spawn(vec2(0.0, 0.0), vec2(100.0, 0.0)).unwrap();
        let second = sim.spawn(vec2(60.0, 0.0), vec2(0.0, 100.0)).unwrap();
        (sim, first, second)
    };

    let (mut stepped, first, second) = setup();
    let keys: Vec<_> = stepped.agents().map(|(id, _)| id).collect();
    assert_eq!(keys, vec![first, second]);
    stepped.step(DT, open_world()).unwrap();

    // Same frame, one agent at a time in key order
    let (mut manual, _, _) = setup();
    let start_velocity = manual.agent(first).unwrap().velocity;
    manual.step_agent(first, DT, open_world()).unwrap();
    let updated_velocity = manual.agent(first).unwrap().velocity;
    let report = manual.step_agent(second, DT, open_world()).unwrap();

    assert_eq!(stepped.agent(first), manual.agent(first));
    assert_eq!(stepped.agent(second), manual.agent(second));

    // The second agent steered against the first agent's new velocity
    let second_velocity = vec2(0.0, 100.0);
    let in_place = expected_alignment(&manual, updated_velocity, second_velocity);
    let snapshot = expected_alignment(&manual, start_velocity, second_velocity);
    assert_eq!(report.alignment_neighbors, 1);
    assert!((report.force - in_place).length() < 1e-2);
    assert!((report.force - snapshot).length() > 1.0);
}
