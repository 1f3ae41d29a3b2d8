/*
 * Boid Swarm
 *
 * Flocking simulation over a sparse chunked grid. Each boid avoids the
 * world edges, keeps its distance from close neighbors, steers around
 * obstacles and, when no obstacle is in the way, aligns with the boids
 * around it.
 *
 * Set RUST_LOG=debug (or trace) for simulation diagnostics.
 */

use boid_swarm::app::{model, update};

fn main() {
    env_logger::init();

    nannou::app(model).update(update).run();
}
