/*
 * Application Module
 *
 * This module defines the main application model and logic for the flocking
 * simulation. It handles the initialization and the per-frame update:
 * UI first, then population changes, then one simulation step sized by the
 * real elapsed time.
 */

use nannou::prelude::*;
use nannou_egui::Egui;

use crate::camera::Camera;
use crate::debug::DebugInfo;
use crate::input::{self, PointerState};
use crate::params::SimulationParams;
use crate::physics::Simulation;
use crate::renderer;
use crate::ui;
use crate::{START_OBSTACLES, START_OBSTACLE_SPREAD};

// Main model for the application
pub struct Model {
    pub simulation: Simulation,
    pub egui: Egui,
    pub debug_info: DebugInfo,
    pub camera: Camera,
    pub pointer: PointerState,
}

// Initialize the model
pub fn model(app: &App) -> Model {
    // Calculate window size based on monitor size (80% of monitor size)
    let (window_width, window_height) = match app.primary_monitor() {
        Some(monitor) => {
            let size = monitor.size();
            (size.width as f32 * 0.8, size.height as f32 * 0.8)
        }
        None => (1280.0, 720.0),
    };

    let window_id = app
        .new_window()
        .title("Boid Swarm")
        .size(window_width as u32, window_height as u32)
        .view(renderer::view)
        .mouse_moved(input::mouse_moved)
        .mouse_pressed(input::mouse_pressed)
        .mouse_released(input::mouse_released)
        .key_pressed(input::key_pressed)
        .raw_event(input::raw_window_event)
        .build()
        .expect("failed to create window");

    let window = app.window(window_id).expect("window was just created");
    let egui = Egui::from_window(&window);

    let params = SimulationParams::default();
    let camera = Camera::new(params.world_width);
    let bounds = camera.world_bounds(app.window_rect());
    let num_agents = params.num_agents;

    let mut simulation = Simulation::new(params).expect("default parameters are valid");
    let mut rng = rand::thread_rng();

    if let Err(err) = simulation.populate(num_agents, bounds, &mut rng) {
        log::error!("failed to seed the flock: {}", err);
    }
    if let Err(err) = simulation.scatter_obstacles(START_OBSTACLES, START_OBSTACLE_SPREAD, &mut rng) {
        log::error!("failed to place obstacles: {}", err);
    }

    log::info!(
        "started with {} boids and {} obstacles in a {:.0}x{:.0} world",
        simulation.agent_count(),
        simulation.obstacles().len(),
        bounds.width(),
        bounds.height()
    );

    let mut debug_info = DebugInfo::default();
    debug_info.record(&simulation, None);

    Model {
        simulation,
        egui,
        debug_info,
        camera,
        pointer: PointerState::default(),
    }
}

// Update the model
pub fn update(app: &App, model: &mut Model, update: Update) {
    model.debug_info.fps = app.fps();
    model.debug_info.frame_time = update.since_last;

    let actions = ui::update_ui(&mut model.egui, &mut model.simulation.params, &model.debug_info);
    let bounds = model.camera.world_bounds(app.window_rect());
    let mut rng = rand::thread_rng();

    if actions.reset_agents {
        let count = model.simulation.params.num_agents;
        model.simulation.clear_agents();
        if let Err(err) = model.simulation.populate(count, bounds, &mut rng) {
            log::error!("failed to reset the flock: {}", err);
        }
    } else if actions.changes.num_agents_changed {
        let count = model.simulation.params.num_agents;
        if let Err(err) = model.simulation.resize_population(count, bounds, &mut rng) {
            log::error!("failed to resize the flock: {}", err);
        }
    }

    if actions.clear_obstacles {
        model.simulation.obstacles_mut().clear();
        model.pointer.release();
    }

    let mut report = None;
    if !model.simulation.params.pause_simulation {
        match model.simulation.step(update.since_last.as_secs_f32(), bounds) {
            Ok(frame) => report = Some(frame),
            Err(err) => {
                log::error!("simulation halted: {}", err);
                model.simulation.params.pause_simulation = true;
            }
        }
    }

    model.debug_info.record(&model.simulation, report);
}
