/*
 * UI Module
 *
 * This module contains functions for creating and updating the user interface
 * using nannou_egui. It provides controls for the population size, speed and
 * view toggles, and shows the frame statistics.
 * Parameter change detection is handled by the SimulationParams struct.
 */

use nannou_egui::{egui, Egui};

use crate::debug::DebugInfo;
use crate::params::{ParamChanges, SimulationParams};

/// What the user asked for this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiActions {
    pub reset_agents: bool,
    pub clear_obstacles: bool,
    pub changes: ParamChanges,
}

pub fn update_ui(egui: &mut Egui, params: &mut SimulationParams, debug_info: &DebugInfo) -> UiActions {
    let mut actions = UiActions::default();

    // Take a snapshot of current parameter values for change detection
    params.take_snapshot();

    let ctx = egui.begin_frame();

    egui::Window::new("Simulation Controls")
        .default_pos([10.0, 10.0])
        .show(&ctx, |ui| {
            ui.label(format!("FPS: {:.1}", debug_info.fps));
            ui.label(format!("Density: {:.2}", debug_info.density));
            ui.label(format!("Boid count: {}", debug_info.agent_count));
            ui.label(format!("Chunks: {}", debug_info.chunk_count));

            ui.separator();

            ui.collapsing("Flock", |ui| {
                ui.add(
                    egui::Slider::new(&mut params.num_agents, SimulationParams::get_num_agents_range())
                        .text("Number of Boids"),
                );
                ui.add(
                    egui::Slider::new(&mut params.steering.max_speed, SimulationParams::get_max_speed_range())
                        .text("Max Speed"),
                );

                if ui.button("Reset Boids").clicked() {
                    actions.reset_agents = true;
                }
            });

            ui.collapsing("Obstacles", |ui| {
                ui.label("Click and drag to move, Shift + drag to resize");
                ui.label("Ctrl + click to add or remove");
                if ui.button("Clear Obstacles").clicked() {
                    actions.clear_obstacles = true;
                }
            });

            ui.checkbox(&mut params.show_chunks, "Show Chunks (C)");
            ui.checkbox(&mut params.show_debug, "Show Debug Info");
            ui.checkbox(&mut params.pause_simulation, "Pause Simulation");
        });

    actions.changes = params.detect_changes();
    actions
}

// Draw debug information on the screen
pub fn draw_debug_info(draw: &nannou::Draw, debug_info: &DebugInfo, window_rect: nannou::geom::Rect) {
    let lines = debug_info.summary_lines();

    // Create a background panel in the top-right corner
    let margin = 20.0;
    let line_height = 20.0;
    let panel_width = 200.0;
    let panel_height = line_height * lines.len() as f32 + margin;
    let panel_x = window_rect.right() - panel_width / 2.0;
    let panel_y = window_rect.top() - panel_height / 2.0;

    draw.rect()
        .x_y(panel_x, panel_y)
        .w_h(panel_width, panel_height)
        .color(nannou::color::rgba(0.0, 0.0, 0.0, 0.7));

    let text_y = window_rect.top() - margin;

    for (i, text) in lines.iter().enumerate() {
        let y = text_y - (i as f32 * line_height);

        draw.text(text)
            .x_y(panel_x, y)
            .w(panel_width - margin)
            .left_justify()
            .color(nannou::color::WHITE)
            .font_size(14);
    }
}
