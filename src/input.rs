/*
 * Input Module
 *
 * This module handles user input events for the flocking simulation.
 * Obstacles are edited with the mouse:
 *
 * - Click on an obstacle to select it, drag to move it
 * - Shift + drag resizes the selected obstacle to the cursor distance
 * - Ctrl + click on empty space adds an obstacle, on an obstacle removes it
 * - Releasing the button drops the selection
 * - The C key toggles the chunk outlines
 */

use nannou::prelude::*;
use nannou::winit::event::MouseButton;

use crate::app::Model;
use crate::error::SimulationError;
use crate::obstacle::{ObstacleId, ObstacleSet};

/// Pointer state owned by the UI; the simulation never sees the selection.
#[derive(Debug, Default)]
pub struct PointerState {
    /// Cursor position in world space.
    pub position: Vec2,
    pub selected: Option<ObstacleId>,
}

impl PointerState {
    pub fn press(&mut self, obstacles: &mut ObstacleSet, ctrl: bool) -> Result<(), SimulationError> {
        self.selected = obstacles.hit_test(self.position);

        if ctrl {
            match self.selected.take() {
                Some(id) => {
                    obstacles.remove(id);
                }
                None => {
                    obstacles.add_default(self.position)?;
                }
            }
        }

        Ok(())
    }

    pub fn moved(&mut self, obstacles: &mut ObstacleSet, position: Vec2, shift: bool) -> Result<(), SimulationError> {
        self.position = position;

        let id = match self.selected {
            Some(id) => id,
            None => return Ok(()),
        };

        if shift {
            let center = match obstacles.get(id) {
                Some(obstacle) => obstacle.position(),
                None => return Err(SimulationError::UnknownObstacle(id)),
            };
            let radius = center.distance(position);
            // Cursor on the center would give a zero radius; keep the old size
            if radius > 0.0 {
                obstacles.resize(id, radius)?;
            }
        } else {
            obstacles.reposition(id, position)?;
        }

        Ok(())
    }

    pub fn release(&mut self) {
        self.selected = None;
    }
}

// Mouse moved event handler
pub fn mouse_moved(app: &App, model: &mut Model, pos: Point2) {
    let world_pos = model.camera.screen_to_world(pos, app.window_rect());
    let shift = app.keys.mods.shift();

    if let Err(err) = model
        .pointer
        .moved(model.simulation.obstacles_mut(), world_pos, shift)
    {
        log::warn!("could not edit obstacle: {}", err);
        model.pointer.release();
    }
}

// Mouse pressed event handler
pub fn mouse_pressed(app: &App, model: &mut Model, button: MouseButton) {
    if button != MouseButton::Left {
        return;
    }

    // Clicks on the control panel belong to egui
    if model.egui.ctx().is_pointer_over_area() {
        return;
    }

    let ctrl = app.keys.mods.ctrl();
    if let Err(err) = model.pointer.press(model.simulation.obstacles_mut(), ctrl) {
        log::warn!("could not edit obstacle: {}", err);
    }
}

// Mouse released event handler
pub fn mouse_released(_app: &App, model: &mut Model, button: MouseButton) {
    if button == MouseButton::Left {
        model.pointer.release();
    }
}

pub fn key_pressed(_app: &App, model: &mut Model, key: Key) {
    if key == Key::C {
        model.simulation.params.show_chunks = !model.simulation.params.show_chunks;
        log::debug!("chunk outlines {}", if model.simulation.params.show_chunks { "on" } else { "off" });
    }
}

// Handle raw window events for egui
pub fn raw_window_event(_app: &App, model: &mut Model, event: &nannou::winit::event::WindowEvent) {
    model.egui.handle_raw_event(event);
}
