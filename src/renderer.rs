/*
 * Renderer Module
 *
 * This module handles the rendering of the flocking simulation.
 * It draws obstacles, agents, the optional chunk outlines and the
 * debug overlay, mapping everything through the camera.
 */

use nannou::prelude::*;

use crate::app::Model;
use crate::boid::Boid;
use crate::camera::Camera;
use crate::ui;
use crate::AGENT_SIZE;

// Render the model
pub fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    draw.background().color(BLACK);

    let window_rect = app.window_rect();
    let camera = &model.camera;
    let scale = camera.scale(window_rect);

    // Obstacles, the selected one outlined
    for (id, obstacle) in model.simulation.obstacles().iter() {
        let center = camera.world_to_screen(obstacle.position(), window_rect);
        let ellipse = draw
            .ellipse()
            .xy(center)
            .radius(obstacle.radius() * scale)
            .color(rgb(0.45, 0.45, 0.45));

        if model.pointer.selected == Some(id) {
            ellipse.stroke(WHITE).stroke_weight(2.0);
        }
    }

    for (_, boid) in model.simulation.agents() {
        draw_boid(&draw, boid, camera, window_rect);
    }

    // Chunk outlines, empty unless enabled
    for corners in model.simulation.chunk_outlines() {
        let points = corners
            .iter()
            .chain(corners.first())
            .map(|&corner| camera.world_to_screen(corner, window_rect));
        draw.polyline()
            .weight(1.0)
            .points(points)
            .color(rgba(1.0, 1.0, 0.0, 0.6));
    }

    if model.simulation.params.show_debug {
        if let Some((_, boid)) = model.simulation.agents().next() {
            let steering = &model.simulation.params.steering;
            let screen_pos = camera.world_to_screen(boid.position, window_rect);

            // Separation radius
            draw.ellipse()
                .xy(screen_pos)
                .radius(steering.desired_separation() * scale)
                .no_fill()
                .stroke(RED)
                .stroke_weight(1.0);

            // Alignment radius
            draw.ellipse()
                .xy(screen_pos)
                .radius(steering.neighbor_distance * scale)
                .no_fill()
                .stroke(GREEN)
                .stroke_weight(1.0);

            // Velocity vector
            draw.arrow()
                .start(screen_pos)
                .end(screen_pos + boid.velocity * scale)
                .color(YELLOW)
                .stroke_weight(2.0);
        }

        ui::draw_debug_info(&draw, &model.debug_info, window_rect);
    }

    if let Err(err) = draw.to_frame(app, &frame) {
        log::error!("failed to draw frame: {:?}", err);
    }

    if let Err(err) = model.egui.draw_to_frame(&frame) {
        log::error!("failed to draw ui: {:?}", err);
    }
}

// Draw one agent as a triangle pointing along its heading
fn draw_boid(draw: &Draw, boid: &Boid, camera: &Camera, window_rect: Rect) {
    let size = AGENT_SIZE * camera.scale(window_rect);
    let points = [
        pt2(size, 0.0),
        pt2(-size, size / 2.0),
        pt2(-size, -size / 2.0),
    ];

    draw.polygon()
        .color(rgb(0.2, 0.85, 0.35))
        .points(points)
        .xy(camera.world_to_screen(boid.position, window_rect))
        .rotate(boid.heading());
}
