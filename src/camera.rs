/*
 * Camera Module
 *
 * This module defines the Camera struct that maps the world onto the
 * window. The visible world always spans a fixed width; its height follows
 * the window's aspect ratio. Provides coordinate transformations between
 * world space and screen space and the world bounds the simulation steers
 * against.
 */

use nannou::prelude::*;

use crate::params::WorldBounds;

// The world is always centered on the window
pub struct Camera {
    pub world_width: f32,
}

impl Camera {
    pub fn new(world_width: f32) -> Self {
        Self { world_width }
    }

    // Screen pixels per world unit
    pub fn scale(&self, window_rect: Rect) -> f32 {
        if window_rect.w() > 0.0 {
            window_rect.w() / self.world_width
        } else {
            1.0
        }
    }

    // Convert a point from world space to screen space
    pub fn world_to_screen(&self, point: Vec2, window_rect: Rect) -> Vec2 {
        point * self.scale(window_rect) + window_rect.xy()
    }

    // Convert a point from screen space to world space
    pub fn screen_to_world(&self, point: Vec2, window_rect: Rect) -> Vec2 {
        (point - window_rect.xy()) / self.scale(window_rect)
    }

    pub fn world_bounds(&self, window_rect: Rect) -> WorldBounds {
        let aspect = if window_rect.h() > 0.0 {
            window_rect.w() / window_rect.h()
        } else {
            1.0
        };
        WorldBounds::from_viewport(self.world_width, aspect)
    }
}
