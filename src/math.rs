/*
 * Vector Math Module
 *
 * Small helpers on top of the glam vectors that nannou re-exports.
 * Every steering stage normalizes sums that can legitimately be zero
 * (no neighbors, velocity already equal to the target), so normalization
 * here never produces NaN.
 */

use nannou::prelude::*;

// Unit vector in the direction of `v`, or zero when `v` has no length
#[inline]
pub fn normalize_or_zero(v: Vec2) -> Vec2 {
    let length_squared = v.length_squared();
    if length_squared > 0.0 && length_squared.is_finite() {
        v / length_squared.sqrt()
    } else {
        Vec2::ZERO
    }
}

/// Vector projection of `a` onto the direction of `b`.
///
/// Projecting onto a zero vector yields zero.
#[inline]
pub fn project(a: Vec2, b: Vec2) -> Vec2 {
    let direction = normalize_or_zero(b);
    direction * a.dot(direction)
}

// Component of `a` perpendicular to `b`
#[inline]
pub fn reject(a: Vec2, b: Vec2) -> Vec2 {
    a - project(a, b)
}

#[inline]
pub fn manhattan(a: Vec2, b: Vec2) -> f32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

#[inline]
pub fn is_finite(v: Vec2) -> bool {
    v.x.is_finite() && v.y.is_finite()
}

// Angle of a velocity in radians, measured from +x (nannou's rotation convention)
#[inline]
pub fn heading_angle(velocity: Vec2) -> f32 {
    velocity.y.atan2(velocity.x)
}
