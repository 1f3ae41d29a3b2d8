/*
 * Debug Information Module
 *
 * This module defines the DebugInfo struct that contains performance metrics
 * and simulation statistics displayed in the UI.
 *
 * Includes metrics for:
 * - FPS (frames per second) and frame time
 * - Agent and chunk counts, agents per chunk
 * - The last simulation frame report
 */

use std::time::Duration;

use crate::physics::{FrameReport, Simulation};

// Debug information to display
#[derive(Debug, Clone, Default)]
pub struct DebugInfo {
    pub fps: f32,
    pub frame_time: Duration,
    pub agent_count: usize,
    pub chunk_count: usize,
    pub density: f32,
    pub last_frame: FrameReport,
}

impl DebugInfo {
    // Refresh the simulation statistics after a frame
    pub fn record(&mut self, simulation: &Simulation, report: Option<FrameReport>) {
        self.agent_count = simulation.agent_count();
        self.chunk_count = simulation.index().chunk_count();
        self.density = simulation.density();
        if let Some(report) = report {
            self.last_frame = report;
        }
    }

    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("FPS: {:.1}", self.fps),
            format!("Frame time: {:.2} ms", self.frame_time.as_secs_f64() * 1000.0),
            format!("Density: {:.2}", self.density),
            format!("Boid count: {}", self.agent_count),
            format!("Chunks: {}", self.chunk_count),
            format!("Collisions: {}", self.last_frame.collisions),
        ]
    }
}
