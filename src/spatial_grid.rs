/*
 * Spatial Grid Module
 *
 * This module defines the SpatialIndex, an unbounded sparse uniform grid.
 * Each occupied cell is a Chunk holding the agents currently inside it.
 * Chunks are keyed by a Cantor pairing of their signed cell coordinates,
 * so the grid needs no fixed extent and no dense 2D array.
 *
 * Membership is maintained incrementally: an agent only moves between
 * chunks when its cell actually changes, which keeps the per-frame cost
 * proportional to the number of boundary crossings.
 */

use std::collections::HashMap;

use nannou::prelude::*;

use crate::boid::{AgentId, Boid};
use crate::error::SimulationError;

/// Signed integer coordinates of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    // Neighbor cell, or None past the edge of the i32 range
    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Option<CellCoord> {
        Some(CellCoord::new(self.x.checked_add(dx)?, self.y.checked_add(dy)?))
    }
}

/// Flat key of a chunk, a bijective image of its cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey(pub u128);

// Fold Z onto N: 0, -1, 1, -2, 2 ... -> 0, 1, 2, 3, 4 ...
#[inline]
pub fn map_to_positive(n: i32) -> u64 {
    let n = n as i64;
    if n >= 0 {
        (n * 2) as u64
    } else {
        (-n * 2 - 1) as u64
    }
}

#[inline]
fn map_to_signed(n: u64) -> i32 {
    if n % 2 == 0 {
        (n / 2) as i32
    } else {
        (-((n as i64 + 1) / 2)) as i32
    }
}

/// Cantor pairing of the folded coordinates.
///
/// Computed in `u128`, so every `i32` pair maps to a distinct key.
#[inline]
pub fn pair_key(cell: CellCoord) -> ChunkKey {
    let a = map_to_positive(cell.x) as u128;
    let b = map_to_positive(cell.y) as u128;
    ChunkKey((a + b) * (a + b + 1) / 2 + b)
}

/// Inverse of [`pair_key`].
pub fn unpair(key: ChunkKey) -> CellCoord {
    // w is the index of the diagonal the key sits on
    let z = key.0;
    let mut w = ((((8 * z + 1) as f64).sqrt() - 1.0) / 2.0) as u128;
    // Float sqrt can be off by one for large keys
    while w * (w + 1) / 2 > z {
        w -= 1;
    }
    while (w + 1) * (w + 2) / 2 <= z {
        w += 1;
    }
    let b = z - w * (w + 1) / 2;
    let a = w - b;
    CellCoord::new(map_to_signed(a as u64), map_to_signed(b as u64))
}

/// The agents currently inside one grid cell.
#[derive(Debug, Clone)]
pub struct Chunk {
    coord: CellCoord,
    members: Vec<AgentId>,
    idle_frames: u32,
}

impl Chunk {
    fn new(coord: CellCoord) -> Self {
        Self {
            coord,
            members: Vec::new(),
            idle_frames: 0,
        }
    }

    pub fn coord(&self) -> CellCoord {
        self.coord
    }

    pub fn members(&self) -> &[AgentId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.members.contains(&id)
    }

    fn insert(&mut self, id: AgentId) {
        self.members.push(id);
        self.idle_frames = 0;
    }

    fn remove(&mut self, id: AgentId) -> bool {
        match self.members.iter().position(|&member| member == id) {
            Some(slot) => {
                self.members.swap_remove(slot);
                true
            }
            None => false,
        }
    }

    /// World-space corners: origin, +x, +x+y, +y.
    pub fn corners(&self, chunk_size: f32) -> [Vec2; 4] {
        let origin = vec2(self.coord.x as f32, self.coord.y as f32) * chunk_size;
        [
            origin,
            origin + vec2(chunk_size, 0.0),
            origin + vec2(chunk_size, chunk_size),
            origin + vec2(0.0, chunk_size),
        ]
    }
}

pub struct SpatialIndex {
    chunk_size: f32,
    chunks: HashMap<ChunkKey, Chunk>,
}

impl SpatialIndex {
    pub fn new(chunk_size: f32) -> Result<Self, SimulationError> {
        if !(chunk_size.is_finite() && chunk_size > 0.0) {
            return Err(SimulationError::InvalidConfig("chunk_size must be finite and positive"));
        }

        Ok(Self {
            chunk_size,
            chunks: HashMap::new(),
        })
    }

    pub fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    // Convert world coordinates to grid cell coordinates
    #[inline]
    pub fn cell_of(&self, position: Vec2) -> Result<CellCoord, SimulationError> {
        let grid_x = (position.x / self.chunk_size).floor();
        let grid_y = (position.y / self.chunk_size).floor();

        // NaN fails both comparisons, so it is rejected here as well
        let in_range = |v: f32| v >= i32::MIN as f32 && v < i32::MAX as f32;
        if !(in_range(grid_x) && in_range(grid_y)) {
            return Err(SimulationError::CellOutOfRange(position));
        }

        Ok(CellCoord::new(grid_x as i32, grid_y as i32))
    }

    #[inline]
    pub fn chunk_at(&self, cell: CellCoord) -> Option<&Chunk> {
        self.chunks.get(&pair_key(cell))
    }

    pub fn chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        self.chunks.get(&key)
    }

    /// Move `boid` into the chunk matching its current position.
    ///
    /// Creates the target chunk on first use. Nothing changes when the agent
    /// is already registered in the right chunk.
    pub fn update_membership(&mut self, id: AgentId, boid: &mut Boid) -> Result<ChunkKey, SimulationError> {
        let cell = self.cell_of(boid.position)?;
        let key = pair_key(cell);

        if boid.chunk == Some(key) {
            return Ok(key);
        }

        // Leave the old chunk first
        if let Some(old_key) = boid.chunk.take() {
            if let Some(old_chunk) = self.chunks.get_mut(&old_key) {
                old_chunk.remove(id);
            }
        }

        self.chunks
            .entry(key)
            .or_insert_with(|| {
                log::trace!("creating chunk at ({}, {})", cell.x, cell.y);
                Chunk::new(cell)
            })
            .insert(id);
        boid.chunk = Some(key);

        Ok(key)
    }

    // Drop an agent from whatever chunk lists it
    pub fn remove(&mut self, id: AgentId, boid: &mut Boid) -> bool {
        match boid.chunk.take() {
            Some(key) => self
                .chunks
                .get_mut(&key)
                .map_or(false, |chunk| chunk.remove(id)),
            None => false,
        }
    }

    /// Agents in the 3x3 block of cells around `boid`'s chunk, `boid` included.
    pub fn neighbors_of<'a>(&'a self, boid: &Boid) -> impl Iterator<Item = AgentId> + 'a {
        let center = boid.chunk.and_then(|key| self.chunks.get(&key)).map(Chunk::coord);
        center
            .into_iter()
            .flat_map(move |cell| self.neighbors_around(cell, 1))
    }

    /// Agents in the `(2r+1)x(2r+1)` block of cells centered on `center`.
    pub fn neighbors_around<'a>(&'a self, center: CellCoord, radius: i32) -> impl Iterator<Item = AgentId> + 'a {
        let radius = radius.max(0);
        (-radius..=radius)
            .flat_map(move |dx| (-radius..=radius).filter_map(move |dy| center.offset(dx, dy)))
            .filter_map(move |cell| self.chunk_at(cell))
            .flat_map(|chunk| chunk.members().iter().copied())
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Average number of agents per non-empty chunk.
    pub fn density(&self) -> f32 {
        let (occupied, agents) = self
            .chunks
            .values()
            .filter(|chunk| !chunk.is_empty())
            .fold((0usize, 0usize), |(occupied, agents), chunk| (occupied + 1, agents + chunk.len()));

        if occupied == 0 {
            0.0
        } else {
            agents as f32 / occupied as f32
        }
    }

    /// Age empty chunks by one frame and evict those idle longer than `max_idle_frames`.
    pub fn evict_idle_chunks(&mut self, max_idle_frames: u32) -> usize {
        let before = self.chunks.len();

        self.chunks.retain(|_, chunk| {
            if chunk.is_empty() {
                chunk.idle_frames = chunk.idle_frames.saturating_add(1);
            } else {
                chunk.idle_frames = 0;
            }
            chunk.idle_frames <= max_idle_frames
        });

        let evicted = before - self.chunks.len();
        if evicted > 0 {
            log::debug!("evicted {} idle chunks, {} remain", evicted, self.chunks.len());
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}
