//! 3D spatial hash for candidate pair enumeration.
//!
//! Positions are bucketed into cubic cells of the configured edge length.
//! Cell coordinates are reduced modulo 1024 (10 bits per axis) and packed
//! into one `u32` key: `[unused:2][x:10][y:10][z:10]`. The wrap can alias
//! far-apart cells into one bucket; aliased candidates are eliminated by the
//! exact distance check downstream, never by the grid itself.

use ahash::RandomState;
use nalgebra::Vector3;
use smallvec::SmallVec;
use std::collections::HashMap;

use crate::propagation::position_cache::PositionCache;

/// 13 positive neighbor offsets (half of the 26 neighbors). Checking half
/// the directions and letting every cell take its turn as "current" covers
/// the mirror half by symmetry, so no pair is emitted twice.
const HALF_NEIGHBOR_OFFSETS: [(i32, i32, i32); 13] = [
    (1, 0, 0),
    (0, 1, 0),
    (0, 0, 1),
    (1, 1, 0),
    (1, 0, 1),
    (0, 1, 1),
    (1, 1, 1),
    (1, -1, 0),
    (1, 0, -1),
    (0, 1, -1),
    (1, 1, -1),
    (1, -1, 1),
    (1, -1, -1),
];

/// Grid over one time step's object positions.
pub struct SpatialGrid {
    cells: HashMap<u32, SmallVec<[u32; 4]>, RandomState>,
}

impl SpatialGrid {
    /// Bucket positions into cells. `positions` yields `(dense index,
    /// position in km)`; callers skip entries that are invalid at the step.
    pub fn new<I>(cell_size_km: f64, positions: I) -> SpatialGrid
    where
        I: IntoIterator<Item = (u32, Vector3<f64>)>,
    {
        let mut cells: HashMap<u32, SmallVec<[u32; 4]>, RandomState> = HashMap::default();
        for (index, position) in positions {
            let key = cell_key(&position, cell_size_km);
            cells.entry(key).or_default().push(index);
        }
        SpatialGrid { cells }
    }

    /// Grid over all objects valid at `step` of the cache.
    pub fn at_step(cache: &PositionCache, step: usize, cell_size_km: f64) -> SpatialGrid {
        SpatialGrid::new(
            cell_size_km,
            (0..cache.num_objects()).filter_map(|obj| {
                cache
                    .is_valid(obj, step)
                    .then(|| (obj as u32, cache.position_km(obj, step)))
            }),
        )
    }

    /// Enumerate every unordered index pair that could be within one cell
    /// width. Each pair is produced exactly once; no ordering is guaranteed
    /// between the two indices of a cross-cell pair.
    pub fn for_each_candidate_pair<F>(&self, mut consumer: F)
    where
        F: FnMut(u32, u32),
    {
        for (&key, members) in &self.cells {
            // Same-cell pairs
            for i in 0..members.len() {
                for j in i + 1..members.len() {
                    consumer(members[i], members[j]);
                }
            }

            // Adjacent-cell pairs, half the neighbor directions
            let cx = ((key >> 20) & 0x3FF) as i32;
            let cy = ((key >> 10) & 0x3FF) as i32;
            let cz = (key & 0x3FF) as i32;

            for &(ox, oy, oz) in &HALF_NEIGHBOR_OFFSETS {
                let neighbor_key = pack_cell_key(cx + ox, cy + oy, cz + oz);
                let Some(neighbors) = self.cells.get(&neighbor_key) else {
                    continue;
                };
                for &a in members {
                    for &b in neighbors.iter() {
                        consumer(a, b);
                    }
                }
            }
        }
    }
}

fn cell_key(position: &Vector3<f64>, cell_size_km: f64) -> u32 {
    pack_cell_key(
        (position.x / cell_size_km).floor() as i32,
        (position.y / cell_size_km).floor() as i32,
        (position.z / cell_size_km).floor() as i32,
    )
}

/// Pack three cell coordinates, each masked to 10 bits, into a 32-bit key:
/// `[unused:2][x:10][y:10][z:10]`.
fn pack_cell_key(cx: i32, cy: i32, cz: i32) -> u32 {
    let mx = (cx as u32) & 0x3FF;
    let my = (cy as u32) & 0x3FF;
    let mz = (cz as u32) & 0x3FF;
    (mx << 20) | (my << 10) | mz
}
