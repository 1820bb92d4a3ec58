//! Id-mapped approximate-nearest-neighbor index
//!
//! Wraps an HNSW graph so arbitrary database row ids (i64) can be used as
//! search labels. The index is derived state: it is rebuilt from the
//! relational store and never persisted.

use hnsw_rs::prelude::{DistL2, Hnsw};

use crate::vector::VECTOR_DIM;

const HNSW_MAX_NB_CONNECTION: usize = 32;
const HNSW_EF_CONSTRUCTION: usize = 100;
const HNSW_MAX_LAYER: usize = 16;

/// Floor for the search-time `ef` parameter; small k with a tiny `ef`
/// degrades recall badly on HNSW graphs.
const HNSW_EF_SEARCH_FLOOR: usize = 64;

/// One nearest-neighbor hit: database row id and L2 distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnHit {
    pub id: i64,
    pub distance: f32,
}

/// In-memory ANN index mapping row ids to vectors
pub struct AnnIndex {
    hnsw: Hnsw<'static, f32, DistL2>,
    /// Slot -> row id. The HNSW graph is addressed by dense slot numbers;
    /// this is the id-map layer.
    ids: Vec<i64>,
}

impl AnnIndex {
    /// Create an empty index sized for roughly `capacity` vectors
    pub fn new(capacity: usize) -> Self {
        let hnsw = Hnsw::new(
            HNSW_MAX_NB_CONNECTION,
            capacity.max(16),
            HNSW_MAX_LAYER,
            HNSW_EF_CONSTRUCTION,
            DistL2 {},
        );
        Self {
            hnsw,
            ids: Vec::with_capacity(capacity),
        }
    }

    /// Insert a vector under a row id
    ///
    /// The caller is responsible for dimensionality; the store validates
    /// before anything reaches the index.
    pub fn insert(&mut self, id: i64, vector: &[f32]) {
        debug_assert_eq!(vector.len(), VECTOR_DIM);
        let slot = self.ids.len();
        self.ids.push(id);
        self.hnsw.insert_slice((vector, slot));
    }

    /// Number of indexed vectors
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the index holds no vectors
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Return up to `min(k, len)` nearest neighbors, ascending by distance
    ///
    /// Labels that do not map back to a known slot are dropped rather than
    /// surfaced.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<AnnHit> {
        let k = k.min(self.ids.len());
        if k == 0 {
            return Vec::new();
        }
        let ef = k.max(HNSW_EF_SEARCH_FLOOR);
        let mut hits: Vec<AnnHit> = self
            .hnsw
            .search(query, k, ef)
            .into_iter()
            .filter_map(|neighbour| {
                self.ids.get(neighbour.d_id).map(|&id| AnnHit {
                    id,
                    distance: neighbour.distance,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_vector(hot: usize) -> Vec<f32> {
        let mut v = vec![0.0_f32; VECTOR_DIM];
        v[hot] = 1.0;
        v
    }

    #[test]
    fn empty_index_returns_no_hits() {
        let index = AnnIndex::new(0);
        assert!(index.is_empty());
        assert!(index.search(&unit_vector(0), 5).is_empty());
    }

    #[test]
    fn search_is_bounded_by_index_size() {
        let mut index = AnnIndex::new(4);
        index.insert(101, &unit_vector(0));
        index.insert(202, &unit_vector(1));
        let hits = index.search(&unit_vector(0), 10);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn nearest_hit_carries_the_mapped_row_id() {
        let mut index = AnnIndex::new(8);
        for (row_id, hot) in [(11_i64, 0_usize), (22, 5), (33, 9)] {
            index.insert(row_id, &unit_vector(hot));
        }
        let hits = index.search(&unit_vector(5), 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 22);
        assert!(hits[0].distance < 0.1);
    }

    #[test]
    fn results_are_ascending_in_distance() {
        let mut index = AnnIndex::new(8);
        for (row_id, hot) in [(1_i64, 0_usize), (2, 1), (3, 2), (4, 3)] {
            index.insert(row_id, &unit_vector(hot));
        }
        let hits = index.search(&unit_vector(0), 4);
        for pair in hits.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
        assert_eq!(hits[0].id, 1);
    }
}
