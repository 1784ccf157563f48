use rstar::{primitives::GeomWithData, RTree};

use crate::error::{MetricsError, MetricsResult};
use crate::has_position::HasPosition;

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Planar radius lookup over an immutable point set.
///
/// Points are bulk loaded into an R*-tree keyed by their (x, y) coordinates; each
/// entry remembers its position in the input slice.
pub struct PointIndex {
    tree: RTree<IndexedPoint>,
}

impl PointIndex {
    pub fn build<P: HasPosition>(points: &[P]) -> MetricsResult<Self> {
        if points.is_empty() {
            return Err(MetricsError::InvalidInput(
                "cannot index an empty point set".into(),
            ));
        }
        let entries = points
            .iter()
            .enumerate()
            .map(|(i, p)| GeomWithData::new(p.planar(), i))
            .collect();
        Ok(Self {
            tree: RTree::bulk_load(entries),
        })
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Indices of every point whose planar distance to `center` is at most `radius`.
    ///
    /// Indices come back in ascending order, which is the candidate order callers
    /// rely on for tie-breaking.
    pub fn query_radius(&self, center: [f64; 2], radius: f64) -> Vec<usize> {
        if radius.is_nan() || radius < 0.0 {
            return vec![];
        }
        let mut found: Vec<usize> = self
            .tree
            .locate_within_distance(center, radius * radius)
            .map(|e| e.data)
            .collect();
        found.sort_unstable();
        found
    }
}
