use serde::{Deserialize, Serialize};

use crate::index::PointIndex;
use crate::point::Point;
use crate::point_cloud::PointCloud;
use crate::tree::TreePosition;

/// Apex selected for a tree and the height derived from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeightResult {
    pub label: String,
    pub tree: TreePosition,
    pub apex: Point,
    /// `apex.z - tree.z`, unclamped.
    pub height: f64,
}

/// Score of a canopy point as a tree top candidate.
///
/// NOTE: the vertical distance between tree foot and point is left out of the score.
/// Only the horizontal term penalises a candidate. Kept as is until it is settled
/// whether that is intended (apex expected above the stem) or a latent defect.
pub fn score(tree: &TreePosition, p: &Point) -> f64 {
    let horizontal = p.planar_distance(tree.x(), tree.y());
    p.z() - horizontal.exp()
}

/// Picks the best scoring canopy point within `radius` of the tree.
///
/// Returns `None` when no canopy point lies within the radius.
pub fn estimate(
    tree: &TreePosition,
    index: &PointIndex,
    points: &PointCloud,
    radius: f64,
) -> Option<HeightResult> {
    let candidates = index.query_radius([tree.x(), tree.y()], radius);

    // first occurrence wins on equal scores
    let mut best: Option<(f64, &Point)> = None;
    for p in candidates.iter().filter_map(|&i| points.get(i)) {
        let s = score(tree, p);
        if !s.is_finite() {
            continue;
        }
        match best {
            Some((b, _)) if s <= b => {}
            _ => best = Some((s, p)),
        }
    }

    best.map(|(_, apex)| HeightResult {
        label: tree.label.clone(),
        tree: tree.clone(),
        apex: *apex,
        height: apex.z() - tree.z(),
    })
}
