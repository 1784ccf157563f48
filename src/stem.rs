use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dbscan::Dbscan;
use crate::hull::{convex_hull, ring_perimeter};
use crate::point::Point;
use crate::point_cloud::PointCloud;
use crate::tree::TreePosition;

/// Parameters of the stem slicing procedure.
///
/// Measurement heights are `reference_height + i * measurement_interval` above the
/// tree foot for every `i` in `offset_indices`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StemParams {
    pub reference_height: f64,
    pub measurement_interval: f64,
    pub offset_indices: Vec<i32>,
    pub planar_radius: f64,
    /// Half height of the slab around each measurement height.
    pub slab_thickness: f64,
    pub cluster_eps: f64,
    pub cluster_min_samples: usize,
}

impl Default for StemParams {
    fn default() -> Self {
        Self {
            reference_height: 1.0,
            measurement_interval: 0.075,
            offset_indices: (-4..=2).collect(),
            planar_radius: 2.0,
            slab_thickness: 0.05,
            cluster_eps: 0.15,
            cluster_min_samples: 7,
        }
    }
}

impl StemParams {
    pub fn height_at(&self, offset_index: i32) -> f64 {
        self.reference_height + offset_index as f64 * self.measurement_interval
    }
}

/// Horizontal stem outline at one measurement height.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrossSection {
    pub label: String,
    pub offset_index: i32,
    /// Measurement height above the tree foot.
    pub height: f64,
    /// Hull vertices, counter-clockwise, each with its original z.
    pub boundary: Vec<Point>,
}

impl CrossSection {
    /// Length of the closed planar outline.
    pub fn perimeter(&self) -> f64 {
        let ring: Vec<[f64; 2]> = self.boundary.iter().map(|p| [p.x(), p.y()]).collect();
        ring_perimeter(&ring)
    }

    /// Diameter of the circle with the same perimeter.
    pub fn equivalent_diameter(&self) -> f64 {
        self.perimeter() / std::f64::consts::PI
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    NoPoints,
    NoCluster,
    Degenerate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoPoints => write!(f, "no points in slab"),
            SkipReason::NoCluster => write!(f, "no valid clusters"),
            SkipReason::Degenerate => write!(f, "fewer than three non-collinear inliers"),
        }
    }
}

/// Outcome for one measurement height.
#[derive(Clone, Debug, PartialEq)]
pub struct SliceOutcome {
    pub offset_index: i32,
    pub height: f64,
    pub section: Result<CrossSection, SkipReason>,
}

/// Cuts the stem around `tree` at every configured height, in `offset_indices` order.
pub fn extract(tree: &TreePosition, points: &PointCloud, params: &StemParams) -> Vec<SliceOutcome> {
    let near: Vec<&Point> = points
        .iter()
        .filter(|p| p.planar_distance(tree.x(), tree.y()) <= params.planar_radius)
        .collect();
    let dbscan = Dbscan::new(params.cluster_eps, params.cluster_min_samples);

    params
        .offset_indices
        .iter()
        .map(|&offset_index| {
            let height = params.height_at(offset_index);
            SliceOutcome {
                offset_index,
                height,
                section: slice_section(tree, &near, height, params.slab_thickness, &dbscan).map(
                    |boundary| CrossSection {
                        label: format!("{}_{}", tree.label, offset_index),
                        offset_index,
                        height,
                        boundary,
                    },
                ),
            }
        })
        .collect()
}

fn slice_section(
    tree: &TreePosition,
    near: &[&Point],
    height: f64,
    thickness: f64,
    dbscan: &Dbscan,
) -> Result<Vec<Point>, SkipReason> {
    let low = tree.z() + height - thickness;
    let high = tree.z() + height + thickness;
    let slab: Vec<&Point> = near
        .iter()
        .copied()
        .filter(|p| low <= p.z() && p.z() <= high)
        .collect();
    if slab.is_empty() {
        return Err(SkipReason::NoPoints);
    }

    let planar: Vec<[f64; 2]> = slab.iter().map(|p| [p.x(), p.y()]).collect();
    let clustering = dbscan.fit(&planar);
    let largest = clustering.largest_cluster().ok_or(SkipReason::NoCluster)?;

    let inliers: Vec<&Point> = clustering
        .members(largest)
        .into_iter()
        .map(|i| slab[i])
        .collect();
    if inliers.is_empty() {
        return Err(SkipReason::NoCluster);
    }

    let inlier_planar: Vec<[f64; 2]> = inliers.iter().map(|p| [p.x(), p.y()]).collect();
    let hull = convex_hull(&inlier_planar).ok_or(SkipReason::Degenerate)?;
    Ok(hull.into_iter().map(|i| *inliers[i]).collect())
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;
    use crate::hull::cross;

    fn tree() -> TreePosition {
        TreePosition::new("42", 100.0, 200.0, 50.0)
    }

    fn ring(n: usize, radius: f64, z: f64) -> Vec<Point> {
        (0..n)
            .map(|i| {
                let a = i as f64 * std::f64::consts::TAU / n as f64;
                Point::new(100.0 + radius * a.cos(), 200.0 + radius * a.sin(), z)
            })
            .collect()
    }

    fn single_height_params(min_samples: usize) -> StemParams {
        StemParams {
            offset_indices: vec![0],
            cluster_eps: 1.0,
            cluster_min_samples: min_samples,
            ..Default::default()
        }
    }

    #[test]
    fn default_heights_span_breast_height() {
        let params = StemParams::default();
        let heights: Vec<f64> = params
            .offset_indices
            .iter()
            .map(|&i| params.height_at(i))
            .collect();
        assert_eq!(heights.len(), 7);
        assert_approx_eq!(heights[0], 0.7);
        assert_approx_eq!(heights[4], 1.0);
        assert_approx_eq!(heights[6], 1.15);
    }

    #[test]
    fn ring_of_eight_gives_convex_cyclic_hull() {
        let cloud = PointCloud::new(ring(8, 1.0, 51.0));
        let outcomes = extract(&tree(), &cloud, &single_height_params(3));
        assert_eq!(outcomes.len(), 1);
        let section = outcomes[0].section.as_ref().unwrap();
        assert_eq!(section.label, "42_0");
        assert_eq!(section.boundary.len(), 8);

        // same points, same cyclic order as around the ring
        let input = ring(8, 1.0, 51.0);
        let start = input.iter().position(|p| *p == section.boundary[0]).unwrap();
        for (k, p) in section.boundary.iter().enumerate() {
            assert_eq!(*p, input[(start + k) % 8]);
        }

        let n = section.boundary.len();
        let signs: Vec<bool> = (0..n)
            .map(|k| {
                let a = &section.boundary[k];
                let b = &section.boundary[(k + 1) % n];
                let c = &section.boundary[(k + 2) % n];
                cross([a.x(), a.y()], [b.x(), b.y()], [c.x(), c.y()]) > 0.0
            })
            .collect();
        assert!(signs.iter().all(|s| *s == signs[0]));
    }

    #[test]
    fn hull_keeps_original_z() {
        let mut points = ring(8, 0.3, 51.0);
        for (i, p) in points.iter_mut().enumerate() {
            p.position.z += i as f64 * 0.001;
        }
        let cloud = PointCloud::new(points.clone());
        let outcomes = extract(&tree(), &cloud, &single_height_params(3));
        let section = outcomes[0].section.as_ref().unwrap();
        for p in &section.boundary {
            assert!(points.contains(p));
        }
        assert_approx_eq!(section.equivalent_diameter(), section.perimeter() / std::f64::consts::PI);
        assert!(section.equivalent_diameter() < 0.6);
    }

    #[test]
    fn fewer_than_three_inliers_is_degenerate_skip() {
        let cloud = PointCloud::new(vec![
            Point::new(100.1, 200.0, 51.0),
            Point::new(100.2, 200.0, 51.0),
        ]);
        let outcomes = extract(&tree(), &cloud, &single_height_params(2));
        assert_eq!(outcomes[0].section, Err(SkipReason::Degenerate));
    }

    #[test]
    fn collinear_inliers_are_degenerate_skip() {
        let cloud: PointCloud = (0..5)
            .map(|i| Point::new(100.0 + i as f64 * 0.1, 200.0, 51.0))
            .collect();
        let outcomes = extract(&tree(), &cloud, &single_height_params(2));
        assert_eq!(outcomes[0].section, Err(SkipReason::Degenerate));
    }

    #[test]
    fn empty_slab_and_noise_only_are_skips() {
        let cloud = PointCloud::new(ring(8, 1.0, 60.0));
        let outcomes = extract(&tree(), &cloud, &single_height_params(3));
        assert_eq!(outcomes[0].section, Err(SkipReason::NoPoints));

        let cloud = PointCloud::new(ring(8, 1.0, 51.0));
        let outcomes = extract(&tree(), &cloud, &single_height_params(20));
        assert_eq!(outcomes[0].section, Err(SkipReason::NoCluster));
    }

    #[test]
    fn points_outside_planar_radius_are_ignored() {
        let mut points = ring(8, 1.0, 51.0);
        points.extend(ring(8, 1.0, 51.0).into_iter().map(|p| {
            Point::new(p.x() + 10.0, p.y(), p.z())
        }));
        let cloud = PointCloud::new(points);
        let outcomes = extract(&tree(), &cloud, &single_height_params(3));
        let section = outcomes[0].section.as_ref().unwrap();
        assert!(section
            .boundary
            .iter()
            .all(|p| p.planar_distance(100.0, 200.0) <= 1.0 + 1e-9));
    }

    #[test]
    fn one_outcome_per_offset_in_order() {
        let mut points = ring(8, 0.15, 50.7);
        points.extend(ring(8, 0.15, 51.15));
        let cloud = PointCloud::new(points);
        let params = StemParams {
            cluster_min_samples: 3,
            ..Default::default()
        };
        let outcomes = extract(&tree(), &cloud, &params);
        let indices: Vec<i32> = outcomes.iter().map(|o| o.offset_index).collect();
        assert_eq!(indices, vec![-4, -3, -2, -1, 0, 1, 2]);
        assert!(outcomes[0].section.is_ok());
        assert_eq!(outcomes[1].section, Err(SkipReason::NoPoints));
        assert!(outcomes[6].section.is_ok());
        assert_eq!(outcomes[6].section.as_ref().unwrap().label, "42_2");
    }

    #[test]
    fn extraction_is_deterministic() {
        let cloud = PointCloud::new(ring(16, 0.25, 51.0));
        let params = single_height_params(3);
        assert_eq!(extract(&tree(), &cloud, &params), extract(&tree(), &cloud, &params));
    }
}
