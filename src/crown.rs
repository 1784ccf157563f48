use std::path::Path;

use geo::{Coord, EuclideanDistance, EuclideanLength, Intersects, LineString, Polygon};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, MetricsResult};
use crate::geojson::{FeatureCollection, Geometry, Position};
use crate::point::Point;
use crate::tree::TreePosition;

/// Crown outline in plan view, optionally carrying a z per exterior vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct CrownPolygon {
    planar: Polygon<f64>,
    /// One z per exterior coordinate of `planar`, closing vertex included.
    exterior_z: Option<Vec<f64>>,
}

impl CrownPolygon {
    pub fn new(exterior: Vec<[f64; 2]>, interiors: Vec<Vec<[f64; 2]>>) -> Self {
        Self {
            planar: Polygon::new(
                ring(exterior.into_iter()),
                interiors.into_iter().map(|r| ring(r.into_iter())).collect(),
            ),
            exterior_z: None,
        }
    }

    pub fn with_z(exterior: Vec<[f64; 3]>, interiors: Vec<Vec<[f64; 2]>>) -> Self {
        let mut z: Vec<f64> = exterior.iter().map(|c| c[2]).collect();
        let planar = Polygon::new(
            ring(exterior.iter().map(|c| [c[0], c[1]])),
            interiors.into_iter().map(|r| ring(r.into_iter())).collect(),
        );
        // geo closes open rings by repeating the first coordinate
        let closed_len = planar.exterior().0.len();
        if z.len() + 1 == closed_len {
            if let Some(first) = z.first().copied() {
                z.push(first);
            }
        }
        Self {
            planar,
            exterior_z: (z.len() == closed_len).then_some(z),
        }
    }

    pub fn planar(&self) -> &Polygon<f64> {
        &self.planar
    }

    pub fn has_z(&self) -> bool {
        self.exterior_z.is_some()
    }

    /// Planar length of the exterior ring.
    pub fn perimeter(&self) -> f64 {
        self.planar.exterior().euclidean_length()
    }

    /// Exterior ring in 3D, filling in `fallback_z` when the polygon has no z.
    pub fn exterior_3d(&self, fallback_z: f64) -> Vec<Point> {
        self.planar
            .exterior()
            .coords()
            .enumerate()
            .map(|(i, c)| {
                let z = self
                    .exterior_z
                    .as_ref()
                    .and_then(|z| z.get(i).copied())
                    .unwrap_or(fallback_z);
                Point::new(c.x, c.y, z)
            })
            .collect()
    }
}

fn ring(coords: impl Iterator<Item = [f64; 2]>) -> LineString<f64> {
    LineString::new(coords.map(|[x, y]| Coord { x, y }).collect())
}

/// The crown chosen for a tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrownMatch {
    pub label: String,
    /// Position of the chosen polygon in the input set.
    pub polygon_index: usize,
    /// Whether the tree lies inside (or on) the polygon rather than nearest to it.
    pub contains_tree: bool,
    /// Closed exterior ring in 3D.
    pub boundary: Vec<Point>,
    /// Perimeter / π, the diameter of the circle with the same perimeter.
    pub diameter: f64,
}

/// Associates `tree` with the first polygon covering it, or failing that the nearest one.
pub fn match_crown(tree: &TreePosition, polygons: &[CrownPolygon]) -> MetricsResult<CrownMatch> {
    if polygons.is_empty() {
        return Err(MetricsError::NoPolygons);
    }
    let location = geo::Point::new(tree.x(), tree.y());

    let (polygon_index, contains_tree) =
        match polygons.iter().position(|p| location.intersects(p.planar())) {
            Some(i) => (i, true),
            None => (nearest(&location, polygons), false),
        };
    let chosen = &polygons[polygon_index];

    let perimeter = chosen.perimeter();
    if perimeter.is_nan() || perimeter <= 0.0 {
        return Err(MetricsError::GeometryDegenerate(format!(
            "crown polygon {} matched to tree {} has a zero-length boundary",
            polygon_index, tree.label
        )));
    }

    Ok(CrownMatch {
        label: tree.label.clone(),
        polygon_index,
        contains_tree,
        boundary: chosen.exterior_3d(tree.z()),
        diameter: perimeter / std::f64::consts::PI,
    })
}

/// Index of the polygon with the smallest planar distance, first one on ties.
fn nearest(location: &geo::Point<f64>, polygons: &[CrownPolygon]) -> usize {
    let mut best = (0, f64::INFINITY);
    for (i, polygon) in polygons.iter().enumerate() {
        let d = location.euclidean_distance(polygon.planar());
        if d < best.1 {
            best = (i, d);
        }
    }
    best.0
}

/// Loads crown polygons from a GeoJSON feature collection.
///
/// Each `Polygon` feature yields one crown and each `MultiPolygon` feature one crown
/// per part, in file order. Other geometry types are skipped.
pub fn read_crown_polygons(path: &Path) -> MetricsResult<Vec<CrownPolygon>> {
    if !path.exists() {
        return Err(MetricsError::InvalidInput(format!(
            "crown polygon file {} does not exist",
            path.display()
        )));
    }
    let collection = FeatureCollection::read(path)?;

    let mut polygons = vec![];
    for (i, feature) in collection.features.iter().enumerate() {
        match &feature.geometry {
            Some(Geometry::Polygon { coordinates }) => {
                polygons.extend(crown_from_rings(coordinates));
            }
            Some(Geometry::MultiPolygon { coordinates }) => {
                polygons.extend(coordinates.iter().filter_map(|rings| crown_from_rings(rings)));
            }
            _ => warn!("feature {} in {} is not a polygon, skipped", i, path.display()),
        }
    }

    if polygons.is_empty() {
        return Err(MetricsError::InvalidInput(format!(
            "no crown polygons in {}",
            path.display()
        )));
    }
    Ok(polygons)
}

fn crown_from_rings(rings: &[Vec<Position>]) -> Option<CrownPolygon> {
    let (exterior, interiors) = rings.split_first()?;
    let interiors: Vec<Vec<[f64; 2]>> = interiors
        .iter()
        .map(|r| r.iter().filter(|p| p.len() >= 2).map(|p| [p[0], p[1]]).collect())
        .collect();
    if exterior.iter().any(|p| p.len() < 2) {
        return None;
    }
    if !exterior.is_empty() && exterior.iter().all(|p| p.len() >= 3) {
        Some(CrownPolygon::with_z(
            exterior.iter().map(|p| [p[0], p[1], p[2]]).collect(),
            interiors,
        ))
    } else {
        Some(CrownPolygon::new(
            exterior.iter().map(|p| [p[0], p[1]]).collect(),
            interiors,
        ))
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    fn square(x0: f64, y0: f64, side: f64) -> CrownPolygon {
        CrownPolygon::new(
            vec![
                [x0, y0],
                [x0 + side, y0],
                [x0 + side, y0 + side],
                [x0, y0 + side],
            ],
            vec![],
        )
    }

    #[test]
    fn empty_set_is_an_error() {
        let tree = TreePosition::new("1", 0.0, 0.0, 0.0);
        assert!(matches!(
            match_crown(&tree, &[]),
            Err(MetricsError::NoPolygons)
        ));
    }

    #[test]
    fn containing_polygon_with_perimeter_diameter() {
        let polygons = vec![square(-10.0, -10.0, 3.0), square(0.0, 0.0, 4.0)];
        let tree = TreePosition::new("7", 1.5, 2.5, 120.0);
        let m = match_crown(&tree, &polygons).unwrap();
        assert_eq!(m.polygon_index, 1);
        assert!(m.contains_tree);
        assert!((m.diameter - 16.0 / std::f64::consts::PI).abs() < 1e-9);
        assert_eq!(m.boundary.len(), 5);
        assert!(m.boundary.iter().all(|p| p.z() == 120.0));
    }

    #[test]
    fn overlapping_polygons_pick_first() {
        let polygons = vec![square(0.0, 0.0, 4.0), square(1.0, 1.0, 4.0)];
        let tree = TreePosition::new("7", 2.0, 2.0, 0.0);
        assert_eq!(match_crown(&tree, &polygons).unwrap().polygon_index, 0);
    }

    #[test]
    fn boundary_point_counts_as_contained() {
        let polygons = vec![square(0.0, 0.0, 4.0)];
        let tree = TreePosition::new("7", 4.0, 2.0, 0.0);
        assert!(match_crown(&tree, &polygons).unwrap().contains_tree);
    }

    #[test]
    fn outside_tree_gets_nearest_polygon() {
        // far square 5.0 to the left, near square 2.0 to the right
        let polygons = vec![square(-9.0, -1.0, 4.0), square(2.0, -1.0, 2.0)];
        let tree = TreePosition::new("3", 0.0, 0.0, 10.0);
        let m = match_crown(&tree, &polygons).unwrap();
        assert_eq!(m.polygon_index, 1);
        assert!(!m.contains_tree);
        assert_approx_eq!(
            geo::Point::new(0.0, 0.0).euclidean_distance(polygons[1].planar()),
            2.0
        );
        assert_approx_eq!(
            geo::Point::new(0.0, 0.0).euclidean_distance(polygons[0].planar()),
            5.0
        );
    }

    #[test]
    fn equidistant_polygons_pick_first() {
        let polygons = vec![square(2.0, -1.0, 2.0), square(-4.0, -1.0, 2.0)];
        let tree = TreePosition::new("3", 0.0, 0.0, 10.0);
        assert_eq!(match_crown(&tree, &polygons).unwrap().polygon_index, 0);
    }

    #[test]
    fn polygon_z_is_kept() {
        let polygon = CrownPolygon::with_z(
            vec![[0.0, 0.0, 5.0], [2.0, 0.0, 6.0], [2.0, 2.0, 7.0], [0.0, 2.0, 8.0]],
            vec![],
        );
        assert!(polygon.has_z());
        let tree = TreePosition::new("1", 1.0, 1.0, 100.0);
        let m = match_crown(&tree, &[polygon]).unwrap();
        let z: Vec<f64> = m.boundary.iter().map(|p| p.z()).collect();
        assert_eq!(z, vec![5.0, 6.0, 7.0, 8.0, 5.0]);
    }

    #[test]
    fn zero_length_boundary_is_degenerate() {
        let polygon = CrownPolygon::new(vec![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]], vec![]);
        let tree = TreePosition::new("1", 5.0, 5.0, 0.0);
        assert!(matches!(
            match_crown(&tree, &[polygon]),
            Err(MetricsError::GeometryDegenerate(_))
        ));
    }

    #[test]
    fn reads_polygons_and_multipolygon_parts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crowns.geojson");
        std::fs::write(
            &path,
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{},"geometry":{"type":"Polygon",
                 "coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}},
                {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[5,5]}},
                {"type":"Feature","properties":{},"geometry":{"type":"MultiPolygon",
                 "coordinates":[[[[2,2,9],[3,2,9],[3,3,9],[2,2,9]]],[[[4,4],[5,4],[5,5],[4,4]]]]}}
            ]}"#,
        )
        .unwrap();
        let polygons = read_crown_polygons(&path).unwrap();
        assert_eq!(polygons.len(), 3);
        assert!(!polygons[0].has_z());
        assert!(polygons[1].has_z());
        assert!(!polygons[2].has_z());
    }
}
