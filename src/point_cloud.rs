use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use las::{Read, Reader};
use log::{debug, info};

use crate::error::{MetricsError, MetricsResult};
use crate::point::Point;

/// Immutable set of survey points, loaded once per input file.
#[derive(Clone, Debug)]
pub struct PointCloud {
    points: Vec<Point>,
}

impl PointCloud {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Loads a cloud from `.las` or an ASCII `x y z` file (`.txt`, `.xyz`, `.csv`, `.asc`).
    pub fn from_path(path: &Path) -> MetricsResult<Self> {
        if !path.exists() {
            return Err(MetricsError::InvalidInput(format!(
                "point cloud {} does not exist",
                path.display()
            )));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let points = match extension.as_deref() {
            Some("las") => read_points_from_las(path)?,
            Some("txt") | Some("xyz") | Some("csv") | Some("asc") => read_points_from_txt(path)?,
            _ => {
                return Err(MetricsError::InvalidInput(format!(
                    "unsupported point cloud format: {}",
                    path.display()
                )))
            }
        };

        if points.is_empty() {
            return Err(MetricsError::InvalidInput(format!(
                "point cloud {} contains no points",
                path.display()
            )));
        }
        info!("loaded {} points from {}", points.len(), path.display());
        Ok(Self::new(points))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Point> {
        self.points.get(idx)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }
}

impl FromIterator<Point> for PointCloud {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn read_points_from_las(path: &Path) -> MetricsResult<Vec<Point>> {
    let mut reader = Reader::from_path(path)?;
    reader
        .points()
        .map(|p| p.map(|p| Point::new(p.x, p.y, p.z)).map_err(MetricsError::from))
        .collect()
}

pub fn read_points_from_txt(path: &Path) -> MetricsResult<Vec<Point>> {
    let reader = BufReader::new(File::open(path)?);
    let mut points = vec![];
    let mut rejected = 0usize;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match Point::try_parse(&line) {
            Ok(p) => points.push(p),
            Err(_) => rejected += 1,
        }
    }
    if rejected > 0 {
        debug!("skipped {} unparsable lines in {}", rejected, path.display());
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn reads_ascii_cloud_skipping_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.xyz");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "X Y Z").unwrap();
        writeln!(f, "1 2 3").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "4,5,6,128").unwrap();

        let cloud = PointCloud::from_path(&path).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.get(1), Some(&Point::new(4.0, 5.0, 6.0)));
    }

    #[test]
    fn reads_las_cloud() {
        use las::Write as _;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.las");
        {
            let mut writer = las::Writer::from_path(&path, Default::default()).unwrap();
            for (x, y, z) in [(1.5, 2.25, 100.125), (-3.0, 4.5, 101.75)] {
                writer
                    .write(las::Point {
                        x,
                        y,
                        z,
                        ..Default::default()
                    })
                    .unwrap();
            }
            writer.close().unwrap();
        }

        let cloud = PointCloud::from_path(&path).unwrap();
        assert_eq!(cloud.len(), 2);
        let p = cloud.get(1).unwrap();
        assert_approx_eq!(p.x(), -3.0, 1e-6);
        assert_approx_eq!(p.y(), 4.5, 1e-6);
        assert_approx_eq!(p.z(), 101.75, 1e-6);
    }

    #[test]
    fn laz_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.laz");
        File::create(&path).unwrap();
        let err = PointCloud::from_path(&path).unwrap_err();
        assert!(matches!(err, MetricsError::InvalidInput(_)));
    }

    #[test]
    fn missing_file_is_invalid_input() {
        let err = PointCloud::from_path(Path::new("/nonexistent/cloud.las")).unwrap_err();
        assert!(matches!(err, MetricsError::InvalidInput(_)));
    }

    #[test]
    fn empty_cloud_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        File::create(&path).unwrap();
        let err = PointCloud::from_path(&path).unwrap_err();
        assert!(matches!(err, MetricsError::InvalidInput(_)));
    }

    #[test]
    fn unsupported_extension_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.e57");
        File::create(&path).unwrap();
        let err = PointCloud::from_path(&path).unwrap_err();
        assert!(matches!(err, MetricsError::InvalidInput(_)));
    }
}
