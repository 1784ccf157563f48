use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, MetricsResult};

/// Point struct that holds a position in the projected CRS of the survey
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Point {
    pub position: Point3<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Point3::new(x, y, z),
        }
    }

    /// Parses `x y z [...]` from an ASCII point cloud line.
    /// Columns may be separated by whitespace or commas; trailing attributes are ignored.
    pub fn try_parse(line: &str) -> MetricsResult<Self> {
        let mut split = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty());
        match (split.next(), split.next(), split.next()) {
            (Some(x), Some(y), Some(z)) => {
                let parse = |s: &str| {
                    s.parse::<f64>().map_err(|e| {
                        MetricsError::InvalidInput(format!("invalid coordinate {:?}: {}", s, e))
                    })
                };
                Ok(Point::new(parse(x)?, parse(y)?, parse(z)?))
            }
            _ => Err(MetricsError::InvalidInput(format!(
                "invalid point format: {:?}",
                line
            ))),
        }
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn z(&self) -> f64 {
        self.position.z
    }

    /// Distance in the xy plane to `(x, y)`.
    pub fn planar_distance(&self, x: f64, y: f64) -> f64 {
        self.planar_distance_squared(x, y).sqrt()
    }

    pub fn planar_distance_squared(&self, x: f64, y: f64) -> f64 {
        let dx = self.position.x - x;
        let dy = self.position.y - y;
        dx * dx + dy * dy
    }
}

impl From<Point3<f64>> for Point {
    fn from(position: Point3<f64>) -> Self {
        Self { position }
    }
}
