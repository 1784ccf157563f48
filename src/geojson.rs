//! Minimal GeoJSON model used for crown polygon input and per-tree vector artifacts.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::MetricsResult;
use crate::point::Point;

pub type Position = Vec<f64>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
}

impl Geometry {
    pub fn line_string_z(points: &[Point]) -> Self {
        Geometry::LineString {
            coordinates: points.iter().map(position_z).collect(),
        }
    }

    /// Single ring polygon; the ring is closed if its ends differ.
    pub fn polygon_z(ring: &[Point]) -> Self {
        let mut coordinates: Vec<Position> = ring.iter().map(position_z).collect();
        if let (Some(first), Some(last)) = (coordinates.first(), coordinates.last()) {
            if first != last {
                coordinates.push(first.clone());
            }
        }
        Geometry::Polygon {
            coordinates: vec![coordinates],
        }
    }
}

fn position_z(p: &Point) -> Position {
    vec![p.x(), p.y(), p.z()]
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
    pub geometry: Option<Geometry>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            kind: "Feature".into(),
            properties: Some(Map::new()),
            geometry: Some(geometry),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Value>,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Collection tagged with a named EPSG CRS member.
    pub fn new(features: Vec<Feature>, epsg: u32) -> Self {
        Self {
            kind: "FeatureCollection".into(),
            crs: Some(json!({
                "type": "name",
                "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", epsg) }
            })),
            features,
        }
    }

    pub fn read(path: &Path) -> MetricsResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn write(&self, path: &Path) -> MetricsResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
