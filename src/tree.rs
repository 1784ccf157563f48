use std::collections::HashSet;
use std::path::Path;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, MetricsResult};

/// A surveyed stem foot. `label` joins every artifact derived for the tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreePosition {
    pub label: String,
    pub position: Point3<f64>,
}

impl TreePosition {
    pub fn new(label: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            label: label.into(),
            position: Point3::new(x, y, z),
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
}

/// Survey exports write integer ids as floats (`75479826.0`); keep them integral.
fn normalize_label(raw: &str) -> String {
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        _ => raw.to_string(),
    }
}

/// Reads headerless `label,x,y,z` rows.
pub fn read_tree_positions(path: &Path) -> MetricsResult<Vec<TreePosition>> {
    if !path.exists() {
        return Err(MetricsError::InvalidInput(format!(
            "tree position file {} does not exist",
            path.display()
        )));
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut trees = vec![];
    let mut seen = HashSet::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() < 4 {
            return Err(MetricsError::InvalidInput(format!(
                "{}:{}: expected label,x,y,z",
                path.display(),
                row + 1
            )));
        }
        let coord = |i: usize| {
            record[i].parse::<f64>().map_err(|e| {
                MetricsError::InvalidInput(format!(
                    "{}:{}: invalid coordinate {:?}: {}",
                    path.display(),
                    row + 1,
                    &record[i],
                    e
                ))
            })
        };
        let label = normalize_label(&record[0]);
        if label.is_empty() || label == "." || label == ".." || label.contains(['/', '\\']) {
            return Err(MetricsError::InvalidInput(format!(
                "{}:{}: label {:?} cannot name an output folder",
                path.display(),
                row + 1,
                label
            )));
        }
        if !seen.insert(label.clone()) {
            return Err(MetricsError::InvalidInput(format!(
                "duplicate tree label {}",
                label
            )));
        }
        trees.push(TreePosition::new(label, coord(1)?, coord(2)?, coord(3)?));
    }

    if trees.is_empty() {
        return Err(MetricsError::InvalidInput(format!(
            "no tree positions in {}",
            path.display()
        )));
    }
    Ok(trees)
}
