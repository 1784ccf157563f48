use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MetricsResult;
use crate::height::HeightResult;

/// One line of `tree_heights.csv`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeightRow {
    pub label: String,
    pub tree_x: f64,
    pub tree_y: f64,
    pub tree_z: f64,
    pub grid_x: f64,
    pub grid_y: f64,
    pub grid_z: f64,
    pub height: f64,
}

impl From<&HeightResult> for HeightRow {
    fn from(r: &HeightResult) -> Self {
        Self {
            label: r.label.clone(),
            tree_x: r.tree.x(),
            tree_y: r.tree.y(),
            tree_z: r.tree.z(),
            grid_x: r.apex.x(),
            grid_y: r.apex.y(),
            grid_z: r.apex.z(),
            height: r.height,
        }
    }
}

/// Writes the aggregate height table. The header is written even without rows.
pub fn write_height_table(path: &Path, rows: &[HeightRow]) -> MetricsResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record([
        "label", "tree_x", "tree_y", "tree_z", "grid_x", "grid_y", "grid_z", "height",
    ])?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
