use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MetricsError, MetricsResult};

/// Per-tree measurement record as consumed by the viewer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurements {
    pub crown_diameter: f64,
    pub stem_diameter: Vec<f64>,
    pub height: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeRecord {
    pub measurements: Measurements,
}

impl TreeRecord {
    /// Fresh record with placeholder stem and height values.
    pub fn with_crown_diameter(crown_diameter: f64) -> Self {
        Self {
            measurements: Measurements {
                crown_diameter,
                stem_diameter: vec![],
                height: 0.0,
            },
        }
    }
}

/// Sets `measurements.crownDiameter` in the record at `path`.
///
/// An existing record keeps every other field untouched; a missing one is created.
pub fn update_crown_diameter(path: &Path, crown_diameter: f64) -> MetricsResult<Value> {
    let record = if path.exists() {
        let mut record: Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        let root = record.as_object_mut().ok_or_else(|| {
            MetricsError::InvalidInput(format!("{} is not a JSON object", path.display()))
        })?;
        let measurements = root
            .entry("measurements")
            .or_insert_with(|| Value::Object(Default::default()));
        let measurements = measurements.as_object_mut().ok_or_else(|| {
            MetricsError::InvalidInput(format!(
                "measurements in {} is not a JSON object",
                path.display()
            ))
        })?;
        measurements.insert("crownDiameter".into(), crown_diameter.into());
        record
    } else {
        serde_json::to_value(TreeRecord::with_crown_diameter(crown_diameter))?
    };

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &record)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(record)
}
