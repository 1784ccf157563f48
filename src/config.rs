use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{MetricsError, MetricsResult};
use crate::stem::StemParams;

/// One of the per-tree analyses a run can perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Analysis {
    Height,
    Stem,
    Crown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightParams {
    /// Planar search radius around the tree foot (m).
    pub search_radius: f64,
}

impl Default for HeightParams {
    fn default() -> Self {
        Self { search_radius: 5.0 }
    }
}

/// Run configuration, read from a JSON file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Headerless `label,x,y,z` file.
    pub tree_positions: Option<PathBuf>,
    /// Canopy cloud used for heights.
    pub canopy_cloud: Option<PathBuf>,
    /// Stem cloud used for cross-sections.
    pub stem_cloud: Option<PathBuf>,
    /// GeoJSON crown polygons.
    pub crown_polygons: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// EPSG code written into every vector artifact.
    pub crs_epsg: u32,
    pub height: HeightParams,
    pub stem: StemParams,
    pub analyses: Vec<Analysis>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tree_positions: None,
            canopy_cloud: None,
            stem_cloud: None,
            crown_polygons: None,
            output_dir: PathBuf::from("outputs"),
            crs_epsg: 23700,
            height: HeightParams::default(),
            stem: StemParams::default(),
            analyses: vec![Analysis::Height, Analysis::Stem, Analysis::Crown],
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> MetricsResult<Self> {
        if !path.exists() {
            return Err(MetricsError::InvalidInput(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        let config: Config = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        Ok(config)
    }

    pub fn enabled(&self, analysis: Analysis) -> bool {
        self.analyses.contains(&analysis)
    }

    /// Checks parameter ranges and that every enabled analysis has its inputs.
    pub fn validate(&self) -> MetricsResult<()> {
        let invalid = |msg: String| -> MetricsResult<()> { Err(MetricsError::InvalidInput(msg)) };

        if self.analyses.is_empty() {
            return invalid("no analyses enabled".into());
        }
        if self.tree_positions.is_none() {
            return invalid("tree_positions is required".into());
        }
        let required = [
            (Analysis::Height, &self.canopy_cloud, "canopy_cloud"),
            (Analysis::Stem, &self.stem_cloud, "stem_cloud"),
            (Analysis::Crown, &self.crown_polygons, "crown_polygons"),
        ];
        for (analysis, input, name) in required {
            if self.enabled(analysis) && input.is_none() {
                return invalid(format!("{} is required for the {:?} analysis", name, analysis));
            }
        }

        if !positive(self.height.search_radius) {
            return invalid("height.search_radius must be positive".into());
        }
        let stem = &self.stem;
        if !positive(stem.planar_radius) {
            return invalid("stem.planar_radius must be positive".into());
        }
        if !positive(stem.slab_thickness) {
            return invalid("stem.slab_thickness must be positive".into());
        }
        if !positive(stem.cluster_eps) {
            return invalid("stem.cluster_eps must be positive".into());
        }
        if stem.cluster_min_samples == 0 {
            return invalid("stem.cluster_min_samples must be at least 1".into());
        }
        if stem.offset_indices.is_empty() {
            return invalid("stem.offset_indices must not be empty".into());
        }
        Ok(())
    }
}

/// False for zero, negatives and NaN.
fn positive(v: f64) -> bool {
    v > 0.0
}
