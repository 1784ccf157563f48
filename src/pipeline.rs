//! Per-tree driver: loads inputs once, runs the enabled analyses for every tree and
//! writes the artifacts.
//!
//! Trees are processed in parallel; outcomes are collected back in tree-file order
//! before anything is written, so outputs do not depend on scheduling.

use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};

use crate::config::{Analysis, Config};
use crate::crown::{match_crown, read_crown_polygons, CrownMatch, CrownPolygon};
use crate::error::{MetricsError, MetricsResult};
use crate::geojson::{Feature, FeatureCollection, Geometry};
use crate::height::{estimate, HeightResult};
use crate::index::PointIndex;
use crate::measurements::update_crown_diameter;
use crate::meta::{ArtifactCounts, RunSummary};
use crate::point::Point;
use crate::point_cloud::PointCloud;
use crate::report::{write_height_table, HeightRow};
use crate::stem::{extract, SliceOutcome};
use crate::tree::{read_tree_positions, TreePosition};

/// Result of one analysis for one tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Artifact<T> {
    Produced(T),
    /// Nothing to produce for this tree; not an error.
    Skipped(String),
    Failed(String),
    Disabled,
}

impl<T> From<MetricsResult<T>> for Artifact<T> {
    fn from(result: MetricsResult<T>) -> Self {
        match result {
            Ok(v) => Artifact::Produced(v),
            Err(e) if e.is_skip() => Artifact::Skipped(e.to_string()),
            Err(e) => Artifact::Failed(e.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TreeOutcome {
    pub tree: TreePosition,
    pub height: Artifact<HeightResult>,
    /// One entry per configured measurement height; empty when the analysis is disabled.
    pub slices: Vec<SliceOutcome>,
    pub crown: Artifact<CrownMatch>,
}

/// Everything loaded from disk for a run.
pub struct Inputs {
    pub trees: Vec<TreePosition>,
    pub canopy: Option<(PointCloud, PointIndex)>,
    pub stems: Option<PointCloud>,
    pub crowns: Option<Vec<CrownPolygon>>,
}

impl Inputs {
    /// Loads only the inputs the enabled analyses need. Any failure here aborts the run.
    pub fn load(config: &Config) -> MetricsResult<Self> {
        let trees_path = required(&config.tree_positions, "tree_positions")?;
        let trees = read_tree_positions(trees_path)?;
        info!("loaded {} tree positions from {}", trees.len(), trees_path.display());

        let canopy = if config.enabled(Analysis::Height) {
            let cloud = PointCloud::from_path(required(&config.canopy_cloud, "canopy_cloud")?)?;
            let index = PointIndex::build(cloud.points())?;
            Some((cloud, index))
        } else {
            None
        };
        let stems = if config.enabled(Analysis::Stem) {
            Some(PointCloud::from_path(required(&config.stem_cloud, "stem_cloud")?)?)
        } else {
            None
        };
        let crowns = if config.enabled(Analysis::Crown) {
            let path = required(&config.crown_polygons, "crown_polygons")?;
            let polygons = read_crown_polygons(path)?;
            info!("loaded {} crown polygons from {}", polygons.len(), path.display());
            Some(polygons)
        } else {
            None
        };

        Ok(Self {
            trees,
            canopy,
            stems,
            crowns,
        })
    }
}

fn required<'a>(path: &'a Option<PathBuf>, name: &str) -> MetricsResult<&'a Path> {
    path.as_deref()
        .ok_or_else(|| MetricsError::InvalidInput(format!("{} is not configured", name)))
}

/// Runs every enabled analysis for one tree. Pure: reads the shared inputs only.
pub fn process_tree(tree: &TreePosition, inputs: &Inputs, config: &Config) -> TreeOutcome {
    let height = match &inputs.canopy {
        Some((cloud, index)) => match estimate(tree, index, cloud, config.height.search_radius) {
            Some(result) => Artifact::Produced(result),
            None => Artifact::Skipped(format!(
                "no canopy points within {} m",
                config.height.search_radius
            )),
        },
        None => Artifact::Disabled,
    };

    let slices = match &inputs.stems {
        Some(cloud) => extract(tree, cloud, &config.stem),
        None => vec![],
    };

    let crown = match &inputs.crowns {
        Some(polygons) => match_crown(tree, polygons).into(),
        None => Artifact::Disabled,
    };

    TreeOutcome {
        tree: tree.clone(),
        height,
        slices,
        crown,
    }
}

/// Processes every tree, in parallel, returning outcomes in input order.
pub fn process_all(inputs: &Inputs, config: &Config) -> Vec<TreeOutcome> {
    inputs
        .trees
        .par_iter()
        .map(|tree| process_tree(tree, inputs, config))
        .collect()
}

pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> MetricsResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run(&self) -> MetricsResult<RunSummary> {
        let config = &self.config;
        let inputs = Inputs::load(config)?;
        create_dir_all(&config.output_dir)?;

        info!("processing {} trees", inputs.trees.len());
        let outcomes = process_all(&inputs, config);

        let mut summary = RunSummary::new(outcomes.len());
        let mut rows = vec![];
        for outcome in &outcomes {
            let writer = TreeWriter::new(&config.output_dir, &outcome.tree, config.crs_epsg);
            writer.write(outcome, &mut summary, &mut rows);
        }

        if config.enabled(Analysis::Height) {
            let path = config.output_dir.join("tree_heights.csv");
            write_height_table(&path, &rows)?;
            info!("height table written to {}", path.display());
        }
        summary.write(&config.output_dir.join("summary.json"))?;

        let c = |a: &ArtifactCounts| {
            format!("{} produced, {} skipped, {} failed", a.produced, a.skipped, a.failed)
        };
        info!("trees: {}", summary.trees);
        if config.enabled(Analysis::Height) {
            info!("heights: {}", c(&summary.heights));
        }
        if config.enabled(Analysis::Stem) {
            info!("cross-sections: {}", c(&summary.cross_sections));
        }
        if config.enabled(Analysis::Crown) {
            info!("crowns: {}", c(&summary.crowns));
        }
        Ok(summary)
    }
}

/// Writes the artifacts of one tree under `<output>/<label>/`.
struct TreeWriter<'a> {
    tree: &'a TreePosition,
    dir: PathBuf,
    epsg: u32,
}

impl<'a> TreeWriter<'a> {
    fn new(output_dir: &Path, tree: &'a TreePosition, epsg: u32) -> Self {
        Self {
            tree,
            dir: output_dir.join(&tree.label),
            epsg,
        }
    }

    fn path(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.tree.label, suffix))
    }

    fn write(&self, outcome: &TreeOutcome, summary: &mut RunSummary, rows: &mut Vec<HeightRow>) {
        let label = &self.tree.label;

        match &outcome.height {
            Artifact::Produced(result) => match self.write_height(result) {
                Ok(path) => {
                    summary.heights.produced += 1;
                    rows.push(HeightRow::from(result));
                    info!("height line for tree {} written to {}", label, path.display());
                }
                Err(e) => {
                    warn!("tree {}: writing height failed: {}", label, e);
                    summary.record_failure(label, Analysis::Height, e.to_string());
                }
            },
            Artifact::Skipped(reason) => {
                summary.heights.skipped += 1;
                warn!("tree {}: height skipped: {}", label, reason);
            }
            Artifact::Failed(message) => {
                warn!("tree {}: height failed: {}", label, message);
                summary.record_failure(label, Analysis::Height, message.clone());
            }
            Artifact::Disabled => {}
        }

        if !outcome.slices.is_empty() {
            for slice in &outcome.slices {
                match &slice.section {
                    Ok(_) => summary.cross_sections.produced += 1,
                    Err(reason) => {
                        summary.cross_sections.skipped += 1;
                        warn!(
                            "tree {}: no cross-section at {:.2}m: {}",
                            label, slice.height, reason
                        );
                    }
                }
            }
            match self.write_stems(&outcome.slices) {
                Ok(Some(path)) => {
                    info!("stem cross-sections for tree {} written to {}", label, path.display())
                }
                Ok(None) => warn!("tree {}: no valid cross-sections", label),
                Err(e) => {
                    warn!("tree {}: writing cross-sections failed: {}", label, e);
                    summary.record_failure(label, Analysis::Stem, e.to_string());
                }
            }
        }

        match &outcome.crown {
            Artifact::Produced(m) => match self.write_crown(m) {
                Ok(path) => {
                    summary.crowns.produced += 1;
                    info!(
                        "crown polygon {} for tree {} written to {} (diameter {:.2}m)",
                        m.polygon_index,
                        label,
                        path.display(),
                        m.diameter
                    );
                }
                Err(e) => {
                    warn!("tree {}: writing crown failed: {}", label, e);
                    summary.record_failure(label, Analysis::Crown, e.to_string());
                }
            },
            Artifact::Skipped(reason) => {
                summary.crowns.skipped += 1;
                warn!("tree {}: crown skipped: {}", label, reason);
            }
            Artifact::Failed(message) => {
                warn!("tree {}: crown failed: {}", label, message);
                summary.record_failure(label, Analysis::Crown, message.clone());
            }
            Artifact::Disabled => {}
        }
    }

    fn write_height(&self, result: &HeightResult) -> MetricsResult<PathBuf> {
        create_dir_all(&self.dir)?;
        let foot = Point::from(result.tree.position);
        let feature = Feature::new(Geometry::line_string_z(&[foot, result.apex]))
            .with_property("label", result.label.clone())
            .with_property("height", result.height);
        let path = self.path("_height.geojson");
        FeatureCollection::new(vec![feature], self.epsg).write(&path)?;
        Ok(path)
    }

    fn write_stems(&self, slices: &[SliceOutcome]) -> MetricsResult<Option<PathBuf>> {
        let features: Vec<Feature> = slices
            .iter()
            .filter_map(|s| s.section.as_ref().ok())
            .map(|section| {
                Feature::new(Geometry::line_string_z(&section.boundary))
                    .with_property("label", section.label.clone())
                    .with_property("height", section.height)
            })
            .collect();
        if features.is_empty() {
            return Ok(None);
        }
        debug!("tree {}: {} cross-sections", self.tree.label, features.len());
        create_dir_all(&self.dir)?;
        let path = self.path("_stem_diameters.geojson");
        FeatureCollection::new(features, self.epsg).write(&path)?;
        Ok(Some(path))
    }

    fn write_crown(&self, m: &CrownMatch) -> MetricsResult<PathBuf> {
        create_dir_all(&self.dir)?;
        let feature = Feature::new(Geometry::polygon_z(&m.boundary))
            .with_property("label", m.label.clone())
            .with_property("diameter", m.diameter);
        update_crown_diameter(&self.path("_measurements.json"), m.diameter)?;
        let path = self.path("_polygon.geojson");
        FeatureCollection::new(vec![feature], self.epsg).write(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> Inputs {
        let canopy = PointCloud::new(vec![
            Point::new(0.5, 0.0, 25.0),
            Point::new(100.0, 100.0, 30.0),
        ]);
        let index = PointIndex::build(canopy.points()).unwrap();
        Inputs {
            trees: vec![
                TreePosition::new("1", 0.0, 0.0, 5.0),
                TreePosition::new("2", 50.0, 50.0, 5.0),
            ],
            canopy: Some((canopy, index)),
            stems: None,
            crowns: Some(vec![CrownPolygon::new(
                vec![[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]],
                vec![],
            )]),
        }
    }

    #[test]
    fn missing_canopy_points_is_a_skip() {
        let inputs = inputs();
        let config = Config::default();
        let outcomes = process_all(&inputs, &config);
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(outcomes[0].height, Artifact::Produced(_)));
        assert!(matches!(outcomes[1].height, Artifact::Skipped(_)));
        assert!(outcomes[1].slices.is_empty());
    }

    #[test]
    fn outcomes_keep_tree_order() {
        let inputs = inputs();
        let outcomes = process_all(&inputs, &Config::default());
        let labels: Vec<&str> = outcomes.iter().map(|o| o.tree.label.as_str()).collect();
        assert_eq!(labels, vec!["1", "2"]);
    }

    #[test]
    fn every_tree_gets_a_crown() {
        let inputs = inputs();
        let outcomes = process_all(&inputs, &Config::default());
        for o in &outcomes {
            match &o.crown {
                Artifact::Produced(m) => assert_eq!(m.label, o.tree.label),
                other => panic!("unexpected crown outcome {:?}", other),
            }
        }
    }

    #[test]
    fn skip_errors_map_to_skipped() {
        let a: Artifact<()> = Err(MetricsError::GeometryDegenerate("x".into())).into();
        assert!(matches!(a, Artifact::Skipped(_)));
        let a: Artifact<()> = Err(MetricsError::NoPolygons).into();
        assert!(matches!(a, Artifact::Failed(_)));
    }
}
