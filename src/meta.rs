use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Analysis;
use crate::error::MetricsResult;

/// Produced / skipped / failed tally for one artifact kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactCounts {
    pub produced: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// A tree whose processing hit an error for one analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeFailure {
    pub label: String,
    pub analysis: Analysis,
    pub message: String,
}

/// Summary of a processing run, written next to the per-tree outputs
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    version: String,
    pub trees: usize,
    pub heights: ArtifactCounts,
    pub cross_sections: ArtifactCounts,
    pub crowns: ArtifactCounts,
    pub failures: Vec<TreeFailure>,
}

impl RunSummary {
    pub fn new(trees: usize) -> RunSummary {
        RunSummary {
            version: env!("CARGO_PKG_VERSION").to_string(),
            trees,
            ..Default::default()
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn counts_mut(&mut self, analysis: Analysis) -> &mut ArtifactCounts {
        match analysis {
            Analysis::Height => &mut self.heights,
            Analysis::Stem => &mut self.cross_sections,
            Analysis::Crown => &mut self.crowns,
        }
    }

    pub fn record_failure(&mut self, label: &str, analysis: Analysis, message: String) {
        self.counts_mut(analysis).failed += 1;
        self.failures.push(TreeFailure {
            label: label.to_string(),
            analysis,
            message,
        });
    }

    pub fn write(&self, path: &Path) -> MetricsResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
