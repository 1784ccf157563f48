use thiserror::Error;

/// Errors raised by the metric extraction routines and their input loaders.
///
/// `InvalidInput` and the I/O flavoured variants abort a run. `NoResult` and
/// `GeometryDegenerate` are per-tree conditions: the driver records them as skips.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no result: {0}")]
    NoResult(String),
    #[error("degenerate geometry: {0}")]
    GeometryDegenerate(String),
    #[error("no crown polygons to match against")]
    NoPolygons,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Las(#[from] las::Error),
}

impl MetricsError {
    /// True for conditions that only skip the current tree.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            MetricsError::NoResult(_) | MetricsError::GeometryDegenerate(_)
        )
    }
}

pub type MetricsResult<T> = Result<T, MetricsError>;
