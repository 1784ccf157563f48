use std::path::Path;

use flexi_logger::{Duplicate, FileSpec, FlexiLoggerError, Logger, LoggerHandle};

/// Starts logging at `level` (e.g. `info`, `debug`, `lidar_tree_metrics=debug`).
///
/// Records go to stderr; when `log_dir` is given they are also kept in a log file
/// there. The returned handle must be held for the lifetime of the program.
pub fn setup_logging(level: &str, log_dir: Option<&Path>) -> Result<LoggerHandle, FlexiLoggerError> {
    let logger = Logger::try_with_str(level)?;
    match log_dir {
        Some(dir) => logger
            .log_to_file(FileSpec::default().directory(dir))
            .duplicate_to_stderr(Duplicate::All)
            .start(),
        None => logger.start(),
    }
}
