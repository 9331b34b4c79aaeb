use flexi_logger::{FileSpec, Logger, LoggerHandle, WriteMode};
use std::path::Path;

const LOG_BASENAME: &str = "relay-search";

/// Initialize logging. With a log directory, debug builds log to stdout +
/// file and release builds log at `level` to a rotated file. Without one,
/// logs go to stderr via env_logger.
///
/// The returned handle flushes the file writer on drop, so hold it until exit.
pub fn init(
    log_dir: Option<&Path>,
    level: &str,
) -> Result<Option<LoggerHandle>, Box<dyn std::error::Error>> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
                .try_init()?;
            return Ok(None);
        }
    };

    let file_spec = FileSpec::default()
        .directory(log_dir)
        .basename(LOG_BASENAME);

    let logger = if cfg!(debug_assertions) {
        Logger::try_with_env_or_str("debug")?
            .log_to_file(file_spec)
            .duplicate_to_stdout(flexi_logger::Duplicate::All)
    } else {
        Logger::try_with_str(level)?
            .log_to_file(file_spec)
            .rotate(
                flexi_logger::Criterion::Size(10_000_000), // 10MB
                flexi_logger::Naming::Numbers,
                flexi_logger::Cleanup::KeepLogFiles(3),
            )
    };

    let handle = logger.write_mode(WriteMode::BufferAndFlush).start()?;

    Ok(Some(handle))
}
