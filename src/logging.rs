use log::{LevelFilter, Log, Metadata, Record};

/// Environment variable read for the log level when none is given on the command line
pub const LOG_LEVEL_ENV: &str = "RUST_LOG";

/// Writes `[LEVEL target] message` lines to stderr
#[derive(Debug)]
pub struct StderrLogger {
    level: LevelFilter,
}

impl StderrLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    pub fn format_record(record: &Record) -> String {
        format!("[{} {}] {}", record.level(), record.target(), record.args())
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{}", Self::format_record(record));
        }
    }

    fn flush(&self) {}
}

/// Pick the log level from an explicit value, then `RUST_LOG`, then `Warn`.
///
/// Unparseable values fall back to `Warn`.
pub fn level_from(explicit: Option<&str>, env: Option<&str>) -> LevelFilter {
    explicit
        .or(env)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(LevelFilter::Warn)
}

/// Install the stderr logger as the global `log` backend
pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(StderrLogger::new(level)))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    fn metadata(level: Level) -> Metadata<'static> {
        Metadata::builder().level(level).target("avatar_rig").build()
    }

    #[test]
    fn filters_below_level() {
        let logger = StderrLogger::new(LevelFilter::Warn);
        assert!(logger.enabled(&metadata(Level::Error)));
        assert!(logger.enabled(&metadata(Level::Warn)));
        assert!(!logger.enabled(&metadata(Level::Info)));
        assert!(!StderrLogger::new(LevelFilter::Off).enabled(&metadata(Level::Error)));
    }

    #[test]
    fn level_precedence() {
        assert_eq!(level_from(None, None), LevelFilter::Warn);
        assert_eq!(level_from(None, Some("debug")), LevelFilter::Debug);
        assert_eq!(level_from(Some("info"), Some("debug")), LevelFilter::Info);
        assert_eq!(level_from(Some("loud"), None), LevelFilter::Warn);
    }

    #[test]
    fn record_line() {
        let line = StderrLogger::format_record(
            &Record::builder()
                .args(format_args!("Skipped {} controllers", 2))
                .level(Level::Warn)
                .target("avatar_rig::convert::rig")
                .build(),
        );
        assert_eq!(line, "[WARN avatar_rig::convert::rig] Skipped 2 controllers");
    }
}
