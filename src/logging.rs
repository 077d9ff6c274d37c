use std::io::Write;

use colored::*;
use log::{Level, LevelFilter};

/// Initializes `env_logger` for the binary.
///
/// `level` (from `--log-level`) and the filters for noisy dependencies are
/// the defaults. When `RUST_LOG` is set its directives are applied on top
/// and win, so `RUST_LOG=reqwest=debug` or `RUST_LOG=trace` take effect.
pub fn init_logger(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let rust_log = std::env::var(env_logger::DEFAULT_FILTER_ENV).ok();
    logger_builder(level, rust_log.as_deref()).try_init()
}

fn logger_builder(level: LevelFilter, rust_log: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.filter_module("html5ever", LevelFilter::Error);
    builder.filter_module("selectors", LevelFilter::Warn);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("page_mirror", level);
    if let Some(directives) = rust_log {
        builder.parse_filters(directives);
    }

    builder.format(|buf, record| {
        let level = match record.level() {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN".yellow().bold(),
            Level::Info => "INFO".green(),
            Level::Debug => "DEBUG".blue(),
            Level::Trace => "TRACE".dimmed(),
        };
        writeln!(buf, "{} {}", level, record.args())
    });

    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Record;

    fn enabled(logger: &env_logger::Logger, target: &str, level: Level) -> bool {
        logger.matches(&Record::builder().target(target).level(level).build())
    }

    #[test]
    fn test_log_level_sets_defaults() {
        let logger = logger_builder(LevelFilter::Info, None).build();
        assert!(enabled(&logger, "page_mirror::mirror", Level::Info));
        assert!(!enabled(&logger, "page_mirror::mirror", Level::Debug));
        assert!(!enabled(&logger, "reqwest::connect", Level::Debug));
        assert!(!enabled(&logger, "html5ever::tree_builder", Level::Warn));
    }

    #[test]
    fn test_rust_log_directives_win() {
        let logger = logger_builder(LevelFilter::Warn, Some("reqwest=debug,page_mirror::fetcher=trace")).build();
        assert!(enabled(&logger, "reqwest::connect", Level::Debug));
        assert!(enabled(&logger, "page_mirror::fetcher", Level::Trace));
        assert!(!enabled(&logger, "page_mirror::mirror", Level::Info));
    }
}
