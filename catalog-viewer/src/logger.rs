//! Logging setup
//!
//! Headless commands log to stderr. The interactive browser routes logs into
//! its in-screen panel instead, since stderr would tear the terminal UI.
//! Either way a daily rolling file is added when a log directory is set.

use std::path::Path;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Formatted lines on stderr
    Terminal,
    /// The TUI log panel
    Panel,
}

/// Install the global subscriber
///
/// `level` is an `EnvFilter` directive such as `info` or
/// `catalog_client=debug`; `RUST_LOG` wins when set.
pub fn init_logger(level: &str, log_dir: Option<&Path>, target: LogTarget) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "catalog-viewer");
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(appender)
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    let output_layer = match target {
        LogTarget::Terminal => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
        LogTarget::Panel => tui_logger::tracing_subscriber_layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output_layer)
        .with(file_layer)
        .try_init()?;

    // `log` records already reach the panel through the tracing bridge
    if target == LogTarget::Panel {
        tui_logger::set_default_level(panel_level(level));
    }

    Ok(())
}

/// Panel threshold for a filter directive; unknown directives show `info`
fn panel_level(level: &str) -> log::LevelFilter {
    level.parse().unwrap_or(log::LevelFilter::Info)
}
