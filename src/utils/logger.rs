//! Logging utilities

use crate::{PairsTradingError, Result};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Initialize logging: console plus a daily rolling file.
///
/// `RUST_LOG` takes precedence over `log_level`. With `json` set the file
/// layer writes one JSON object per event.
pub fn init<P: AsRef<Path>>(log_level: &str, log_file: P, json: bool) -> Result<()> {
    let log_file = log_file.as_ref();
    let directory = log_file.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(directory)?;

    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        directory,
        log_file.file_name().unwrap_or(std::ffi::OsStr::new("pairs-bot.log")),
    );

    let console_layer = fmt::layer().with_target(true).with_line_number(true);

    let file_layer = if json {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(file_appender)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(file_appender)
            .boxed()
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| PairsTradingError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

/// Log a signal decision for a pair
#[macro_export]
macro_rules! log_signal {
    ($level:ident, $pair:expr, $zscore:expr, $signal:expr, $($field:tt)*) => {
        ::tracing::$level!(
            pair = %$pair,
            zscore = ?$zscore,
            signal = %$signal,
            $($field)*
        );
    };
}

/// Log an order leg with structured fields
#[macro_export]
macro_rules! log_leg {
    ($level:ident, $leg:expr, $symbol:expr, $side:expr, $size:expr, $($field:tt)*) => {
        ::tracing::$level!(
            leg = %$leg,
            symbol = %$symbol,
            side = %$side,
            size = %$size,
            $($field)*
        );
    };
}

/// Log a ledger change with structured fields
#[macro_export]
macro_rules! log_position {
    ($level:ident, $pair:expr, $position_type:expr, $($field:tt)*) => {
        ::tracing::$level!(
            pair = %$pair,
            position_type = %$position_type,
            $($field)*
        );
    };
}
