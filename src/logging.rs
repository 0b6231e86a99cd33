use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Tracing setup: human-readable console output plus a daily-rolling JSON
/// file under logs/. `RUST_LOG` overrides the default `gigbook=info` filter.
pub fn init_logging() {
    let _ = fs::create_dir_all("logs");

    let file_appender = tracing_appender::rolling::daily("logs", "gigbook.log");
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("gigbook=info".parse().unwrap()))
        .with(file_layer)
        .with(console_layer)
        .init();

    // The appender guard must live for the process or buffered lines are
    // lost on exit.
    std::mem::forget(_guard);
}
