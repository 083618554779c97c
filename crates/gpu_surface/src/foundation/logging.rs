//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

use crate::core::config::LoggingConfig;

/// Initialize the logging system from `RUST_LOG`
///
/// Does nothing if a logger is already installed, so tests and embedders can
/// call it more than once. Returns false in that case.
pub fn init() -> bool {
    env_logger::try_init().is_ok()
}

/// Initialize the logging system with a configured default level
///
/// `RUST_LOG` still takes precedence over `config.level`. Returns false when a
/// logger was already installed.
pub fn init_with_config(config: &LoggingConfig) -> bool {
    let env = env_logger::Env::default().default_filter_or(config.level.as_str());
    let mut builder = env_logger::Builder::from_env(env);
    if config.show_thread_names {
        builder.format(|buf, record| {
            use std::io::Write;
            let thread = std::thread::current();
            writeln!(
                buf,
                "[{} {} {}] {}",
                record.level(),
                thread.name().unwrap_or("unnamed"),
                record.target(),
                record.args()
            )
        });
    }
    builder.try_init().is_ok()
}
