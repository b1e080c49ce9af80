//! Tracing setup for the flora binary.

use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

/// Changes the level of an installed subscriber after startup, e.g. once the
/// config file has been read.
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    /// `RUST_LOG` was set and keeps precedence over later changes.
    from_env: bool,
}

impl LogHandle {
    /// Switch to `level` unless `RUST_LOG` chose the filter.
    pub fn set_default_level(&self, level: &str) {
        if self.from_env {
            return;
        }
        if let Err(e) = self.filter.reload(EnvFilter::new(level)) {
            tracing::warn!(error = %e, level, "could not change log level");
        }
    }
}

/// Initialize logging at the bootstrap `warn` level.
pub fn init() -> LogHandle {
    init_with_level("warn")
}

/// Initialize logging with a specific default level.
///
/// `RUST_LOG` still takes precedence when set. Output goes to stderr so it
/// never mixes with command output on stdout.
pub fn init_with_level(default_level: &str) -> LogHandle {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(default_level), false),
    };
    let (layer, handle) = reload::Layer::new(filter);

    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();

    LogHandle {
        filter: handle,
        from_env,
    }
}

#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
