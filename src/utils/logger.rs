//! Tracing subscriber setup for the scoring pipeline

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured level.
#[derive(Debug, Clone)]
pub struct Logger {
    level: String,
    initialized: bool,
}

impl Logger {
    pub fn new() -> Self {
        Self::with_level("info")
    }

    pub fn with_level(level: &str) -> Self {
        Self {
            level: level.to_string(),
            initialized: false,
        }
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    /// Returns false when another subscriber was already installed.
    pub fn init(&mut self) -> bool {
        if self.initialized {
            return true;
        }
        let installed = tracing_subscriber::fmt()
            .with_env_filter(self.filter())
            .with_target(false)
            .try_init()
            .is_ok();
        self.initialized = true;
        if installed {
            info!("Logger initialized with level: {}", self.level);
        }
        installed
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}
