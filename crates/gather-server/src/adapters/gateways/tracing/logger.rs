use std::fmt::{Display, Write as _};
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::error::ServeError;
use crate::use_cases::ports::{Logger, NilLogger, SharedLogger};

/// How the process-wide subscriber is set up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is not set, e.g. `info`
    pub level: String,
    pub json: bool,
    /// Emit nothing at all
    pub disabled: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            disabled: false,
        }
    }
}

/// Install the global subscriber and return the matching logger.
///
/// Priority: `RUST_LOG` > `settings.level`.
pub fn init_tracing(settings: &LogSettings) -> Result<SharedLogger, ServeError> {
    if settings.disabled {
        return Ok(NilLogger::shared());
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| ServeError::ConfigurationError(format!("log level: {e}")))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if settings.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    installed.map_err(|e| ServeError::ConfigurationError(e.to_string()))?;

    Ok(Arc::new(TracingLogger::new()))
}

/// [`Logger`] that emits through `tracing`.
///
/// Accumulated fields are rendered into a single `fields` value since tracing
/// field names are fixed at compile time.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    fields: Vec<(String, String)>,
}

impl TracingLogger {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    fn with(&self, key: &str, value: String) -> SharedLogger {
        let mut fields = self.fields.clone();
        fields.push((key.to_string(), value));
        Arc::new(Self { fields })
    }

    fn rendered(&self) -> String {
        let mut out = String::new();
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            if value.contains(char::is_whitespace) || value.is_empty() {
                let _ = write!(out, "{key}={value:?}");
            } else {
                let _ = write!(out, "{key}={value}");
            }
        }
        out
    }
}

impl Logger for TracingLogger {
    fn with_field(&self, key: &str, value: &dyn Display) -> SharedLogger {
        self.with(key, value.to_string())
    }

    fn with_error(&self, err: &dyn std::error::Error) -> SharedLogger {
        self.with("error", err.to_string())
    }

    fn debug(&self, message: &str) {
        tracing::debug!(fields = %self.rendered(), "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(fields = %self.rendered(), "{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!(fields = %self.rendered(), "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(fields = %self.rendered(), "{message}");
    }
}
