use std::fmt::Display;
use std::sync::Arc;

pub type SharedLogger = Arc<dyn Logger>;

/// Structured, chainable logger.
///
/// Messages are for humans; everything else goes into a named field.
pub trait Logger: Send + Sync {
    fn with_field(&self, key: &str, value: &dyn Display) -> SharedLogger;
    fn with_error(&self, err: &dyn std::error::Error) -> SharedLogger;

    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);

    /// True when nothing would be emitted, so callers can skip building fields
    fn is_disabled(&self) -> bool {
        false
    }
}

/// Logger that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NilLogger;

impl NilLogger {
    pub fn shared() -> SharedLogger {
        Arc::new(NilLogger)
    }
}

impl Logger for NilLogger {
    fn with_field(&self, _key: &str, _value: &dyn Display) -> SharedLogger {
        Arc::new(NilLogger)
    }

    fn with_error(&self, _err: &dyn std::error::Error) -> SharedLogger {
        Arc::new(NilLogger)
    }

    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, _message: &str) {}

    fn is_disabled(&self) -> bool {
        true
    }
}
