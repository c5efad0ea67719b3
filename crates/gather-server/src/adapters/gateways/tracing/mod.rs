mod logger;

pub use logger::{init_tracing, LogSettings, TracingLogger};
