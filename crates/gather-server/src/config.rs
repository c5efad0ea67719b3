use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::gateways::{LogSettings, METADATA_BASE};
use crate::error::ServeError;
use crate::use_cases::metadata::DEFAULT_SECTIONS;

pub const DEFAULT_PORT_SPEC: &str = ":8080";
pub const DEFAULT_POETRY_DIR: &str = "poetry";

/// Command line options, with environment fallbacks where deployment
/// platforms set them.
#[derive(Debug, Clone, Parser)]
#[command(name = "gather-server", disable_version_flag = true)]
pub struct Config {
    /// Port to listen on for HTTP requests
    #[arg(long, env = "PORT", default_value = DEFAULT_PORT_SPEC)]
    pub port: String,

    /// Show version and exit
    #[arg(long)]
    pub version: bool,

    /// Poetry serving directory
    #[arg(long = "poetry.dir", env = "POETRY_DIR", default_value = DEFAULT_POETRY_DIR)]
    pub poetry_dir: PathBuf,

    /// Base URL the metadata sections are fetched relative to
    #[arg(long = "metadata.base", default_value = METADATA_BASE)]
    pub metadata_base: String,

    /// Deadline for gathering all metadata sections, in milliseconds
    #[arg(long = "metadata.timeout-ms", default_value_t = 3000)]
    pub metadata_timeout_ms: u64,

    /// Metadata section to gather; repeat for several
    #[arg(long = "metadata.section")]
    pub metadata_sections: Vec<String>,

    /// Serve this ECS metadata file instead of querying the metadata service
    #[arg(long = "metadata.file", env = "ECS_CONTAINER_METADATA_FILE")]
    pub metadata_file: Option<PathBuf>,

    /// Logging level
    #[arg(long = "log.level", default_value = "info")]
    pub log_level: String,

    /// Format logs into JSON
    #[arg(long = "log.json")]
    pub log_json: bool,

    /// Inhibit all logging
    #[arg(long = "log.no-local")]
    pub log_no_local: bool,
}

impl Config {
    /// Address to bind; `:8080` and `8080` both mean all interfaces
    pub fn listen_addr(&self) -> Result<SocketAddr, ServeError> {
        let spec = self.port.trim();
        let spec = if spec.is_empty() { DEFAULT_PORT_SPEC } else { spec };
        let spec = if spec.contains(':') {
            spec.to_string()
        } else {
            format!(":{spec}")
        };
        let spec = match spec.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}"),
            None => spec,
        };
        spec.parse()
            .map_err(|e| ServeError::ConfigurationError(format!("port {:?}: {e}", self.port)))
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    pub fn sections(&self) -> Vec<String> {
        if self.metadata_sections.is_empty() {
            DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect()
        } else {
            self.metadata_sections.clone()
        }
    }

    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            level: self.log_level.clone(),
            json: self.log_json,
            disabled: self.log_no_local,
        }
    }
}
