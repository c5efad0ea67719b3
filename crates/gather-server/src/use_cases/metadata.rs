use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::entities::{CollectionResult, Deadline, FetchOutcome};
use crate::use_cases::gather::ParallelCollector;
use crate::use_cases::ports::{Fetcher, Logger, NilLogger, SharedLogger};
use crate::use_cases::render;

pub const DEFAULT_GATHER_TIMEOUT: Duration = Duration::from_secs(3);

pub const DEFAULT_SECTIONS: [&str; 3] = ["hostname", "placement/availability-zone", "iam/info"];

const PAGE_TITLE: &str = "AWS Info Dumper";

/// Everything the metadata page needs, shared by all requests
#[derive(Clone)]
pub struct AppContext {
    pub fetcher: Arc<dyn Fetcher<String>>,
    pub sections: Arc<Vec<String>>,
    pub gather_timeout: Duration,
    pub metadata_file: Option<PathBuf>,
    pub logger: SharedLogger,
}

impl AppContext {
    pub fn new(fetcher: Arc<dyn Fetcher<String>>) -> Self {
        Self {
            fetcher,
            sections: Arc::new(DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect()),
            gather_timeout: DEFAULT_GATHER_TIMEOUT,
            metadata_file: None,
            logger: NilLogger::shared(),
        }
    }

    pub fn with_sections(mut self, sections: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.sections = Arc::new(sections.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_gather_timeout(mut self, timeout: Duration) -> Self {
        self.gather_timeout = timeout;
        self
    }

    /// Serve this file instead of querying the metadata service
    pub fn with_metadata_file(mut self, path: Option<PathBuf>) -> Self {
        self.metadata_file = path;
        self
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("sections", &self.sections)
            .field("gather_timeout", &self.gather_timeout)
            .field("metadata_file", &self.metadata_file)
            .finish_non_exhaustive()
    }
}

/// What one metadata request produced
#[derive(Debug)]
pub enum MetadataReport {
    File {
        path: PathBuf,
        contents: Result<Vec<u8>, String>,
    },
    Gathered {
        sections: Arc<Vec<String>>,
        result: CollectionResult<String>,
    },
}

impl MetadataReport {
    pub fn timed_out(&self) -> bool {
        match self {
            MetadataReport::File { .. } => false,
            MetadataReport::Gathered { sections, result } => !result.is_complete_for(sections),
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = render::page_header(PAGE_TITLE);
        match self {
            MetadataReport::File { path, contents } => {
                out.push_str("<h2>ECS metadata from file</h2>\n");
                let heading = path.display().to_string();
                match contents {
                    Ok(body) => render::render_section(&mut out, &heading, body),
                    Err(message) => render::render_error(&mut out, &heading, message),
                }
            }
            MetadataReport::Gathered { sections, result } => {
                out.push_str("<h2>AWS metadata service (HTTP requests)</h2>\n");
                render::render_sections(&mut out, sections, result);
            }
        }
        out.push_str(render::page_footer());
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MetadataReport::File { path, contents } => {
                let path = path.display().to_string();
                match contents {
                    Ok(body) => serde_json::json!({
                        "file": path,
                        "body": String::from_utf8_lossy(body),
                    }),
                    Err(message) => serde_json::json!({ "file": path, "error": message }),
                }
            }
            MetadataReport::Gathered { sections, result } => {
                render::render_sections_json(sections, result)
            }
        }
    }
}

/// Collect the metadata for one request.
///
/// `request` is cancelled when the client goes away; the gather round is also
/// capped at the configured timeout.
pub async fn dump_metadata(
    context: &AppContext,
    request: &CancellationToken,
    logger: &dyn Logger,
) -> MetadataReport {
    if let Some(path) = &context.metadata_file {
        let contents = tokio::fs::read(path).await.map_err(|e| {
            logger
                .with_field("file", &path.display())
                .with_error(&e)
                .warning("reading metadata file failed");
            e.to_string()
        });
        return MetadataReport::File {
            path: path.clone(),
            contents,
        };
    }

    let deadline = Deadline::within(request, context.gather_timeout);
    let result = ParallelCollector::new()
        .run(context.sections.as_slice(), Arc::clone(&context.fetcher), &deadline)
        .await;

    if !logger.is_disabled() {
        for key in context.sections.iter() {
            match result.get(key) {
                Some(FetchOutcome::Success { payload }) => logger
                    .with_field("section", key)
                    .with_field("length", &payload.len())
                    .debug("section gathered"),
                Some(FetchOutcome::Failure { error }) => logger
                    .with_field("section", key)
                    .with_error(error)
                    .warning("section failed"),
                None => {}
            }
        }
        let missing = result.missing(&context.sections);
        if !missing.is_empty() {
            let missing: Vec<&str> = missing.into_iter().map(String::as_str).collect();
            logger
                .with_field("missing", &missing.join(","))
                .with_field("timeout_ms", &context.gather_timeout.as_millis())
                .warning("terminated early");
        }
    }

    MetadataReport::Gathered {
        sections: Arc::clone(&context.sections),
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::FetchError;
    use crate::use_cases::ports::fetch_fn;

    fn context() -> AppContext {
        let fetcher = fetch_fn(|key: String, cancel: CancellationToken| async move {
            match key.as_str() {
                "hostname" => Ok(b"ip-10-0-0-1".to_vec()),
                "iam/info" => Err(FetchError::Status { status: 404 }),
                _ => {
                    cancel.cancelled().await;
                    Err(FetchError::Cancelled)
                }
            }
        });
        AppContext::new(Arc::new(fetcher)).with_gather_timeout(Duration::from_millis(500))
    }

    #[test]
    fn test_context_defaults() {
        let context = context();
        assert_eq!(
            context.sections.as_slice(),
            &["hostname", "placement/availability-zone", "iam/info"]
        );
        assert!(context.metadata_file.is_none());
        assert!(context.logger.is_disabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dump_metadata_partial() {
        let context = context();
        let report = dump_metadata(&context, &CancellationToken::new(), &NilLogger).await;

        assert!(report.timed_out());
        let html = report.to_html();
        assert!(html.contains("<h3>hostname</h3>\nip-10-0-0-1"));
        assert!(html.contains("<h3 class=\"error\">iam/info</h3>"));
        assert!(html.contains("terminated early"));
        assert!(!html.contains("placement/availability-zone</h3>"));

        let json = report.to_json();
        assert_eq!(json["timed_out"], serde_json::json!(["placement/availability-zone"]));
        assert_eq!(json["sections"][0]["body"], "ip-10-0-0-1");
    }

    #[tokio::test]
    async fn test_dump_metadata_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecs.json");
        std::fs::write(&path, r#"{"Cluster":"<default>"}"#).unwrap();
        let context = context().with_metadata_file(Some(path.clone()));

        let report = dump_metadata(&context, &CancellationToken::new(), &NilLogger).await;

        assert!(!report.timed_out());
        let html = report.to_html();
        assert!(html.contains("ECS metadata from file"));
        assert!(html.contains("&lt;default&gt;"));
        assert_eq!(report.to_json()["file"], path.display().to_string());
    }

    #[tokio::test]
    async fn test_dump_metadata_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let context = context().with_metadata_file(Some(dir.path().join("absent.json")));

        let report = dump_metadata(&context, &CancellationToken::new(), &NilLogger).await;

        assert!(matches!(
            report,
            MetadataReport::File { contents: Err(_), .. }
        ));
        assert!(report.to_html().contains("error errmsg"));
    }
}
