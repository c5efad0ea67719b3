use std::fmt::Write as _;

use serde::Serialize;

use crate::entities::{CollectionResult, FetchOutcome};

const TIMEOUT_HEADING: &str = "timeout";
const TIMEOUT_MESSAGE: &str = "terminated early";

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn page_header(title: &str) -> String {
    let title = escape_html(title);
    format!("<html><head><title>{title}</title></head><body><h1>{title}</h1>\n")
}

pub fn page_footer() -> &'static str {
    "</body></html>\n"
}

pub fn render_index(title: &str, names: &[String]) -> String {
    let mut out = page_header(title);
    out.push_str("<ul>\n");
    for name in names {
        let name = escape_html(name);
        let _ = writeln!(out, " <li><a href=\"{name}\">{name}</a></li>");
    }
    out.push_str("</ul>\n");
    out.push_str(page_footer());
    out
}

pub fn render_section(out: &mut String, heading: &str, body: &[u8]) {
    let _ = write!(out, "\n<h3>{}</h3>\n", escape_html(heading));
    out.push_str(&escape_html(&String::from_utf8_lossy(body)));
}

pub fn render_error(out: &mut String, heading: &str, message: &str) {
    let _ = write!(
        out,
        "\n<h3 class=\"error\">{}</h3>\n<div class=\"error errmsg\">{}</div>\n",
        escape_html(heading),
        escape_html(message)
    );
}

/// Render gathered sections in requested order.
///
/// Keys without an outcome get no section of their own; a single timeout
/// notice is appended instead when any are missing.
pub fn render_sections(out: &mut String, requested: &[String], result: &CollectionResult<String>) {
    for key in requested {
        match result.get(key) {
            Some(FetchOutcome::Success { payload }) => render_section(out, key, payload),
            Some(FetchOutcome::Failure { error }) => render_error(out, key, &error.to_string()),
            None => {}
        }
    }
    if !result.is_complete_for(requested) {
        render_error(out, TIMEOUT_HEADING, TIMEOUT_MESSAGE);
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionView {
    Success { key: String, body: String },
    Failure { key: String, error: String },
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SectionsView {
    pub sections: Vec<SectionView>,
    pub timed_out: Vec<String>,
}

impl SectionsView {
    pub fn new(requested: &[String], result: &CollectionResult<String>) -> Self {
        let sections = requested
            .iter()
            .filter_map(|key| {
                result.get(key).map(|outcome| match outcome {
                    FetchOutcome::Success { payload } => SectionView::Success {
                        key: key.clone(),
                        body: String::from_utf8_lossy(payload).into_owned(),
                    },
                    FetchOutcome::Failure { error } => SectionView::Failure {
                        key: key.clone(),
                        error: error.to_string(),
                    },
                })
            })
            .collect();
        let timed_out = result.missing(requested).into_iter().cloned().collect();
        Self {
            sections,
            timed_out,
        }
    }
}

pub fn render_sections_json(requested: &[String], result: &CollectionResult<String>) -> serde_json::Value {
    serde_json::to_value(SectionsView::new(requested, result)).unwrap_or_default()
}
