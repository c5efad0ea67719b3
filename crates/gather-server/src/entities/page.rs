use std::path::PathBuf;

/// What a first-level page serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    /// Remote metadata gathered in parallel on each request
    Metadata,
    /// Files served from a directory; paths containing `/.` are refused
    StaticDir(PathBuf),
    /// Always answers 404
    NotFound,
}

/// Condition a page needs at startup, otherwise it is left unregistered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    DirectoryExists(PathBuf),
}

impl Precondition {
    /// Returns the reason the condition does not hold
    pub fn check(&self) -> Result<(), String> {
        match self {
            Precondition::DirectoryExists(dir) => match std::fs::metadata(dir) {
                Ok(meta) if meta.is_dir() => Ok(()),
                Ok(_) => Err("not a directory".to_string()),
                Err(e) => Err(e.to_string()),
            },
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Precondition::DirectoryExists(dir) => dir.display().to_string(),
        }
    }
}

/// A first-level page, mounted at `/<name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub name: String,
    pub kind: PageKind,
    pub indexed: bool,
    pub precondition: Option<Precondition>,
}

impl Page {
    pub fn new(name: impl Into<String>, kind: PageKind) -> Self {
        Self {
            name: name.into(),
            kind,
            indexed: true,
            precondition: None,
        }
    }

    pub fn unindexed(mut self) -> Self {
        self.indexed = false;
        self
    }

    pub fn only_if(mut self, precondition: Precondition) -> Self {
        self.precondition = Some(precondition);
        self
    }

    /// Route path without any trailing slash, e.g. `/poetry`
    pub fn mount_path(&self) -> String {
        format!("/{}", self.name.trim_end_matches('/'))
    }

    /// Label used on the index page
    pub fn index_label(&self) -> String {
        self.name.trim_end_matches('/').replace('/', " ")
    }
}
