use crate::entities::{Page, PageKind};
use crate::error::ServeError;
use crate::use_cases::ports::Logger;

/// First-level pages of the server, built once at startup
///
/// # Example
///
/// ```rust
/// use gather_server::prelude::*;
///
/// let registry = PageRegistry::new()
///     .page(Page::new("aws", PageKind::Metadata))
///     .unwrap()
///     .page(Page::new("favicon.ico", PageKind::NotFound).unindexed())
///     .unwrap();
///
/// assert_eq!(registry.index_names(), vec!["aws".to_string()]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PageRegistry {
    pages: Vec<Page>,
}

impl PageRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { pages: Vec::new() }
    }

    /// Register a page, rejecting a name that is already taken
    pub fn add(&mut self, page: Page) -> Result<(), ServeError> {
        if self.pages.iter().any(|p| p.name == page.name) {
            return Err(ServeError::DuplicatePage(page.name));
        }
        self.pages.push(page);
        Ok(())
    }

    /// Builder form of [`PageRegistry::add`]
    pub fn page(mut self, page: Page) -> Result<Self, ServeError> {
        self.add(page)?;
        Ok(self)
    }

    pub fn add_page(&mut self, name: impl Into<String>, kind: PageKind) -> Result<(), ServeError> {
        self.add(Page::new(name, kind))
    }

    pub fn add_unindexed(
        &mut self,
        name: impl Into<String>,
        kind: PageKind,
    ) -> Result<(), ServeError> {
        self.add(Page::new(name, kind).unindexed())
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Drop pages whose precondition does not hold, logging why
    pub fn resolve(self, logger: &dyn Logger) -> Self {
        let pages = self
            .pages
            .into_iter()
            .filter(|page| {
                let Some(precondition) = &page.precondition else {
                    return true;
                };
                let logger = logger
                    .with_field("page", &page.mount_path())
                    .with_field("subject", &precondition.subject());
                match precondition.check() {
                    Ok(()) => {
                        logger.info("page enabled");
                        true
                    }
                    Err(reason) => {
                        logger
                            .with_field("reason", &reason)
                            .warning("skipping page setup");
                        false
                    }
                }
            })
            .collect();
        Self { pages }
    }

    /// Sorted labels of the pages listed on the root page
    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .pages
            .iter()
            .filter(|page| page.indexed)
            .map(Page::index_label)
            .collect();
        names.sort();
        names
    }
}
