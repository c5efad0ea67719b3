mod collection;
mod deadline;
mod outcome;
mod page;

pub use collection::{CollectionResult, FetchKey};
pub use deadline::Deadline;
pub use outcome::{FetchError, FetchOutcome};
pub use page::{Page, PageKind, Precondition};
