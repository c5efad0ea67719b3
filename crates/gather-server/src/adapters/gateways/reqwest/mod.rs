mod fetcher;

pub use fetcher::{HttpFetcher, METADATA_BASE};
