mod fetcher;
mod logger;
mod server;

pub use fetcher::{fetch_fn, FetchFn, Fetcher};
pub use logger::{Logger, NilLogger, SharedLogger};
pub use server::Server;
