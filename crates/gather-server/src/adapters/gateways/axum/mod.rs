mod request_log;
mod server;

pub use server::Axum;
