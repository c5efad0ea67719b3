pub mod gather;
pub mod metadata;
pub mod ports;
pub mod registry;
pub mod render;

pub use gather::ParallelCollector;
pub use metadata::{dump_metadata, AppContext, MetadataReport};
pub use registry::PageRegistry;
