pub mod fallback;
pub mod orchestrator;
pub mod prompt;
pub mod schema;
pub mod types;

pub use orchestrator::MetadataOrchestrator;
pub use schema::{is_valid_metadata, schema_description_pretty};
pub use types::{ImageInfo, MetadataError, RequestContext};
