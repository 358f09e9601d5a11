mod ingest;
mod model;
mod registry;

pub use ingest::*;
pub use ingest::hands::*;
pub use ingest::measures::*;
pub use model::config::*;
pub use model::song::*;
pub use registry::*;
