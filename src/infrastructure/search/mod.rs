//! Search strategy implementations

mod chroma;
mod memory_index;
mod scan;
mod store;

pub use chroma::{ChromaBackend, ChromaConfig};
pub use memory_index::MemoryIndex;
pub use scan::CosineScanBackend;
pub use store::{QaRecord, RecordStore};
