// Scoped similarity search
pub mod engine;

pub use engine::{RetrievalEngine, SearchParams};
