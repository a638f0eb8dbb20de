//! Memory service clients: hosted Mem0 over HTTP, and a local keyword store.

mod keyword_store;
mod mem0;

pub use agent_types::{AddOptions, MemoryClient, MemoryError, MemoryMessage, MemoryRecord, SearchOptions};
pub use keyword_store::InMemoryMemoryStore;
pub use mem0::Mem0Client;
