// ── Bundled backends ──

mod default;
mod memory;

pub use default::DefaultBackend;
pub use memory::{MemoryBackend, StoreSnapshot};
