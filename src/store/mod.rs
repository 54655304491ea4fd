pub mod json_store;
pub mod progress;
pub mod schema;

pub use json_store::{JsonStore, KeyValueStore, MemoryStore, StoreError};
pub use progress::ProgressStore;
pub use schema::{DrillProgress, ExportData, WritingProgress};
