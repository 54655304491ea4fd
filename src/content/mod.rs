pub mod library;
pub mod schema;

pub use library::{Library, SutraInfo};
pub use schema::{CharKind, Character, Chunk, ContentError, Section};
