//! Recitation drill for memorizing chanted sutras section by section.
//!
//! The binary in `main.rs` is a thin terminal front end over these modules;
//! integration tests and benchmarks use them directly.

pub mod app;
pub mod config;
pub mod content;
pub mod engine;
pub mod event;
pub mod recognizer;
pub mod speech;
pub mod store;
pub mod ui;
