//! Storage abstractions for service layer
//!
//! The drink list is always read and written as one document. `DrinkStore`
//! hides whether that document lives in a JSON file or in memory.

pub mod drink_store;
pub mod json_file_store;
pub mod memory_store;

pub use drink_store::DrinkStore;
pub use json_file_store::JsonFileStore;
pub use memory_store::MemoryStore;
