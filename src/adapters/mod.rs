// Adapters layer: concrete implementations of the DispatchStore port.

pub mod json_file;
pub mod memory;
mod tables;

pub use json_file::JsonFileStore;
pub use memory::InMemoryStore;
