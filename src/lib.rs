pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{InMemoryStore, JsonFileStore};
pub use app::{Command, CommandOutput, Dispatcher};
pub use config::DispatchConfig;
pub use crate::core::{
    engine::{AssignmentEngine, EngineSettings},
    pool::ResourcePool,
};
pub use utils::error::{DispatchError, Result};
