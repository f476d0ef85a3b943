pub mod commands;

pub use commands::{Command, CommandOutput, Dispatcher};
