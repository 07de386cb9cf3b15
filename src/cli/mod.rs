mod args;
mod chat;
mod commands;
mod display;
pub(crate) mod theme;
mod tools;

pub use args::{CliArgs, Command};
pub(crate) use chat::ChatSession;
pub(crate) use tools::{ExplainFormat, ToolRunner, read_input};
