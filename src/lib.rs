pub mod cli;
pub mod client;
pub mod load_config;
pub mod logging;
pub mod sqlite_store;

pub use cli::{run, run_with, Cli, Commands, Direction};
