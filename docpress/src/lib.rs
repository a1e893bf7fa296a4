pub mod cli;
pub mod generate;
pub mod load_config;

pub use cli::{run, Cli, Commands};
