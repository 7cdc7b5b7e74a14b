pub mod cli;
pub mod config;
pub mod store;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::{load_config, GridsiftConfig};
