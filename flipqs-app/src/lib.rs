pub mod bootstrap;
pub mod commands;
pub mod config;

pub use bootstrap::Runtime;
pub use config::Config;
