//! Command implementations.

pub mod config;
pub mod process;
pub mod taxonomy;

pub use self::config::execute_config;
pub use self::process::execute_process;
pub use self::taxonomy::execute_taxonomy;
