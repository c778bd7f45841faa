// Public modules
pub mod db_config;
pub mod dump;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod import;
pub mod pgpass;
pub mod replicate;
pub mod retention;
pub mod server;
pub mod settings;
pub mod ssh;

// Internal modules - not part of public API
pub(crate) mod erb;
pub(crate) mod local_files;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
