//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Argument-list command building and rendering
//! - `io` - File I/O with consistent error handling
//! - `shell` - Shell escaping and quoting
//! - `sort` - Version-aware name ordering

pub mod command;
pub mod io;
pub mod shell;
pub mod sort;
