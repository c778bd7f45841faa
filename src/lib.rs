/// Macro for prefixed status logging to stderr (only when stderr is a terminal).
///
/// Usage:
/// ```ignore
/// log_status!("dump", "Creating {} on {}", path, host);
/// log_status!("import", "Restoring {}", database);
/// ```
#[macro_export]
macro_rules! log_status {
    ($prefix:expr, $($arg:tt)*) => {
        if ::std::io::IsTerminal::is_terminal(&::std::io::stderr()) {
            eprintln!(concat!("[", $prefix, "] {}"), format_args!($($arg)*));
        }
    };
}

/// Macro for prefixed warnings on stderr.
///
/// Unlike `log_status!`, warnings are written even when stderr is redirected
/// so that non-fatal failures show up in pipeline logs.
#[macro_export]
macro_rules! log_warning {
    ($prefix:expr, $($arg:tt)*) => {
        eprintln!(concat!("[", $prefix, "] warning: {}"), format_args!($($arg)*));
    };
}

pub mod core;
pub mod utils;

// Re-export everything from core for ergonomic library use
// Users can write `pgreplicate::dump` instead of `pgreplicate::core::dump`
pub use core::*;
pub use utils::*;
