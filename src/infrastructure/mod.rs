//! Infrastructure layer for filesystem and OS interactions.
//!
//! - [`paths`]: Config, log and animation directory resolution
//! - [`os_signals`]: Termination signals bridged to cancellation

pub mod os_signals;
pub mod paths;

pub use os_signals::cancel_on_signal;
pub use paths::{
    animation_search_roots, default_config_file, expand_tilde, ANIMATIONS_DIR_ENV,
    DEFAULT_DEBUG_LOG,
};
