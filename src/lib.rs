//! wsbridge harness
//!
//! Host-process side of the `wsbridge` base client: global logging setup and
//! the helpers shared by the binaries.
//!
//! ## Architecture
//!
//! - **wsbridge**: the base WebSocket client (re-exported from workspace)
//! - **logging**: global `tracing` subscriber for host processes
//! - **bin_common**: configuration loading for binary executables
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use wsbridge_harness::bin_common::{load_config_path, load_listen_config};
//! use wsbridge_harness::logging::init_tracing;
//! ```

// Re-export workspace libraries for convenience
pub use wsbridge;

pub mod logging;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;

    pub use cli::{load_config_path, load_listen_config, parse_args, ListenArgs};
}
