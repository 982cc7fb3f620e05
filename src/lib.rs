//! Workspace facade crate.
//!
//! Re-exports the individual workspace crates so host applications can depend
//! on `mediadb-workspace` alone. The `desktop-shims` feature (default) also
//! pulls in `bridge-desktop` and lets [`core_runtime::config::UpdateConfig`]
//! fall back to local-filesystem bridges.

pub use bridge_traits;
pub use core_library;
pub use core_runtime;
pub use core_sync;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;
