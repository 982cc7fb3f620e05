//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the media database core:
//! - Logging and tracing infrastructure
//! - Update configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the library and sync
//! crates depend on. It establishes the logging conventions, the
//! fail-fast configuration builder and the event broadcasting used to tell
//! listeners that the database changed.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
