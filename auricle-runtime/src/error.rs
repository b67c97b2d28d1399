//! # Runtime Error Types
//!
//! The top-level error type for the Auricle plugin runtime, wrapping the
//! SDK's manifest and host errors and adding the runtime's own failure
//! modes.
//!
//! ## Error Categories
//!
//! - **Manifest Errors**: validation rejections, reported to the load
//!   caller with the precise reason
//! - **Host Errors**: artifact fetch, instantiation, handoff and request
//!   channel failures surfaced by the SDK layer
//! - **Lifecycle Errors**: duplicate loads and operations on unknown
//!   plugins
//! - **Configuration Errors**: invalid runtime configuration
//!
//! ## Failure Semantics
//!
//! Load errors propagate to the caller. Enable/disable/unload errors are
//! logged by the lifecycle manager but do not cascade; rate-limit and
//! permission misses never become errors at all; the dispatcher answers
//! them with a neutral `null` and a warning trace.

use auricle_plugin_sdk::error::{HostError, ManifestError};
use thiserror::Error;

/// All failure modes the runtime reports to its embedder.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Manifest validation rejections
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Failures crossing the plugin/host boundary
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// A plugin with the same name is already loaded
    #[error("plugin already loaded: {name}")]
    DuplicatePlugin { name: String },

    /// An operation referenced a plugin that is not in the plugins map
    #[error("unknown plugin: {name}")]
    UnknownPlugin { name: String },

    /// Invalid runtime configuration
    #[error("configuration error: {message}")]
    Config { message: String },

    /// JSON serialization and deserialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failures in the storage and loader layers
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// Shorthand for a configuration failure with a formatted message.
    pub fn config(message: impl Into<String>) -> Self {
        RuntimeError::Config {
            message: message.into(),
        }
    }
}
