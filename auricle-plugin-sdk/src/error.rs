//! # Error Handling Module
//!
//! This module provides the error types shared between the Auricle runtime,
//! the embedding host application, and plugin authors. It defines
//! standardized error types for manifest validation and host-capability
//! failures with detailed context for debugging.
//!
//! ## Overview
//!
//! The error handling system provides:
//! - **ManifestError**: Precise rejection reasons for invalid plugin manifests
//! - **HostError**: Failures crossing the plugin/host boundary
//! - **Standardized Error Types**: Consistent error patterns across the SDK
//! - **Error Conversion**: Automatic error type conversion and propagation
//!
//! ## Error Categories
//!
//! ### Manifest Errors
//!
//! Validation rejections, each naming the offending field or tag:
//! - **Missing Fields**: A required descriptor field is absent
//! - **Wrong Types**: A field carries the wrong primitive type
//! - **Unknown Tags**: Permission tags outside the closed vocabulary
//! - **Unknown Categories**: Category values outside the closed set
//! - **Malformed Cross-Plugin Entries**: Broken `cross_plugin_access` records
//!
//! ### Host Errors
//!
//! Failures raised while loading plugins or servicing capability calls:
//! - **Artifact Errors**: Entry artifact fetch or instantiation failures
//! - **Handoff Errors**: A script plugin never registered its instance
//! - **Request Channel Errors**: Missing handlers and handler failures
//! - **Cross-Plugin Denials**: Ungranted plugin-to-plugin calls
//! - **Lifecycle Errors**: `init`/`start`/`stop`/`destroy` failures
//! - **Service Errors**: Host-service level failures behind a dispatch
//!
//! ## Guiding Rule
//!
//! Local recovery is the default for anything triggered by plugin code:
//! rate limits, bad arguments and listener failures never surface as
//! errors to the caller. Only genuinely exceptional control flow (a
//! denied cross-plugin call, a plugin that never completes its handoff)
//! is represented here as an error the caller must handle.

use thiserror::Error;

/// Precise rejection reasons produced by manifest validation.
///
/// Validation is a pure function from untyped parsed data to either a
/// valid [`crate::manifest::Manifest`] or exactly one of these reasons.
/// No side effects are performed while validating.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// A required descriptor field is absent
    #[error("manifest missing required field: {field}")]
    MissingField { field: &'static str },

    /// A field is present but carries the wrong primitive type
    #[error("manifest field {field} has wrong type, expected {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    /// A permission tag outside the closed vocabulary
    #[error("unknown permission tag: {tag}")]
    UnknownPermission { tag: String },

    /// A category value outside the closed set
    #[error("unknown plugin category: {value}")]
    UnknownCategory { value: String },

    /// A plugin type other than `script` or `native`
    #[error("unknown plugin type: {value}")]
    UnknownPluginType { value: String },

    /// A broken `cross_plugin_access` record
    #[error("malformed cross_plugin_access entry: {detail}")]
    MalformedCrossPluginEntry { detail: String },
}

/// Failures crossing the plugin/host boundary.
///
/// Raised by the loader, the capability surface and the event bus. The
/// dispatcher itself answers most misuse with a neutral `null` reply and
/// a warning trace; this type covers the exceptional control flow that
/// must reach the caller.
#[derive(Error, Debug)]
pub enum HostError {
    /// HTTP communication failures while fetching artifacts or proxying
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization and deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failures while reading artifacts or persisting storage
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry artifact could not be fetched
    #[error("failed to fetch entry artifact for plugin {plugin}: {message}")]
    ArtifactFetch { plugin: String, message: String },

    /// Script execution or native module instantiation failed
    #[error("failed to instantiate plugin {plugin}: {message}")]
    Instantiation { plugin: String, message: String },

    /// A script plugin finished executing without registering its instance
    #[error("plugin {plugin} never registered an instance during handoff")]
    HandoffMissing { plugin: String },

    /// `request` was made against a name with no registered handler
    #[error("no handler registered for request: {name}")]
    NoRequestHandler { name: String },

    /// A registered request handler returned an error
    #[error("request {name} failed: {message}")]
    RequestFailed { name: String, message: String },

    /// A plugin-to-plugin call the caller's manifest does not grant.
    ///
    /// The message embeds the exact manifest fragment the plugin author
    /// must add, so the denial is directly actionable.
    #[error(
        "plugin {caller} may not call {method} on {target}; add this to the \
         manifest of {caller}: {manifest_fragment}"
    )]
    CrossPluginDenied {
        caller: String,
        target: String,
        method: String,
        manifest_fragment: String,
    },

    /// A plugin lifecycle hook (`init`/`start`/`stop`/`destroy`) failed
    #[error("plugin {plugin} failed during {phase}: {message}")]
    Lifecycle {
        plugin: String,
        phase: &'static str,
        message: String,
    },

    /// A host service behind a dispatched call failed
    #[error("host service error: {message}")]
    Service { message: String },
}

impl HostError {
    /// Shorthand for a host-service failure with a formatted message.
    pub fn service(message: impl Into<String>) -> Self {
        HostError::Service {
            message: message.into(),
        }
    }
}
