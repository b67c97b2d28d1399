//! # Auricle Plugin SDK
//!
//! The shared contract between the Auricle media host, its sandboxed
//! plugin runtime, and plugin authors. The SDK owns everything that
//! crosses the plugin boundary: descriptor schema and permission
//! vocabulary, domain models, host event payloads, the typed host-call
//! catalogue, the permission-composed capability surface, and the host
//! services interface the runtime dispatches onto.
//!
//! ## Overview
//!
//! - **`manifest`**: plugin descriptors, the closed permission
//!   vocabulary, and the pure validation pass
//! - **`models`**: tracks, playback state, playlists, proxied HTTP shapes
//! - **`events`**: host-emitted event names and payload contracts
//! - **`calls`**: the closed [`calls::HostCall`] enumeration with per-call
//!   permission gates
//! - **`api`**: the per-plugin capability object, composed from
//!   permission-tagged builders
//! - **`instance`**: the plugin lifecycle trait
//! - **`host`**: the services contract the embedding host implements
//! - **`bridge`**: the stock reqwest implementation of the outbound proxy
//! - **`error`**: manifest and host error types
//!
//! ## Trust model
//!
//! Plugins are untrusted. Nothing in this crate gives a plugin more than
//! its manifest was granted: the capability object only carries the
//! permitted method groups, every call is re-checked at dispatch, and
//! plugin-to-plugin requests require explicit `cross_plugin_access`
//! grants.
//!
//! ## Quick Start (host side)
//!
//! ```rust
//! use auricle_plugin_sdk::manifest::Manifest;
//!
//! let manifest = Manifest::from_value(&raw_descriptor)?;
//! runtime.load_plugin(manifest).await?;
//! ```

pub mod api;
pub mod bridge;
pub mod calls;
pub mod error;
pub mod events;
pub mod host;
pub mod instance;
pub mod manifest;
pub mod models;

pub use api::{FetchResponse, PluginApi};
pub use calls::{CallGate, HostCall, StreamResolver};
pub use error::{HostError, ManifestError};
pub use host::HostServices;
pub use instance::PluginInstance;
pub use manifest::{CrossPluginAccess, Manifest, Permission, PluginCategory, PluginType};
pub use models::{DownloadRequest, Playlist, PlaybackState, ProxyRequest, ProxyResponse, Track};
