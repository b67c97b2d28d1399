//! # Auricle Plugin Runtime
//!
//! A sandboxed plugin runtime for the Auricle media host. It loads
//! third-party extensions (script source or native binary modules),
//! gates every host capability behind an explicit permission grant,
//! brokers a typed call-and-event bus between plugins and the host, and
//! owns the full lifecycle of every plugin resource so that load/unload
//! cycles leave no residue.
//!
//! ## Architecture
//!
//! - **`runtime`**: the lifecycle manager and owner of the plugins map
//! - **`dispatcher`**: the single switch routing capability calls to
//!   host services, applying rate limits and permission re-checks
//! - **`surface`**: composes the per-plugin capability object from the
//!   ledger at load time
//! - **`loader`**: the two load paths (script handoff, native
//!   instantiation with permission-filtered imports) and artifact fetch
//! - **`event_bus`**: pub/sub with owner-tagged subscriptions plus the
//!   request/response channel behind cross-plugin grants
//! - **`permissions`** / **`cross_plugin`**: the permission ledger and
//!   the cached cross-plugin grant checks
//! - **`storage`**, **`ui_slots`**, **`stream_resolver`**: the
//!   per-plugin scoped store and the shared registries
//! - **`rate_limit`**: token buckets on the api-call and storage-write
//!   channels
//! - **`config`**: TOML configuration with env overrides
//! - **`test_host`**: in-memory host services and engines for tests
//!
//! ## Quick Start
//!
//! ```rust
//! use auricle_runtime::{PluginRuntime, RuntimeConfig};
//! use std::sync::Arc;
//!
//! let runtime = PluginRuntime::new(
//!     RuntimeConfig::load("auricle.toml")?,
//!     host_services,
//!     script_engine,
//!     native_engine,
//! );
//! runtime.load_plugin_value(&manifest_json).await?;
//! let sweeper = runtime.spawn_sweeper();
//! ```
//!
//! ## Concurrency model
//!
//! The original host ran plugins cooperatively on a UI event loop; this
//! runtime keeps the equivalent discipline on a multi-threaded
//! substrate by serialising every mutation of the plugins map, the
//! registries and the ledgers through concurrent maps and short
//! critical sections, while downloads, fetches and resolver calls run
//! as plain async work that never holds runtime state across an await.

pub mod config;
pub mod cross_plugin;
pub mod dispatcher;
pub mod error;
pub mod event_bus;
pub mod loader;
pub mod permissions;
pub mod plugin;
pub mod rate_limit;
pub mod storage;
pub mod stream_resolver;
pub mod surface;
pub mod test_host;
pub mod ui_slots;

mod runtime;

pub use config::{init_logging, RuntimeConfig};
pub use error::RuntimeError;
pub use event_bus::{EventBus, HOST_OWNER};
pub use loader::{ArtifactSource, NativeEngine, ScriptEngine};
pub use runtime::{ErrorCallback, PluginRuntime};
pub use ui_slots::UiSlot;
