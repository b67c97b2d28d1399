//! The plugin instance contract.
//!
//! Every loaded plugin, script or native, is represented to the runtime
//! as one [`PluginInstance`]. Script engines hand over an implementation
//! during the registration handoff; native engines synthesize one around
//! the module's exported `init`/`start`/`stop`/`destroy` handles.

use crate::api::PluginApi;
use crate::error::HostError;
use async_trait::async_trait;

/// The lifecycle surface a plugin exposes to the runtime.
///
/// `init` receives the plugin's capability object exactly once, right
/// after a successful load; the plugin captures it and the runtime
/// forgets it. `start`/`stop` follow enable/disable transitions and
/// default to no-ops. `destroy` runs first during unload, before the
/// runtime reclaims the plugin's resources.
///
/// Hook failures are caught by the lifecycle manager; returning an error
/// never interrupts a teardown.
#[async_trait]
pub trait PluginInstance: Send + Sync {
    /// Hand the plugin its capability object.
    async fn init(&self, api: PluginApi) -> Result<(), HostError>;

    /// Called when the plugin is enabled.
    async fn start(&self) -> Result<(), HostError> {
        Ok(())
    }

    /// Called when the plugin is disabled.
    async fn stop(&self) -> Result<(), HostError> {
        Ok(())
    }

    /// Called at the head of unload, before resource teardown.
    async fn destroy(&self) -> Result<(), HostError> {
        Ok(())
    }
}
