//! # API Surface Factory
//!
//! Builds the per-plugin capability object at load time. The method set
//! is a function of the permission ledger at that instant: the factory
//! reads the granted set, hands it to the SDK's permission-tagged
//! composition, and forgets the result; the capability object lives
//! with the plugin, never in the runtime's authoritative state.

use crate::permissions::PermissionLedger;
use auricle_plugin_sdk::api::{EventBusPort, HostDispatch, PluginApi};
use std::sync::Arc;

/// Compose the capability object for one plugin from the ledger's
/// current view.
pub fn build_api(
    plugin: &str,
    ledger: &PermissionLedger,
    dispatch: Arc<dyn HostDispatch>,
    bus: Arc<dyn EventBusPort>,
) -> PluginApi {
    let granted = ledger.granted_for(plugin);
    let api = PluginApi::compose(plugin, &granted, dispatch, bus);
    tracing::debug!(
        plugin,
        groups = ?api.method_keys(),
        "capability object composed"
    );
    api
}
