//! # Typed Event Bus
//!
//! One emitter shared by the host and every plugin, plus the
//! request/response rendezvous used for plugin-to-plugin RPC.
//!
//! ## Subscriptions
//!
//! Every `on`/`once` records the subscribing plugin's name, so the whole
//! set of a destroyed plugin's listeners can be detached in one pass.
//! Delivery is in registration order; a listener that fails is caught
//! and logged without stopping delivery to later listeners. A `once`
//! subscription is removed before its listener runs.
//!
//! ## Request channel
//!
//! At most one handler exists per request name; registering again
//! replaces. A request against an unregistered name fails immediately.
//! When a request crosses plugin boundaries, the cross-plugin gate is
//! consulted before the handler runs; a denial reaches the caller as a
//! descriptive error, not a neutral failure.

use async_trait::async_trait;
use auricle_plugin_sdk::api::{EventBusPort, EventListenerFn, RequestHandlerFn};
use auricle_plugin_sdk::error::HostError;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Reserved owner name for host-side subscriptions and requests; the
/// cross-plugin gate never applies to it.
pub const HOST_OWNER: &str = "host";

/// Decides whether one plugin may invoke a named request handled by
/// another. Implemented by the cross-plugin permission manager.
#[async_trait]
pub trait CrossPluginGate: Send + Sync {
    async fn check(&self, caller: &str, target: &str, method: &str) -> Result<(), HostError>;
}

/// Gate that allows everything; used by buses without a permission
/// manager attached (unit tests, single-plugin embeddings).
pub struct OpenGate;

#[async_trait]
impl CrossPluginGate for OpenGate {
    async fn check(&self, _caller: &str, _target: &str, _method: &str) -> Result<(), HostError> {
        Ok(())
    }
}

struct Subscription {
    id: u64,
    owner: String,
    once: bool,
    listener: EventListenerFn,
}

struct RequestHandler {
    owner: String,
    handler: RequestHandlerFn,
}

/// The shared emitter and request channel.
pub struct EventBus {
    listeners: RwLock<HashMap<String, Vec<Subscription>>>,
    handlers: DashMap<String, RequestHandler>,
    next_id: AtomicU64,
    gate: Arc<dyn CrossPluginGate>,
}

impl EventBus {
    pub fn new(gate: Arc<dyn CrossPluginGate>) -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            handlers: DashMap::new(),
            next_id: AtomicU64::new(1),
            gate,
        }
    }

    /// Register a listener; returns its subscription id.
    pub fn on(&self, owner: &str, event: &str, listener: EventListenerFn) -> u64 {
        self.insert(owner, event, listener, false)
    }

    /// Register a single-delivery listener.
    pub fn once(&self, owner: &str, event: &str, listener: EventListenerFn) -> u64 {
        self.insert(owner, event, listener, true)
    }

    fn insert(&self, owner: &str, event: &str, listener: EventListenerFn, once: bool) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut listeners = self.listeners.write().unwrap();
        listeners
            .entry(event.to_string())
            .or_default()
            .push(Subscription {
                id,
                owner: owner.to_string(),
                once,
                listener,
            });
        id
    }

    /// Remove one subscription by id.
    pub fn off(&self, event: &str, subscription: u64) {
        let mut listeners = self.listeners.write().unwrap();
        if let Some(entries) = listeners.get_mut(event) {
            entries.retain(|s| s.id != subscription);
        }
    }

    /// Detach every subscription and request handler owned by a plugin.
    pub fn remove_plugin_listeners(&self, owner: &str) {
        let mut listeners = self.listeners.write().unwrap();
        for entries in listeners.values_mut() {
            entries.retain(|s| s.owner != owner);
        }
        drop(listeners);
        self.handlers.retain(|_, handler| handler.owner != owner);
    }

    /// Deliver an event to every listener in registration order.
    ///
    /// `once` subscriptions are removed before invocation. A failing
    /// listener is logged and later listeners still receive the event.
    pub fn emit(&self, event: &str, payload: Value) {
        let to_invoke: Vec<(u64, String, EventListenerFn)> = {
            let mut listeners = self.listeners.write().unwrap();
            match listeners.get_mut(event) {
                None => return,
                Some(entries) => {
                    let snapshot = entries
                        .iter()
                        .map(|s| (s.id, s.owner.clone(), Arc::clone(&s.listener)))
                        .collect();
                    entries.retain(|s| !s.once);
                    snapshot
                }
            }
        };

        for (id, owner, listener) in to_invoke {
            if let Err(e) = listener(payload.clone()) {
                tracing::warn!(event, owner = %owner, subscription = id, error = %e, "event listener failed");
            }
        }
    }

    /// Listener count for an event; used by tests and diagnostics.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .read()
            .unwrap()
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Subscriptions currently owned by a plugin across all events.
    pub fn owned_subscription_count(&self, owner: &str) -> usize {
        self.listeners
            .read()
            .unwrap()
            .values()
            .flat_map(|entries| entries.iter())
            .filter(|s| s.owner == owner)
            .count()
    }

    /// Install `owner`'s handler for a named request, replacing any
    /// previous one.
    pub fn register_request_handler(&self, owner: &str, name: &str, handler: RequestHandlerFn) {
        let previous = self.handlers.insert(
            name.to_string(),
            RequestHandler {
                owner: owner.to_string(),
                handler,
            },
        );
        if let Some(previous) = previous {
            tracing::debug!(
                name,
                new_owner = owner,
                previous_owner = %previous.owner,
                "request handler replaced"
            );
        }
    }

    /// Whether a handler exists for a request name; exposed for tests.
    pub fn has_request_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Invoke the handler registered for `name`.
    ///
    /// Fails synchronously with [`HostError::NoRequestHandler`] when no
    /// handler exists. Cross-plugin calls are checked against the gate
    /// before the handler runs; host-originated requests bypass it.
    pub async fn request(&self, caller: &str, name: &str, data: Value) -> Result<Value, HostError> {
        let (owner, handler) = match self.handlers.get(name) {
            None => {
                return Err(HostError::NoRequestHandler {
                    name: name.to_string(),
                })
            }
            Some(entry) => (entry.owner.clone(), Arc::clone(&entry.handler)),
        };

        if caller != HOST_OWNER && owner != caller {
            self.gate.check(caller, &owner, name).await?;
        }

        handler(data).await.map_err(|e| HostError::RequestFailed {
            name: name.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl EventBusPort for EventBus {
    fn subscribe(&self, owner: &str, event: &str, listener: EventListenerFn, once: bool) -> u64 {
        self.insert(owner, event, listener, once)
    }

    fn unsubscribe(&self, event: &str, subscription: u64) {
        self.off(event, subscription)
    }

    fn register_request_handler(&self, owner: &str, name: &str, handler: RequestHandlerFn) {
        EventBus::register_request_handler(self, owner, name, handler)
    }

    async fn request(&self, caller: &str, name: &str, data: Value) -> Result<Value, HostError> {
        EventBus::request(self, caller, name, data).await
    }
}
