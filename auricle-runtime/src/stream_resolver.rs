//! # Stream-Resolver Registry
//!
//! Maps a source-type tag to the plugin-provided function that turns an
//! opaque external id into a playable URL. Consumed by the host's
//! playback engine: when it is asked to play a non-local track, it calls
//! [`StreamResolverRegistry::resolve`] and treats `None` as
//! "unplayable".
//!
//! At most one resolver exists per source-type. Registration is
//! last-writer-wins; unregistration only succeeds for the owner, so one
//! plugin cannot tear down another's resolver.

use auricle_plugin_sdk::calls::StreamResolver;
use dashmap::DashMap;
use serde_json::Value;

struct ResolverEntry {
    owner: String,
    resolver: StreamResolver,
}

/// The shared resolver registry; one per runtime.
#[derive(Default)]
pub struct StreamResolverRegistry {
    entries: DashMap<String, ResolverEntry>,
}

impl StreamResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a resolver for a source-type tag, replacing any previous
    /// one regardless of owner.
    pub fn register(&self, source_type: &str, owner: &str, resolver: StreamResolver) {
        let previous = self.entries.insert(
            source_type.to_string(),
            ResolverEntry {
                owner: owner.to_string(),
                resolver,
            },
        );
        match previous {
            Some(previous) if previous.owner != owner => {
                tracing::info!(
                    source_type,
                    new_owner = owner,
                    previous_owner = %previous.owner,
                    "stream resolver replaced"
                );
            }
            _ => tracing::debug!(source_type, owner, "stream resolver registered"),
        }
    }

    /// Remove the resolver for a source-type, but only when `owner`
    /// registered it. Returns whether anything was removed.
    pub fn unregister(&self, source_type: &str, owner: &str) -> bool {
        self.entries
            .remove_if(source_type, |_, entry| entry.owner == owner)
            .is_some()
    }

    /// Remove every resolver owned by a plugin; used at unload.
    pub fn unregister_owner(&self, owner: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.owner != owner);
        before - self.entries.len()
    }

    /// The owner of a source-type's resolver, if one is registered.
    pub fn owner_of(&self, source_type: &str) -> Option<String> {
        self.entries
            .get(source_type)
            .map(|entry| entry.owner.clone())
    }

    /// Resolve an external id to a playable URL.
    ///
    /// `None` when no resolver is registered or the resolver failed;
    /// failures are logged, never propagated; the playback engine
    /// decides how to surface an unplayable track.
    pub async fn resolve(
        &self,
        source_type: &str,
        external_id: &str,
        options: Value,
    ) -> Option<String> {
        let resolver = match self.entries.get(source_type) {
            None => {
                tracing::debug!(source_type, "no stream resolver registered");
                return None;
            }
            // Clone out so the dashmap guard is not held across the await.
            Some(entry) => entry.resolver.clone(),
        };

        match resolver.resolve(external_id.to_string(), options).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(source_type, external_id, error = %e, "stream resolver failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auricle_plugin_sdk::error::HostError;
    use serde_json::json;

    fn fixed_url(url: &'static str) -> StreamResolver {
        StreamResolver::new(move |_, _| Box::pin(async move { Ok(url.to_string()) }))
    }

    #[tokio::test]
    async fn absent_resolver_resolves_to_none() {
        let registry = StreamResolverRegistry::new();
        assert_eq!(registry.resolve("remote", "id-1", json!({})).await, None);
    }

    #[tokio::test]
    async fn registered_resolver_returns_its_url() {
        let registry = StreamResolverRegistry::new();
        registry.register("remote", "r-plugin", fixed_url("https://cdn.example/1.ogg"));
        assert_eq!(
            registry.resolve("remote", "id-1", json!({})).await.as_deref(),
            Some("https://cdn.example/1.ogg")
        );
    }

    #[tokio::test]
    async fn failing_resolver_resolves_to_none() {
        let registry = StreamResolverRegistry::new();
        registry.register(
            "remote",
            "r-plugin",
            StreamResolver::new(|_, _| {
                Box::pin(async { Err(HostError::service("catalogue offline")) })
            }),
        );
        assert_eq!(registry.resolve("remote", "id-1", json!({})).await, None);
    }

    #[test]
    fn only_the_owner_may_unregister() {
        let registry = StreamResolverRegistry::new();
        registry.register("remote", "owner", fixed_url("u"));
        assert!(!registry.unregister("remote", "intruder"));
        assert_eq!(registry.owner_of("remote").as_deref(), Some("owner"));
        assert!(registry.unregister("remote", "owner"));
        assert_eq!(registry.owner_of("remote"), None);
    }

    #[tokio::test]
    async fn registration_is_last_writer_wins() {
        let registry = StreamResolverRegistry::new();
        registry.register("remote", "first", fixed_url("https://first/"));
        registry.register("remote", "second", fixed_url("https://second/"));
        assert_eq!(registry.owner_of("remote").as_deref(), Some("second"));
        assert_eq!(
            registry.resolve("remote", "x", json!({})).await.as_deref(),
            Some("https://second/")
        );
    }

    #[test]
    fn unregister_owner_removes_all_of_theirs() {
        let registry = StreamResolverRegistry::new();
        registry.register("remote", "p", fixed_url("a"));
        registry.register("radio", "p", fixed_url("b"));
        registry.register("cloud", "other", fixed_url("c"));
        assert_eq!(registry.unregister_owner("p"), 2);
        assert_eq!(registry.owner_of("cloud").as_deref(), Some("other"));
    }
}
