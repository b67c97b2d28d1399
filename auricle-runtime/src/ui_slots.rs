//! # UI Slot Registry
//!
//! Named extension points at the host-UI boundary. The host registers a
//! container per slot; plugins place prioritised visual fragments into
//! slots through the dispatcher.
//!
//! Ordering within a slot is by ascending priority, stable on ties. A
//! plugin owns at most one entry per slot; a second registration by the
//! same owner replaces the first. Entries can be removed by
//! (slot, owner) or in bulk by owner, and the sweeper purges entries
//! whose owner is no longer loaded.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// The closed set of extension points the host UI exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UiSlot {
    PlayerBarMenu,
    SidebarTop,
    SidebarBottom,
    SettingsPanel,
    NowPlaying,
}

impl UiSlot {
    pub const ALL: [UiSlot; 5] = [
        UiSlot::PlayerBarMenu,
        UiSlot::SidebarTop,
        UiSlot::SidebarBottom,
        UiSlot::SettingsPanel,
        UiSlot::NowPlaying,
    ];

    /// The kebab-case slot name plugins use.
    pub fn name(&self) -> &'static str {
        match self {
            UiSlot::PlayerBarMenu => "player-bar-menu",
            UiSlot::SidebarTop => "sidebar-top",
            UiSlot::SidebarBottom => "sidebar-bottom",
            UiSlot::SettingsPanel => "settings-panel",
            UiSlot::NowPlaying => "now-playing",
        }
    }

    /// Parse a slot name; `None` for anything outside the closed set.
    pub fn parse(name: &str) -> Option<UiSlot> {
        UiSlot::ALL.iter().copied().find(|slot| slot.name() == name)
    }
}

/// One plugin-owned fragment placed in a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotEntry {
    pub id: Uuid,
    pub slot: UiSlot,
    pub owner: String,
    /// The plugin's fragment wrapped in its ownership container
    pub fragment: String,
    pub priority: i32,
    /// Monotonic insertion stamp; breaks priority ties stably
    seq: u64,
}

/// Registry of host containers and plugin fragments per slot.
#[derive(Debug, Default)]
pub struct SlotRegistry {
    containers: DashMap<UiSlot, String>,
    entries: DashMap<UiSlot, Vec<SlotEntry>>,
    seq: AtomicU64,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host-side: bind a rendered container element to a slot.
    pub fn register_container(&self, slot: UiSlot, container_id: impl Into<String>) {
        self.containers.insert(slot, container_id.into());
    }

    /// The container bound to a slot, if the host registered one.
    pub fn container(&self, slot: UiSlot) -> Option<String> {
        self.containers.get(&slot).map(|entry| entry.clone())
    }

    /// Place a plugin's fragment into a slot, replacing any previous
    /// entry by the same owner. The raw fragment is wrapped in an
    /// ownership container so the host can strip it wholesale.
    pub fn add(&self, slot: UiSlot, owner: &str, html: &str, priority: i32) -> Uuid {
        let entry = SlotEntry {
            id: Uuid::new_v4(),
            slot,
            owner: owner.to_string(),
            fragment: format!(
                r#"<div class="plugin-fragment" data-plugin="{owner}">{html}</div>"#
            ),
            priority,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        };
        let id = entry.id;
        let mut entries = self.entries.entry(slot).or_default();
        entries.retain(|existing| existing.owner != owner);
        entries.push(entry);
        entries.sort_by_key(|e| (e.priority, e.seq));
        id
    }

    /// The slot's entries in render order.
    pub fn entries_for(&self, slot: UiSlot) -> Vec<SlotEntry> {
        self.entries
            .get(&slot)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Remove one owner's entry from one slot.
    pub fn remove(&self, slot: UiSlot, owner: &str) -> bool {
        match self.entries.get_mut(&slot) {
            None => false,
            Some(mut entries) => {
                let before = entries.len();
                entries.retain(|e| e.owner != owner);
                entries.len() != before
            }
        }
    }

    /// Remove every entry owned by a plugin, across all slots.
    pub fn remove_owner(&self, owner: &str) -> usize {
        let mut removed = 0;
        for mut entries in self.entries.iter_mut() {
            let before = entries.len();
            entries.retain(|e| e.owner != owner);
            removed += before - entries.len();
        }
        removed
    }

    /// Purge entries whose owner fails the predicate; the sweeper's
    /// belt-and-braces pass against crashed unloads.
    pub fn retain_owners(&self, mut is_loaded: impl FnMut(&str) -> bool) -> usize {
        let mut removed = 0;
        for mut entries in self.entries.iter_mut() {
            let before = entries.len();
            entries.retain(|e| is_loaded(&e.owner));
            removed += before - entries.len();
        }
        removed
    }

    /// Entries owned by a plugin across all slots; used for assertions.
    pub fn owned_entry_count(&self, owner: &str) -> usize {
        self.entries
            .iter()
            .flat_map(|entries| entries.clone())
            .filter(|e| e.owner == owner)
            .count()
    }
}
