//! # Manifest Schema and Validator
//!
//! This module defines the plugin descriptor schema for the Auricle media
//! host and the pure validation pass that turns untyped parsed data into a
//! typed [`Manifest`] or a precise [`ManifestError`].
//!
//! ## Overview
//!
//! Every plugin ships one manifest describing:
//! - **Identity**: display `name`, filesystem-safe `safe_name`, `version`, `author`
//! - **Delivery**: plugin `type` (script source or native binary module) and `entry` artifact
//! - **Capabilities**: the set of requested permission tags
//! - **UI Placement**: optional UI slot names the plugin intends to fill
//! - **Cross-Plugin Access**: which methods the plugin may invoke on which peers
//!
//! ## Permission Vocabulary
//!
//! Permission tags are drawn from a closed vocabulary; unknown tags are
//! rejected at validation time rather than silently dropped:
//!
//! | Tag | Gates |
//! |-----|-------|
//! | `player-read` | Reading playback state, current track, queue |
//! | `player-control` | Transport control, queue mutation, stream resolvers |
//! | `library-read` | Reading library tracks and playlists |
//! | `library-write` | Library mutation, downloads, cover updates |
//! | `ui-inject` | Injecting visual fragments into host UI slots |
//! | `network-fetch` | Outbound HTTP through the host proxy |
//! | `scoped-storage` | The per-plugin key/value store |
//! | `lyrics-read` | Reading lyrics for a track |
//! | `lyrics-write` | Writing lyrics for a track |
//! | `notifications` | Raising system notifications |
//! | `settings-write` | Writing host-wide settings |
//!
//! ## Validation Contract
//!
//! [`Manifest::from_value`] is a pure function with no side effects.
//! Rejections distinguish missing required fields, wrong primitive types,
//! unknown permission tags, unknown categories and malformed cross-plugin
//! entries, so callers can report exactly what a plugin author must fix.
//!
//! ## Usage
//!
//! ```rust
//! use auricle_plugin_sdk::manifest::Manifest;
//!
//! let raw = serde_json::json!({
//!     "name": "Catalogue Search",
//!     "version": "1.2.0",
//!     "author": "example",
//!     "type": "script",
//!     "entry": "index.js",
//!     "permissions": ["network-fetch", "scoped-storage"],
//!     "category": "library"
//! });
//!
//! let manifest = Manifest::from_value(&raw)?;
//! assert_eq!(manifest.safe_name, "catalogue-search");
//! ```

use crate::error::ManifestError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// One permission tag from the closed vocabulary.
///
/// Wire form is the kebab-case tag (`player-read`, `scoped-storage`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    /// Read playback state, current track and queue
    PlayerRead,
    /// Control transport and queue; register stream resolvers
    PlayerControl,
    /// Read library tracks and playlists
    LibraryRead,
    /// Mutate the library, download tracks, update covers
    LibraryWrite,
    /// Inject visual fragments into host UI slots
    UiInject,
    /// Outbound HTTP through the host proxy
    NetworkFetch,
    /// Per-plugin scoped key/value storage
    ScopedStorage,
    /// Read lyrics
    LyricsRead,
    /// Write lyrics
    LyricsWrite,
    /// Raise system notifications
    Notifications,
    /// Write host-wide settings
    SettingsWrite,
}

impl Permission {
    /// Every tag in the closed vocabulary, in declaration order.
    pub const ALL: [Permission; 11] = [
        Permission::PlayerRead,
        Permission::PlayerControl,
        Permission::LibraryRead,
        Permission::LibraryWrite,
        Permission::UiInject,
        Permission::NetworkFetch,
        Permission::ScopedStorage,
        Permission::LyricsRead,
        Permission::LyricsWrite,
        Permission::Notifications,
        Permission::SettingsWrite,
    ];

    /// The kebab-case wire tag for this permission.
    pub fn tag(&self) -> &'static str {
        match self {
            Permission::PlayerRead => "player-read",
            Permission::PlayerControl => "player-control",
            Permission::LibraryRead => "library-read",
            Permission::LibraryWrite => "library-write",
            Permission::UiInject => "ui-inject",
            Permission::NetworkFetch => "network-fetch",
            Permission::ScopedStorage => "scoped-storage",
            Permission::LyricsRead => "lyrics-read",
            Permission::LyricsWrite => "lyrics-write",
            Permission::Notifications => "notifications",
            Permission::SettingsWrite => "settings-write",
        }
    }

    /// Parse a wire tag, returning `None` for anything outside the vocabulary.
    pub fn parse(tag: &str) -> Option<Permission> {
        Permission::ALL.iter().copied().find(|p| p.tag() == tag)
    }
}

/// How a plugin's entry artifact is delivered and executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    /// Source text executed through the host's script engine
    Script,
    /// A binary module instantiated with permission-filtered imports
    Native,
}

impl PluginType {
    fn parse(value: &str) -> Option<PluginType> {
        match value {
            "script" => Some(PluginType::Script),
            "native" => Some(PluginType::Native),
            _ => None,
        }
    }
}

/// Coarse catalogue category for a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginCategory {
    Audio,
    Ui,
    Lyrics,
    Library,
    Utility,
}

impl PluginCategory {
    fn parse(value: &str) -> Option<PluginCategory> {
        match value {
            "audio" => Some(PluginCategory::Audio),
            "ui" => Some(PluginCategory::Ui),
            "lyrics" => Some(PluginCategory::Lyrics),
            "library" => Some(PluginCategory::Library),
            "utility" => Some(PluginCategory::Utility),
            _ => None,
        }
    }
}

/// One cross-plugin grant: the caller may invoke the listed methods on
/// the named target plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossPluginAccess {
    /// Display name of the target plugin
    pub plugin: String,
    /// Request/method names the caller may invoke on the target
    pub methods: Vec<String>,
}

/// A validated plugin descriptor.
///
/// Produced only by [`Manifest::from_value`]; the permission set is
/// deduplicated and every tag is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Unique display name
    pub name: String,
    /// Filesystem-safe alias; defaults to the lowercased,
    /// whitespace-to-dash form of `name`
    pub safe_name: String,
    /// Plugin version string
    pub version: String,
    /// Plugin author
    pub author: String,
    /// Delivery and execution model
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
    /// Entry artifact filename, resolved as `<safe_name>/<entry>`
    pub entry: String,
    /// Requested permission tags, deduplicated
    pub permissions: HashSet<Permission>,
    /// UI slot names the plugin intends to fill
    #[serde(default)]
    pub ui_slots: Vec<String>,
    /// Catalogue category
    pub category: PluginCategory,
    /// Cross-plugin method grants held by this plugin
    #[serde(default)]
    pub cross_plugin_access: Vec<CrossPluginAccess>,
}

impl Manifest {
    /// Validate untyped parsed manifest data.
    ///
    /// Pure function: either every invariant holds and a typed manifest is
    /// returned, or the first violation is reported as a precise
    /// [`ManifestError`].
    ///
    /// # Errors
    ///
    /// - [`ManifestError::MissingField`] when `name`, `version`, `author`,
    ///   `type` or `entry` is absent
    /// - [`ManifestError::WrongType`] when a field has the wrong primitive type
    /// - [`ManifestError::UnknownPluginType`] / [`ManifestError::UnknownCategory`]
    ///   for values outside their closed sets
    /// - [`ManifestError::UnknownPermission`] for tags outside the vocabulary
    /// - [`ManifestError::MalformedCrossPluginEntry`] for broken grant records
    pub fn from_value(raw: &Value) -> Result<Manifest, ManifestError> {
        let name = require_string(raw, "name")?;
        let version = require_string(raw, "version")?;
        let author = require_string(raw, "author")?;
        let entry = require_string(raw, "entry")?;

        let type_tag = require_string(raw, "type")?;
        let plugin_type = PluginType::parse(&type_tag)
            .ok_or(ManifestError::UnknownPluginType { value: type_tag })?;

        let safe_name = match raw.get("safe_name") {
            None | Some(Value::Null) => derive_safe_name(&name),
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(ManifestError::WrongType {
                    field: "safe_name",
                    expected: "string",
                })
            }
        };

        let permissions = parse_permissions(raw)?;
        let ui_slots = parse_ui_slots(raw)?;

        let category = match raw.get("category") {
            None | Some(Value::Null) => PluginCategory::Utility,
            Some(Value::String(s)) => PluginCategory::parse(s)
                .ok_or_else(|| ManifestError::UnknownCategory { value: s.clone() })?,
            Some(_) => {
                return Err(ManifestError::WrongType {
                    field: "category",
                    expected: "string",
                })
            }
        };

        let cross_plugin_access = parse_cross_plugin_access(raw)?;

        Ok(Manifest {
            name,
            safe_name,
            version,
            author,
            plugin_type,
            entry,
            permissions,
            ui_slots,
            category,
            cross_plugin_access,
        })
    }

    /// Whether the manifest requests the given permission.
    pub fn requests(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// The cross-plugin grant for a target plugin, if any.
    pub fn cross_plugin_grant(&self, target: &str) -> Option<&CrossPluginAccess> {
        self.cross_plugin_access
            .iter()
            .find(|grant| grant.plugin == target)
    }
}

/// Lowercase the name and replace whitespace runs with single dashes.
fn derive_safe_name(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

fn require_string(raw: &Value, field: &'static str) -> Result<String, ManifestError> {
    match raw.get(field) {
        None | Some(Value::Null) => Err(ManifestError::MissingField { field }),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ManifestError::WrongType {
            field,
            expected: "string",
        }),
    }
}

fn parse_permissions(raw: &Value) -> Result<HashSet<Permission>, ManifestError> {
    let mut permissions = HashSet::new();
    match raw.get("permissions") {
        None | Some(Value::Null) => {}
        Some(Value::Array(tags)) => {
            for tag in tags {
                let tag = tag.as_str().ok_or(ManifestError::WrongType {
                    field: "permissions",
                    expected: "array of strings",
                })?;
                let permission =
                    Permission::parse(tag).ok_or_else(|| ManifestError::UnknownPermission {
                        tag: tag.to_string(),
                    })?;
                // Duplicate tags deduplicate silently.
                permissions.insert(permission);
            }
        }
        Some(_) => {
            return Err(ManifestError::WrongType {
                field: "permissions",
                expected: "array of strings",
            })
        }
    }
    Ok(permissions)
}

fn parse_ui_slots(raw: &Value) -> Result<Vec<String>, ManifestError> {
    match raw.get("ui_slots") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(slots)) => slots
            .iter()
            .map(|slot| {
                slot.as_str()
                    .map(str::to_string)
                    .ok_or(ManifestError::WrongType {
                        field: "ui_slots",
                        expected: "array of strings",
                    })
            })
            .collect(),
        Some(_) => Err(ManifestError::WrongType {
            field: "ui_slots",
            expected: "array of strings",
        }),
    }
}

fn parse_cross_plugin_access(raw: &Value) -> Result<Vec<CrossPluginAccess>, ManifestError> {
    let entries = match raw.get("cross_plugin_access") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(ManifestError::WrongType {
                field: "cross_plugin_access",
                expected: "array of objects",
            })
        }
    };

    let mut grants = Vec::with_capacity(entries.len());
    for entry in entries {
        let plugin = entry
            .get("plugin")
            .and_then(Value::as_str)
            .ok_or_else(|| ManifestError::MalformedCrossPluginEntry {
                detail: "entry missing string field `plugin`".to_string(),
            })?
            .to_string();

        let methods = entry
            .get("methods")
            .and_then(Value::as_array)
            .ok_or_else(|| ManifestError::MalformedCrossPluginEntry {
                detail: format!("entry for {plugin} missing array field `methods`"),
            })?;

        let methods = methods
            .iter()
            .map(|m| match m.as_str() {
                Some(name) if !name.is_empty() => Ok(name.to_string()),
                _ => Err(ManifestError::MalformedCrossPluginEntry {
                    detail: format!("entry for {plugin} contains a non-string or empty method"),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        grants.push(CrossPluginAccess { plugin, methods });
    }
    Ok(grants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "name": "Keyboard Shortcuts",
            "version": "0.1.0",
            "author": "auricle",
            "type": "script",
            "entry": "index.js"
        })
    }

    #[test]
    fn minimal_manifest_validates_with_derived_safe_name() {
        let manifest = Manifest::from_value(&minimal()).unwrap();
        assert_eq!(manifest.name, "Keyboard Shortcuts");
        assert_eq!(manifest.safe_name, "keyboard-shortcuts");
        assert_eq!(manifest.plugin_type, PluginType::Script);
        assert_eq!(manifest.category, PluginCategory::Utility);
        assert!(manifest.permissions.is_empty());
    }

    #[test]
    fn missing_required_fields_are_reported_precisely() {
        for field in ["name", "version", "author", "type", "entry"] {
            let mut raw = minimal();
            raw.as_object_mut().unwrap().remove(field);
            match Manifest::from_value(&raw) {
                Err(ManifestError::MissingField { field: reported }) => {
                    assert_eq!(reported, field)
                }
                other => panic!("expected MissingField for {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn wrong_primitive_type_is_rejected() {
        let mut raw = minimal();
        raw["version"] = json!(42);
        assert_eq!(
            Manifest::from_value(&raw),
            Err(ManifestError::WrongType {
                field: "version",
                expected: "string"
            })
        );
    }

    #[test]
    fn unknown_permission_tag_is_rejected() {
        let mut raw = minimal();
        raw["permissions"] = json!(["player-read", "filesystem-root"]);
        assert_eq!(
            Manifest::from_value(&raw),
            Err(ManifestError::UnknownPermission {
                tag: "filesystem-root".to_string()
            })
        );
    }

    #[test]
    fn duplicated_permissions_deduplicate() {
        let mut raw = minimal();
        raw["permissions"] = json!(["player-read", "player-read", "scoped-storage"]);
        let manifest = Manifest::from_value(&raw).unwrap();
        assert_eq!(manifest.permissions.len(), 2);
        assert!(manifest.requests(Permission::PlayerRead));
        assert!(manifest.requests(Permission::ScopedStorage));
    }

    #[test]
    fn unknown_category_is_rejected() {
        let mut raw = minimal();
        raw["category"] = json!("games");
        assert_eq!(
            Manifest::from_value(&raw),
            Err(ManifestError::UnknownCategory {
                value: "games".to_string()
            })
        );
    }

    #[test]
    fn unknown_plugin_type_is_rejected() {
        let mut raw = minimal();
        raw["type"] = json!("wasm2");
        assert_eq!(
            Manifest::from_value(&raw),
            Err(ManifestError::UnknownPluginType {
                value: "wasm2".to_string()
            })
        );
    }

    #[test]
    fn malformed_cross_plugin_entries_are_rejected() {
        let mut raw = minimal();
        raw["cross_plugin_access"] = json!([{ "plugin": "Search" }]);
        assert!(matches!(
            Manifest::from_value(&raw),
            Err(ManifestError::MalformedCrossPluginEntry { .. })
        ));

        raw["cross_plugin_access"] = json!([{ "plugin": "Search", "methods": ["query", ""] }]);
        assert!(matches!(
            Manifest::from_value(&raw),
            Err(ManifestError::MalformedCrossPluginEntry { .. })
        ));
    }

    #[test]
    fn cross_plugin_grants_round_trip() {
        let mut raw = minimal();
        raw["cross_plugin_access"] =
            json!([{ "plugin": "Catalogue Search", "methods": ["search.query"] }]);
        let manifest = Manifest::from_value(&raw).unwrap();
        let grant = manifest.cross_plugin_grant("Catalogue Search").unwrap();
        assert_eq!(grant.methods, vec!["search.query".to_string()]);
        assert!(manifest.cross_plugin_grant("Other").is_none());
    }

    #[test]
    fn explicit_safe_name_wins_over_derivation() {
        let mut raw = minimal();
        raw["safe_name"] = json!("kbshortcuts");
        let manifest = Manifest::from_value(&raw).unwrap();
        assert_eq!(manifest.safe_name, "kbshortcuts");
    }

    #[test]
    fn permission_tags_parse_round_trip() {
        for permission in Permission::ALL {
            assert_eq!(Permission::parse(permission.tag()), Some(permission));
        }
        assert_eq!(Permission::parse("root"), None);
    }
}
