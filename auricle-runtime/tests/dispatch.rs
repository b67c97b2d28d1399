//! Dispatcher-level behaviour: gating, side effects on host services,
//! and the capability-closure invariant.

mod support;

use auricle_plugin_sdk::api::expected_method_keys;
use auricle_plugin_sdk::events::names;
use auricle_plugin_sdk::host::HostServices;
use auricle_plugin_sdk::instance::PluginInstance;
use auricle_plugin_sdk::models::{ProxyRequest, ProxyResponse};
use auricle_plugin_sdk::HostCall;
use auricle_runtime::config::RateLimitConfig;
use auricle_runtime::HOST_OWNER;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use support::{native_manifest, script_manifest, track, Fixture, RecordingPlugin};

/// Invariant 1: the capability object's method groups equal the
/// host-defined projection of the granted permissions.
#[tokio::test]
async fn capability_closure_holds_for_loaded_plugins() {
    let fixture = Fixture::new();
    let grants: [&[&str]; 4] = [
        &[],
        &["player-read", "player-control"],
        &["scoped-storage", "network-fetch"],
        &["library-read", "library-write", "lyrics-read", "notifications"],
    ];

    for (i, permissions) in grants.iter().enumerate() {
        let name = format!("Closure {i}");
        let plugin = RecordingPlugin::new();
        fixture
            .load_script_plugin(script_manifest(&name, permissions), Arc::clone(&plugin))
            .await
            .unwrap();

        let granted = fixture.runtime.ledger().granted_for(&name);
        assert_eq!(
            plugin.api().method_keys(),
            expected_method_keys(&granted),
            "projection mismatch for grant set {i}"
        );
    }
}

/// Invariant 2: a call from a name not in the plugins map fails softly
/// and never reaches host services.
#[tokio::test]
async fn dispatch_from_unknown_caller_is_neutral() {
    let fixture = Fixture::new();
    let reply = fixture
        .runtime
        .dispatch_port()
        .dispatch("ghost", HostCall::PlayerTogglePlay)
        .await
        .unwrap();
    assert!(reply.is_null());
    assert!(!fixture.host.playback_state().await.playing);
}

/// `player.setTrack` installs the track and delivers `trackChange` with
/// the previous value before the call returns.
#[tokio::test]
async fn set_track_emits_track_change_with_previous() {
    let fixture = Fixture::new();
    let plugin = RecordingPlugin::new();
    fixture
        .load_script_plugin(
            script_manifest("DJ", &["player-control", "player-read"]),
            Arc::clone(&plugin),
        )
        .await
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    fixture.runtime.events().on(
        HOST_OWNER,
        names::TRACK_CHANGE,
        Arc::new(move |payload| {
            sink.lock().unwrap().push(payload);
            Ok(())
        }),
    );

    let control = plugin.api().player_control.unwrap();
    control.set_track(track("t1", "First")).await.unwrap();
    control.set_track(track("t2", "Second")).await.unwrap();

    let events = seen.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert!(events[0]["previous"].is_null());
    assert_eq!(events[0]["current"]["id"], "t1");
    assert_eq!(events[1]["previous"]["id"], "t1");
    assert_eq!(events[1]["current"]["id"], "t2");
}

/// A successful download triggers a rescan of its directory; a failing
/// scanner is logged but the download still reports its path.
#[tokio::test]
async fn download_triggers_rescan_and_survives_rescan_failure() {
    let fixture = Fixture::new();
    let plugin = RecordingPlugin::new();
    fixture
        .load_script_plugin(script_manifest("Fetcher", &["library-write"]), Arc::clone(&plugin))
        .await
        .unwrap();

    let library = plugin.api().library_write.unwrap();
    let saved = library
        .download_track("https://cdn.example/song.ogg", "song.ogg")
        .await
        .unwrap();
    assert_eq!(saved.as_deref(), Some("/music/downloads/song.ogg"));
    assert_eq!(fixture.host.rescans(), vec![PathBuf::from("/music/downloads")]);

    fixture.host.fail_rescans(true);
    let saved = library
        .download_track("https://cdn.example/other.ogg", "other.ogg")
        .await
        .unwrap();
    assert_eq!(saved.as_deref(), Some("/music/downloads/other.ogg"));
    assert_eq!(fixture.host.downloads().len(), 2);
}

/// `storage.set` burns a storage token on top of the api token;
/// exhaustion reads as `false`, not an error.
#[tokio::test]
async fn storage_writes_are_rate_limited_separately() {
    let fixture = Fixture::with_rate_limits(RateLimitConfig {
        api_capacity: 30,
        api_refill_per_sec: 0.0,
        storage_capacity: 1,
        storage_refill_per_sec: 0.0,
    });
    let plugin = RecordingPlugin::new();
    fixture
        .load_script_plugin(script_manifest("Saver", &["scoped-storage"]), Arc::clone(&plugin))
        .await
        .unwrap();

    let storage = plugin.api().storage.unwrap();
    assert!(storage.set("first", "1").await.unwrap());
    assert!(!storage.set("second", "2").await.unwrap());
    // Reads stay available; only the write channel is spent.
    assert_eq!(storage.get("first").await.unwrap().as_deref(), Some("1"));
}

/// `fetch` proxies through host services and exposes the
/// response-shaped record.
#[tokio::test]
async fn fetch_proxies_through_the_host() {
    let fixture = Fixture::new();
    fixture.host.push_proxy_reply(ProxyResponse {
        status: 200,
        headers: HashMap::from([("content-type".to_string(), "application/json".to_string())]),
        body: r#"{"hits": 2}"#.to_string(),
    });

    let plugin = RecordingPlugin::new();
    fixture
        .load_script_plugin(script_manifest("Search", &["network-fetch"]), Arc::clone(&plugin))
        .await
        .unwrap();

    let response = plugin
        .api()
        .fetch
        .unwrap()
        .fetch(ProxyRequest::get("https://catalogue.example/search?q=x"))
        .await
        .unwrap()
        .expect("not rate limited");

    assert!(response.ok);
    assert_eq!(response.status, 200);
    assert_eq!(response.json().unwrap()["hits"], 2);
    assert_eq!(response.text(), r#"{"hits": 2}"#);
}

/// `settings.setDownloadLocation` reports whether the host setter was
/// available.
#[tokio::test]
async fn set_download_location_reports_setter_availability() {
    let fixture = Fixture::new();
    let plugin = RecordingPlugin::new();
    fixture
        .load_script_plugin(script_manifest("Settings", &["settings-write"]), Arc::clone(&plugin))
        .await
        .unwrap();

    let settings = plugin.api().settings.unwrap();
    assert!(settings.set_download_location("/new/downloads").await.unwrap());
    assert_eq!(
        fixture.host.download_location(),
        Some(PathBuf::from("/new/downloads"))
    );

    fixture.host.disable_download_setter();
    assert!(!settings.set_download_location("/other").await.unwrap());
}

/// Registering twice in the same slot keeps one entry per owner.
#[tokio::test]
async fn ui_slot_registration_replaces_per_owner() {
    let fixture = Fixture::new();
    let plugin = RecordingPlugin::new();
    fixture
        .load_script_plugin(script_manifest("Widget", &["ui-inject"]), Arc::clone(&plugin))
        .await
        .unwrap();

    let ui = plugin.api().ui.unwrap();
    assert!(ui.register_slot("player-bar-menu", "<b>v1</b>", Some(10)).await.unwrap());
    assert!(ui.register_slot("player-bar-menu", "<b>v2</b>", Some(10)).await.unwrap());

    let entries = fixture
        .runtime
        .slots()
        .entries_for(auricle_runtime::UiSlot::PlayerBarMenu);
    assert_eq!(entries.len(), 1);
    assert!(entries[0].fragment.contains("<b>v2</b>"));

    // Unknown slot names degrade to a neutral failure.
    assert!(!ui.register_slot("toolbar", "<b>x</b>", None).await.unwrap());
}

/// Lyrics and notification capabilities round-trip through the host.
#[tokio::test]
async fn lyrics_and_notifications_reach_the_host() {
    let fixture = Fixture::new();
    let plugin = RecordingPlugin::new();
    fixture
        .load_script_plugin(
            script_manifest("Lyricist", &["lyrics-read", "lyrics-write", "notifications"]),
            Arc::clone(&plugin),
        )
        .await
        .unwrap();

    let api = plugin.api();
    api.lyrics_write
        .as_ref()
        .unwrap()
        .set("t1", "la la la")
        .await
        .unwrap();
    assert_eq!(
        api.lyrics.as_ref().unwrap().get("t1").await.unwrap().as_deref(),
        Some("la la la")
    );
    assert_eq!(api.lyrics.as_ref().unwrap().get("t2").await.unwrap(), None);

    api.notify
        .as_ref()
        .unwrap()
        .show("Lyrics saved", "t1 updated")
        .await
        .unwrap();
    assert_eq!(
        fixture.host.notifications(),
        vec![("Lyrics saved".to_string(), "t1 updated".to_string())]
    );
}

/// Native plugins receive only permission-filtered imports and load
/// through the same lifecycle.
#[tokio::test]
async fn native_plugin_imports_are_permission_filtered() {
    let fixture = Fixture::new();
    let manifest = native_manifest("Visualizer", &["player-read", "scoped-storage"]);

    // The loader fetches bytes before instantiating.
    fixture.install_artifact(&manifest.safe_name, &manifest.entry, "\0asm");
    let plugin = RecordingPlugin::new();
    fixture
        .natives
        .program("Visualizer", Arc::clone(&plugin) as Arc<dyn PluginInstance>, 64 * 1024);

    fixture.runtime.load_plugin(manifest).await.unwrap();
    assert!(fixture.runtime.is_loaded("Visualizer"));

    let imports = fixture.natives.imports_for("Visualizer");
    assert!(imports.contains(&"player.getState"));
    assert!(imports.contains(&"storage.get"));
    assert!(imports.contains(&"theme.refresh"));
    assert!(!imports.contains(&"player.togglePlay"));
    assert!(!imports.contains(&"http.fetch"));

    // The instance got its capability object like any script plugin.
    assert!(plugin.api().player.is_some());
    assert!(plugin.api().player_control.is_none());

    fixture.runtime.unload_plugin("Visualizer").await.unwrap();
    assert!(!fixture.runtime.is_loaded("Visualizer"));
}

/// `theme.refresh` stays callable with no permissions at all.
#[tokio::test]
async fn theme_refresh_is_always_available() {
    let fixture = Fixture::new();
    let plugin = RecordingPlugin::new();
    fixture
        .load_script_plugin(script_manifest("Themer", &[]), Arc::clone(&plugin))
        .await
        .unwrap();

    plugin.api().theme.refresh().await.unwrap();
    assert_eq!(fixture.host.theme_refreshes(), 1);
}
