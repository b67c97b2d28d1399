use auricle_runtime::event_bus::{EventBus, OpenGate};
use auricle_runtime::rate_limit::TokenBucket;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use std::sync::Arc;

fn bench_token_bucket(c: &mut Criterion) {
    let bucket = TokenBucket::new(u32::MAX, 1_000_000.0);
    c.bench_function("token_bucket_try_consume", |b| {
        b.iter(|| black_box(bucket.try_consume()))
    });
}

fn bench_event_emission(c: &mut Criterion) {
    let bus = EventBus::new(Arc::new(OpenGate));
    for i in 0..16 {
        bus.on(&format!("plugin-{i}"), "timeUpdate", Arc::new(|_| Ok(())));
    }
    let payload = json!({"position": 12.5, "duration": 180.0});
    c.bench_function("event_bus_emit_16_listeners", |b| {
        b.iter(|| bus.emit(black_box("timeUpdate"), payload.clone()))
    });
}

fn bench_manifest_validation(c: &mut Criterion) {
    let raw = json!({
        "name": "Catalogue Search",
        "version": "1.2.0",
        "author": "bench",
        "type": "script",
        "entry": "index.js",
        "permissions": ["network-fetch", "scoped-storage", "ui-inject"],
        "category": "library",
        "cross_plugin_access": [{"plugin": "Lyrics", "methods": ["lyrics.fetch"]}]
    });
    c.bench_function("manifest_validation", |b| {
        b.iter(|| auricle_plugin_sdk::Manifest::from_value(black_box(&raw)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_token_bucket,
    bench_event_emission,
    bench_manifest_validation
);
criterion_main!(benches);
