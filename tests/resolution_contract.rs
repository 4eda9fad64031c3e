// Resolution-policy contract: first-match scans, hint fast paths, cached
// bindings, and permanent per-name failures.
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use anchorite::api::{
    DEFAULT_EXPORT, Engine, ErrorKind, ExportStatus, ExportValue, Fingerprint, LiveInstance,
    ModuleExports, ModuleGraph, matching_modules, resolve,
};

fn data_module(value: serde_json::Value) -> ModuleExports {
    ModuleExports::new().with(DEFAULT_EXPORT, ExportValue::Data(value))
}

fn invite_collection_module() -> ModuleExports {
    let collection = LiveInstance::of("GroupMetadataCollection")
        .identity("groups")
        .method("handlePendingInvite", |_, _| Ok(json!("handled")))
        .build();
    ModuleExports::new().with(DEFAULT_EXPORT, ExportValue::Instance(collection))
}

#[test]
fn pending_invite_probe_binds_the_second_module() {
    let graph = ModuleGraph::new()
        .with("1", data_module(json!({"foo": 1})))
        .with("2", invite_collection_module());

    let fingerprint =
        Fingerprint::matching(|m| m.instance_with_method(DEFAULT_EXPORT, "handlePendingInvite"));
    let binding = resolve("GroupMetadataStore", &fingerprint, &graph).expect("resolved");

    assert_eq!(binding.source_id.as_str(), "2");
    let store = binding.value.as_instance().expect("instance");
    assert_eq!(
        store.invoke("handlePendingInvite", &[]).expect("invoke"),
        json!("handled")
    );
}

#[test]
fn unmatched_name_is_pending_then_permanently_failed() {
    let engine = Engine::new("2.3000.1");
    engine
        .declare("X", Fingerprint::matching(|m| m.has_function("neverExported")))
        .expect("declare");

    // Before the resolution pass: recoverable, await initialization.
    let err = engine.get("X").expect_err("pending");
    assert_eq!(err.kind(), ErrorKind::Unresolved);

    let summary = engine
        .inject(ModuleGraph::new().with("1", data_module(json!(1))))
        .expect("inject");
    assert_eq!(summary.failed, vec!["X".to_string()]);

    // After the pass: still unresolved, permanently.
    let err = engine.get("X").expect_err("failed");
    assert_eq!(err.kind(), ErrorKind::Unresolved);
    assert!(err.message().unwrap_or("").contains("permanently"));
    assert_eq!(
        engine.registry().state("X").map(|state| state.status),
        Some(ExportStatus::Failed)
    );
}

#[test]
fn valid_hint_resolves_in_one_lookup() {
    let graph = ModuleGraph::new()
        .with("1", data_module(json!(1)))
        .with("2", data_module(json!(2)))
        .with("3", invite_collection_module());

    let probes = Arc::new(AtomicUsize::new(0));
    let fingerprint = {
        let probes = Arc::clone(&probes);
        Fingerprint::matching(move |m| {
            probes.fetch_add(1, Ordering::SeqCst);
            m.instance_with_method(DEFAULT_EXPORT, "handlePendingInvite")
        })
        .with_hint("3")
    };

    let binding = resolve("GroupMetadataStore", &fingerprint, &graph).expect("resolved");
    assert_eq!(binding.source_id.as_str(), "3");
    assert_eq!(probes.load(Ordering::SeqCst), 1);
}

#[test]
fn resolved_names_never_rescan() {
    let engine = Engine::new("2.3000.1");
    let probes = Arc::new(AtomicUsize::new(0));
    {
        let probes = Arc::clone(&probes);
        engine
            .declare(
                "Padding",
                Fingerprint::matching(move |m| {
                    probes.fetch_add(1, Ordering::SeqCst);
                    m.has(DEFAULT_EXPORT)
                }),
            )
            .expect("declare");
    }

    engine
        .inject(ModuleGraph::new().with("9", data_module(json!("x"))))
        .expect("inject");
    let scans = probes.load(Ordering::SeqCst);
    assert!(scans >= 1);

    let first = engine.get("Padding").expect("bound");
    let second = engine.get("Padding").expect("bound");
    assert_eq!(first.as_data(), second.as_data());
    assert_eq!(probes.load(Ordering::SeqCst), scans);
}

#[test]
fn first_match_wins_and_ambiguity_is_reportable() {
    let graph = ModuleGraph::new()
        .with("a", data_module(json!("first")))
        .with("b", data_module(json!("second")));
    let fingerprint = Fingerprint::matching(|m| m.has(DEFAULT_EXPORT));

    let matches = matching_modules(&fingerprint, &graph);
    let ids: Vec<&str> = matches.iter().map(|id| id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);

    let binding = resolve("Either", &fingerprint, &graph).expect("resolved");
    assert_eq!(binding.source_id.as_str(), "a");
    assert_eq!(binding.value.as_data(), Some(&json!("first")));
}

#[test]
fn distinct_names_may_share_one_export() {
    let engine = Engine::new("2.3000.1");
    let probe = || Fingerprint::matching(|m| m.instance_with_method(DEFAULT_EXPORT, "handlePendingInvite"));
    engine.declare("GroupMetadataStore", probe()).expect("declare");
    engine.declare("PendingInviteStore", probe()).expect("declare alias");

    engine
        .inject(ModuleGraph::new().with("2", invite_collection_module()))
        .expect("inject");

    let a = engine.registry().binding("GroupMetadataStore").expect("a");
    let b = engine.registry().binding("PendingInviteStore").expect("b");
    assert_eq!(a.source_id, b.source_id);

    let a = a.value.as_instance().expect("instance").clone();
    let b = b.value.as_instance().expect("instance").clone();
    assert!(Arc::ptr_eq(&a, &b));
}
