//! Purpose: Session façade wiring graph source, hints, registry, proxies,
//! and the event bridge.
//! Exports: `Engine`, `EngineBuilder`.
//! Role: The one object consumers hold by reference for a host session.
//! Invariants: Constructed once per host session, torn down with it; no
//! global state anywhere in the engine.
//! Invariants: `get` is synchronous and only meaningful after `wait_ready`.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;

use crate::api::bridge::EventBridge;
use crate::core::error::Error;
use crate::core::fingerprint::Fingerprint;
use crate::core::graph::{GraphSource, ModuleGraph};
use crate::core::hints::HintMap;
use crate::core::proxy::ProxyModel;
use crate::core::registry::{ExportRegistry, ResolveSummary};
use crate::core::resolve::ResolveOptions;
use crate::core::value::ExportValue;

pub struct Engine {
    host_version: String,
    source: GraphSource,
    hints: HintMap,
    registry: ExportRegistry,
    proxies: ProxyModel,
    bridge: EventBridge,
    ready_tx: watch::Sender<bool>,
}

pub struct EngineBuilder {
    host_version: String,
    hint_file: Option<PathBuf>,
    options: ResolveOptions,
}

impl EngineBuilder {
    /// Hint file to consult for this host version. Missing or unusable
    /// files degrade to full scans.
    pub fn hint_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.hint_file = Some(path.into());
        self
    }

    /// Enable the ambiguity advisory on every resolution. Authoring aid;
    /// makes each scan walk the whole graph.
    pub fn check_ambiguity(mut self) -> Self {
        self.options.check_ambiguity = true;
        self
    }

    pub fn build(self) -> Engine {
        let hints = match &self.hint_file {
            Some(path) => HintMap::load_or_empty(path, self.host_version.clone()),
            None => HintMap::empty(self.host_version.clone()),
        };
        let (ready_tx, _) = watch::channel(false);
        Engine {
            host_version: self.host_version,
            source: GraphSource::new(),
            hints,
            registry: ExportRegistry::with_options(self.options),
            proxies: ProxyModel::new(),
            bridge: EventBridge::new(),
            ready_tx,
        }
    }
}

impl Engine {
    pub fn builder(host_version: impl Into<String>) -> EngineBuilder {
        EngineBuilder {
            host_version: host_version.into(),
            hint_file: None,
            options: ResolveOptions::default(),
        }
    }

    pub fn new(host_version: impl Into<String>) -> Self {
        Self::builder(host_version).build()
    }

    pub fn host_version(&self) -> &str {
        &self.host_version
    }

    /// Declare a logical export. Hints recorded for this host version are
    /// attached automatically. Declarations made after injection resolve
    /// immediately; earlier ones wait for the injection pass.
    pub fn declare(&self, name: &str, fingerprint: Fingerprint) -> Result<(), Error> {
        let fingerprint = self.hints.apply(name, fingerprint);
        self.registry.register(name, fingerprint)?;
        if let Ok(graph) = self.source.snapshot() {
            self.registry.resolve_pending(&graph);
        }
        Ok(())
    }

    /// The host's readiness signal: capture the graph, run the resolution
    /// pass over everything declared so far, and release waiting
    /// consumers.
    pub fn inject(&self, graph: ModuleGraph) -> Result<ResolveSummary, Error> {
        self.source.inject(graph)?;
        let snapshot = self.source.snapshot()?;
        let summary = self.registry.resolve_pending(&snapshot);
        tracing::info!(
            host_version = %self.host_version,
            resolved = summary.resolved,
            failed = summary.failed.len(),
            "engine initialized"
        );
        let _ = self.ready_tx.send(true);
        Ok(summary)
    }

    /// Resolves once the injection pass has completed. No timeout; callers
    /// with a deadline race this against their own timer.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready_tx.subscribe();
        let _ = rx.wait_for(|ready| *ready).await;
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_tx.borrow()
    }

    /// Fetch a bound export by logical name.
    pub fn get(&self, name: &str) -> Result<ExportValue, Error> {
        self.registry.get(name)
    }

    /// Tear the session down: detach every event relay. The registry and
    /// graph die with the engine value itself.
    pub fn shutdown(&self) {
        self.bridge.shutdown();
        tracing::debug!(host_version = %self.host_version, "engine shut down");
    }

    pub fn graph(&self) -> Result<Arc<ModuleGraph>, Error> {
        self.source.snapshot()
    }

    pub fn source(&self) -> &GraphSource {
        &self.source
    }

    pub fn hints(&self) -> &HintMap {
        &self.hints
    }

    pub fn registry(&self) -> &ExportRegistry {
        &self.registry
    }

    pub fn proxies(&self) -> &ProxyModel {
        &self.proxies
    }

    pub fn bridge(&self) -> &EventBridge {
        &self.bridge
    }
}

#[cfg(test)]
mod tests {
    use super::Engine;
    use crate::core::error::ErrorKind;
    use crate::core::fingerprint::Fingerprint;
    use crate::core::graph::ModuleGraph;
    use crate::core::value::{DEFAULT_EXPORT, ExportValue, ModuleExports};
    use serde_json::json;

    fn one_module_graph() -> ModuleGraph {
        ModuleGraph::new().with(
            "5",
            ModuleExports::new().with(DEFAULT_EXPORT, ExportValue::Data(json!("payload"))),
        )
    }

    #[test]
    fn get_before_inject_is_unresolved() {
        let engine = Engine::new("2.3000.1");
        engine
            .declare("Thing", Fingerprint::matching(|m| m.has(DEFAULT_EXPORT)))
            .expect("declare");
        let err = engine.get("Thing").expect_err("pending");
        assert_eq!(err.kind(), ErrorKind::Unresolved);
        assert!(!engine.is_ready());
    }

    #[test]
    fn inject_resolves_declarations() {
        let engine = Engine::new("2.3000.1");
        engine
            .declare("Thing", Fingerprint::matching(|m| m.has(DEFAULT_EXPORT)))
            .expect("declare");

        let summary = engine.inject(one_module_graph()).expect("inject");
        assert_eq!(summary.resolved, 1);
        assert!(engine.is_ready());

        let value = engine.get("Thing").expect("bound");
        assert_eq!(value.as_data(), Some(&json!("payload")));
    }

    #[test]
    fn late_declaration_resolves_immediately() {
        let engine = Engine::new("2.3000.1");
        engine.inject(one_module_graph()).expect("inject");

        engine
            .declare("Late", Fingerprint::matching(|m| m.has(DEFAULT_EXPORT)))
            .expect("declare");
        assert!(engine.get("Late").is_ok());
    }

    #[tokio::test]
    async fn wait_ready_releases_after_resolution_pass() {
        let engine = std::sync::Arc::new(Engine::new("2.3000.1"));
        engine
            .declare("Thing", Fingerprint::matching(|m| m.has(DEFAULT_EXPORT)))
            .expect("declare");

        let waiter = {
            let engine = std::sync::Arc::clone(&engine);
            tokio::spawn(async move {
                engine.wait_ready().await;
                engine.get("Thing").is_ok()
            })
        };
        tokio::task::yield_now().await;

        engine.inject(one_module_graph()).expect("inject");
        assert!(waiter.await.expect("join"));
    }
}
