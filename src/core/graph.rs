//! Purpose: Hold the host's module graph and gate access on host readiness.
//! Exports: `ModuleId`, `ModuleGraph`, `GraphSource`.
//! Role: The engine's only view of the host's loaded-module collection.
//! Invariants: Identifiers are stable within one session, never across sessions.
//! Invariants: Iteration follows insertion order, so scans are deterministic.
//! Invariants: The graph is injected at most once and immutable once captured.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::core::error::{Error, ErrorKind};
use crate::core::value::ModuleExports;

/// Identifier the host assigned to a module in the running session. The
/// literal is opaque; the same logical module lands on a different one in
/// every host build.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(literal: impl Into<String>) -> Self {
        Self(literal.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(literal: &str) -> Self {
        Self::new(literal)
    }
}

impl From<String> for ModuleId {
    fn from(literal: String) -> Self {
        Self::new(literal)
    }
}

/// Flat collection of loaded modules in host insertion order, with an
/// index for the hint fast path.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    order: Vec<(ModuleId, ModuleExports)>,
    index: HashMap<ModuleId, usize>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module. Duplicate identifiers replace the exports in
    /// place, keeping the original scan position.
    pub fn insert(&mut self, id: ModuleId, exports: ModuleExports) {
        if let Some(&slot) = self.index.get(&id) {
            self.order[slot].1 = exports;
        } else {
            self.index.insert(id.clone(), self.order.len());
            self.order.push((id, exports));
        }
    }

    pub fn with(mut self, id: impl Into<ModuleId>, exports: ModuleExports) -> Self {
        self.insert(id.into(), exports);
        self
    }

    pub fn get(&self, id: &ModuleId) -> Option<&ModuleExports> {
        self.index.get(id).map(|&slot| &self.order[slot].1)
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, &ModuleExports)> {
        self.order.iter().map(|(id, exports)| (id, exports))
    }
}

/// Supplies the module graph once the host signals that its environment
/// has been injected. There is no timeout on readiness; callers that need
/// an upper bound race `ready()` against their own deadline.
pub struct GraphSource {
    graph: Mutex<Option<Arc<ModuleGraph>>>,
    ready_tx: watch::Sender<bool>,
}

impl GraphSource {
    pub fn new() -> Self {
        let (ready_tx, _) = watch::channel(false);
        Self {
            graph: Mutex::new(None),
            ready_tx,
        }
    }

    /// The host's readiness signal. Accepts the graph exactly once per
    /// session; a second injection is a usage error.
    pub fn inject(&self, graph: ModuleGraph) -> Result<(), Error> {
        let mut slot = self.graph.lock().expect("graph lock");
        if slot.is_some() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("module graph already injected for this session"));
        }
        tracing::debug!(modules = graph.len(), "module graph injected");
        *slot = Some(Arc::new(graph));
        drop(slot);
        let _ = self.ready_tx.send(true);
        Ok(())
    }

    /// Resolves once the graph is enumerable. Immediately resolved for
    /// sessions that already injected.
    pub async fn ready(&self) {
        let mut rx = self.ready_tx.subscribe();
        // wait_for errors only when the sender is dropped, and the sender
        // lives as long as `self`.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    pub fn is_ready(&self) -> bool {
        *self.ready_tx.borrow()
    }

    pub fn snapshot(&self) -> Result<Arc<ModuleGraph>, Error> {
        let slot = self.graph.lock().expect("graph lock");
        slot.clone().ok_or_else(|| {
            Error::new(ErrorKind::NotReady)
                .with_message("module graph requested before host readiness")
        })
    }
}

impl Default for GraphSource {
    fn default() -> Self {
        Self::new()
    }
}
