//! Purpose: Stable namespace of logical exports over the volatile graph.
//! Exports: `ExportRegistry`, `ExportState`, `ExportStatus`, `ResolveSummary`.
//! Role: Owns the unresolved→resolved lifecycle; consumers import from here,
//! never from the graph directly.
//! Invariants: A name resolves at most once per session; failures are
//! permanent, never retried.
//! Invariants: Successful resolution is observable exactly once per name via
//! the registry emitter.
//! Invariants: One name's failure never aborts resolution of the others.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::json;

use crate::core::error::{Error, ErrorKind};
use crate::core::events::Emitter;
use crate::core::fingerprint::Fingerprint;
use crate::core::graph::ModuleGraph;
use crate::core::resolve::{ResolveOptions, ResolvedBinding, resolve_with};
use crate::core::value::ExportValue;

/// Event emitted once per successfully resolved name.
pub const RESOLVED_EVENT: &str = "resolved";

enum Slot {
    Declared(Fingerprint),
    Resolved(ResolvedBinding),
    Failed { message: String },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Pending,
    Resolved,
    Failed,
}

/// Introspection view of one declared name.
#[derive(Clone, Debug, Serialize)]
pub struct ExportState {
    pub status: ExportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResolveSummary {
    pub resolved: usize,
    pub failed: Vec<String>,
}

pub struct ExportRegistry {
    slots: Mutex<BTreeMap<String, Slot>>,
    events: Emitter,
    options: ResolveOptions,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::with_options(ResolveOptions::default())
    }

    pub fn with_options(options: ResolveOptions) -> Self {
        Self {
            slots: Mutex::new(BTreeMap::new()),
            events: Emitter::new("registry"),
            options,
        }
    }

    /// Declare a logical export ahead of resolution. Names bind once; a
    /// duplicate declaration is rejected rather than silently re-bound.
    pub fn register(&self, name: &str, fingerprint: Fingerprint) -> Result<(), Error> {
        let mut slots = self.slots.lock().expect("registry lock");
        if slots.contains_key(name) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("logical export already declared")
                .with_name(name));
        }
        slots.insert(name.to_string(), Slot::Declared(fingerprint));
        Ok(())
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.slots.lock().expect("registry lock").contains_key(name)
    }

    /// Run the resolution pass over every still-pending declaration.
    /// Already-resolved and already-failed names are left untouched, so
    /// calling this again after late declarations is safe.
    pub fn resolve_pending(&self, graph: &ModuleGraph) -> ResolveSummary {
        let pending: Vec<(String, Fingerprint)> = {
            let slots = self.slots.lock().expect("registry lock");
            slots
                .iter()
                .filter_map(|(name, slot)| match slot {
                    Slot::Declared(fingerprint) => Some((name.clone(), fingerprint.clone())),
                    _ => None,
                })
                .collect()
        };

        let mut summary = ResolveSummary::default();
        let mut resolved: Vec<ResolvedBinding> = Vec::new();
        for (name, fingerprint) in pending {
            match resolve_with(&name, &fingerprint, graph, self.options) {
                Ok(binding) => resolved.push(binding),
                Err(err) => {
                    tracing::warn!(name = %name, error = %err, "export resolution failed");
                    summary.failed.push(name.clone());
                    let mut slots = self.slots.lock().expect("registry lock");
                    slots.insert(
                        name,
                        Slot::Failed {
                            message: err.to_string(),
                        },
                    );
                }
            }
        }

        for binding in resolved {
            let payload = json!({
                "name": binding.name,
                "module": binding.source_id.as_str(),
            });
            {
                let mut slots = self.slots.lock().expect("registry lock");
                slots.insert(binding.name.clone(), Slot::Resolved(binding));
            }
            summary.resolved += 1;
            // Emitted outside the lock so listeners may read the registry.
            self.events.emit(RESOLVED_EVENT, &payload);
        }

        tracing::debug!(
            resolved = summary.resolved,
            failed = summary.failed.len(),
            "resolution pass complete"
        );
        summary
    }

    /// Fetch a bound export. Pending and permanently failed names both
    /// surface as `Unresolved`; the message tells them apart. Undeclared
    /// names are a usage error so typos are not mistaken for churn.
    pub fn get(&self, name: &str) -> Result<ExportValue, Error> {
        self.binding(name).map(|binding| binding.value)
    }

    pub fn binding(&self, name: &str) -> Result<ResolvedBinding, Error> {
        let slots = self.slots.lock().expect("registry lock");
        match slots.get(name) {
            None => Err(Error::new(ErrorKind::Usage)
                .with_message("logical export was never declared")
                .with_name(name)),
            Some(Slot::Declared(_)) => Err(Error::new(ErrorKind::Unresolved)
                .with_message("declared but not resolved yet; await initialization")
                .with_name(name)),
            Some(Slot::Failed { message }) => Err(Error::new(ErrorKind::Unresolved)
                .with_message(format!("resolution failed permanently: {message}"))
                .with_name(name)),
            Some(Slot::Resolved(binding)) => Ok(binding.clone()),
        }
    }

    pub fn state(&self, name: &str) -> Option<ExportState> {
        let slots = self.slots.lock().expect("registry lock");
        slots.get(name).map(state_of)
    }

    /// Snapshot of every declared name, for introspection and offline
    /// tooling. Serializes to stable JSON (names are sorted).
    pub fn all(&self) -> BTreeMap<String, ExportState> {
        let slots = self.slots.lock().expect("registry lock");
        slots
            .iter()
            .map(|(name, slot)| (name.clone(), state_of(slot)))
            .collect()
    }

    /// Registry lifecycle events (`resolved`).
    pub fn events(&self) -> &Emitter {
        &self.events
    }
}

impl Default for ExportRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn state_of(slot: &Slot) -> ExportState {
    match slot {
        Slot::Declared(_) => ExportState {
            status: ExportStatus::Pending,
            module: None,
        },
        Slot::Resolved(binding) => ExportState {
            status: ExportStatus::Resolved,
            module: Some(binding.source_id.as_str().to_string()),
        },
        Slot::Failed { .. } => ExportState {
            status: ExportStatus::Failed,
            module: None,
        },
    }
}
