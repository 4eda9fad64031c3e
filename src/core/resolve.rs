//! Purpose: Locate one logical export in the module graph with a fingerprint.
//! Exports: `ResolvedBinding`, `ResolveOptions`, `resolve`, `resolve_with`,
//! `matching_modules`.
//! Role: The scan itself; caching and at-most-once policy live in the registry.
//! Invariants: Scans run in graph insertion order; the first match wins.
//! Invariants: A valid hint binds in a single lookup, a stale one falls back
//! to the full scan and never fails the resolution.

use crate::core::error::{Error, ErrorKind};
use crate::core::fingerprint::Fingerprint;
use crate::core::graph::{ModuleGraph, ModuleId};
use crate::core::value::{ExportValue, ModuleExports};

#[derive(Clone, Debug)]
pub struct ResolvedBinding {
    pub name: String,
    pub value: ExportValue,
    pub source_id: ModuleId,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ResolveOptions {
    /// Keep scanning past the first hit and log an advisory when other
    /// modules would also match. Turns every resolution into a full scan,
    /// so it stays off outside fingerprint authoring.
    pub check_ambiguity: bool,
}

pub fn resolve(
    name: &str,
    fingerprint: &Fingerprint,
    graph: &ModuleGraph,
) -> Result<ResolvedBinding, Error> {
    resolve_with(name, fingerprint, graph, ResolveOptions::default())
}

pub fn resolve_with(
    name: &str,
    fingerprint: &Fingerprint,
    graph: &ModuleGraph,
    options: ResolveOptions,
) -> Result<ResolvedBinding, Error> {
    if let Some(hint) = fingerprint.hint() {
        match graph.get(hint) {
            Some(exports) if fingerprint.matches(exports) => {
                tracing::debug!(name, module = %hint, "hint hit, skipping scan");
                return bind(name, fingerprint, hint.clone(), exports);
            }
            _ => {
                tracing::debug!(name, module = %hint, "stale hint, falling back to scan");
            }
        }
    }

    let mut first: Option<&ModuleId> = None;
    let mut also: Vec<&ModuleId> = Vec::new();
    for (id, exports) in graph.iter() {
        if !fingerprint.matches(exports) {
            continue;
        }
        if first.is_none() {
            first = Some(id);
            if !options.check_ambiguity {
                break;
            }
        } else {
            also.push(id);
        }
    }

    let Some(id) = first else {
        return Err(Error::new(ErrorKind::NotFound)
            .with_message("no module satisfied the fingerprint")
            .with_name(name));
    };

    if !also.is_empty() {
        let others: Vec<&str> = also.iter().map(|id| id.as_str()).collect();
        tracing::warn!(
            name,
            bound = %id,
            ?others,
            "fingerprint is ambiguous; first match kept"
        );
    }

    let exports = graph.get(id).expect("scanned module present");
    bind(name, fingerprint, id.clone(), exports)
}

/// Every module the fingerprint would accept, in scan order. Authoring and
/// test aid; resolution itself stops at the first.
pub fn matching_modules(fingerprint: &Fingerprint, graph: &ModuleGraph) -> Vec<ModuleId> {
    graph
        .iter()
        .filter(|(_, exports)| fingerprint.matches(exports))
        .map(|(id, _)| id.clone())
        .collect()
}

fn bind(
    name: &str,
    fingerprint: &Fingerprint,
    source_id: ModuleId,
    exports: &ModuleExports,
) -> Result<ResolvedBinding, Error> {
    let Some(value) = fingerprint.select(exports) else {
        return Err(Error::new(ErrorKind::NotFound)
            .with_message("matched module yielded no export under the selector")
            .with_name(name)
            .with_module(source_id.as_str()));
    };
    Ok(ResolvedBinding {
        name: name.to_string(),
        value,
        source_id,
    })
}
