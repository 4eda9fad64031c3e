//! Purpose: Declarative binding tables for a messaging-style host.
//! Exports: `declare_all`, store/function fingerprint tables, record
//! descriptors, collection event names.
//! Role: The data the engine runs on; mechanical by design so new host
//! releases only touch these tables.
//! Invariants: Tables declare, the engine resolves; nothing here inspects
//! the graph directly.

pub mod functions;
pub mod records;
pub mod stores;

use crate::api::Engine;
use crate::core::error::Error;

/// Lifecycle events the host's collections emit.
pub mod events {
    pub const COLLECTION_HAS_SYNCED: &str = "collection_has_synced";
    pub const ADD: &str = "add";
    pub const CHANGE: &str = "change";
    pub const REMOVE: &str = "remove";
}

/// Declare every cataloged binding and descriptor on a fresh engine.
/// Called once per session, before the host injects its graph.
pub fn declare_all(engine: &Engine) -> Result<(), Error> {
    for (name, fingerprint) in stores::store_fingerprints() {
        engine.declare(&name, fingerprint)?;
    }
    for (name, fingerprint) in stores::collection_class_fingerprints() {
        engine.declare(&name, fingerprint)?;
    }
    for (name, fingerprint) in functions::function_fingerprints() {
        engine.declare(&name, fingerprint)?;
    }
    records::register_descriptors(engine.proxies())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::declare_all;
    use crate::api::Engine;

    #[test]
    fn declare_all_is_collision_free() {
        let engine = Engine::new("2.3000.1");
        declare_all(&engine).expect("all names distinct");
        assert!(engine.registry().is_declared("ChatStore"));
        assert!(engine.registry().is_declared("QueryExists"));
    }
}
