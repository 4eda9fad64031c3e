//! Purpose: Describe how to recognize one logical export inside the graph.
//! Exports: `Fingerprint`, `PredicateFn`, `SelectorFn`.
//! Role: Declarative predicate/selector pair, the unit of the catalog tables.
//! Invariants: Predicates are pure functions of a module's exports; no side
//! effects, no reliance on scan order.
//! Invariants: Selectors only extract; they never mutate the module.

use std::fmt;
use std::sync::Arc;

use crate::core::graph::ModuleId;
use crate::core::value::{DEFAULT_EXPORT, ClassHandle, ExportValue, ModuleExports};

pub type PredicateFn = Arc<dyn Fn(&ModuleExports) -> bool + Send + Sync>;
pub type SelectorFn = Arc<dyn Fn(&ModuleExports) -> Option<ExportValue> + Send + Sync>;

#[derive(Clone)]
pub struct Fingerprint {
    predicate: PredicateFn,
    selector: SelectorFn,
    hint: Option<ModuleId>,
}

impl Fingerprint {
    /// Fingerprint with the given predicate, selecting the `default`
    /// export. Most singletons bind this way.
    pub fn matching(predicate: impl Fn(&ModuleExports) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Arc::new(predicate),
            selector: Arc::new(|exports| exports.default_export().cloned()),
            hint: None,
        }
    }

    /// Singleton probe: the `default` export must be a live instance of
    /// `class_name`.
    pub fn instance_of_default(class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        Self::matching(move |exports| exports.instance_of(DEFAULT_EXPORT, &class_name))
    }

    /// Select a named export instead of `default`.
    pub fn select_export(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.selector = Arc::new(move |exports| exports.get(&name).cloned());
        self
    }

    /// Select the first present export from a preference chain. Hosts
    /// rename exports across releases; the chain absorbs that churn.
    pub fn select_first_of(mut self, names: &[&str]) -> Self {
        let names: Vec<String> = names.iter().map(|name| name.to_string()).collect();
        self.selector = Arc::new(move |exports| {
            names.iter().find_map(|name| exports.get(name).cloned())
        });
        self
    }

    /// Select the class of the instance exported under `name`. Used when
    /// the module publishes a singleton but the binding wants its type.
    pub fn select_class_of(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.selector = Arc::new(move |exports| {
            exports
                .get(&name)
                .and_then(ExportValue::as_instance)
                .map(|instance| ExportValue::Class(ClassHandle::new(instance.class_name())))
        });
        self
    }

    pub fn select_with(
        mut self,
        selector: impl Fn(&ModuleExports) -> Option<ExportValue> + Send + Sync + 'static,
    ) -> Self {
        self.selector = Arc::new(selector);
        self
    }

    /// Attach a module identifier remembered from a previous session of
    /// the same host version. Invalid hints cost one wasted lookup.
    pub fn with_hint(mut self, hint: impl Into<ModuleId>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn set_hint(&mut self, hint: Option<ModuleId>) {
        self.hint = hint;
    }

    pub fn hint(&self) -> Option<&ModuleId> {
        self.hint.as_ref()
    }

    pub fn matches(&self, exports: &ModuleExports) -> bool {
        (self.predicate)(exports)
    }

    pub fn select(&self, exports: &ModuleExports) -> Option<ExportValue> {
        (self.selector)(exports)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fingerprint")
            .field("hint", &self.hint)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::Fingerprint;
    use crate::core::instance::LiveInstance;
    use crate::core::value::{DEFAULT_EXPORT, ExportValue, HostFunction, ModuleExports};
    use serde_json::json;

    fn query_exists_module() -> ModuleExports {
        ModuleExports::new().with(
            "queryExists",
            ExportValue::Function(HostFunction::new(
                "queryExists",
                "function(e){throw new Error(\"Should not reach queryExists stub\")}",
                |_| Ok(json!({"exists": true})),
            )),
        )
    }

    #[test]
    fn default_selector_picks_default_export() {
        let exports = ModuleExports::new().with(DEFAULT_EXPORT, ExportValue::Data(json!(42)));
        let fingerprint = Fingerprint::matching(|m| m.has(DEFAULT_EXPORT));
        assert!(fingerprint.matches(&exports));
        let value = fingerprint.select(&exports).expect("selected");
        assert_eq!(value.as_data(), Some(&json!(42)));
    }

    #[test]
    fn select_first_of_walks_the_chain() {
        let fingerprint = Fingerprint::matching(|m| {
            m.signature_contains("queryExists", "Should not reach queryExists stub")
        })
        .select_first_of(&["queryExists", DEFAULT_EXPORT]);

        let exports = query_exists_module();
        assert!(fingerprint.matches(&exports));
        let value = fingerprint.select(&exports).expect("selected");
        assert_eq!(value.as_function().map(|f| f.name()), Some("queryExists"));
    }

    #[test]
    fn instance_of_default_probes_class() {
        let store = LiveInstance::of("ChatCollection").identity("chats").build();
        let exports = ModuleExports::new().with(DEFAULT_EXPORT, ExportValue::Instance(store));

        assert!(Fingerprint::instance_of_default("ChatCollection").matches(&exports));
        assert!(!Fingerprint::instance_of_default("MsgCollection").matches(&exports));
    }

    #[test]
    fn select_class_of_extracts_instance_class() {
        let store = LiveInstance::of("GroupMetadataCollection")
            .identity("groups")
            .method("handlePendingInvite", |_, _| Ok(json!(null)))
            .build();
        let exports = ModuleExports::new().with(DEFAULT_EXPORT, ExportValue::Instance(store));

        let fingerprint = Fingerprint::matching(|m| {
            m.instance_with_method(DEFAULT_EXPORT, "handlePendingInvite")
        })
        .select_class_of(DEFAULT_EXPORT);

        let value = fingerprint.select(&exports).expect("selected");
        assert_eq!(
            value.as_class().map(|class| class.name()),
            Some("GroupMetadataCollection")
        );
    }
}
