//! Purpose: Model the dynamic values a host module can export.
//! Exports: `ExportValue`, `HostFunction`, `ClassHandle`, `ModuleExports`.
//! Role: Typed stand-in for the host runtime's untyped export objects.
//! Invariants: Probe helpers are pure reads; they never mutate or invoke exports.
//! Invariants: Function signatures are opaque text; the engine only substring-matches them.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::core::error::Error;
use crate::core::instance::LiveInstance;

/// Export key the host assigns to a module's primary value.
pub const DEFAULT_EXPORT: &str = "default";

pub type HostFn = Arc<dyn Fn(&[Value]) -> Result<Value, Error> + Send + Sync>;

/// A callable the host compiled into some module. The signature is the
/// compiled source text; fingerprints match markers inside it because the
/// host strips every other identifier between releases.
#[derive(Clone)]
pub struct HostFunction {
    name: String,
    signature: String,
    call: HostFn,
}

impl HostFunction {
    pub fn new(
        name: impl Into<String>,
        signature: impl Into<String>,
        call: impl Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            signature: signature.into(),
            call: Arc::new(call),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn invoke(&self, args: &[Value]) -> Result<Value, Error> {
        (self.call)(args)
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Identity of a host class. Instances point back at it by name; the
/// engine never constructs host objects, so nothing else is carried.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClassHandle {
    name: String,
}

impl ClassHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug)]
pub enum ExportValue {
    Data(Value),
    Function(HostFunction),
    Class(ClassHandle),
    Instance(Arc<LiveInstance>),
}

impl ExportValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ExportValue::Data(_) => "data",
            ExportValue::Function(_) => "function",
            ExportValue::Class(_) => "class",
            ExportValue::Instance(_) => "instance",
        }
    }

    pub fn as_data(&self) -> Option<&Value> {
        match self {
            ExportValue::Data(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&HostFunction> {
        match self {
            ExportValue::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassHandle> {
        match self {
            ExportValue::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Arc<LiveInstance>> {
        match self {
            ExportValue::Instance(instance) => Some(instance),
            _ => None,
        }
    }
}

/// The named exports of one module, in host declaration order.
#[derive(Clone, Debug, Default)]
pub struct ModuleExports {
    entries: Vec<(String, ExportValue)>,
}

impl ModuleExports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an export. Last write wins, order of first insertion
    /// is kept, matching how the host publishes re-assigned exports.
    pub fn insert(&mut self, name: impl Into<String>, value: ExportValue) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: ExportValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ExportValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn default_export(&self) -> Option<&ExportValue> {
        self.get(DEFAULT_EXPORT)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the named export exists and is callable.
    pub fn has_function(&self, name: &str) -> bool {
        matches!(self.get(name), Some(ExportValue::Function(_)))
    }

    /// True when the named export is a function whose compiled source
    /// contains `marker`. Missing or non-function exports are false.
    pub fn signature_contains(&self, name: &str, marker: &str) -> bool {
        match self.get(name) {
            Some(ExportValue::Function(function)) => function.signature().contains(marker),
            _ => false,
        }
    }

    /// True when the named export is a live instance of `class_name`.
    pub fn instance_of(&self, name: &str, class_name: &str) -> bool {
        match self.get(name) {
            Some(ExportValue::Instance(instance)) => instance.class_name() == class_name,
            _ => false,
        }
    }

    /// True when the named export is a live instance carrying `method`.
    /// This is the classic probe for unlabeled singletons: the class name
    /// churns, the behavioral surface does not.
    pub fn instance_with_method(&self, name: &str, method: &str) -> bool {
        match self.get(name) {
            Some(ExportValue::Instance(instance)) => instance.has_method(method),
            _ => false,
        }
    }
}
