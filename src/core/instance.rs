//! Purpose: Model a host-owned stateful object the engine observes and wraps.
//! Exports: `LiveInstance`, `InstanceBuilder`, `InstanceMethod`.
//! Role: The shared mutable boundary between the host and the engine.
//! Invariants: State is never copied out; every read sees the fields as they
//! are at call time, every write lands on the instance itself.
//! Invariants: The host may mutate fields and emit events at any point; the
//! engine provides pass-through access, not isolation.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value, json};

use crate::core::error::{Error, ErrorKind};
use crate::core::events::Emitter;

pub type InstanceMethod = Arc<dyn Fn(&LiveInstance, &[Value]) -> Result<Value, Error> + Send + Sync>;

pub struct LiveInstance {
    identity: Option<String>,
    class_name: String,
    fields: Mutex<Map<String, Value>>,
    methods: HashMap<String, InstanceMethod>,
    events: Emitter,
}

impl LiveInstance {
    pub fn of(class_name: impl Into<String>) -> InstanceBuilder {
        InstanceBuilder {
            identity: None,
            class_name: class_name.into(),
            fields: Map::new(),
            methods: HashMap::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Host-assigned identity, when the object carries one. Wrapping
    /// requires it; transient host objects may lack it.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Read a field as it is right now. Absent fields read as `Null`,
    /// matching the host runtime's absent-property semantics.
    pub fn field(&self, name: &str) -> Value {
        self.fields
            .lock()
            .expect("instance fields lock")
            .get(name)
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields
            .lock()
            .expect("instance fields lock")
            .contains_key(name)
    }

    /// Mutate a field on the instance. Both the host's own updates and
    /// engine writes land here; a `change` event is emitted either way,
    /// the way the host notifies its collections.
    pub fn set_field(&self, name: &str, value: Value) {
        {
            let mut fields = self.fields.lock().expect("instance fields lock");
            fields.insert(name.to_string(), value.clone());
        }
        self.events.emit(
            "change",
            &json!({ "property": name, "value": value }),
        );
    }

    /// Forward a method call to the instance. Unknown methods are a usage
    /// error carrying the instance identity for diagnostics.
    pub fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, Error> {
        let Some(body) = self.methods.get(method) else {
            let mut err = Error::new(ErrorKind::Usage)
                .with_message("instance has no such method")
                .with_property(method);
            if let Some(identity) = self.identity() {
                err = err.with_instance(identity);
            }
            return Err(err);
        };
        body(self, args)
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    pub fn events(&self) -> &Emitter {
        &self.events
    }

    pub fn emit(&self, event: &str, payload: &Value) {
        self.events.emit(event, payload);
    }
}

impl fmt::Debug for LiveInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveInstance")
            .field("class", &self.class_name)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

pub struct InstanceBuilder {
    identity: Option<String>,
    class_name: String,
    fields: Map<String, Value>,
    methods: HashMap<String, InstanceMethod>,
}

impl InstanceBuilder {
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        body: impl Fn(&LiveInstance, &[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Arc::new(body));
        self
    }

    pub fn build(self) -> Arc<LiveInstance> {
        let label = self
            .identity
            .clone()
            .unwrap_or_else(|| self.class_name.clone());
        Arc::new(LiveInstance {
            identity: self.identity,
            class_name: self.class_name,
            fields: Mutex::new(self.fields),
            methods: self.methods,
            events: Emitter::new(label),
        })
    }
}
