//! Purpose: Read/mutate façade over live host instances, descriptor driven.
//! Exports: `ProxyDescriptor`, `ProxyModel`, `ProxyHandle`, `GetterFn`, `SetterFn`.
//! Role: Composition over the host's unknown types; a wrapper holding a
//! reference plus an accessor table, never a subclass.
//! Invariants: Descriptor tables are declared once per class and shared by
//! every instance of it.
//! Invariants: One handle per host identity; wrapping twice returns the
//! first handle so caller identity checks stay meaningful.
//! Invariants: Derived properties are recomputed from live state on every
//! read, never cached.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::core::error::{Error, ErrorKind};
use crate::core::events::Emitter;
use crate::core::instance::LiveInstance;

pub type GetterFn = Arc<dyn Fn(&LiveInstance) -> Result<Value, Error> + Send + Sync>;
pub type SetterFn = Arc<dyn Fn(&LiveInstance, Value) -> Result<(), Error> + Send + Sync>;

struct PropertySpec {
    get: GetterFn,
    set: Option<SetterFn>,
}

pub struct ProxyDescriptor {
    class_name: String,
    properties: BTreeMap<String, PropertySpec>,
    methods: BTreeSet<String>,
}

impl ProxyDescriptor {
    pub fn for_class(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            properties: BTreeMap::new(),
            methods: BTreeSet::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Stored field with pass-through read and write.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let read = name.clone();
        let write = name.clone();
        self.properties.insert(
            name,
            PropertySpec {
                get: Arc::new(move |instance| Ok(instance.field(&read))),
                set: Some(Arc::new(move |instance, value| {
                    instance.set_field(&write, value);
                    Ok(())
                })),
            },
        );
        self
    }

    /// Stored field the engine may read but never write.
    pub fn read_only(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let read = name.clone();
        self.properties.insert(
            name,
            PropertySpec {
                get: Arc::new(move |instance| Ok(instance.field(&read))),
                set: None,
            },
        );
        self
    }

    /// Computed property: a pure function of current instance state,
    /// evaluated on each read. Always read-only.
    pub fn derived(
        mut self,
        name: impl Into<String>,
        compute: impl Fn(&LiveInstance) -> Result<Value, Error> + Send + Sync + 'static,
    ) -> Self {
        self.properties.insert(
            name.into(),
            PropertySpec {
                get: Arc::new(compute),
                set: None,
            },
        );
        self
    }

    /// Declare a host method calls are forwarded to unmodified.
    pub fn method(mut self, name: impl Into<String>) -> Self {
        self.methods.insert(name.into());
        self
    }

    pub fn methods(mut self, names: &[&str]) -> Self {
        for name in names {
            self.methods.insert((*name).to_string());
        }
        self
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn is_writable(&self, name: &str) -> bool {
        self.properties
            .get(name)
            .is_some_and(|spec| spec.set.is_some())
    }

    pub fn forwards_method(&self, name: &str) -> bool {
        self.methods.contains(name)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(String::as_str)
    }
}

impl fmt::Debug for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyDescriptor")
            .field("class", &self.class_name)
            .field("properties", &self.properties.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Handle consumers hold instead of the raw host object.
pub struct ProxyHandle {
    instance: Arc<LiveInstance>,
    descriptor: Arc<ProxyDescriptor>,
}

impl ProxyHandle {
    pub fn identity(&self) -> &str {
        // Wrapping guarantees the identity field exists.
        self.instance.identity().unwrap_or_default()
    }

    pub fn class_name(&self) -> &str {
        self.instance.class_name()
    }

    pub fn instance(&self) -> &Arc<LiveInstance> {
        &self.instance
    }

    pub fn descriptor(&self) -> &Arc<ProxyDescriptor> {
        &self.descriptor
    }

    pub fn get(&self, property: &str) -> Result<Value, Error> {
        let Some(spec) = self.descriptor.properties.get(property) else {
            return Err(self.unknown_property(property));
        };
        (spec.get)(&self.instance)
    }

    pub fn set(&self, property: &str, value: Value) -> Result<(), Error> {
        let Some(spec) = self.descriptor.properties.get(property) else {
            return Err(self.unknown_property(property));
        };
        let Some(set) = &spec.set else {
            return Err(Error::new(ErrorKind::ReadOnly)
                .with_message("property has no setter")
                .with_instance(self.identity())
                .with_property(property));
        };
        set(&self.instance, value)
    }

    /// Forward a declared method to the host instance, arguments and
    /// return value unchanged.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value, Error> {
        if !self.descriptor.forwards_method(method) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("method not declared in the descriptor")
                .with_instance(self.identity())
                .with_property(method));
        }
        self.instance.invoke(method, args)
    }

    /// The wrapped instance's own event stream, re-exposed.
    pub fn events(&self) -> &Emitter {
        self.instance.events()
    }

    fn unknown_property(&self, property: &str) -> Error {
        Error::new(ErrorKind::Usage)
            .with_message("property not declared in the descriptor")
            .with_instance(self.identity())
            .with_property(property)
    }
}

impl fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyHandle")
            .field("class", &self.instance.class_name())
            .field("identity", &self.instance.identity())
            .finish()
    }
}

/// Owns descriptor tables and the one-handle-per-identity cache.
pub struct ProxyModel {
    descriptors: Mutex<HashMap<String, Arc<ProxyDescriptor>>>,
    handles: Mutex<HashMap<(String, String), Arc<ProxyHandle>>>,
}

impl ProxyModel {
    pub fn new() -> Self {
        Self {
            descriptors: Mutex::new(HashMap::new()),
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Install a class's descriptor table. Tables bind once; redeclaring a
    /// class is a usage error.
    pub fn register_descriptor(&self, descriptor: ProxyDescriptor) -> Result<(), Error> {
        let mut descriptors = self.descriptors.lock().expect("descriptor lock");
        let class = descriptor.class_name().to_string();
        if descriptors.contains_key(&class) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("descriptor already registered for class")
                .with_name(class));
        }
        descriptors.insert(class, Arc::new(descriptor));
        Ok(())
    }

    pub fn descriptor_for(&self, class_name: &str) -> Option<Arc<ProxyDescriptor>> {
        self.descriptors
            .lock()
            .expect("descriptor lock")
            .get(class_name)
            .cloned()
    }

    /// Wrap using the descriptor registered for the instance's class.
    pub fn wrap(&self, instance: &Arc<LiveInstance>) -> Result<Arc<ProxyHandle>, Error> {
        let Some(descriptor) = self.descriptor_for(instance.class_name()) else {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("no descriptor registered for class")
                .with_name(instance.class_name()));
        };
        self.wrap_with(instance, &descriptor)
    }

    /// Wrap with an explicit descriptor. Same host identity returns the
    /// previously created handle.
    pub fn wrap_with(
        &self,
        instance: &Arc<LiveInstance>,
        descriptor: &Arc<ProxyDescriptor>,
    ) -> Result<Arc<ProxyHandle>, Error> {
        let Some(identity) = instance.identity() else {
            return Err(Error::new(ErrorKind::InvalidInstance)
                .with_message("instance has no identity field to key the proxy on")
                .with_name(instance.class_name()));
        };
        if descriptor.class_name() != instance.class_name() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("descriptor class does not match instance class")
                .with_name(descriptor.class_name())
                .with_instance(identity));
        }

        let key = (instance.class_name().to_string(), identity.to_string());
        let mut handles = self.handles.lock().expect("handle lock");
        if let Some(existing) = handles.get(&key) {
            return Ok(Arc::clone(existing));
        }
        let handle = Arc::new(ProxyHandle {
            instance: Arc::clone(instance),
            descriptor: Arc::clone(descriptor),
        });
        handles.insert(key, Arc::clone(&handle));
        Ok(handle)
    }

    pub fn wrapped_count(&self) -> usize {
        self.handles.lock().expect("handle lock").len()
    }
}

impl Default for ProxyModel {
    fn default() -> Self {
        Self::new()
    }
}
