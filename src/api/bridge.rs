//! Purpose: Relay host-internal instance events onto one public namespace.
//! Exports: `EventBridge`.
//! Role: The engine-external subscribe surface; feature code listens here,
//! never on host instances directly.
//! Invariants: Relays add no buffering or reordering; payloads pass through
//! at the host's own notification point.
//! Invariants: Tearing the bridge down detaches every relay from its source.

use std::sync::{Arc, Mutex};

use crate::core::error::Error;
use crate::core::events::{Emitter, Subscription};
use crate::core::instance::LiveInstance;
use serde_json::Value;

pub struct EventBridge {
    public: Arc<Emitter>,
    relays: Mutex<Vec<(Arc<LiveInstance>, Subscription)>>,
}

impl EventBridge {
    pub fn new() -> Self {
        Self {
            public: Arc::new(Emitter::new("public")),
            relays: Mutex::new(Vec::new()),
        }
    }

    /// Forward `event` emissions from `source` onto the public emitter
    /// under `public_name`. Returns the source-side subscription so one
    /// relay can be detached without tearing the bridge down.
    pub fn relay(
        &self,
        source: &Arc<LiveInstance>,
        event: &str,
        public_name: &str,
    ) -> Subscription {
        let public = Arc::clone(&self.public);
        let renamed = public_name.to_string();
        let subscription = source.events().on(event, move |payload| {
            public.emit(&renamed, payload);
            Ok(())
        });
        tracing::debug!(
            source = source.events().label(),
            event,
            public = public_name,
            "relay attached"
        );
        self.relays
            .lock()
            .expect("relay lock")
            .push((Arc::clone(source), subscription.clone()));
        subscription
    }

    /// Detach every relay from its source and drop public listeners.
    /// Called when the host session ends.
    pub fn shutdown(&self) {
        let relays: Vec<_> = self.relays.lock().expect("relay lock").drain(..).collect();
        for (source, subscription) in relays {
            source.events().off(&subscription);
        }
        self.public.clear_listeners(None);
    }

    pub fn relay_count(&self) -> usize {
        self.relays.lock().expect("relay lock").len()
    }

    // The public subscribe surface, mirroring the emitter contract.

    pub fn on(
        &self,
        event: &str,
        listener: impl Fn(&Value) -> Result<(), Error> + Send + Sync + 'static,
    ) -> Subscription {
        self.public.on(event, listener)
    }

    pub fn once(&self, event: &str) -> impl Future<Output = Result<Value, Error>> + Send + 'static {
        self.public.once(event)
    }

    pub fn off(&self, subscription: &Subscription) {
        self.public.off(subscription);
    }

    pub fn clear_listeners(&self, event: Option<&str>) {
        self.public.clear_listeners(event);
    }

    pub fn listener_count(&self, event: Option<&str>) -> usize {
        self.public.listener_count(event)
    }

    pub fn emitter(&self) -> &Arc<Emitter> {
        &self.public
    }
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::new()
    }
}
