//! Purpose: Small pub/sub primitive shared by every engine event source.
//! Exports: `Emitter`, `Subscription`, `ListenerFn`.
//! Role: Uniform subscribe/unsubscribe contract over host-internal events.
//! Invariants: Delivery is synchronous at the emission point and in registration order.
//! Invariants: Each emission runs against a snapshot of the listener list; unsubscribing
//! mid-delivery never affects that emission, only later ones.
//! Invariants: A failing listener is logged and never stops delivery to the rest.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::oneshot;

use crate::core::error::{Error, ErrorKind};

pub type ListenerFn = Arc<dyn Fn(&Value) -> Result<(), Error> + Send + Sync>;

/// Handle returned by `on`; pass back to `off` to unsubscribe.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subscription {
    event: String,
    id: u64,
}

impl Subscription {
    pub fn event(&self) -> &str {
        &self.event
    }
}

struct Entry {
    id: u64,
    once: bool,
    listener: ListenerFn,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    events: HashMap<String, Vec<Entry>>,
}

pub struct Emitter {
    label: String,
    registry: Mutex<Registry>,
}

impl Emitter {
    /// `label` names the source in diagnostics, e.g. `"chat"` or an
    /// instance identity.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            registry: Mutex::new(Registry::default()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn on(
        &self,
        event: &str,
        listener: impl Fn(&Value) -> Result<(), Error> + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe(event, Arc::new(listener), false)
    }

    /// Resolve with the first payload emitted after this call, then
    /// unsubscribe. The listener is registered before the future is
    /// returned, so emissions between call and await are not lost. Fails
    /// if the listener list is cleared before any emission arrives.
    pub fn once(&self, event: &str) -> impl Future<Output = Result<Value, Error>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        let slot = Mutex::new(Some(tx));
        self.subscribe(
            event,
            Arc::new(move |payload: &Value| {
                if let Some(tx) = slot.lock().expect("once slot lock").take() {
                    let _ = tx.send(payload.clone());
                }
                Ok(())
            }),
            true,
        );
        let event = event.to_string();
        async move {
            rx.await.map_err(|_| {
                Error::new(ErrorKind::Internal)
                    .with_message("event source dropped the subscription before emitting")
                    .with_property(event)
            })
        }
    }

    pub fn off(&self, subscription: &Subscription) {
        let mut registry = self.registry.lock().expect("emitter lock");
        if let Some(entries) = registry.events.get_mut(&subscription.event) {
            entries.retain(|entry| entry.id != subscription.id);
            if entries.is_empty() {
                registry.events.remove(&subscription.event);
            }
        }
    }

    /// Drop listeners for `event`, or every listener when `None`.
    pub fn clear_listeners(&self, event: Option<&str>) {
        let mut registry = self.registry.lock().expect("emitter lock");
        match event {
            Some(event) => {
                registry.events.remove(event);
            }
            None => registry.events.clear(),
        }
    }

    pub fn listener_count(&self, event: Option<&str>) -> usize {
        let registry = self.registry.lock().expect("emitter lock");
        match event {
            Some(event) => registry.events.get(event).map_or(0, Vec::len),
            None => registry.events.values().map(Vec::len).sum(),
        }
    }

    /// Deliver `payload` to every listener subscribed to `event` at the
    /// moment of emission. One-shot listeners are retired before their
    /// callback runs, so re-entrant emits cannot double-fire them.
    pub fn emit(&self, event: &str, payload: &Value) {
        let snapshot: Vec<(u64, ListenerFn)> = {
            let mut registry = self.registry.lock().expect("emitter lock");
            let Some(entries) = registry.events.get_mut(event) else {
                return;
            };
            let snapshot = entries
                .iter()
                .map(|entry| (entry.id, Arc::clone(&entry.listener)))
                .collect();
            entries.retain(|entry| !entry.once);
            if entries.is_empty() {
                registry.events.remove(event);
            }
            snapshot
        };

        for (id, listener) in snapshot {
            if let Err(err) = listener(payload) {
                tracing::warn!(
                    emitter = %self.label,
                    event,
                    listener = id,
                    error = %err,
                    "listener failed; continuing delivery"
                );
            }
        }
    }

    fn subscribe(&self, event: &str, listener: ListenerFn, once: bool) -> Subscription {
        let mut registry = self.registry.lock().expect("emitter lock");
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .events
            .entry(event.to_string())
            .or_default()
            .push(Entry { id, once, listener });
        Subscription {
            event: event.to_string(),
            id,
        }
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("label", &self.label)
            .field("listeners", &self.listener_count(None))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Emitter;
    use crate::core::error::{Error, ErrorKind};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn delivery_in_registration_order() {
        let emitter = Emitter::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            emitter.on("change", move |_| {
                seen.lock().expect("seen").push(tag);
                Ok(())
            });
        }

        emitter.emit("change", &json!({}));
        assert_eq!(*seen.lock().expect("seen"), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribe_mid_delivery_spares_current_emission() {
        let emitter = Arc::new(Emitter::new("test"));
        let hits = Arc::new(AtomicUsize::new(0));
        let target: Arc<Mutex<Option<super::Subscription>>> = Arc::new(Mutex::new(None));

        // Runs first; unsubscribes the counting listener registered below.
        {
            let emitter = Arc::clone(&emitter);
            let target = Arc::clone(&target);
            emitter.clone().on("sync", move |_| {
                if let Some(sub) = target.lock().expect("target").as_ref() {
                    emitter.off(sub);
                }
                Ok(())
            });
        }
        let counting = {
            let hits = Arc::clone(&hits);
            emitter.on("sync", move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };
        *target.lock().expect("target") = Some(counting);

        // Already snapshotted for this emission, so it still runs once.
        emitter.emit("sync", &json!(1));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Gone for every later emission.
        emitter.emit("sync", &json!(2));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn self_unsubscribe_does_not_block_later_listeners() {
        let emitter = Arc::new(Emitter::new("test"));
        let hits = Arc::new(AtomicUsize::new(0));
        let own: Arc<Mutex<Option<super::Subscription>>> = Arc::new(Mutex::new(None));

        let first = {
            let emitter = Arc::clone(&emitter);
            let own = Arc::clone(&own);
            emitter.clone().on("change", move |_| {
                if let Some(sub) = own.lock().expect("own").take() {
                    emitter.off(&sub);
                }
                Ok(())
            })
        };
        *own.lock().expect("own") = Some(first);
        {
            let hits = Arc::clone(&hits);
            emitter.on("change", move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        emitter.emit("change", &json!({}));
        emitter.emit("change", &json!({}));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(emitter.listener_count(Some("change")), 1);
    }

    #[test]
    fn failing_listener_does_not_stop_delivery() {
        let emitter = Emitter::new("test");
        let hits = Arc::new(AtomicUsize::new(0));

        emitter.on("add", |_| {
            Err(Error::new(ErrorKind::Internal).with_message("listener boom"))
        });
        {
            let hits = Arc::clone(&hits);
            emitter.on("add", move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        emitter.emit("add", &json!({}));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_count_per_event_and_total() {
        let emitter = Emitter::new("test");
        emitter.on("a", |_| Ok(()));
        emitter.on("a", |_| Ok(()));
        let b = emitter.on("b", |_| Ok(()));

        assert_eq!(emitter.listener_count(Some("a")), 2);
        assert_eq!(emitter.listener_count(Some("b")), 1);
        assert_eq!(emitter.listener_count(None), 3);

        emitter.off(&b);
        assert_eq!(emitter.listener_count(Some("b")), 0);

        emitter.clear_listeners(None);
        assert_eq!(emitter.listener_count(None), 0);
    }

    #[tokio::test]
    async fn once_resolves_first_emission_only() {
        let emitter = Emitter::new("test");

        // Registered at call time, not at first poll.
        let waiter = emitter.once("remove");
        assert_eq!(emitter.listener_count(Some("remove")), 1);

        emitter.emit("remove", &json!({"id": "m1"}));
        emitter.emit("remove", &json!({"id": "m2"}));

        let payload = waiter.await.expect("once");
        assert_eq!(payload, json!({"id": "m1"}));
        assert_eq!(emitter.listener_count(Some("remove")), 0);
    }

    #[tokio::test]
    async fn once_fails_when_cleared() {
        let emitter = Emitter::new("test");
        let waiter = emitter.once("gone");
        emitter.clear_listeners(Some("gone"));

        let err = waiter.await.expect_err("cancelled");
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
