use crate::core::errors::AsinCacheError;
use crate::core::models::NotificationEvent;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use tracing::{error, trace};

pub const DEVTOOLS_PLUGIN_ID: &str = "api-refetch-devtools";

type Handler = Arc<dyn Fn(&NotificationEvent) + Send + Sync>;
type Registry = RwLock<HashMap<String, Vec<(u64, Handler)>>>;

/// Process-local publish/subscribe channel.
///
/// Delivery is synchronous and at-most-once. Nothing is retained: a subscriber
/// attached after a publish never sees it.
#[derive(Clone)]
pub struct NotificationBus {
    plugin_id: Arc<str>,
    handlers: Arc<Registry>,
    next_id: Arc<AtomicU64>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        NotificationBus::new(DEVTOOLS_PLUGIN_ID)
    }
}

impl NotificationBus {
    pub fn new(plugin_id: &str) -> Self {
        NotificationBus {
            plugin_id: Arc::from(plugin_id),
            handlers: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    fn qualified(&self, event_name: &str) -> String {
        format!("{}:{}", self.plugin_id, event_name)
    }

    #[must_use = "dropping the subscription detaches the handler"]
    pub fn subscribe<F>(&self, event_name: &str, handler: F) -> Subscription
    where
        F: Fn(&NotificationEvent) + Send + Sync + 'static,
    {
        let name = self.qualified(event_name);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        handlers.entry(name.clone()).or_default().push((id, Arc::new(handler)));
        Subscription {
            registry: Arc::downgrade(&self.handlers),
            name,
            id,
        }
    }

    /// Delivers `payload` to every current subscriber of `event_name` and returns how many were reached.
    ///
    /// A panicking handler does not stop delivery to the others; it is reported
    /// as [`AsinCacheError::NotificationFailed`] once every handler has run.
    pub fn publish(&self, event_name: &str, payload: &NotificationEvent) -> Result<usize, AsinCacheError> {
        let name = self.qualified(event_name);
        // Snapshot so handlers can (un)subscribe while being called.
        let targets: Vec<Handler> = {
            let handlers = self
                .handlers
                .read()
                .map_err(|_| AsinCacheError::NotificationFailed(format!("Subscriber registry poisoned for {}", name)))?;
            handlers
                .get(&name)
                .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
                .unwrap_or_default()
        };
        let mut failed = 0;
        for handler in &targets {
            if catch_unwind(AssertUnwindSafe(|| handler(payload))).is_err() {
                error!(event = %name, "notification handler panicked");
                failed += 1;
            }
        }
        trace!(event = %name, delivered = targets.len() - failed, failed, "published notification");
        if failed > 0 {
            return Err(AsinCacheError::NotificationFailed(format!(
                "{} of {} handlers for {} panicked",
                failed,
                targets.len(),
                name
            )));
        }
        Ok(targets.len())
    }

    pub fn subscriber_count(&self, event_name: &str) -> usize {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        handlers.get(&self.qualified(event_name)).map_or(0, Vec::len)
    }
}

/// Handle returned by [`NotificationBus::subscribe`]. Dropping it detaches the handler.
#[must_use = "dropping the subscription detaches the handler"]
pub struct Subscription {
    registry: Weak<Registry>,
    name: String,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        // The handler is released after the lock; its captures may hold subscriptions too.
        let _removed: Option<Handler> = {
            let mut handlers = registry.write().unwrap_or_else(|e| e.into_inner());
            let Some(list) = handlers.get_mut(&self.name) else {
                return;
            };
            let removed = list.iter().position(|(id, _)| *id == self.id).map(|pos| list.remove(pos).1);
            if list.is_empty() {
                handlers.remove(&self.name);
            }
            removed
        };
    }
}
