//! Typed publish/subscribe used to hand results from one pipeline stage to the next.
//!
//! Each stage owns one [`EventBus`] per event kind it produces, so payload shapes are
//! checked at compile time and no stage calls the next one directly. Handlers run in
//! registration order and each one is awaited to completion before the next is invoked.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock as SyncRwLock;

/// Callback type for bus subscribers
pub type EventHandler<E> =
    Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Publish/subscribe channel for a single event kind
pub struct EventBus<E> {
    handlers: SyncRwLock<Vec<EventHandler<E>>>,
}

impl<E> EventBus<E>
where
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            handlers: SyncRwLock::new(Vec::new()),
        }
    }

    /// Register a handler. Handlers are invoked in the order they were registered.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static,
    {
        self.handlers.write().push(Arc::new(handler));
    }

    /// Deliver `event` to every handler, awaiting each before advancing to the next.
    pub async fn emit(&self, event: E) {
        // Snapshot so no lock is held across a handler await
        let handlers = self.handlers.read().clone();
        for handler in handlers {
            handler(event.clone()).await;
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl<E> Default for EventBus<E>
where
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn test_emit_without_handlers_is_noop() {
        let bus: EventBus<u32> = EventBus::new();
        bus.emit(7).await;
        assert_eq!(bus.handler_count(), 0);
    }

    #[tokio::test]
    async fn test_handlers_run_in_registration_order() {
        let bus: EventBus<&'static str> = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            bus.subscribe(move |event| {
                let seen = seen.clone();
                Box::pin(async move {
                    seen.lock().push(format!("{tag}:{event}"));
                })
            });
        }

        bus.emit("a").await;
        bus.emit("b").await;

        assert_eq!(
            *seen.lock(),
            vec![
                "first:a", "second:a", "third:a", "first:b", "second:b", "third:b"
            ]
        );
    }

    #[tokio::test]
    async fn test_each_handler_completes_before_next_starts() {
        let bus: EventBus<()> = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let slow_log = log.clone();
        bus.subscribe(move |_| {
            let log = slow_log.clone();
            Box::pin(async move {
                log.lock().push("slow:start");
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                log.lock().push("slow:end");
            })
        });

        let fast_log = log.clone();
        bus.subscribe(move |_| {
            let log = fast_log.clone();
            Box::pin(async move {
                log.lock().push("fast");
            })
        });

        bus.emit(()).await;

        assert_eq!(*log.lock(), vec!["slow:start", "slow:end", "fast"]);
    }
}
