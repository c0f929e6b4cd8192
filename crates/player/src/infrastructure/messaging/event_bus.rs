//! Event Bus for state change notifications.
//!
//! Push-based: subscribers register callbacks that are invoked for every
//! dispatched event. The bus holds strong references to subscribers, so they
//! persist until cleared or the bus is dropped.

use std::sync::Arc;
use tokio::sync::Mutex;

type Subscriber<E> = Box<dyn FnMut(E) + Send + 'static>;

pub struct EventBus<E> {
    subscribers: Arc<Mutex<Vec<Subscriber<E>>>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<E: Clone + Send + 'static> EventBus<E> {
    /// Create a new EventBus with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Subscribe to all events.
    pub async fn subscribe(&self, callback: impl FnMut(E) + Send + 'static) {
        self.subscribers.lock().await.push(Box::new(callback));
    }

    /// Dispatch an event to all subscribers.
    ///
    /// Each subscriber's callback is invoked with its own clone of the event.
    pub async fn dispatch(&self, event: E) {
        let mut subscribers = self.subscribers.lock().await;
        for subscriber in subscribers.iter_mut() {
            subscriber(event.clone());
        }
    }

    /// Get the number of subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Clear all subscribers.
    pub async fn clear(&self) {
        self.subscribers.lock().await.clear();
    }
}

impl<E: Clone + Send + 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn every_subscriber_receives_each_event() {
        let bus = EventBus::<u32>::new();
        let total = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let total = total.clone();
            bus.subscribe(move |n| {
                total.fetch_add(n as usize, Ordering::SeqCst);
            })
            .await;
        }

        bus.dispatch(5).await;
        assert_eq!(total.load(Ordering::SeqCst), 10);
        assert_eq!(bus.subscriber_count().await, 2);
    }

    #[tokio::test]
    async fn subscribers_get_independent_clones() {
        let bus = EventBus::<Vec<u8>>::new();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));

        let sink = seen.clone();
        bus.subscribe(move |mut v| {
            v.push(9);
            sink.lock().unwrap().push(v);
        })
        .await;
        let sink = seen.clone();
        bus.subscribe(move |v| sink.lock().unwrap().push(v)).await;

        bus.dispatch(vec![1]).await;
        assert_eq!(*seen.lock().unwrap(), vec![vec![1, 9], vec![1]]);
    }

    #[tokio::test]
    async fn clear_removes_subscribers() {
        let bus = EventBus::<()>::new();
        bus.subscribe(|_| {}).await;
        bus.clear().await;
        assert_eq!(bus.subscriber_count().await, 0);
    }
}
