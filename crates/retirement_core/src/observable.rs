//! crates/retirement_core/src/observable.rs
//!
//! A subscribable value container with replay-latest semantics.
//!
//! Subscribers are called synchronously, in subscription order, on the task that
//! calls `set`. A new subscriber is called immediately with the current value.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::mpsc;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    value: T,
    next_id: u64,
    subscribers: Vec<(u64, Callback<T>)>,
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> Shared<T> {
    // A panicking subscriber must not brick the container for everyone else.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A value that broadcasts every change to its subscribers.
pub struct Observable<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Observable<T> {
    pub fn new(initial: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    value: initial,
                    next_id: 0,
                    subscribers: Vec::new(),
                }),
            }),
        }
    }

    /// Returns a copy of the current value.
    pub fn get(&self) -> T {
        self.shared.lock().value.clone()
    }

    /// Replaces the value and notifies every subscriber.
    pub fn set(&self, value: T) {
        let (current, subscribers) = {
            let mut inner = self.shared.lock();
            inner.value = value;
            let subscribers: Vec<Callback<T>> =
                inner.subscribers.iter().map(|(_, cb)| cb.clone()).collect();
            (inner.value.clone(), subscribers)
        };
        // The lock is released so callbacks may read, set or unsubscribe.
        for callback in subscribers {
            callback(&current);
        }
    }

    /// Registers `on_change` and calls it at once with the current value.
    pub fn subscribe<F>(&self, on_change: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let callback: Callback<T> = Arc::new(on_change);
        let (id, current) = {
            let mut inner = self.shared.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push((id, callback.clone()));
            (id, inner.value.clone())
        };
        callback(&current);

        let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.lock().subscribers.retain(|(sid, _)| *sid != id);
                }
            })),
        }
    }

    /// Bridges the value into a channel for async consumers.
    ///
    /// Unlike a watch channel, every value is delivered; nothing is coalesced.
    /// The first item is the current value.
    pub fn updates(&self) -> (Subscription, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(move |value: &T| {
            let _ = tx.send(value.clone());
        });
        (subscription, rx)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers.len()
    }
}

/// Handle returned by `Observable::subscribe`. Delivery stops when it is dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_replays_current_value() {
        let value = Observable::new(7u32);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = value.subscribe(move |v| sink.lock().unwrap().push(*v));

        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }

    #[test]
    fn every_transition_is_delivered_in_subscription_order() {
        let value = Observable::new(0u32);
        let log = Arc::new(Mutex::new(Vec::new()));

        let first_log = log.clone();
        let _first = value.subscribe(move |v| first_log.lock().unwrap().push(("first", *v)));
        let second_log = log.clone();
        let _second = value.subscribe(move |v| second_log.lock().unwrap().push(("second", *v)));

        value.set(1);
        value.set(2);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ("first", 0),
                ("second", 0),
                ("first", 1),
                ("second", 1),
                ("first", 2),
                ("second", 2),
            ]
        );
    }

    #[test]
    fn dropping_the_subscription_stops_delivery() {
        let value = Observable::new(String::from("a"));
        let count = Arc::new(Mutex::new(0usize));
        let counter = count.clone();
        let sub = value.subscribe(move |_| *counter.lock().unwrap() += 1);
        assert_eq!(value.subscriber_count(), 1);

        drop(sub);
        value.set("b".to_string());

        assert_eq!(*count.lock().unwrap(), 1);
        assert_eq!(value.subscriber_count(), 0);
        assert_eq!(value.get(), "b");
    }

    #[test]
    fn callback_may_read_the_observable() {
        let value = Observable::new(1u8);
        let reader = value.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = value.subscribe(move |_| sink.lock().unwrap().push(reader.get()));

        value.set(5);

        assert_eq!(*seen.lock().unwrap(), vec![1, 5]);
    }

    #[tokio::test]
    async fn updates_channel_receives_every_value() {
        let value = Observable::new(0i32);
        let (_sub, mut rx) = value.updates();
        value.set(1);
        value.set(2);

        assert_eq!(rx.recv().await, Some(0));
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
    }
}
