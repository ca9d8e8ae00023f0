//! Typed pub/sub signals with explicit subscription handles.
//!
//! Every entity owns a fixed set of named `Signal` channels. Dispatch is
//! synchronous and in subscription order. A publish that happens while a
//! dispatch is already running on the same channel is queued and delivered
//! after the current pass completes, so handlers may re-publish without
//! recursing.
//!
//! Subscribers get a [`Subscription`] handle back. Bindings collect their
//! handles in a [`Subscriptions`] arena and release all of them exactly once
//! on disposal - no dangling handlers after an entity is removed.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct SignalInner<T> {
    next_id: u64,
    handlers: Vec<(u64, Handler<T>)>,
    dispatching: bool,
    pending: VecDeque<T>,
}

impl<T> Default for SignalInner<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            handlers: Vec::new(),
            dispatching: false,
            pending: VecDeque::new(),
        }
    }
}

/// A single named pub/sub channel carrying values of type `T`.
///
/// Cloning yields another handle to the same channel.
pub struct Signal<T> {
    inner: Arc<Mutex<SignalInner<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self
            .inner
            .lock()
            .map(|g| g.handlers.len())
            .unwrap_or(0);
        f.debug_struct("Signal").field("subscribers", &n).finish()
    }
}

impl<T: Send + 'static> Signal<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SignalInner::default())),
        }
    }

    /// Subscribe a handler. Handlers run synchronously on [`publish`],
    /// in subscription order.
    ///
    /// [`publish`]: Signal::publish
    pub fn subscribe<F>(&self, handler: F) -> Subscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = guard.next_id;
        guard.next_id += 1;
        guard.handlers.push((id, Arc::new(handler)));
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Publish a value to all current subscribers, then return.
    ///
    /// Re-entrant publishes (a handler publishing on the channel it is
    /// handling) are queued and run after the current dispatch completes.
    /// No event is retained for late subscribers.
    pub fn publish(&self, value: T) {
        {
            let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            if guard.dispatching {
                guard.pending.push_back(value);
                return;
            }
            guard.dispatching = true;
        }

        self.dispatch(&value);

        // Drain anything queued by handlers during the pass above.
        loop {
            let next = {
                let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
                match guard.pending.pop_front() {
                    Some(v) => v,
                    None => {
                        guard.dispatching = false;
                        return;
                    }
                }
            };
            self.dispatch(&next);
        }
    }

    fn dispatch(&self, value: &T) {
        let snapshot: Vec<(u64, Handler<T>)> = {
            let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            guard.handlers.clone()
        };

        for (id, handler) in snapshot {
            // A handler may unsubscribe itself or others mid-dispatch;
            // skip anyone no longer registered, leave the rest untouched.
            let alive = {
                let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
                guard.handlers.iter().any(|(hid, _)| *hid == id)
            };
            if alive {
                handler(value);
            }
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .handlers
            .len()
    }
}

/// Handle identifying one subscription on one channel.
///
/// Dropping the handle does NOT unsubscribe; call [`unsubscribe`] or hand
/// the handle to a [`Subscriptions`] arena.
///
/// [`unsubscribe`]: Subscription::unsubscribe
pub struct Subscription<T> {
    id: u64,
    inner: Weak<Mutex<SignalInner<T>>>,
}

impl<T> Subscription<T> {
    /// Remove the handler from the channel. Safe to call while the channel
    /// is mid-dispatch and safe if the channel is already gone.
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut guard = inner.lock().unwrap_or_else(|e| e.into_inner());
            guard.handlers.retain(|(id, _)| *id != self.id);
        }
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Arena of subscriptions owned by one binding.
///
/// [`dispose`] releases every tracked subscription exactly once; dropping
/// the arena does the same.
///
/// [`dispose`]: Subscriptions::dispose
#[derive(Default)]
pub struct Subscriptions {
    subs: Vec<Box<dyn FnOnce() + Send>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a subscription handle.
    pub fn track<T: Send + 'static>(&mut self, sub: Subscription<T>) {
        self.subs.push(Box::new(move || sub.unsubscribe()));
    }

    /// Release all tracked subscriptions. Idempotent.
    pub fn dispose(&mut self) {
        for unsub in self.subs.drain(..) {
            unsub();
        }
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriptions")
            .field("tracked", &self.subs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn test_publish_in_subscription_order() {
        let sig: Signal<i32> = Signal::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = Arc::clone(&order);
        let _a = sig.subscribe(move |v| o1.lock().unwrap().push(("a", *v)));
        let o2 = Arc::clone(&order);
        let _b = sig.subscribe(move |v| o2.lock().unwrap().push(("b", *v)));

        sig.publish(7);
        assert_eq!(&*order.lock().unwrap(), &[("a", 7), ("b", 7)]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let sig: Signal<i32> = Signal::new();
        let counter = Arc::new(AtomicI32::new(0));

        let c = Arc::clone(&counter);
        let sub = sig.subscribe(move |v| {
            c.fetch_add(*v, Ordering::SeqCst);
        });

        sig.publish(10);
        sub.unsubscribe();
        sig.publish(10);
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_self_unsubscribe_during_dispatch_leaves_others_intact() {
        let sig: Signal<()> = Signal::new();
        let counter = Arc::new(AtomicI32::new(0));

        // First handler removes itself on first delivery.
        let slot: Arc<Mutex<Option<Subscription<()>>>> = Arc::new(Mutex::new(None));
        let slot2 = Arc::clone(&slot);
        let sub = sig.subscribe(move |_| {
            if let Some(s) = slot2.lock().unwrap().take() {
                s.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(sub);

        let c = Arc::clone(&counter);
        let _keep = sig.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        sig.publish(());
        sig.publish(());
        // Second handler saw both publishes even though the first removed
        // itself mid-dispatch.
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(sig.subscriber_count(), 1);
    }

    #[test]
    fn test_reentrant_publish_is_queued() {
        let sig: Signal<i32> = Signal::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sig2 = sig.clone();
        let s1 = Arc::clone(&seen);
        let _echo = sig.subscribe(move |v| {
            s1.lock().unwrap().push(("echo", *v));
            if *v > 0 {
                sig2.publish(*v - 1);
            }
        });
        let s2 = Arc::clone(&seen);
        let _tail = sig.subscribe(move |v| {
            s2.lock().unwrap().push(("tail", *v));
        });

        sig.publish(2);
        // Each value completes a full pass before the queued one starts.
        assert_eq!(
            &*seen.lock().unwrap(),
            &[
                ("echo", 2),
                ("tail", 2),
                ("echo", 1),
                ("tail", 1),
                ("echo", 0),
                ("tail", 0),
            ]
        );
    }

    #[test]
    fn test_subscriptions_arena_disposes_once() {
        let sig: Signal<()> = Signal::new();
        let counter = Arc::new(AtomicI32::new(0));

        let mut subs = Subscriptions::new();
        let c = Arc::clone(&counter);
        subs.track(sig.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(subs.len(), 1);

        sig.publish(());
        subs.dispose();
        subs.dispose();
        sig.publish(());

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(sig.subscriber_count(), 0);
        assert!(subs.is_empty());
    }

    #[test]
    fn test_default_constructed_signal_dispatches() {
        // The signal structs on entities are all built through Default.
        let sig: Signal<String> = Signal::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = sig.subscribe(move |v: &String| s.lock().unwrap().push(v.clone()));

        sig.publish("ready".to_string());
        assert_eq!(&*seen.lock().unwrap(), &["ready".to_string()]);
    }

    #[test]
    fn test_no_replay_for_late_subscribers() {
        let sig: Signal<i32> = Signal::new();
        sig.publish(1);

        let counter = Arc::new(AtomicI32::new(0));
        let c = Arc::clone(&counter);
        let _sub = sig.subscribe(move |v| {
            c.fetch_add(*v, Ordering::SeqCst);
        });
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
