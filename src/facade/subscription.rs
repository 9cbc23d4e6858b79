use super::StoreState;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type Listener = Arc<dyn Fn(&StoreState) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub_{}", self.0)
    }
}

#[derive(Default)]
struct Delivery {
    pending: VecDeque<StoreState>,
    draining: bool,
}

/// Listener registry plus an ordered delivery queue.
///
/// Snapshots are enqueued while the state lock is held, so the queue order is
/// the transition order. Whoever finds the queue idle drains it; a transition
/// dispatched from inside a listener only enqueues, and the outer drain loop
/// delivers it after the current snapshot.
#[derive(Default)]
pub(crate) struct Subscriptions {
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    delivery: Mutex<Delivery>,
    next_id: AtomicU64,
}

impl Subscriptions {
    pub fn subscribe(&self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        lock(&self.listeners).push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        lock(&self.listeners).len()
    }

    pub fn enqueue(&self, snapshot: StoreState) {
        lock(&self.delivery).pending.push_back(snapshot);
    }

    /// Delivers queued snapshots unless another caller is already doing so.
    /// Must be called without the state lock held.
    pub fn drain(&self) {
        {
            let mut delivery = lock(&self.delivery);
            if delivery.draining {
                return;
            }
            delivery.draining = true;
        }
        let reset = DrainGuard(&self.delivery);

        loop {
            let snapshot = {
                let mut delivery = lock(&self.delivery);
                match delivery.pending.pop_front() {
                    Some(snapshot) => snapshot,
                    None => {
                        // Cleared under the lock that saw the queue empty.
                        delivery.draining = false;
                        std::mem::forget(reset);
                        return;
                    }
                }
            };
            let listeners: Vec<Listener> = lock(&self.listeners)
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect();
            for listener in listeners {
                listener(&snapshot);
            }
        }
    }
}

/// Clears the draining flag when a listener panics, so later transitions are
/// still delivered.
struct DrainGuard<'a>(&'a Mutex<Delivery>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        lock(self.0).draining = false;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
