//! Ordered delivery of session snapshots to synchronous observers.
//!
//! Every committed transition gets a sequence number while the commit is still
//! exclusive. Delivery then runs in that order no matter which thread made the
//! transition, so the last snapshot an observer sees is always the current one.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::thread::{self, ThreadId};

use super::session::SessionSnapshot;

type Observer = Arc<dyn Fn(&SessionSnapshot) + Send + Sync>;

#[derive(Default)]
struct Observers {
    next_id: u64,
    entries: Vec<(u64, Observer)>,
}

/// Handle for a registered observer. Dropping it unregisters the observer.
pub struct Subscription {
    id: u64,
    observers: Weak<Mutex<Observers>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            if let Ok(mut observers) = observers.lock() {
                observers.entries.retain(|(id, _)| *id != self.id);
            }
        }
    }
}

#[derive(Default)]
struct Queue {
    pending: VecDeque<(u64, SessionSnapshot)>,
    next_seq: u64,
    /// Highest sequence number taken off `pending`
    popped: u64,
    /// Highest sequence number every observer has seen
    delivered: u64,
    draining: Option<ThreadId>,
}

#[derive(Default)]
pub(crate) struct Publisher {
    observers: Arc<Mutex<Observers>>,
    queue: Mutex<Queue>,
    drained: Condvar,
}

impl Publisher {
    pub(crate) fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&SessionSnapshot) + Send + Sync + 'static,
    {
        let mut observers = self
            .observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let id = observers.next_id;
        observers.next_id += 1;
        observers.entries.push((id, Arc::new(observer)));

        Subscription {
            id,
            observers: Arc::downgrade(&self.observers),
        }
    }

    /// Queue a committed snapshot and return its sequence number.
    ///
    /// Must be called while the commit still excludes other writers.
    pub(crate) fn enqueue(&self, snapshot: SessionSnapshot) -> u64 {
        let mut queue = self.lock_queue();
        queue.next_seq += 1;
        let seq = queue.next_seq;
        queue.pending.push_back((seq, snapshot));
        seq
    }

    /// Return once snapshot `seq` and everything queued before it has reached
    /// every observer.
    ///
    /// The first caller drains the queue while callers on other threads wait.
    /// A call made from inside an observer returns at once; its snapshot is
    /// delivered as soon as that observer returns.
    pub(crate) fn deliver(&self, seq: u64) {
        let current = thread::current().id();
        let mut queue = self.lock_queue();
        loop {
            if queue.delivered >= seq {
                return;
            }
            match queue.draining {
                Some(owner) if owner == current => return,
                Some(_) => {
                    queue = self
                        .drained
                        .wait(queue)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
                None => {
                    queue.draining = Some(current);
                    drop(queue);
                    {
                        let _draining = DrainGuard(self);
                        self.drain();
                    }
                    queue = self.lock_queue();
                }
            }
        }
    }

    fn drain(&self) {
        loop {
            let (seq, snapshot) = {
                let mut queue = self.lock_queue();
                match queue.pending.pop_front() {
                    Some((seq, snapshot)) => {
                        queue.popped = seq;
                        (seq, snapshot)
                    }
                    None => return,
                }
            };

            // Observers run without any lock held so they may subscribe,
            // drop subscriptions or trigger further transitions.
            for observer in self.observers() {
                observer(&snapshot);
            }
            self.lock_queue().delivered = seq;
            self.drained.notify_all();
        }
    }

    fn observers(&self) -> Vec<Observer> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entries
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }

    fn lock_queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Hands the queue back when draining ends, including when an observer panics.
struct DrainGuard<'a>(&'a Publisher);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        let mut queue = self.0.lock_queue();
        queue.draining = None;
        queue.delivered = queue.delivered.max(queue.popped);
        drop(queue);
        self.0.drained.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(snapshot: &SessionSnapshot) -> String {
        snapshot.error_message().unwrap_or_default().to_string()
    }

    #[test]
    fn test_delivery_follows_commit_order_across_threads() {
        let publisher = Arc::new(Publisher::default());
        let committed = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let _sub = publisher.subscribe(move |s| sink.lock().unwrap().push(message(s)));

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let publisher = Arc::clone(&publisher);
                let committed = Arc::clone(&committed);
                thread::spawn(move || {
                    for i in 0..200 {
                        let label = format!("{worker}-{i}");
                        let seq = {
                            // Stands in for the watch sender's exclusive commit
                            let mut committed = committed.lock().unwrap();
                            committed.push(label.clone());
                            publisher.enqueue(SessionSnapshot::failed(label))
                        };
                        publisher.deliver(seq);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(seen.lock().unwrap().len(), 800);
        assert_eq!(*seen.lock().unwrap(), *committed.lock().unwrap());
    }

    #[test]
    fn test_nested_transition_is_delivered_after_current_observer() {
        let publisher = Arc::new(Publisher::default());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let _first = publisher.subscribe(move |s| sink.lock().unwrap().push(format!("a:{}", message(s))));

        let weak = Arc::downgrade(&publisher);
        let _second = publisher.subscribe(move |s| {
            if message(s) == "outer" {
                if let Some(publisher) = weak.upgrade() {
                    let seq = publisher.enqueue(SessionSnapshot::failed("inner"));
                    publisher.deliver(seq);
                }
            }
        });

        let sink = Arc::clone(&seen);
        let _third = publisher.subscribe(move |s| sink.lock().unwrap().push(format!("c:{}", message(s))));

        let seq = publisher.enqueue(SessionSnapshot::failed("outer"));
        publisher.deliver(seq);

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["a:outer", "c:outer", "a:inner", "c:inner"]
        );
    }

    #[test]
    fn test_panicking_observer_releases_queue() {
        let publisher = Arc::new(Publisher::default());
        let sub = publisher.subscribe(|_| panic!("observer failed"));

        let seq = publisher.enqueue(SessionSnapshot::unauthenticated());
        let caller = Arc::clone(&publisher);
        assert!(thread::spawn(move || caller.deliver(seq)).join().is_err());
        drop(sub);

        let count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&count);
        let _sub = publisher.subscribe(move |_| *counter.lock().unwrap() += 1);

        let seq = publisher.enqueue(SessionSnapshot::unauthenticated());
        publisher.deliver(seq);
        assert_eq!(*count.lock().unwrap(), 1);
    }
}
