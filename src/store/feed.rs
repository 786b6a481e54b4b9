use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;

use crate::models::Comment;

/// A full, ordered copy of the collection.
pub type Snapshot = Vec<Comment>;

/// A failure pushed to subscribers in place of a snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct StoreFault(pub String);

pub type Event = Result<Snapshot, StoreFault>;

/// Fans out every new snapshot to all live subscribers.
#[derive(Default)]
pub struct Broadcaster {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    subscribers: Vec<Sender<Event>>,
    last: Option<Snapshot>,
}

impl Broadcaster {
    /// Registers a subscriber and hands it `current` as its first event.
    pub fn subscribe(&self, current: Snapshot) -> Subscription {
        let (tx, rx) = mpsc::channel();
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // The receiver is alive, so the send cannot fail.
        let _ = tx.send(Ok(current.clone()));
        inner.subscribers.push(tx);
        inner.last = Some(current);
        Subscription { rx }
    }

    /// Sends `snapshot` to everyone, dropping subscribers that went away.
    pub fn publish(&self, snapshot: Snapshot) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .subscribers
            .retain(|tx| tx.send(Ok(snapshot.clone())).is_ok());
        inner.last = Some(snapshot);
    }

    /// Like [`publish`](Self::publish), but only when the collection differs
    /// from the last one sent. Returns whether anything was sent.
    pub fn publish_if_changed(&self, snapshot: Snapshot) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.last.as_ref() == Some(&snapshot) {
            return false;
        }
        inner
            .subscribers
            .retain(|tx| tx.send(Ok(snapshot.clone())).is_ok());
        inner.last = Some(snapshot);
        true
    }

    pub fn publish_fault(&self, fault: StoreFault) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .subscribers
            .retain(|tx| tx.send(Err(fault.clone())).is_ok());
        // Force the next good snapshot through even if it matches.
        inner.last = None;
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .len()
    }
}

/// A lazy, unbounded stream of collection snapshots. It ends only when the
/// store that produced it is dropped, and cannot be restarted.
pub struct Subscription {
    rx: Receiver<Event>,
}

impl Subscription {
    /// Returns the next event if one is already queued.
    pub fn try_next(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event. `Ok(None)` means nothing
    /// arrived in time; `Err` means the store is gone.
    pub fn next_timeout(&mut self, timeout: Duration) -> Result<Option<Event>, StoreFault> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(StoreFault("subscription closed".to_string()))
            }
        }
    }
}

impl Iterator for Subscription {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(ids: &[&str]) -> Snapshot {
        ids.iter()
            .map(|id| Comment {
                id: (*id).to_string(),
                name: "n".to_string(),
                text: "t".to_string(),
                last_modified_display: "1/1/2026 00:00".to_string(),
                created_at: None,
                edited: false,
                owner_token: None,
            })
            .collect()
    }

    fn ids(event: Event) -> Vec<String> {
        event.unwrap().into_iter().map(|c| c.id).collect()
    }

    #[test]
    fn test_subscribe_delivers_current_first() {
        let feed = Broadcaster::default();
        let mut sub = feed.subscribe(snapshot(&["a"]));
        assert_eq!(ids(sub.try_next().unwrap()), vec!["a"]);
        assert!(sub.try_next().is_none());
    }

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let feed = Broadcaster::default();
        let mut one = feed.subscribe(Vec::new());
        let mut two = feed.subscribe(Vec::new());
        one.try_next();
        two.try_next();

        feed.publish(snapshot(&["b", "a"]));
        assert_eq!(ids(one.try_next().unwrap()), vec!["b", "a"]);
        assert_eq!(ids(two.try_next().unwrap()), vec!["b", "a"]);
    }

    #[test]
    fn test_publish_if_changed_skips_duplicates() {
        let feed = Broadcaster::default();
        let mut sub = feed.subscribe(snapshot(&["a"]));
        sub.try_next();

        assert!(!feed.publish_if_changed(snapshot(&["a"])));
        assert!(sub.try_next().is_none());

        assert!(feed.publish_if_changed(snapshot(&["b", "a"])));
        assert_eq!(ids(sub.try_next().unwrap()), vec!["b", "a"]);
    }

    #[test]
    fn test_fault_then_same_snapshot_is_resent() {
        let feed = Broadcaster::default();
        let mut sub = feed.subscribe(snapshot(&["a"]));
        sub.try_next();

        feed.publish_fault(StoreFault("boom".to_string()));
        assert_eq!(sub.try_next().unwrap(), Err(StoreFault("boom".to_string())));

        assert!(feed.publish_if_changed(snapshot(&["a"])));
        assert_eq!(ids(sub.try_next().unwrap()), vec!["a"]);
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let feed = Broadcaster::default();
        let sub = feed.subscribe(Vec::new());
        let _keep = feed.subscribe(Vec::new());
        drop(sub);
        feed.publish(Vec::new());
        assert_eq!(feed.subscriber_count(), 1);
    }

    #[test]
    fn test_closed_feed_ends_iteration() {
        let feed = Broadcaster::default();
        let mut sub = feed.subscribe(Vec::new());
        drop(feed);
        assert!(sub.next().is_some());
        assert!(sub.next().is_none());
        assert!(sub.next_timeout(Duration::from_millis(10)).is_err());
    }
}
