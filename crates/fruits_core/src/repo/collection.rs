//! Observable in-memory collection backed by a `tokio::sync::watch` channel.

use std::sync::Arc;
use tokio::sync::watch;

/// Latest-value cache of one entity list.
///
/// Clones share the same channel, so a reload task can publish while the
/// repository keeps serving snapshots. Subscribers only ever see whole lists.
#[derive(Debug)]
pub struct Collection<T> {
    sender: Arc<watch::Sender<Vec<T>>>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
        }
    }
}

impl<T: Clone> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Collection<T> {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Vec::new());
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.sender.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.sender.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.sender.borrow().get(index).cloned()
    }

    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.sender.borrow().iter().find(|item| predicate(item)).cloned()
    }

    /// Publishes `items` as the new list.
    pub fn replace(&self, items: Vec<T>) {
        self.sender.send_replace(items);
    }

    pub fn clear(&self) {
        self.sender.send_replace(Vec::new());
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<T>> {
        self.sender.subscribe()
    }
}
