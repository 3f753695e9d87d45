//! Internal blocking FIFO used by the pipeline stages.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// Thread-safe FIFO with notify-based wakeups.
///
/// The mutex guards only push/pop and is never held across an await.
/// Waiters park on the `Notify` with a timeout as a safety net; a woken
/// waiter may still find the queue empty when another consumer won the
/// race, so callers loop.
pub(crate) struct SignalQueue<T> {
    items: Mutex<Inner<T>>,
    data: Notify,
}

struct Inner<T> {
    queue: VecDeque<T>,
    closed: bool,
}

impl<T> SignalQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Inner {
                queue: VecDeque::new(),
                closed: false,
            }),
            data: Notify::new(),
        }
    }

    /// Appends an item; silently discarded once the queue is closed.
    pub fn push(&self, item: T) {
        let mut inner = self.items.lock().unwrap();
        if inner.closed {
            return;
        }
        inner.queue.push_back(item);
        drop(inner);
        self.data.notify_one();
    }

    pub fn push_all(&self, items: impl IntoIterator<Item = T>) {
        let mut inner = self.items.lock().unwrap();
        if inner.closed {
            return;
        }
        let before = inner.queue.len();
        inner.queue.extend(items);
        let added = inner.queue.len() - before;
        drop(inner);
        if added > 0 {
            // More than one worker may be parked; wake them all and let
            // each re-poll.
            self.data.notify_waiters();
            self.data.notify_one();
        }
    }

    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().unwrap().queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().unwrap().queue.is_empty()
    }

    /// Closes the queue and empties it, returning how many items were
    /// dropped. Later pushes are discarded under the same lock, so nothing
    /// can land after the drain.
    pub fn close(&self) -> usize {
        let mut inner = self.items.lock().unwrap();
        inner.closed = true;
        let dropped = inner.queue.len();
        inner.queue.clear();
        dropped
    }

    /// Removes the head, waiting up to `timeout` for one to arrive.
    ///
    /// Returns `None` on timeout or when a concurrent consumer stole the
    /// wakeup; callers treat `None` as "poll again".
    pub async fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        if let Some(item) = self.try_pop() {
            return Some(item);
        }
        // Register interest before the second check so a push between the
        // check and the await is not lost.
        let notified = self.data.notified();
        if let Some(item) = self.try_pop() {
            return Some(item);
        }
        let _ = tokio::time::timeout(timeout, notified).await;
        self.try_pop()
    }

    /// Parks until an item arrives or `timeout` elapses, without popping.
    ///
    /// Used by workers that reserve a pending slot before removing, so the
    /// removal itself stays outside any await.
    pub async fn wait_data(&self, timeout: Duration) {
        if !self.is_empty() {
            return;
        }
        let notified = self.data.notified();
        if !self.is_empty() {
            return;
        }
        let _ = tokio::time::timeout(timeout, notified).await;
    }

    /// Wakes every parked waiter so it can re-observe shared state.
    pub fn wake_all(&self) {
        self.data.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn fifo_order() {
        let queue = SignalQueue::new();
        queue.push(1);
        queue.push(2);
        queue.push_all([3, 4]);
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.try_pop(), Some(1));
        assert_eq!(queue.try_pop(), Some(2));
        assert_eq!(queue.try_pop(), Some(3));
        assert_eq!(queue.try_pop(), Some(4));
        assert_eq!(queue.try_pop(), None);
    }

    #[tokio::test]
    async fn pop_timeout_returns_none_when_idle() {
        let queue: SignalQueue<u32> = SignalQueue::new();
        let popped = queue.pop_timeout(Duration::from_millis(10)).await;
        assert_eq!(popped, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn pop_timeout_wakes_on_push() {
        let queue = Arc::new(SignalQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop_timeout(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(99u32);
        assert_eq!(consumer.await.unwrap(), Some(99));
    }

    #[tokio::test]
    async fn close_drops_queued_and_refuses_later_pushes() {
        let queue = SignalQueue::new();
        queue.push_all(0..5);
        assert_eq!(queue.close(), 5);
        assert!(queue.is_empty());
        queue.push(6);
        queue.push_all(7..9);
        assert!(queue.is_empty());
    }
}
