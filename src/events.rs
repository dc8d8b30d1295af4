//! Change notifications
//!
//! Observers are plain channel senders. Subscribers own their receiver and
//! drain it on their own thread; a dropped receiver unsubscribes itself on
//! the next notification.

use crossbeam_channel::{Receiver, Sender};

#[derive(Debug)]
pub struct Observers<E> {
    senders: Vec<Sender<E>>,
}

impl<E: Clone> Observers<E> {
    pub fn new() -> Self {
        Self { senders: Vec::new() }
    }

    /// Register a new listener
    pub fn subscribe(&mut self) -> Receiver<E> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.senders.push(tx);
        rx
    }

    /// Send `event` to every live listener
    pub fn notify(&mut self, event: E) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

impl<E: Clone> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}
