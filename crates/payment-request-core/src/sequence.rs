//! Owning-sequence task queue.
//!
//! Work that originates off the owning sequence (a UI worker thread, a delayed reply) is
//! posted here and only runs when the owner drains the queue.

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

use crate::ports::PaymentError;

#[derive(Debug)]
pub struct Sequence<T> {
    sender: UnboundedSender<T>,
    receiver: UnboundedReceiver<T>,
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Sequence<T> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    pub fn sender(&self) -> SequenceSender<T> {
        SequenceSender {
            sender: self.sender.clone(),
        }
    }

    pub fn post(&self, task: T) {
        // The receiver lives in `self`, so the send cannot fail here.
        let _ = self.sender.send(task);
    }

    pub fn try_next(&mut self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(task) => Some(task),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub async fn next(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Everything queued right now. Tasks posted while the batch is processed wait for the
    /// next call.
    pub fn drain(&mut self) -> Vec<T> {
        let mut tasks = Vec::new();
        while let Some(task) = self.try_next() {
            tasks.push(task);
        }
        tasks
    }
}

/// Cloneable, thread-safe handle for posting onto a `Sequence`.
#[derive(Debug)]
pub struct SequenceSender<T> {
    sender: UnboundedSender<T>,
}

impl<T> Clone for SequenceSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> SequenceSender<T> {
    pub fn post(&self, task: T) -> Result<(), PaymentError> {
        self.sender
            .send(task)
            .map_err(|_| PaymentError::Transport("owning sequence is gone".to_owned()))
    }
}
