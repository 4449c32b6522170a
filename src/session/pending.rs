//! Pending-write queue.
//!
//! Writes issued before the secure channel is established wait here.
//! Insertion order is flush order; the queue is drained exactly once, at
//! the Secure transition, and failed wholesale if the session dies first.

use std::collections::VecDeque;

use bytes::Bytes;
use tokio::sync::oneshot;

use super::types::WriteError;

/// Completion side of a single write.
pub(crate) type WriteCompletion = oneshot::Sender<Result<(), WriteError>>;

/// FIFO buffer of writes awaiting the secure channel.
#[derive(Default)]
pub(crate) struct PendingWriteQueue {
    entries: VecDeque<(Bytes, WriteCompletion)>,
}

impl PendingWriteQueue {
    /// Append a write. Completion stays untouched until flush or failure.
    pub fn push(&mut self, payload: Bytes, completion: WriteCompletion) {
        self.entries.push_back((payload, completion));
    }

    /// Take every queued write, oldest first.
    pub fn drain(&mut self) -> std::collections::vec_deque::IntoIter<(Bytes, WriteCompletion)> {
        std::mem::take(&mut self.entries).into_iter()
    }

    /// Fail every queued write with the same error.
    pub fn fail_all(&mut self, error: WriteError) {
        for (_, completion) in std::mem::take(&mut self.entries) {
            let _ = completion.send(Err(error.clone()));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
