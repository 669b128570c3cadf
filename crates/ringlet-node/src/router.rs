use std::collections::HashMap;

use parking_lot::Mutex;
use ringlet_codec::Message;
use tokio::sync::oneshot;
use tracing::debug;

/// Outstanding requests waiting for an answer, keyed by transaction id.
#[derive(Debug, Default)]
pub struct PendingRequests {
    waiting: Mutex<HashMap<u64, oneshot::Sender<Message>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, transaction_id: u64) -> oneshot::Receiver<Message> {
        let (tx, rx) = oneshot::channel();
        self.waiting.lock().insert(transaction_id, tx);
        rx
    }

    /// Hands `answer` to its waiting request; false for unsolicited answers.
    pub fn complete(&self, answer: Message) -> bool {
        let transaction_id = answer.header.transaction_id;
        let Some(waiter) = self.waiting.lock().remove(&transaction_id) else {
            debug!("no request waiting for answer {transaction_id:#x}");
            return false;
        };
        waiter.send(answer).is_ok()
    }

    pub fn cancel(&self, transaction_id: u64) {
        self.waiting.lock().remove(&transaction_id);
    }

    pub fn len(&self) -> usize {
        self.waiting.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.lock().is_empty()
    }
}
