//! In-memory queue transport.
//!
//! A pair of FIFO queues, one per direction. Each queue has its own lock and
//! condition variable, so the two directions never contend. Used for tests
//! and for wiring two dispatchers together inside one process.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use crate::transport;
use crate::transport::Transport;

/// How long `receive` waits for a message before returning `None`.
pub const DEFAULT_WAIT: Duration = Duration::from_millis(250);

#[derive(Default)]
struct Channel {
    queue: Mutex<VecDeque<Vec<u8>>>,
    ready: Condvar,
}

impl Channel {
    fn lock(&self) -> MutexGuard<'_, VecDeque<Vec<u8>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, message: Vec<u8>) {
        self.lock().push_back(message);
        self.ready.notify_all();
    }

    fn pop(&self, wait: Duration) -> Option<Vec<u8>> {
        let queue = self.lock();
        let (mut queue, _) = self
            .ready
            .wait_timeout_while(queue, wait, |q| q.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        queue.pop_front()
    }
}

/// One end of an in-memory queue pair.
///
/// Messages sent on one end are received, in order, by the other.
pub struct QueueTransport {
    outbound: Arc<Channel>,
    inbound: Arc<Channel>,
    wait: Duration,
}

impl QueueTransport {
    /// Creates a connected `(initiator, responder)` pair.
    pub fn pair() -> (Self, Self) {
        let forward = Arc::new(Channel::default());
        let backward = Arc::new(Channel::default());

        let initiator = Self {
            outbound: Arc::clone(&forward),
            inbound: Arc::clone(&backward),
            wait: DEFAULT_WAIT,
        };
        let responder = Self {
            outbound: backward,
            inbound: forward,
            wait: DEFAULT_WAIT,
        };
        (initiator, responder)
    }

    /// Overrides how long `receive` waits on this end.
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Messages queued for this end and not yet received.
    pub fn pending(&self) -> usize {
        self.inbound.lock().len()
    }
}

impl Transport for QueueTransport {
    fn send(&self, payload: &[u8]) -> transport::Result<()> {
        self.outbound.push(payload.to_vec());
        Ok(())
    }

    fn receive(&self) -> transport::Result<Option<Vec<u8>>> {
        Ok(self.inbound.pop(self.wait))
    }
}
