//! Dispatcher and per-call configuration.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Default bound on how long `call_remote` waits for its reply.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Cooperative cancellation for an in-flight call.
///
/// Clones share the same flag, so one thread can cancel a call that another
/// thread is waiting on.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// What the initiator does between empty polls of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPolicy {
    /// Poll again immediately; the transport's own receive bound paces the loop.
    #[default]
    Busy,
    /// Sleep for a fixed interval before polling again.
    Sleep(Duration),
}

/// How a single `call_remote` waits for its reply.
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// `None` waits until the reply arrives, however long that takes.
    pub timeout: Option<Duration>,
    pub poll: PollPolicy,
    pub cancel: Option<CancelToken>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_CALL_TIMEOUT),
            poll: PollPolicy::Busy,
            cancel: None,
        }
    }
}

impl CallOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// Dispatcher-wide settings.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Options used by `call_remote` and by `RemoteFunction::call`.
    pub call: CallOptions,
    /// Pause after a transport failure in the dispatch loop.
    pub error_backoff: Duration,
    /// Name given to the dispatch thread.
    pub thread_name: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            call: CallOptions::default(),
            error_backoff: Duration::from_millis(50),
            thread_name: "wirerun-dispatch".to_string(),
        }
    }
}

impl DispatcherConfig {
    pub fn with_call_options(mut self, call: CallOptions) -> Self {
        self.call = call;
        self
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}
