//! # Dispatcher
//!
//! Owns the function registry and drives one end of a transport, either as
//! an initiator (`call_remote`) or as a responder (`serve`).
//!
//! ## Responder loop
//!
//! ```text
//! Idle -> PollingTransport -> [message? Decode -> Lookup -> Invoke -> Encode -> Send] -> Idle
//!                          \-> Stopped (shutdown flag, checked once per iteration)
//! ```
//!
//! ## Invariants
//!
//! 1. **One role per end**: a serving dispatcher refuses `call_remote`, since
//!    its loop would consume the replies.
//! 2. **Correlated replies**: each caller waits for the reply carrying its own
//!    `seq`, and at most one caller waits on a given `seq`. Replies for other
//!    in-flight callers on this dispatcher are parked for them; replies nobody
//!    waits for are dropped.
//! 3. **No orphan threads**: `shutdown` (and `Drop`) joins the loop thread,
//!    unless it runs on that thread, which then exits on its own.
//! 4. **Callables run unlocked**: the registry lock is released before a
//!    callable is invoked.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::thread;
use std::thread::JoinHandle;
use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use wirerpc::Callable;
use wirerpc::FrameKind;
use wirerpc::InterfaceIdentity;
use wirerpc::Marshaller;
use wirerpc::RemoteError;
use wirerpc::ResultEnvelope;

use crate::config::CallOptions;
use crate::config::DispatcherConfig;
use crate::config::PollPolicy;
use crate::error::Error;
use crate::error::Result;
use crate::registry::Registry;
use crate::transport::Transport;

/// State shared between the dispatcher handle and its loop thread.
struct Shared {
    registry: Registry,
    marshaller: Marshaller,
    transport: Box<dyn Transport>,
    config: DispatcherConfig,
    stopping: Mutex<bool>,
    /// In-flight calls by `seq`; `Some` once another caller parked the reply.
    inbox: DashMap<u64, Option<Vec<u8>>>,
}

pub struct Dispatcher {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new(transport: impl Transport) -> Self {
        Self::with_config(transport, DispatcherConfig::default())
    }

    pub fn with_config(transport: impl Transport, config: DispatcherConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Registry::new(),
                marshaller: Marshaller::new(),
                transport: Box::new(transport),
                config,
                stopping: Mutex::new(false),
                inbox: DashMap::new(),
            }),
            worker: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.shared.registry
    }

    pub fn marshaller(&self) -> &Marshaller {
        &self.shared.marshaller
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.shared.config
    }

    fn worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_serving(&self) -> bool {
        self.worker().is_some()
    }

    // ========================================================================
    //  REGISTRATION
    // ========================================================================

    pub fn register_function(
        &self,
        interface: &InterfaceIdentity,
        function: &str,
        callable: Callable,
    ) -> Result<()> {
        self.shared.registry.register(interface, function, callable)?;
        debug!(%interface, function, "registered function");
        Ok(())
    }

    pub fn deregister_function(&self, interface: &InterfaceIdentity, function: &str) -> Result<()> {
        self.shared.registry.deregister(interface, function)?;
        debug!(%interface, function, "deregistered function");
        Ok(())
    }

    // ========================================================================
    //  INITIATOR
    // ========================================================================

    /// Sends an encoded call and waits for its reply, using the configured
    /// call options.
    pub fn call_remote(&self, call_data: &[u8]) -> Result<Vec<u8>> {
        self.call_remote_with(call_data, &self.shared.config.call)
    }

    /// Sends an encoded call and waits for the reply with the same `seq`.
    ///
    /// # Errors
    /// - `Error::InvalidMode` if this dispatcher is serving.
    /// - `Error::SeqInFlight` if another caller is waiting on the same `seq`.
    /// - `Error::Timeout` / `Error::Cancelled` per `options`.
    /// - `Error::Transport` if the transport fails.
    pub fn call_remote_with(&self, call_data: &[u8], options: &CallOptions) -> Result<Vec<u8>> {
        if self.is_serving() {
            return Err(Error::InvalidMode);
        }
        let seq = self.shared.marshaller.peek_seq(call_data)?;
        let _slot = InboxSlot::claim(&self.shared.inbox, seq)?;

        self.shared.transport.send(call_data)?;
        debug!(seq, "call sent");

        let started = Instant::now();
        loop {
            if let Some(reply) = self.take_parked(seq) {
                return Ok(reply);
            }
            if options.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if let Some(limit) = options.timeout {
                if started.elapsed() >= limit {
                    return Err(Error::Timeout(limit));
                }
            }

            match self.shared.transport.receive()? {
                Some(message) => {
                    if let Some(reply) = self.route_reply(seq, message) {
                        return Ok(reply);
                    }
                }
                None => pause(options.poll),
            }
        }
    }

    fn take_parked(&self, seq: u64) -> Option<Vec<u8>> {
        self.shared.inbox.get_mut(&seq).and_then(|mut slot| slot.take())
    }

    /// Returns the message if it answers `seq`; otherwise hands it to its
    /// waiter or drops it.
    fn route_reply(&self, seq: u64, message: Vec<u8>) -> Option<Vec<u8>> {
        let header = match self.shared.marshaller.peek(&message) {
            Ok(header) => header,
            Err(err) => {
                warn!(error = %err, "dropping undecodable frame");
                return None;
            }
        };
        if header.kind != FrameKind::Reply {
            warn!(seq = header.seq, "initiator dropped a call frame");
            return None;
        }
        if header.seq == seq {
            return Some(message);
        }
        match self.shared.inbox.get_mut(&header.seq) {
            Some(mut slot) => *slot = Some(message),
            None => debug!(seq = header.seq, "dropping reply with no waiting caller"),
        }
        None
    }

    // ========================================================================
    //  RESPONDER
    // ========================================================================

    /// Decodes a call, runs the matching callable and returns the encoded
    /// reply.
    ///
    /// Routing misses are answered with a `Failure` labelled
    /// `UnknownInterface` or `UnknownFunction`.
    pub fn dispatch_incoming(&self, call_data: &[u8]) -> Result<Vec<u8>> {
        self.shared.dispatch_incoming(call_data)
    }

    /// Starts the dispatch loop on a dedicated thread.
    pub fn serve(&self) -> Result<()> {
        let mut worker = self.worker();
        if worker.is_some() {
            return Err(Error::AlreadyServing);
        }
        *self.shared.stopping() = false;

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(self.shared.config.thread_name.clone())
            .spawn(move || shared.serve_loop())
            .map_err(Error::Spawn)?;
        *worker = Some(handle);
        Ok(())
    }

    /// Stops the dispatch loop and waits for its thread to exit.
    ///
    /// Returns within roughly one transport receive bound. Does nothing if
    /// the dispatcher is not serving. Called from the loop thread itself (a
    /// callable dropping the last handle), it only raises the stop flag; the
    /// loop exits after the current reply is sent.
    pub fn shutdown(&self) {
        let Some(handle) = self.worker().take() else {
            return;
        };
        *self.shared.stopping() = true;
        if handle.thread().id() == thread::current().id() {
            debug!("shutdown requested from the dispatch thread");
            return;
        }
        if handle.join().is_err() {
            error!("dispatch thread panicked");
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Shared {
    fn stopping(&self) -> MutexGuard<'_, bool> {
        self.stopping.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn serve_loop(&self) {
        info!(thread = %self.config.thread_name, "dispatch loop started");
        loop {
            match self.transport.receive() {
                Ok(Some(message)) => self.answer(&message),
                Ok(None) => {}
                Err(err) => {
                    error!(error = %err, "transport receive failed");
                    thread::sleep(self.config.error_backoff);
                }
            }
            if *self.stopping() {
                break;
            }
        }
        info!(thread = %self.config.thread_name, "dispatch loop stopped");
    }

    fn answer(&self, message: &[u8]) {
        let reply = match self.dispatch_incoming(message) {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "failed to dispatch call");
                match self.malformed_reply(message, &err) {
                    Some(reply) => reply,
                    None => return,
                }
            }
        };
        if let Err(err) = self.transport.send(&reply) {
            error!(error = %err, "failed to send reply");
        }
    }

    /// A `MalformedCall` failure for a call whose `seq` is still readable.
    fn malformed_reply(&self, message: &[u8], err: &Error) -> Option<Vec<u8>> {
        let header = self.marshaller.peek(message).ok()?;
        if header.kind != FrameKind::Call {
            return None;
        }
        let failure = RemoteError::new(RemoteError::MALFORMED_CALL, err.to_string());
        self.marshaller
            .encode_result(header.seq, &ResultEnvelope::Failure(failure))
            .ok()
    }

    fn dispatch_incoming(&self, call_data: &[u8]) -> Result<Vec<u8>> {
        let call = self.marshaller.decode_call(call_data)?;

        let result = match self.registry.lookup(&call.interface, &call.function) {
            Ok(callable) => {
                debug!(seq = call.seq, interface = %call.interface, function = %call.function, "dispatching call");
                callable(call.arguments.as_slice())?
            }
            Err(miss) => {
                warn!(seq = call.seq, error = %miss, "routing miss");
                let label = match miss {
                    Error::UnknownInterface(_) => RemoteError::UNKNOWN_INTERFACE,
                    _ => RemoteError::UNKNOWN_FUNCTION,
                };
                ResultEnvelope::Failure(RemoteError::new(label, miss.to_string()))
            }
        };

        Ok(self.marshaller.encode_result(call.seq, &result)?)
    }
}

/// Registers a caller in the inbox for the duration of one call.
struct InboxSlot<'a> {
    inbox: &'a DashMap<u64, Option<Vec<u8>>>,
    seq: u64,
}

impl<'a> InboxSlot<'a> {
    fn claim(inbox: &'a DashMap<u64, Option<Vec<u8>>>, seq: u64) -> Result<Self> {
        match inbox.entry(seq) {
            Entry::Occupied(_) => Err(Error::SeqInFlight(seq)),
            Entry::Vacant(slot) => {
                slot.insert(None);
                Ok(Self { inbox, seq })
            }
        }
    }
}

impl Drop for InboxSlot<'_> {
    fn drop(&mut self) {
        self.inbox.remove(&self.seq);
    }
}

fn pause(policy: PollPolicy) {
    match policy {
        PollPolicy::Busy => {}
        PollPolicy::Sleep(interval) => thread::sleep(interval),
    }
}
