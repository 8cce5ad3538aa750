//! # Typed Bindings
//!
//! Thin typed wrappers over a [`Dispatcher`].
//!
//! - [`LocalFunction`]: serves a Rust closure under an interface for as long
//!   as the handle lives.
//! - [`RemoteFunction`]: a stub whose argument tuple and return type are fixed
//!   at compile time, so a call with the wrong arity or argument types does
//!   not build.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::Weak;

use tracing::warn;

use wirepack::Pack;
use wirepack::Unpack;
use wirerpc::ArgList;
use wirerpc::Callable;
use wirerpc::InterfaceIdentity;
use wirerpc::Version;
use wirerpc::fallible_skeleton;
use wirerpc::skeleton;

use crate::config::CallOptions;
use crate::dispatcher::Dispatcher;
use crate::error::Result;

/// A named, versioned group of functions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interface {
    identity: InterfaceIdentity,
}

impl Interface {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self { identity: InterfaceIdentity::new(name, version) }
    }

    /// An interface at the default version `1.0`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Version::default())
    }

    pub fn identity(&self) -> &InterfaceIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn version(&self) -> Version {
        self.identity.version
    }
}

/// A registered function. Dropping the handle deregisters it.
pub struct LocalFunction {
    dispatcher: Weak<Dispatcher>,
    interface: InterfaceIdentity,
    name: String,
}

impl LocalFunction {
    /// Registers `f` as `name` under `interface`.
    ///
    /// # Errors
    /// `Error::FunctionAlreadyRegistered` if the name is taken.
    pub fn bind<A, R, F>(
        dispatcher: &Arc<Dispatcher>,
        interface: &Interface,
        name: impl Into<String>,
        f: F,
    ) -> Result<Self>
    where
        A: ArgList + 'static,
        R: Pack + 'static,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        Self::register(dispatcher, interface, name.into(), skeleton(f))
    }

    /// Like [`LocalFunction::bind`], but an `Err` returned by `f` reaches the
    /// caller as a remote error.
    pub fn bind_fallible<A, R, E, F>(
        dispatcher: &Arc<Dispatcher>,
        interface: &Interface,
        name: impl Into<String>,
        f: F,
    ) -> Result<Self>
    where
        A: ArgList + 'static,
        R: Pack + 'static,
        E: std::fmt::Display + 'static,
        F: Fn(A) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        Self::register(dispatcher, interface, name.into(), fallible_skeleton(f))
    }

    fn register(
        dispatcher: &Arc<Dispatcher>,
        interface: &Interface,
        name: String,
        callable: Callable,
    ) -> Result<Self> {
        dispatcher.register_function(interface.identity(), &name, callable)?;
        Ok(Self {
            dispatcher: Arc::downgrade(dispatcher),
            interface: interface.identity().clone(),
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interface(&self) -> &InterfaceIdentity {
        &self.interface
    }
}

impl Drop for LocalFunction {
    fn drop(&mut self) {
        let Some(dispatcher) = self.dispatcher.upgrade() else {
            return;
        };
        if let Err(err) = dispatcher.deregister_function(&self.interface, &self.name) {
            warn!(interface = %self.interface, function = %self.name, error = %err, "deregistration failed");
        }
    }
}

/// A typed stub for a function served by the peer.
pub struct RemoteFunction<A, R> {
    dispatcher: Arc<Dispatcher>,
    interface: InterfaceIdentity,
    name: String,
    _signature: PhantomData<fn(A) -> R>,
}

impl<A, R> Clone for RemoteFunction<A, R> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            interface: self.interface.clone(),
            name: self.name.clone(),
            _signature: PhantomData,
        }
    }
}

impl<A: ArgList, R: Unpack> RemoteFunction<A, R> {
    pub fn new(dispatcher: &Arc<Dispatcher>, interface: &Interface, name: impl Into<String>) -> Self {
        Self {
            dispatcher: Arc::clone(dispatcher),
            interface: interface.identity().clone(),
            name: name.into(),
            _signature: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calls the remote function with the dispatcher's default call options.
    pub fn call(&self, args: A) -> Result<R> {
        self.call_with(args, &self.dispatcher.config().call)
    }

    /// Calls the remote function.
    ///
    /// # Errors
    /// A remote failure comes back as `Error::Rpc(wirerpc::Error::Remote(..))`;
    /// see [`crate::Error::remote`].
    pub fn call_with(&self, args: A, options: &CallOptions) -> Result<R> {
        let marshaller = self.dispatcher.marshaller();
        let request = marshaller.encode_call(&self.interface, &self.name, &args)?;
        let reply = self.dispatcher.call_remote_with(&request, options)?;
        Ok(marshaller.decode_result(&reply)?)
    }
}
