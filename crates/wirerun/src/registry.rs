//! # Function Registry
//!
//! Maps `InterfaceIdentity -> (function name -> Callable)`.
//!
//! ## Invariants
//!
//! 1. **Unique names**: a function name appears at most once per identity.
//! 2. **No empty buckets**: an identity is removed with its last function.
//! 3. **Short critical sections**: `lookup` clones the callable handle and
//!    releases the lock before anything runs.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use wirerpc::Callable;
use wirerpc::InterfaceIdentity;

use crate::error::Error;
use crate::error::Result;

type Buckets = HashMap<InterfaceIdentity, HashMap<String, Callable>>;

#[derive(Default)]
pub struct Registry {
    interfaces: Mutex<Buckets>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Buckets> {
        self.interfaces.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a function, creating the identity bucket if needed.
    ///
    /// # Errors
    /// `Error::FunctionAlreadyRegistered` if the name is taken; the registry
    /// is left unchanged.
    pub fn register(
        &self,
        interface: &InterfaceIdentity,
        function: &str,
        callable: Callable,
    ) -> Result<()> {
        let mut interfaces = self.lock();
        let bucket = interfaces.entry(interface.clone()).or_default();
        match bucket.entry(function.to_owned()) {
            Entry::Occupied(_) => Err(Error::FunctionAlreadyRegistered {
                interface: interface.clone(),
                function: function.to_owned(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(callable);
                Ok(())
            }
        }
    }

    /// Removes a function, dropping the bucket once it is empty.
    pub fn deregister(&self, interface: &InterfaceIdentity, function: &str) -> Result<()> {
        let mut interfaces = self.lock();
        let Some(bucket) = interfaces.get_mut(interface) else {
            return Err(Error::UnknownInterface(interface.clone()));
        };
        if bucket.remove(function).is_none() {
            return Err(Error::UnknownFunction {
                interface: interface.clone(),
                function: function.to_owned(),
            });
        }
        if bucket.is_empty() {
            interfaces.remove(interface);
        }
        Ok(())
    }

    /// Finds a callable by identity, then by name.
    pub fn lookup(&self, interface: &InterfaceIdentity, function: &str) -> Result<Callable> {
        let interfaces = self.lock();
        let bucket = interfaces
            .get(interface)
            .ok_or_else(|| Error::UnknownInterface(interface.clone()))?;
        bucket.get(function).cloned().ok_or_else(|| Error::UnknownFunction {
            interface: interface.clone(),
            function: function.to_owned(),
        })
    }

    pub fn contains_interface(&self, interface: &InterfaceIdentity) -> bool {
        self.lock().contains_key(interface)
    }

    /// Names registered under `interface`, sorted.
    pub fn functions(&self, interface: &InterfaceIdentity) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .get(interface)
            .map(|bucket| bucket.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Total number of registered functions.
    pub fn len(&self) -> usize {
        self.lock().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
