//! # Named-instance registry.
//!
//! The optional "bind to a name" construction variant: a [`Registry`]
//! maps names to [`FountHandle`]s so unrelated parts of a process can
//! reach a shared reservoir without threading handles through every call
//! site. Keep one instance process-wide (a `static` or an `Arc`) if that
//! is the scope you want.
//!
//! Registration stores a handle, never the owning [`Fount`](crate::Fount):
//! the registry cannot keep a core alive or shut one down.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::RegistryError;
use crate::fount::FountHandle;

/// Name-to-handle map for founts sharing one message type.
pub struct Registry<M> {
    founts: DashMap<String, FountHandle<M>>,
}

impl<M> Registry<M> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            founts: DashMap::new(),
        }
    }

    /// Registers a handle under `name`.
    ///
    /// # Errors
    /// [`RegistryError::NameTaken`] when the name is already registered.
    pub fn register(
        &self,
        name: impl Into<String>,
        handle: FountHandle<M>,
    ) -> Result<(), RegistryError> {
        match self.founts.entry(name.into()) {
            Entry::Occupied(entry) => Err(RegistryError::NameTaken {
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(handle);
                Ok(())
            }
        }
    }

    /// Looks up a handle by name.
    pub fn lookup(&self, name: &str) -> Option<FountHandle<M>> {
        self.founts.get(name).map(|entry| entry.value().clone())
    }

    /// Removes a registration.
    ///
    /// # Errors
    /// [`RegistryError::NotFound`] when the name is not registered.
    pub fn deregister(&self, name: &str) -> Result<(), RegistryError> {
        self.founts
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    /// Returns the sorted list of registered names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.founts.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }
}

impl<M> Default for Registry<M> {
    fn default() -> Self {
        Self::new()
    }
}
