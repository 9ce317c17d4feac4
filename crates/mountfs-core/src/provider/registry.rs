//! Ordered collection of loaded providers.

use super::{FolderProvider, Provider, ProviderResolver};
use crate::error::{Result, VfsError};
use std::fmt;
use std::sync::Arc;

/// The providers loaded into a file system, in registration order.
///
/// The registry always holds the built-in [`FolderProvider`] at index `0`.
/// It cannot be removed: requests to remove it are ignored, so the file
/// system can always mount directories and write to its write location.
pub struct ProviderRegistry {
    folder: Arc<dyn Provider>,
    providers: Vec<Arc<dyn Provider>>,
    resolver: Arc<dyn ProviderResolver>,
}

impl ProviderRegistry {
    /// Creates a registry holding only the folder provider.
    #[must_use]
    pub fn new(resolver: Arc<dyn ProviderResolver>) -> Self {
        let folder: Arc<dyn Provider> = Arc::new(FolderProvider::new());
        Self {
            providers: vec![Arc::clone(&folder)],
            folder,
            resolver,
        }
    }

    /// Returns the built-in folder provider.
    #[must_use]
    pub const fn folder_provider(&self) -> &Arc<dyn Provider> {
        &self.folder
    }

    /// Returns the resolver used to instantiate plug-ins.
    #[must_use]
    pub fn resolver(&self) -> &Arc<dyn ProviderResolver> {
        &self.resolver
    }

    /// Returns the number of loaded providers, the folder provider included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Always `false`; the folder provider is never removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Iterates the providers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.iter()
    }

    /// Returns the provider at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arc<dyn Provider>> {
        self.providers.get(index)
    }

    /// Looks up a provider by type name, ignoring ASCII case.
    #[must_use]
    pub fn find(&self, type_name: &str) -> Option<&Arc<dyn Provider>> {
        self.position(type_name).map(|i| &self.providers[i])
    }

    /// Returns `true` if a provider with this type name is loaded.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.position(type_name).is_some()
    }

    fn position(&self, type_name: &str) -> Option<usize> {
        self.providers
            .iter()
            .position(|p| p.type_name().eq_ignore_ascii_case(type_name))
    }

    /// Loads the plug-in registered under `type_name`.
    ///
    /// Returns the already loaded instance if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::InvalidArgument`] for an empty name,
    /// [`VfsError::ProviderNotFound`] if the resolver does not know the name
    /// and [`VfsError::ProviderCreationFailed`] if its factory produced
    /// nothing.
    pub fn add(&mut self, type_name: &str) -> Result<Arc<dyn Provider>> {
        if type_name.trim().is_empty() {
            return Err(VfsError::empty_argument("type_name"));
        }
        if let Some(existing) = self.find(type_name) {
            return Ok(Arc::clone(existing));
        }
        if !self.resolver.contains(type_name) {
            return Err(VfsError::ProviderNotFound {
                type_name: type_name.to_string(),
            });
        }

        let provider =
            self.resolver
                .create(type_name)
                .ok_or_else(|| VfsError::ProviderCreationFailed {
                    type_name: type_name.to_string(),
                })?;

        Ok(self.add_instance(provider))
    }

    /// Adds an already created provider.
    ///
    /// If a provider with the same type name is loaded, that one is kept and
    /// returned instead.
    pub fn add_instance(&mut self, provider: Arc<dyn Provider>) -> Arc<dyn Provider> {
        if let Some(existing) = self.find(provider.type_name()) {
            return Arc::clone(existing);
        }
        tracing::debug!("Loaded provider {}", provider.type_name());
        self.providers.push(Arc::clone(&provider));
        provider
    }

    /// Unloads and removes the provider with this type name.
    ///
    /// Returns the removed provider, or `None` if nothing was removed
    /// (unknown name, or the folder provider).
    pub fn remove(&mut self, type_name: &str) -> Option<Arc<dyn Provider>> {
        let index = self.position(type_name)?;
        self.remove_at(index)
    }

    /// Unloads and removes the provider at `index`.
    pub fn remove_at(&mut self, index: usize) -> Option<Arc<dyn Provider>> {
        let provider = self.providers.get(index)?;
        if Arc::ptr_eq(provider, &self.folder) {
            tracing::debug!("Ignoring request to remove the folder provider");
            return None;
        }

        provider.on_unload();
        let provider = self.providers.remove(index);
        tracing::debug!("Unloaded provider {}", provider.type_name());
        Some(provider)
    }

    /// Unloads and removes this exact provider instance.
    pub fn remove_instance(&mut self, provider: &Arc<dyn Provider>) -> Option<Arc<dyn Provider>> {
        let index = self.providers.iter().position(|p| Arc::ptr_eq(p, provider))?;
        self.remove_at(index)
    }

    /// Unloads every provider and keeps only the folder provider.
    ///
    /// Returns the providers that were removed.
    pub fn clear(&mut self) -> Vec<Arc<dyn Provider>> {
        let removed: Vec<_> = self
            .providers
            .drain(..)
            .filter(|p| !Arc::ptr_eq(p, &self.folder))
            .collect();
        for provider in &removed {
            provider.on_unload();
        }
        self.folder.on_unload();
        self.providers.push(Arc::clone(&self.folder));
        removed
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|p| p.type_name()).collect();
        f.debug_struct("ProviderRegistry")
            .field("providers", &names)
            .field("resolver", &self.resolver)
            .finish()
    }
}
