//! Provider plug-in lookup.
//!
//! The registry never instantiates providers on its own. It asks a
//! [`ProviderResolver`] for them by type name, which keeps plug-in discovery
//! outside the core and lets callers (and tests) decide what is installed.

use super::Provider;
use std::fmt;
use std::sync::Arc;

/// Creates a provider instance; `None` signals that creation failed.
pub type ProviderFactory = Box<dyn Fn() -> Option<Arc<dyn Provider>> + Send + Sync>;

/// Resolves provider type names to provider instances.
pub trait ProviderResolver: Send + Sync + fmt::Debug {
    /// Lists the type names of every installed provider plug-in.
    fn provider_names(&self) -> Vec<String>;

    /// Returns `true` if a plug-in with this type name is installed.
    fn contains(&self, type_name: &str) -> bool {
        self.provider_names()
            .iter()
            .any(|name| name.eq_ignore_ascii_case(type_name))
    }

    /// Instantiates the provider registered under `type_name`.
    fn create(&self, type_name: &str) -> Option<Arc<dyn Provider>>;
}

/// An in-process catalog of provider factories.
///
/// # Examples
///
/// ```
/// use mountfs_core::{FolderProvider, PluginCatalog, ProviderResolver};
/// use std::sync::Arc;
///
/// let catalog = PluginCatalog::new()
///     .with_plugin("mirror", || Some(Arc::new(FolderProvider::new())));
///
/// assert!(catalog.contains("mirror"));
/// assert!(catalog.create("mirror").is_some());
/// assert!(catalog.create("zip").is_none());
/// ```
#[derive(Default)]
pub struct PluginCatalog {
    plugins: Vec<(String, ProviderFactory)>,
}

impl PluginCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a factory and returns the catalog, for chaining.
    #[must_use]
    pub fn with_plugin<F>(mut self, type_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Option<Arc<dyn Provider>> + Send + Sync + 'static,
    {
        self.register(type_name, factory);
        self
    }

    /// Adds a factory, replacing any factory of the same type name.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Option<Arc<dyn Provider>> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        self.plugins
            .retain(|(name, _)| !name.eq_ignore_ascii_case(&type_name));
        self.plugins.push((type_name, Box::new(factory)));
    }

    /// Returns the number of registered factories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` if no factory is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl ProviderResolver for PluginCatalog {
    fn provider_names(&self) -> Vec<String> {
        self.plugins.iter().map(|(name, _)| name.clone()).collect()
    }

    fn create(&self, type_name: &str) -> Option<Arc<dyn Provider>> {
        self.plugins
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(type_name))
            .and_then(|(_, factory)| factory())
    }
}

impl fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("plugins", &self.provider_names())
            .finish()
    }
}
