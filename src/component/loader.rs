//! # Component Loader
//!
//! The network resolves component names through a [`ComponentLoader`] handed
//! to it at construction. [`ComponentRegistry`] is the in-process
//! implementation: an explicit table of factories and graph definitions.
//! Graph definitions load as [`Subgraph`] components resolved against the
//! same registry.
//!
//! # Example
//!
//! ```rust
//! use flowweave::component::{ComponentLoader, ComponentRegistry};
//!
//! # tokio_test::block_on(async {
//! let registry = ComponentRegistry::with_core_components();
//! let names = registry.list_components().await.unwrap();
//! assert!(names.contains(&"core/Repeat".to_string()));
//! # });
//! ```

use crate::component::component::Component;
use crate::component::subgraph::Subgraph;
use crate::components::{Repeat, RepeatAsync};
use crate::graph::{Graph, GraphError, GraphJson, Metadata};
use crate::network::NetworkConfig;
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use thiserror::Error;
use tracing::debug;

/// Failures resolving a component.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoaderError {
  /// No factory or graph is registered under this name.
  #[error("component '{0}' not available")]
  NotFound(String),
  /// A registered graph definition could not be built.
  #[error("graph component '{name}' is invalid: {source}")]
  InvalidGraph {
    /// Component name.
    name: String,
    /// Underlying failure.
    source: GraphError,
  },
}

/// Resolves component names to fresh instances.
#[async_trait(?Send)]
pub trait ComponentLoader {
  /// Instantiates the component registered as `name`.
  async fn load(&self, name: &str, metadata: &Metadata) -> Result<Rc<dyn Component>, LoaderError>;

  /// Names of every loadable component.
  async fn list_components(&self) -> Result<Vec<String>, LoaderError>;
}

type Factory = Rc<dyn Fn(&Metadata) -> Rc<dyn Component>>;

/// In-process [`ComponentLoader`] backed by explicit registrations.
pub struct ComponentRegistry {
  me: Weak<ComponentRegistry>,
  factories: RefCell<BTreeMap<String, Factory>>,
  graphs: RefCell<BTreeMap<String, GraphJson>>,
  config: NetworkConfig,
}

impl ComponentRegistry {
  /// Creates an empty registry.
  pub fn new() -> Rc<Self> {
    Self::with_config(NetworkConfig::default())
  }

  /// Creates an empty registry whose subgraph networks use `config`.
  pub fn with_config(config: NetworkConfig) -> Rc<Self> {
    Rc::new_cyclic(|me| Self {
      me: me.clone(),
      factories: RefCell::new(BTreeMap::new()),
      graphs: RefCell::new(BTreeMap::new()),
      config,
    })
  }

  /// Creates a registry with `core/Repeat` and `core/RepeatAsync`.
  pub fn with_core_components() -> Rc<Self> {
    let registry = Self::new();
    registry.register("core/Repeat", |_| Repeat::new());
    registry.register("core/RepeatAsync", |_| RepeatAsync::create(None));
    registry
  }

  /// Registers a factory, replacing any previous registration of `name`.
  pub fn register(&self, name: &str, factory: impl Fn(&Metadata) -> Rc<dyn Component> + 'static) {
    self.graphs.borrow_mut().remove(name);
    self
      .factories
      .borrow_mut()
      .insert(name.to_string(), Rc::new(factory));
  }

  /// Registers a graph definition loadable as a subgraph component.
  pub fn register_graph(&self, name: &str, definition: GraphJson) {
    self.factories.borrow_mut().remove(name);
    self
      .graphs
      .borrow_mut()
      .insert(name.to_string(), definition);
  }

  /// Whether `name` is registered.
  pub fn contains(&self, name: &str) -> bool {
    self.factories.borrow().contains_key(name) || self.graphs.borrow().contains_key(name)
  }

  fn load_graph(&self, name: &str, definition: &GraphJson) -> Result<Rc<dyn Component>, LoaderError> {
    let graph = Graph::load_json(definition, None).map_err(|source| LoaderError::InvalidGraph {
      name: name.to_string(),
      source,
    })?;
    let loader: Rc<dyn ComponentLoader> = self
      .me
      .upgrade()
      .ok_or_else(|| LoaderError::NotFound(name.to_string()))?;
    Ok(Subgraph::new(Rc::new(graph), loader, self.config.clone()))
  }
}

#[async_trait(?Send)]
impl ComponentLoader for ComponentRegistry {
  async fn load(&self, name: &str, metadata: &Metadata) -> Result<Rc<dyn Component>, LoaderError> {
    debug!(component = %name, "loading component");
    let factory = self.factories.borrow().get(name).cloned();
    if let Some(factory) = factory {
      return Ok(factory(metadata));
    }
    let definition = self.graphs.borrow().get(name).cloned();
    match definition {
      Some(definition) => self.load_graph(name, &definition),
      None => Err(LoaderError::NotFound(name.to_string())),
    }
  }

  async fn list_components(&self) -> Result<Vec<String>, LoaderError> {
    let mut names: Vec<String> = self.factories.borrow().keys().cloned().collect();
    names.extend(self.graphs.borrow().keys().cloned());
    names.sort();
    Ok(names)
  }
}
