//! The main `Container` struct and its associated methods.

use crate::core::unerase;
use crate::error::Result;
use crate::key::BindingKey;
use crate::registry::{Builder, Draft, Registry};
use crate::resolver::{Factory, Provider, WithArgument};
use crate::scope::Shape;
use crate::type_key::{TypeKey, TypeToken};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A frozen, thread-safe dependency-injection container.
///
/// Built once through a configuration closure, then shared freely: cloning
/// is cheap and every clone sees the same bindings and the same singleton
/// caches.
///
/// # Examples
///
/// ```
/// use fibre_di::{type_token, Container};
///
/// struct Config { url: String }
/// struct Database { url: String }
/// type_token!(Config, Database);
///
/// let container = Container::new(|b| {
///   b.bind::<Config>().instance(Config { url: "postgres://db".into() })?;
///   b.bind::<Database>().singleton(|c| {
///     let config = c.instance::<Config>(None)?;
///     Ok(Database { url: config.url.clone() })
///   })?;
///   Ok(())
/// })?;
///
/// let db = container.instance::<Database>(None)?;
/// assert_eq!(db.url, "postgres://db");
/// # Ok::<(), fibre_di::DiError>(())
/// ```
#[derive(Clone)]
pub struct Container {
  pub(crate) inner: Arc<Registry>,
}

/// Container options, set before the configuration closure runs.
#[derive(Debug, Clone, Default)]
pub struct ContainerBuilder {
  allow_silent_override: bool,
}

impl ContainerBuilder {
  /// Lets a binding replace an existing one without declaring
  /// `overrides(true)`. Off by default.
  pub fn allow_silent_override(mut self, allow: bool) -> Self {
    self.allow_silent_override = allow;
    self
  }

  /// Runs `configure`, freezes the result, then fires the `on_ready`
  /// callbacks in registration order.
  pub fn build<F>(self, configure: F) -> Result<Container>
  where
    F: FnOnce(&mut Builder<'_>) -> Result<()>,
  {
    let mut draft = Draft::new(self.allow_silent_override);
    configure(&mut Builder::root(&mut draft))?;

    let (registry, ready) = draft.freeze();
    let container = Container {
      inner: Arc::new(registry),
    };
    debug!(
      bindings = container.inner.bindings.len(),
      extends = container.inner.parent.is_some(),
      "container ready"
    );

    for callback in ready {
      callback(&container)?;
    }
    Ok(container)
  }
}

impl Container {
  /// Builds a container with default options.
  pub fn new<F>(configure: F) -> Result<Self>
  where
    F: FnOnce(&mut Builder<'_>) -> Result<()>,
  {
    Self::builder().build(configure)
  }

  pub fn builder() -> ContainerBuilder {
    ContainerBuilder::default()
  }

  /// The container this one extends, if any.
  pub fn parent(&self) -> Option<&Container> {
    self.inner.parent.as_ref()
  }

  /// Whether `key` is bound here or anywhere up the parent chain.
  pub fn contains(&self, key: &BindingKey) -> bool {
    self.lookup(key).is_some()
  }

  // --- Instances ---

  /// Resolves a provider-shaped binding of `T`.
  pub fn instance<T>(&self, name: Option<&str>) -> Result<Arc<T>>
  where
    T: ?Sized + TypeToken + Send + Sync,
  {
    let key = BindingKey::of::<T>(name)?;
    let value = self.resolve_value(&key, &Shape::Provider, Box::new(()))?;
    unerase::<T>(&key, &value)
  }

  /// Like [`instance`](Self::instance), but `None` when nothing is bound.
  /// Failures while building the value are still errors.
  pub fn instance_or_none<T>(&self, name: Option<&str>) -> Result<Option<Arc<T>>>
  where
    T: ?Sized + TypeToken + Send + Sync,
  {
    let key = BindingKey::of::<T>(name)?;
    if self.find(&key, &Shape::Provider).is_err() {
      return Ok(None);
    }
    self.instance::<T>(name).map(Some)
  }

  // --- Providers ---

  /// A handle resolving `T` anew on every [`get`](Provider::get), so the
  /// binding's lifecycle applies per call.
  pub fn provider<T>(&self, name: Option<&str>) -> Result<Provider<T>>
  where
    T: ?Sized + TypeToken + Send + Sync,
  {
    let key = BindingKey::of::<T>(name)?;
    self.find(&key, &Shape::Provider)?;
    let container = self.clone();
    Ok(Provider::new(move || {
      let value = container.resolve_value(&key, &Shape::Provider, Box::new(()))?;
      unerase::<T>(&key, &value)
    }))
  }

  pub fn provider_or_none<T>(&self, name: Option<&str>) -> Result<Option<Provider<T>>>
  where
    T: ?Sized + TypeToken + Send + Sync,
  {
    match self.provider::<T>(name) {
      Ok(provider) => Ok(Some(provider)),
      Err(err) if err.is_not_found() => Ok(None),
      Err(err) => Err(err),
    }
  }

  // --- Factories ---

  /// A handle over a factory-shaped binding of `T` taking an `A`.
  pub fn factory<A, T>(&self, name: Option<&str>) -> Result<Factory<A, T>>
  where
    A: TypeToken + Send,
    T: ?Sized + TypeToken + Send + Sync,
  {
    let key = BindingKey::of::<T>(name)?;
    let shape = Shape::Factory(TypeKey::of::<A>()?);
    self.find(&key, &shape)?;
    Ok(Factory::new(self.clone(), key, shape))
  }

  pub fn factory_or_none<A, T>(&self, name: Option<&str>) -> Result<Option<Factory<A, T>>>
  where
    A: TypeToken + Send,
    T: ?Sized + TypeToken + Send + Sync,
  {
    match self.factory::<A, T>(name) {
      Ok(factory) => Ok(Some(factory)),
      Err(err) if err.is_not_found() => Ok(None),
      Err(err) => Err(err),
    }
  }

  /// Curries `arg` into factory lookups: `c.with(arg).instance::<T>(None)`.
  pub fn with<A: TypeToken + Send>(&self, arg: A) -> WithArgument<'_, A> {
    WithArgument::new(self, arg)
  }

  // --- Introspection ---

  /// Every visible key with its strategy label. Local bindings shadow the
  /// parent's.
  pub fn registered_bindings(&self) -> HashMap<BindingKey, String> {
    let mut bindings = self
      .inner
      .parent
      .as_ref()
      .map(Container::registered_bindings)
      .unwrap_or_default();
    for (key, binding) in &self.inner.bindings {
      bindings.insert(key.clone(), binding.label());
    }
    bindings
  }

  /// One sorted line per binding: `bind<Type>("name") with label`.
  pub fn bindings_description(&self) -> String {
    let mut lines: Vec<String> = self
      .registered_bindings()
      .into_iter()
      .map(|(key, label)| format!("{} with {}", key, label))
      .collect();
    lines.sort();
    lines.join("\n")
  }
}

impl fmt::Debug for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Container")
      .field("bindings", &self.inner.bindings.len())
      .field("parent", &self.inner.parent)
      .finish()
  }
}
