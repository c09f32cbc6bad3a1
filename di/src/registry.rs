//! Binding registration: the configuration-time side of the container.
//!
//! A [`Builder`] is only reachable from inside the configuration closure given
//! to [`Container::new`] or [`ContainerBuilder::build`](crate::ContainerBuilder::build).
//! When that closure returns, the registry is frozen into an immutable
//! [`Container`] and nothing can be bound anymore.

use crate::container::Container;
use crate::core::{erase, take_argument, Argument, Creator};
use crate::error::{DiError, Result};
use crate::key::BindingKey;
use crate::scope::{AutoScope, Binding, KeyedScope, Lifecycle, ScopeStore, Shape, Strategy};
use crate::type_key::{TypeKey, TypeToken};
use ahash::AHashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// The frozen binding map of one container.
pub(crate) struct Registry {
  pub(crate) bindings: AHashMap<BindingKey, Binding>,
  pub(crate) parent: Option<Container>,
}

pub(crate) type ReadyCallback = Box<dyn FnOnce(&Container) -> Result<()>>;

/// A registry under construction.
pub(crate) struct Draft {
  bindings: AHashMap<BindingKey, Binding>,
  parent: Option<Container>,
  // Set by `extend(parent, true)`: the child may shadow parent keys freely.
  shadow_parent: bool,
  allow_silent_override: bool,
  ready: Vec<ReadyCallback>,
}

impl Draft {
  pub(crate) fn new(allow_silent_override: bool) -> Self {
    Self {
      bindings: AHashMap::new(),
      parent: None,
      shadow_parent: false,
      allow_silent_override,
      ready: Vec::new(),
    }
  }

  pub(crate) fn freeze(self) -> (Registry, Vec<ReadyCallback>) {
    let registry = Registry {
      bindings: self.bindings,
      parent: self.parent,
    };
    (registry, self.ready)
  }

  fn inherits(&self, key: &BindingKey) -> bool {
    self
      .parent
      .as_ref()
      .is_some_and(|parent| parent.contains(key))
  }

  fn check_override(&self, key: &BindingKey, overrides: Option<bool>, allow_override: bool) -> Result<()> {
    if overrides == Some(true) && !allow_override {
      return Err(DiError::overriding(
        key,
        "cannot override: overriding has been forbidden in this module",
      ));
    }

    let exists = self.bindings.contains_key(key) || (!self.shadow_parent && self.inherits(key));
    if !exists {
      return Ok(());
    }

    match overrides {
      Some(true) => {
        debug!(key = %key, "overriding binding");
        Ok(())
      }
      Some(false) => Err(DiError::overriding(key, "must not override an existing binding")),
      None if self.allow_silent_override => {
        debug!(key = %key, "silently overriding binding");
        Ok(())
      }
      None => Err(DiError::overriding(
        key,
        "overrides an existing binding; declare it with `overrides(true)` or allow silent overrides",
      )),
    }
  }

  fn insert(
    &mut self,
    key: BindingKey,
    binding: Binding,
    overrides: Option<bool>,
    allow_override: bool,
  ) -> Result<()> {
    self.check_override(&key, overrides, allow_override)?;
    debug!(key = %key, label = %binding.label(), "bound");
    self.bindings.insert(key, binding);
    Ok(())
  }
}

/// The configuration surface handed to configuration closures and modules.
pub struct Builder<'a> {
  draft: &'a mut Draft,
  // Whether bindings made through this builder may request an override.
  // Closed for modules imported without `allow_override`, and stays closed
  // for everything they import in turn.
  allow_override: bool,
}

impl<'a> Builder<'a> {
  pub(crate) fn root(draft: &'a mut Draft) -> Self {
    Self {
      draft,
      allow_override: true,
    }
  }

  /// Starts a binding for `T`.
  pub fn bind<T: ?Sized + TypeToken + Send + Sync>(&mut self) -> BindingReceiver<'_, T> {
    BindingReceiver {
      draft: &mut *self.draft,
      allow_override: self.allow_override,
      name: None,
      overrides: None,
      _type: PhantomData,
    }
  }

  /// Starts a named constant: an instance binding whose type is inferred
  /// from the value.
  pub fn constant(&mut self, name: impl Into<String>) -> ConstantBinder<'_> {
    ConstantBinder {
      draft: &mut *self.draft,
      allow_override: self.allow_override,
      name: name.into(),
      overrides: None,
    }
  }

  /// Replays `module` against this builder.
  ///
  /// With `allow_override == false` the module and everything it imports
  /// may not override existing bindings.
  pub fn import(&mut self, module: &Module, allow_override: bool) -> Result<()> {
    if allow_override && !self.allow_override {
      return Err(DiError::Overriding(format!(
        "cannot import module `{}` with overrides allowed: overriding has been forbidden in this module",
        module.name()
      )));
    }
    debug!(module = %module.name(), allow_override, "importing module");
    let mut nested = Builder {
      draft: &mut *self.draft,
      allow_override,
    };
    (module.init)(&mut nested)
  }

  /// Falls back to `parent` for every key this container does not bind.
  ///
  /// Parent bindings are not copied and the parent is never modified. With
  /// `allow_override == false`, binding a key the parent already provides
  /// counts as overriding it.
  pub fn extend(&mut self, parent: &Container, allow_override: bool) -> Result<()> {
    if allow_override && !self.allow_override {
      return Err(DiError::Overriding(
        "cannot extend with overrides allowed: overriding has been forbidden in this module".to_string(),
      ));
    }
    if self.draft.parent.is_some() {
      return Err(DiError::Overriding(
        "this container already extends a parent container".to_string(),
      ));
    }
    if !allow_override && !self.draft.allow_silent_override {
      if let Some(key) = self.draft.bindings.keys().find(|key| parent.contains(key)) {
        return Err(DiError::overriding(
          key,
          "is already bound by the parent container being extended",
        ));
      }
    }
    debug!(allow_override, "extending parent container");
    self.draft.parent = Some(parent.clone());
    self.draft.shadow_parent = allow_override;
    Ok(())
  }

  /// Runs `callback` once the container is built, before it is returned.
  pub fn on_ready<F>(&mut self, callback: F)
  where
    F: FnOnce(&Container) -> Result<()> + 'static,
  {
    self.draft.ready.push(Box::new(callback));
  }

  pub fn is_override_allowed(&self) -> bool {
    self.allow_override
  }
}

/// A binding for `T` waiting for its lifecycle and creator.
#[must_use = "a binding is only registered once a lifecycle method is called"]
pub struct BindingReceiver<'b, T: ?Sized> {
  draft: &'b mut Draft,
  allow_override: bool,
  name: Option<String>,
  overrides: Option<bool>,
  _type: PhantomData<fn() -> Arc<T>>,
}

impl<'b, T: ?Sized + TypeToken + Send + Sync> BindingReceiver<'b, T> {
  pub fn named(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  /// `true` requires permission to replace an existing binding;
  /// `false` forbids replacing one, even when silent overrides are allowed.
  pub fn overrides(mut self, overrides: bool) -> Self {
    self.overrides = Some(overrides);
    self
  }

  fn finish(self, shape: Shape, strategy: impl FnOnce(&BindingKey) -> Strategy) -> Result<()> {
    let key = BindingKey::of::<T>(self.name.as_deref())?;
    let binding = Binding::new(shape, strategy(&key));
    self
      .draft
      .insert(key, binding, self.overrides, self.allow_override)
  }

  /// Binds with an explicit lifecycle. The creator returns an `Arc`, which
  /// also makes this the way to bind trait objects.
  pub fn with<F>(self, lifecycle: Lifecycle, creator: F) -> Result<()>
  where
    F: Fn(&Container) -> Result<Arc<T>> + Send + Sync + 'static,
  {
    let creator: Creator = Box::new(move |container: &Container, _: Argument| {
      creator(container).map(erase::<T>)
    });
    self.finish(Shape::Provider, |_| Strategy::from_lifecycle(lifecycle, creator))
  }

  /// Binds an existing shared value. Every resolution returns this exact `Arc`.
  pub fn instance_arc(self, value: Arc<T>) -> Result<()> {
    self.finish(Shape::Provider, |_| Strategy::instance(value))
  }
}

impl<'b, T: TypeToken + Send + Sync> BindingReceiver<'b, T> {
  /// A new value on every resolution.
  pub fn provider<F>(self, creator: F) -> Result<()>
  where
    F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
  {
    self.with(Lifecycle::Provider, move |c| creator(c).map(Arc::new))
  }

  /// One value, created on first resolution.
  pub fn singleton<F>(self, creator: F) -> Result<()>
  where
    F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
  {
    self.with(Lifecycle::Singleton, move |c| creator(c).map(Arc::new))
  }

  /// One value per resolving thread.
  pub fn thread_singleton<F>(self, creator: F) -> Result<()>
  where
    F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
  {
    self.with(Lifecycle::ThreadSingleton, move |c| creator(c).map(Arc::new))
  }

  /// A new value for every call, built from an argument of type `A`.
  /// Resolved with [`Container::factory`].
  pub fn factory<A, F>(self, creator: F) -> Result<()>
  where
    A: TypeToken + Send,
    F: Fn(&Container, A) -> Result<T> + Send + Sync + 'static,
  {
    let arg_type = TypeKey::of::<A>()?;
    self.finish(Shape::Factory(arg_type), |key| {
      let key = key.clone();
      Strategy::Provider {
        creator: Box::new(move |container: &Container, arg: Argument| {
          let arg = take_argument::<A>(&key, arg)?;
          creator(container, arg).map(|value| erase(Arc::new(value)))
        }),
      }
    })
  }

  pub fn instance(self, value: T) -> Result<()> {
    self.instance_arc(Arc::new(value))
  }

  /// A factory-shaped singleton cached in an external store.
  ///
  /// `selector` maps the factory argument to a key of `store`. A hit returns
  /// the stored value; a miss runs `creator` and stores its result. Only the
  /// store's owner evicts.
  pub fn scoped_singleton<A, K, S, Sel, F>(self, store: Arc<S>, selector: Sel, creator: F) -> Result<()>
  where
    A: TypeToken + Send,
    K: 'static,
    S: ScopeStore<K> + 'static,
    Sel: Fn(&A) -> K + Send + Sync + 'static,
    F: Fn(&Container, A) -> Result<T> + Send + Sync + 'static,
  {
    let arg_type = TypeKey::of::<A>()?;
    self.finish(Shape::Factory(arg_type), |key| {
      let key = key.clone();
      Strategy::Scoped {
        scope: Box::new(KeyedScope::<A, K, T> {
          store,
          selector: Box::new(selector),
          _value: PhantomData,
        }),
        creator: Box::new(move |container: &Container, arg: Argument| {
          let arg = take_argument::<A>(&key, arg)?;
          creator(container, arg).map(|value| erase(Arc::new(value)))
        }),
        auto: false,
      }
    })
  }

  /// A provider-shaped singleton whose selector picks both the scope key and
  /// the store holding it.
  pub fn auto_scoped_singleton<K, S, Sel, F>(self, selector: Sel, creator: F) -> Result<()>
  where
    K: 'static,
    S: ScopeStore<K> + 'static,
    Sel: Fn(&Container) -> (K, Arc<S>) + Send + Sync + 'static,
    F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
  {
    self.finish(Shape::Provider, |_| Strategy::Scoped {
      scope: Box::new(AutoScope::<K, T> {
        selector: Box::new(move |container: &Container| {
          let (key, store) = selector(container);
          (key, store as Arc<dyn ScopeStore<K>>)
        }),
        _value: PhantomData,
      }),
      creator: Box::new(move |container: &Container, _: Argument| {
        creator(container).map(|value| erase(Arc::new(value)))
      }),
      auto: true,
    })
  }
}

/// A named instance binding whose type comes from the bound value.
#[must_use = "a constant is only registered once `with` is called"]
pub struct ConstantBinder<'b> {
  draft: &'b mut Draft,
  allow_override: bool,
  name: String,
  overrides: Option<bool>,
}

impl<'b> ConstantBinder<'b> {
  pub fn overrides(mut self, overrides: bool) -> Self {
    self.overrides = Some(overrides);
    self
  }

  pub fn with<T: TypeToken + Send + Sync>(self, value: T) -> Result<()> {
    let receiver = BindingReceiver::<T> {
      draft: self.draft,
      allow_override: self.allow_override,
      name: Some(self.name),
      overrides: self.overrides,
      _type: PhantomData,
    };
    receiver.instance(value)
  }
}

type ModuleInit = dyn Fn(&mut Builder<'_>) -> Result<()> + Send + Sync;

/// A named, replayable set of bindings.
///
/// Nothing is bound when the module is created; every
/// [`import`](Builder::import) runs the module again against the importing
/// builder, so two containers importing the same module get independent
/// singletons.
#[derive(Clone)]
pub struct Module {
  name: Arc<str>,
  init: Arc<ModuleInit>,
}

impl Module {
  pub fn new<F>(name: impl Into<String>, init: F) -> Self
  where
    F: Fn(&mut Builder<'_>) -> Result<()> + Send + Sync + 'static,
  {
    Self {
      name: Arc::from(name.into()),
      init: Arc::new(init),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }
}

impl fmt::Debug for Module {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Module").field("name", &self.name).finish()
  }
}
