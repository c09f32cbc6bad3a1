//! Resolution: turning a key into a value, a provider or a factory.

use crate::container::Container;
use crate::core::{unerase, AnyArc, Argument, ResolutionGuard};
use crate::error::{DiError, Result};
use crate::key::BindingKey;
use crate::scope::{Binding, Shape};
use crate::type_key::TypeToken;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::trace;

impl Container {
  /// Walks this container, then its parents, and returns the first binding
  /// for `key` along with the container that declared it.
  pub(crate) fn lookup(&self, key: &BindingKey) -> Option<(&Container, &Binding)> {
    let mut current = self;
    loop {
      if let Some(binding) = current.inner.bindings.get(key) {
        return Some((current, binding));
      }
      current = current.inner.parent.as_ref()?;
    }
  }

  /// Like `lookup`, but the binding must also have the requested shape.
  pub(crate) fn find(&self, key: &BindingKey, shape: &Shape) -> Result<(&Container, &Binding)> {
    match self.lookup(key) {
      Some((owner, binding)) if binding.shape == *shape => Ok((owner, binding)),
      _ => Err(DiError::NotFound {
        key: key.clone(),
        shape: shape.to_string(),
      }),
    }
  }

  /// Resolves `key` with the given shape and argument.
  ///
  /// The key stays on this thread's resolution stack while the strategy runs,
  /// so a creator that ends up asking for the same key again fails with
  /// [`DiError::DependencyLoop`] instead of recursing forever.
  pub(crate) fn resolve_value(&self, key: &BindingKey, shape: &Shape, arg: Argument) -> Result<AnyArc> {
    let (owner, binding) = self.find(key, shape)?;
    let _guard = ResolutionGuard::enter(key)?;
    trace!(key = %key, label = %binding.label(), "resolving");
    binding.produce(key, owner, arg)
  }
}

/// Resolves a provider-shaped binding on every call.
pub struct Provider<T: ?Sized> {
  resolve: Arc<dyn Fn() -> Result<Arc<T>> + Send + Sync>,
}

impl<T: ?Sized> Provider<T> {
  pub(crate) fn new<F>(resolve: F) -> Self
  where
    F: Fn() -> Result<Arc<T>> + Send + Sync + 'static,
  {
    Self {
      resolve: Arc::new(resolve),
    }
  }

  pub fn get(&self) -> Result<Arc<T>> {
    (self.resolve)()
  }
}

impl<T: ?Sized> Clone for Provider<T> {
  fn clone(&self) -> Self {
    Self {
      resolve: Arc::clone(&self.resolve),
    }
  }
}

impl<T: ?Sized> fmt::Debug for Provider<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Provider(..)")
  }
}

/// Resolves a factory-shaped binding with a fresh argument on every call.
pub struct Factory<A, T: ?Sized> {
  container: Container,
  key: BindingKey,
  shape: Shape,
  _types: PhantomData<fn(A) -> Arc<T>>,
}

impl<A, T> Factory<A, T>
where
  A: TypeToken + Send,
  T: ?Sized + TypeToken + Send + Sync,
{
  pub(crate) fn new(container: Container, key: BindingKey, shape: Shape) -> Self {
    Self {
      container,
      key,
      shape,
      _types: PhantomData,
    }
  }

  pub fn get(&self, arg: A) -> Result<Arc<T>> {
    let value = self
      .container
      .resolve_value(&self.key, &self.shape, Box::new(arg))?;
    unerase::<T>(&self.key, &value)
  }

  /// Fixes the argument, turning this factory into a provider.
  pub fn to_provider(self, arg: A) -> Provider<T>
  where
    A: Clone + Sync,
  {
    Provider::new(move || self.get(arg.clone()))
  }

  pub fn key(&self) -> &BindingKey {
    &self.key
  }
}

impl<A, T: ?Sized> Clone for Factory<A, T> {
  fn clone(&self) -> Self {
    Self {
      container: self.container.clone(),
      key: self.key.clone(),
      shape: self.shape.clone(),
      _types: PhantomData,
    }
  }
}

impl<A, T: ?Sized> fmt::Debug for Factory<A, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Factory({} with {})", self.key, self.shape)
  }
}

/// A container with a factory argument curried in.
pub struct WithArgument<'c, A> {
  container: &'c Container,
  arg: A,
}

impl<'c, A: TypeToken + Send> WithArgument<'c, A> {
  pub(crate) fn new(container: &'c Container, arg: A) -> Self {
    Self { container, arg }
  }

  pub fn instance<T>(self, name: Option<&str>) -> Result<Arc<T>>
  where
    T: ?Sized + TypeToken + Send + Sync,
  {
    self.container.factory::<A, T>(name)?.get(self.arg)
  }

  pub fn provider<T>(self, name: Option<&str>) -> Result<Provider<T>>
  where
    T: ?Sized + TypeToken + Send + Sync,
    A: Clone + Sync,
  {
    Ok(self.container.factory::<A, T>(name)?.to_provider(self.arg))
  }
}
