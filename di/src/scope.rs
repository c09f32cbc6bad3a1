//! Lifecycle strategies and the bindings that carry them.

use crate::container::Container;
use crate::core::{claim_build, erase, take_argument, wait_for_build, AnyArc, Argument, Creator};
use crate::error::Result;
use crate::key::BindingKey;
use crate::type_key::TypeKey;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::trace;

/// Lifecycles selectable through [`BindingReceiver::with`](crate::BindingReceiver::with).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
  /// A new value on every resolution.
  Provider,
  /// One value for the lifetime of the binding.
  Singleton,
  /// One value per calling thread.
  ThreadSingleton,
}

/// A value held in an external [`ScopeStore`].
///
/// Stores only keep and hand back what the container gave them.
#[derive(Clone)]
pub struct ScopedValue(AnyArc);

impl fmt::Debug for ScopedValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("ScopedValue(..)")
  }
}

/// An externally owned key to value store backing scoped singletons.
///
/// The container never evicts. Whatever the owner removes is rebuilt on the
/// next resolution, whatever it keeps is reused. Thread-safety of the store
/// is the implementor's responsibility.
pub trait ScopeStore<K>: Send + Sync {
  fn get(&self, key: &K) -> Option<ScopedValue>;
  fn insert(&self, key: K, value: ScopedValue);
}

/// A concurrent [`ScopeStore`] backed by a `DashMap`.
pub struct ScopeCache<K> {
  entries: DashMap<K, ScopedValue>,
}

impl<K: Eq + Hash> Default for ScopeCache<K> {
  fn default() -> Self {
    Self {
      entries: DashMap::new(),
    }
  }
}

impl<K: Eq + Hash> ScopeCache<K> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Evicts one scope. The next resolution for that key builds a new value.
  pub fn remove<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.entries.remove(key).is_some()
  }

  pub fn contains_key<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.entries.contains_key(key)
  }

  pub fn clear(&self) {
    self.entries.clear();
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl<K: Eq + Hash + Send + Sync> ScopeStore<K> for ScopeCache<K> {
  fn get(&self, key: &K) -> Option<ScopedValue> {
    self.entries.get(key).map(|entry| entry.value().clone())
  }

  fn insert(&self, key: K, value: ScopedValue) {
    self.entries.insert(key, value);
  }
}

/// Looks a value up in an external store, creating it on a miss.
pub(crate) trait ExternalScope: Send + Sync {
  fn get_or_create(
    &self,
    key: &BindingKey,
    owner: &Container,
    arg: Argument,
    creator: &Creator,
  ) -> Result<AnyArc>;
}

/// Scope selected from the factory argument.
pub(crate) struct KeyedScope<A, K, T: ?Sized> {
  pub(crate) store: Arc<dyn ScopeStore<K>>,
  pub(crate) selector: Box<dyn Fn(&A) -> K + Send + Sync>,
  pub(crate) _value: PhantomData<fn() -> Arc<T>>,
}

impl<A, K, T> ExternalScope for KeyedScope<A, K, T>
where
  A: Send + 'static,
  K: 'static,
  T: ?Sized + Send + Sync + 'static,
{
  fn get_or_create(
    &self,
    key: &BindingKey,
    owner: &Container,
    arg: Argument,
    creator: &Creator,
  ) -> Result<AnyArc> {
    let arg: A = take_argument(key, arg)?;
    let scope_key = (self.selector)(&arg);
    lookup_or_create::<K, T>(key, &*self.store, scope_key, || creator(owner, Box::new(arg)))
  }
}

/// Scope whose selector returns both the key and the store.
pub(crate) struct AutoScope<K, T: ?Sized> {
  pub(crate) selector: Box<dyn Fn(&Container) -> (K, Arc<dyn ScopeStore<K>>) + Send + Sync>,
  pub(crate) _value: PhantomData<fn() -> Arc<T>>,
}

impl<K, T> ExternalScope for AutoScope<K, T>
where
  K: 'static,
  T: ?Sized + Send + Sync + 'static,
{
  fn get_or_create(
    &self,
    key: &BindingKey,
    owner: &Container,
    arg: Argument,
    creator: &Creator,
  ) -> Result<AnyArc> {
    let (scope_key, store) = (self.selector)(owner);
    lookup_or_create::<K, T>(key, &*store, scope_key, || creator(owner, arg))
  }
}

fn lookup_or_create<K, T>(
  key: &BindingKey,
  store: &dyn ScopeStore<K>,
  scope_key: K,
  create: impl FnOnce() -> Result<AnyArc>,
) -> Result<AnyArc>
where
  T: ?Sized + Send + Sync + 'static,
{
  // An entry of a foreign type (a store shared between bindings) is a miss.
  if let Some(ScopedValue(value)) = store.get(&scope_key) {
    if value.is::<Arc<T>>() {
      trace!(key = %key, "scoped value reused");
      return Ok(value);
    }
  }
  let value = create()?;
  store.insert(scope_key, ScopedValue(value.clone()));
  trace!(key = %key, "scoped value created");
  Ok(value)
}

static NEXT_SINGLETON_ID: AtomicU64 = AtomicU64::new(0);

/// The lifecycle of one binding, with its creator and cache.
pub(crate) enum Strategy {
  Provider {
    creator: Creator,
  },
  Singleton {
    id: u64,
    cell: OnceCell<AnyArc>,
    creator: Creator,
  },
  ThreadSingleton {
    slots: DashMap<ThreadId, AnyArc>,
    creator: Creator,
  },
  Scoped {
    scope: Box<dyn ExternalScope>,
    creator: Creator,
    auto: bool,
  },
  Instance {
    value: AnyArc,
  },
}

impl Strategy {
  pub(crate) fn from_lifecycle(lifecycle: Lifecycle, creator: Creator) -> Self {
    match lifecycle {
      Lifecycle::Provider => Strategy::Provider { creator },
      Lifecycle::Singleton => Strategy::Singleton {
        id: NEXT_SINGLETON_ID.fetch_add(1, Ordering::Relaxed),
        cell: OnceCell::new(),
        creator,
      },
      Lifecycle::ThreadSingleton => Strategy::ThreadSingleton {
        slots: DashMap::new(),
        creator,
      },
    }
  }

  pub(crate) fn instance<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
    Strategy::Instance {
      value: erase(value),
    }
  }
}

/// What a binding must be asked for: a provider (no argument) or a factory
/// taking an argument of the given type.
#[derive(Clone, PartialEq, Eq)]
pub(crate) enum Shape {
  Provider,
  Factory(TypeKey),
}

impl fmt::Display for Shape {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Shape::Provider => f.write_str("provider"),
      Shape::Factory(arg) => write!(f, "factory<{}>", arg),
    }
  }
}

pub(crate) struct Binding {
  pub(crate) shape: Shape,
  pub(crate) strategy: Strategy,
}

impl Binding {
  pub(crate) fn new(shape: Shape, strategy: Strategy) -> Self {
    Self { shape, strategy }
  }

  /// Strategy name, with the argument type appended for factory-shaped
  /// bindings.
  pub(crate) fn label(&self) -> String {
    let name = match &self.strategy {
      Strategy::Provider { .. } => match self.shape {
        Shape::Provider => "provider",
        Shape::Factory(_) => "factory",
      },
      Strategy::Singleton { .. } => "singleton",
      Strategy::ThreadSingleton { .. } => "thread_singleton",
      Strategy::Scoped { auto: false, .. } => "scoped_singleton",
      Strategy::Scoped { auto: true, .. } => "auto_scoped_singleton",
      Strategy::Instance { .. } => "instance",
    };
    match &self.shape {
      Shape::Provider => name.to_string(),
      Shape::Factory(arg) => format!("{}<{}>", name, arg),
    }
  }

  /// Runs the strategy. `owner` is the container that declared the binding,
  /// which is what the creator resolves its own dependencies against.
  pub(crate) fn produce(&self, key: &BindingKey, owner: &Container, arg: Argument) -> Result<AnyArc> {
    match &self.strategy {
      Strategy::Provider { creator } => creator(owner, arg),
      Strategy::Singleton { id, cell, creator } => {
        if let Some(value) = cell.get() {
          return Ok(value.clone());
        }
        let _wait = wait_for_build(*id, key)?;
        cell
          .get_or_try_init(|| {
            let _claim = claim_build(*id, key);
            trace!(key = %key, "creating singleton");
            creator(owner, arg)
          })
          .map(Arc::clone)
      }
      Strategy::ThreadSingleton { slots, creator } => {
        let thread = thread::current().id();
        if let Some(value) = slots.get(&thread).map(|slot| slot.value().clone()) {
          return Ok(value);
        }
        // No map lock is held while the creator runs: it may resolve other
        // thread singletons of this binding's shard.
        let value = creator(owner, arg)?;
        Ok(slots.entry(thread).or_insert(value).value().clone())
      }
      Strategy::Scoped { scope, creator, .. } => scope.get_or_create(key, owner, arg, creator),
      Strategy::Instance { value } => Ok(value.clone()),
    }
  }
}
