//! Deferred lookups declared before a container exists.

use crate::container::Container;
use crate::error::{DiError, Result};
use crate::key::BindingKey;
use crate::type_key::TypeToken;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct InjectorState {
  container: OnceCell<Container>,
  declared: Mutex<Vec<BindingKey>>,
}

impl InjectorState {
  fn container(&self) -> Result<&Container> {
    self.container.get().ok_or(DiError::Uninjected)
  }
}

/// Collects typed lookups now and resolves them once a container is
/// [`inject`](Injector::inject)ed.
///
/// Using a handle before injection fails with [`DiError::Uninjected`].
/// Injection happens at most once: a second `inject` fails with
/// [`DiError::AlreadyInjected`] and the first container stays attached.
///
/// # Examples
///
/// ```
/// use fibre_di::{type_token, Container, Injector};
///
/// struct Greeting(String);
/// type_token!(Greeting);
///
/// let injector = Injector::new();
/// let greeting = injector.instance::<Greeting>(None)?;
/// assert!(greeting.get().is_err());
///
/// let container = Container::new(|b| b.bind::<Greeting>().instance(Greeting("hi".into())))?;
/// injector.inject(&container)?;
/// assert_eq!(greeting.get()?.0, "hi");
/// # Ok::<(), fibre_di::DiError>(())
/// ```
#[derive(Clone, Default)]
pub struct Injector {
  state: Arc<InjectorState>,
}

impl Injector {
  pub fn new() -> Self {
    Self::default()
  }

  fn declare<T: ?Sized + TypeToken>(&self, name: Option<&str>) -> Result<BindingKey> {
    let key = BindingKey::of::<T>(name)?;
    self.state.declared.lock().push(key.clone());
    Ok(key)
  }

  /// Attaches `container`. Every handle created from this injector, before
  /// or after this call, resolves against it from now on.
  pub fn inject(&self, container: &Container) -> Result<()> {
    self
      .state
      .container
      .set(container.clone())
      .map_err(|_| DiError::AlreadyInjected)?;
    debug!(
      lookups = self.state.declared.lock().len(),
      "injector attached to container"
    );
    Ok(())
  }

  pub fn is_injected(&self) -> bool {
    self.state.container.get().is_some()
  }

  /// Keys of every lookup declared so far, in declaration order.
  pub fn declared(&self) -> Vec<BindingKey> {
    self.state.declared.lock().clone()
  }

  /// An instance, resolved on first access and kept afterwards.
  pub fn instance<T>(&self, name: Option<&str>) -> Result<InjectedInstance<T>>
  where
    T: ?Sized + TypeToken + Send + Sync,
  {
    self.declare::<T>(name)?;
    let name = name.map(str::to_owned);
    Ok(InjectedInstance::new(
      self.state.clone(),
      Box::new(move |c: &Container| c.instance::<T>(name.as_deref())),
    ))
  }

  /// A provider; every call resolves anew.
  pub fn provider<T>(&self, name: Option<&str>) -> Result<InjectedProvider<T>>
  where
    T: ?Sized + TypeToken + Send + Sync,
  {
    self.declare::<T>(name)?;
    let name = name.map(str::to_owned);
    Ok(InjectedProvider::new(
      self.state.clone(),
      Box::new(move |c: &Container| c.instance::<T>(name.as_deref())),
    ))
  }

  /// A factory taking an `A`.
  pub fn factory<A, T>(&self, name: Option<&str>) -> Result<InjectedFactory<A, T>>
  where
    A: TypeToken + Send,
    T: ?Sized + TypeToken + Send + Sync,
  {
    self.declare::<T>(name)?;
    Ok(InjectedFactory {
      state: self.state.clone(),
      name: name.map(str::to_owned),
      _types: PhantomData,
    })
  }

  /// A provider calling the factory binding `name` with `arg` every time.
  pub fn provider_from_factory<A, T>(&self, arg: A, name: Option<&str>) -> Result<InjectedProvider<T>>
  where
    A: TypeToken + Clone + Send + Sync,
    T: ?Sized + TypeToken + Send + Sync,
  {
    self.declare::<T>(name)?;
    let name = name.map(str::to_owned);
    Ok(InjectedProvider::new(
      self.state.clone(),
      Box::new(move |c: &Container| c.with(arg.clone()).instance::<T>(name.as_deref())),
    ))
  }

  /// An instance built once by the factory binding `name` from `arg`.
  pub fn instance_from_factory<A, T>(&self, arg: A, name: Option<&str>) -> Result<InjectedInstance<T>>
  where
    A: TypeToken + Clone + Send + Sync,
    T: ?Sized + TypeToken + Send + Sync,
  {
    self.declare::<T>(name)?;
    let name = name.map(str::to_owned);
    Ok(InjectedInstance::new(
      self.state.clone(),
      Box::new(move |c: &Container| c.with(arg.clone()).instance::<T>(name.as_deref())),
    ))
  }
}

impl fmt::Debug for Injector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Injector")
      .field("injected", &self.is_injected())
      .field("declared", &self.state.declared.lock().len())
      .finish()
  }
}

type Resolve<T> = Box<dyn Fn(&Container) -> Result<Arc<T>> + Send + Sync>;

/// A deferred instance. The first successful [`get`](Self::get) after
/// injection is cached and returned by every later call.
pub struct InjectedInstance<T: ?Sized> {
  state: Arc<InjectorState>,
  resolve: Resolve<T>,
  value: OnceCell<Arc<T>>,
}

impl<T: ?Sized> InjectedInstance<T> {
  fn new(state: Arc<InjectorState>, resolve: Resolve<T>) -> Self {
    Self {
      state,
      resolve,
      value: OnceCell::new(),
    }
  }

  pub fn get(&self) -> Result<Arc<T>> {
    let container = self.state.container()?;
    self
      .value
      .get_or_try_init(|| (self.resolve)(container))
      .map(Arc::clone)
  }
}

/// A deferred provider.
pub struct InjectedProvider<T: ?Sized> {
  state: Arc<InjectorState>,
  resolve: Resolve<T>,
}

impl<T: ?Sized> InjectedProvider<T> {
  fn new(state: Arc<InjectorState>, resolve: Resolve<T>) -> Self {
    Self { state, resolve }
  }

  pub fn get(&self) -> Result<Arc<T>> {
    (self.resolve)(self.state.container()?)
  }
}

/// A deferred factory.
pub struct InjectedFactory<A, T: ?Sized> {
  state: Arc<InjectorState>,
  name: Option<String>,
  _types: PhantomData<fn(A) -> Arc<T>>,
}

impl<A, T> InjectedFactory<A, T>
where
  A: TypeToken + Send,
  T: ?Sized + TypeToken + Send + Sync,
{
  pub fn get(&self, arg: A) -> Result<Arc<T>> {
    self
      .state
      .container()?
      .with(arg)
      .instance::<T>(self.name.as_deref())
  }
}
