//! The registry lookup key.

use crate::error::Result;
use crate::type_key::{TypeKey, TypeToken};
use std::fmt;
use std::sync::Arc;

/// A bound type plus an optional name.
///
/// The registry holds at most one binding per key. A named and an unnamed
/// binding of the same type are unrelated.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BindingKey {
  type_key: TypeKey,
  name: Option<Arc<str>>,
}

impl BindingKey {
  pub fn new(type_key: TypeKey, name: Option<&str>) -> Self {
    Self {
      type_key,
      name: name.map(Arc::from),
    }
  }

  /// The key for `T` under `name`.
  pub fn of<T: ?Sized + TypeToken>(name: Option<&str>) -> Result<Self> {
    Ok(Self::new(TypeKey::of::<T>()?, name))
  }

  pub fn type_key(&self) -> &TypeKey {
    &self.type_key
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }
}

impl fmt::Display for BindingKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "bind<{}>(\"{}\")", self.type_key, name),
      None => write!(f, "bind<{}>()", self.type_key),
    }
  }
}

impl fmt::Debug for BindingKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "Key({}, Name({}))", self.type_key, name),
      None => write!(f, "Key({})", self.type_key),
    }
  }
}
