//! The error type shared by configuration, resolution and injection.

use crate::key::BindingKey;
use std::fmt::Write as _;

/// Boxed error returned by user creators that fail for their own reasons.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience alias used throughout the crate.
pub type Result<T, E = DiError> = std::result::Result<T, E>;

/// Every failure the container can surface.
///
/// None of these are retried or swallowed internally: they come back from the
/// configuration or resolution call that triggered them.
#[derive(Debug, thiserror::Error)]
pub enum DiError {
  /// A type expression did not resolve to a concrete type.
  #[error("invalid type token `{type_name}`: {reason}")]
  InvalidTypeToken {
    type_name: String,
    reason: &'static str,
  },

  /// No binding matches the key, or the binding has a different shape
  /// (provider vs factory, or another factory argument type).
  #[error("no {shape} binding found for {key}")]
  NotFound { key: BindingKey, shape: String },

  /// The key is already being resolved further up the current call chain.
  #[error("dependency loop detected: {}", render_path(.path))]
  DependencyLoop { key: BindingKey, path: Vec<BindingKey> },

  /// A binding, import or extend tried to replace a binding without permission.
  #[error("{0}")]
  Overriding(String),

  /// A deferred lookup was used before its injector got a container.
  #[error("injector has not been injected with a container yet")]
  Uninjected,

  /// The injector is already attached to a container.
  #[error("injector is already attached to a container")]
  AlreadyInjected,

  /// A binding produced a value whose runtime type is not the requested one.
  /// Only possible with a hand-written `TypeToken` that describes two types
  /// identically.
  #[error("{key} produced a value that is not a `{expected}`")]
  TypeMismatch {
    key: BindingKey,
    expected: &'static str,
  },

  /// A user creator failed.
  #[error(transparent)]
  Custom(#[from] BoxError),
}

impl DiError {
  /// Wraps any error raised inside a user creator.
  pub fn custom<E>(error: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    DiError::Custom(Box::new(error))
  }

  pub(crate) fn overriding(key: &BindingKey, reason: &str) -> Self {
    DiError::Overriding(format!("{} {}", key, reason))
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, DiError::NotFound { .. })
  }

  pub fn is_dependency_loop(&self) -> bool {
    matches!(self, DiError::DependencyLoop { .. })
  }

  pub fn is_overriding(&self) -> bool {
    matches!(self, DiError::Overriding(_))
  }
}

fn render_path(path: &[BindingKey]) -> String {
  let mut out = String::new();
  for (i, key) in path.iter().enumerate() {
    if i > 0 {
      out.push_str(" -> ");
    }
    let _ = write!(out, "{}", key);
  }
  out
}
