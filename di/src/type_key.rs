//! Structural identity for (possibly generic) types.
//!
//! A [`TypeKey`] is built from a [`TypeExpr`], the description of a type as
//! written at a call site. Two keys are equal when their raw types are equal
//! and their argument lists are pairwise equal, in order. An upper-bounded
//! argument is interchangeable with its bound, and an unbound type variable
//! can never become a key.

use crate::error::{DiError, Result};
use once_cell::sync::OnceCell;
use std::any::{type_name, TypeId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The raw, argument-less part of a type: its `TypeId` and a display name.
#[derive(Clone, Copy)]
pub struct RawType {
  id: TypeId,
  name: &'static str,
}

impl RawType {
  /// Describes `T` itself, named after `std::any::type_name`.
  pub fn of<T: ?Sized + 'static>() -> Self {
    Self {
      id: TypeId::of::<T>(),
      name: type_name::<T>(),
    }
  }

  /// Describes `T` under an explicit display name. Used for generic
  /// constructors, where `T` is the constructor applied to placeholder types.
  pub fn named<T: ?Sized + 'static>(name: &'static str) -> Self {
    Self {
      id: TypeId::of::<T>(),
      name,
    }
  }

  pub fn name(&self) -> &'static str {
    self.name
  }
}

impl PartialEq for RawType {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for RawType {}

impl Hash for RawType {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.id.hash(state);
  }
}

impl fmt::Debug for RawType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name)
  }
}

/// A type as written at a call site, before it is resolved into a [`TypeKey`].
#[derive(Clone, Debug)]
pub enum TypeExpr {
  /// A raw type applied to zero or more arguments.
  Concrete { raw: RawType, args: Vec<TypeExpr> },
  /// Some type bounded above by the inner expression; resolves to the bound.
  UpperBounded(Box<TypeExpr>),
  /// A type variable with no concrete binding.
  Variable(&'static str),
}

impl TypeExpr {
  /// A non-generic leaf describing `T` as a whole.
  pub fn of<T: ?Sized + 'static>() -> Self {
    TypeExpr::Concrete {
      raw: RawType::of::<T>(),
      args: Vec::new(),
    }
  }

  pub fn generic(raw: RawType, args: Vec<TypeExpr>) -> Self {
    TypeExpr::Concrete { raw, args }
  }

  pub fn upper_bounded(bound: TypeExpr) -> Self {
    TypeExpr::UpperBounded(Box::new(bound))
  }

  pub fn variable(name: &'static str) -> Self {
    TypeExpr::Variable(name)
  }

  pub fn display_name(&self) -> String {
    match self {
      TypeExpr::Concrete { raw, args } => {
        let args: Vec<String> = args.iter().map(TypeExpr::display_name).collect();
        join_display(raw.name, &args)
      }
      TypeExpr::UpperBounded(bound) => format!("? : {}", bound.display_name()),
      TypeExpr::Variable(name) => (*name).to_string(),
    }
  }
}

/// Captures the full type of `Self` at the call site.
///
/// The default implementation describes `Self` as a non-generic leaf, which is
/// what user types and trait objects want; [`type_token!`](crate::type_token)
/// writes those impls. Generic containers from `std` are described
/// structurally so that their arguments take part in the key.
pub trait TypeToken: 'static {
  fn type_expr() -> TypeExpr {
    TypeExpr::of::<Self>()
  }
}

struct TypeKeyNode {
  raw: RawType,
  args: Box<[TypeKey]>,
  hash: OnceCell<u64>,
}

/// Structural, order-sensitive identity of a fully resolved type.
///
/// Cloning is cheap. The hash is computed on first use and memoized.
#[derive(Clone)]
pub struct TypeKey(Arc<TypeKeyNode>);

impl TypeKey {
  /// The key for `T`.
  pub fn of<T: ?Sized + TypeToken>() -> Result<Self> {
    Self::from_expr(&T::type_expr())
  }

  /// Resolves an expression, unwrapping upper bounds to the bounding type.
  pub fn from_expr(expr: &TypeExpr) -> Result<Self> {
    match expr {
      TypeExpr::Concrete { raw, args } => {
        let args = args
          .iter()
          .map(TypeKey::from_expr)
          .collect::<Result<Vec<_>>>()?;
        Ok(Self(Arc::new(TypeKeyNode {
          raw: *raw,
          args: args.into_boxed_slice(),
          hash: OnceCell::new(),
        })))
      }
      TypeExpr::UpperBounded(bound) => Self::from_expr(bound),
      TypeExpr::Variable(name) => Err(DiError::InvalidTypeToken {
        type_name: (*name).to_string(),
        reason: "must specify concrete type arguments",
      }),
    }
  }

  pub fn raw(&self) -> &RawType {
    &self.0.raw
  }

  pub fn args(&self) -> &[TypeKey] {
    &self.0.args
  }

  pub fn is_generic(&self) -> bool {
    !self.0.args.is_empty()
  }

  pub fn display_name(&self) -> String {
    let args: Vec<String> = self.args().iter().map(TypeKey::display_name).collect();
    join_display(self.0.raw.name, &args)
  }

  /// Order-sensitive combination of the raw hash and the argument hashes.
  pub fn structural_hash(&self) -> u64 {
    *self.0.hash.get_or_init(|| {
      let mut hasher = ahash::AHasher::default();
      self.0.raw.hash(&mut hasher);
      self
        .0
        .args
        .iter()
        .fold(hasher.finish(), |acc, arg| {
          acc.wrapping_mul(31).wrapping_add(arg.structural_hash())
        })
    })
  }
}

fn join_display(raw: &str, args: &[String]) -> String {
  if args.is_empty() {
    raw.to_string()
  } else {
    format!("{}<{}>", raw, args.join(", "))
  }
}

fn expr_matches(key: &TypeKey, expr: &TypeExpr) -> bool {
  match expr {
    TypeExpr::UpperBounded(bound) => expr_matches(key, bound),
    TypeExpr::Variable(_) => false,
    TypeExpr::Concrete { raw, args } => {
      key.0.raw == *raw
        && key.0.args.len() == args.len()
        && key.0.args.iter().zip(args).all(|(k, e)| expr_matches(k, e))
    }
  }
}

impl PartialEq for TypeKey {
  fn eq(&self, other: &Self) -> bool {
    if Arc::ptr_eq(&self.0, &other.0) {
      return true;
    }
    if self.structural_hash() != other.structural_hash() {
      return false;
    }
    self.0.raw == other.0.raw && self.0.args == other.0.args
  }
}

impl Eq for TypeKey {}

impl PartialEq<TypeExpr> for TypeKey {
  fn eq(&self, other: &TypeExpr) -> bool {
    expr_matches(self, other)
  }
}

impl PartialEq<TypeKey> for TypeExpr {
  fn eq(&self, other: &TypeKey) -> bool {
    expr_matches(other, self)
  }
}

impl Hash for TypeKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    state.write_u64(self.structural_hash());
  }
}

impl fmt::Display for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.display_name())
  }
}

impl fmt::Debug for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "TypeKey({})", self.display_name())
  }
}

// --- TypeToken implementations ---

/// Placeholder argument used to name a generic constructor by `TypeId`.
enum Hole {}

/// Implements [`TypeToken`] as a non-generic leaf for each listed type.
///
/// ```
/// use fibre_di::{type_token, TypeKey};
///
/// struct Database;
/// trait Repository: Send + Sync {}
/// type_token!(Database, dyn Repository);
///
/// assert!(TypeKey::of::<Database>().is_ok());
/// ```
#[macro_export]
macro_rules! type_token {
  ($($ty:ty),+ $(,)?) => {
    $(impl $crate::TypeToken for $ty {})+
  };
}

type_token!(
  (),
  bool,
  char,
  i8,
  i16,
  i32,
  i64,
  i128,
  isize,
  u8,
  u16,
  u32,
  u64,
  u128,
  usize,
  f32,
  f64,
  str,
  &'static str,
  String,
);

impl<T: TypeToken> TypeToken for Vec<T> {
  fn type_expr() -> TypeExpr {
    TypeExpr::generic(RawType::named::<Vec<Hole>>("alloc::vec::Vec"), vec![T::type_expr()])
  }
}

impl<T: TypeToken> TypeToken for Option<T> {
  fn type_expr() -> TypeExpr {
    TypeExpr::generic(
      RawType::named::<Option<Hole>>("core::option::Option"),
      vec![T::type_expr()],
    )
  }
}

impl<T: ?Sized + TypeToken> TypeToken for Box<T> {
  fn type_expr() -> TypeExpr {
    TypeExpr::generic(RawType::named::<Box<Hole>>("alloc::boxed::Box"), vec![T::type_expr()])
  }
}

impl<T: ?Sized + TypeToken> TypeToken for Arc<T> {
  fn type_expr() -> TypeExpr {
    TypeExpr::generic(RawType::named::<Arc<Hole>>("alloc::sync::Arc"), vec![T::type_expr()])
  }
}

impl<T: TypeToken, E: TypeToken> TypeToken for std::result::Result<T, E> {
  fn type_expr() -> TypeExpr {
    TypeExpr::generic(
      RawType::named::<std::result::Result<Hole, Hole>>("core::result::Result"),
      vec![T::type_expr(), E::type_expr()],
    )
  }
}

impl<K: TypeToken, V: TypeToken> TypeToken for HashMap<K, V> {
  fn type_expr() -> TypeExpr {
    TypeExpr::generic(
      RawType::named::<HashMap<Hole, Hole>>("std::collections::hash::map::HashMap"),
      vec![K::type_expr(), V::type_expr()],
    )
  }
}

impl<K: TypeToken, V: TypeToken> TypeToken for BTreeMap<K, V> {
  fn type_expr() -> TypeExpr {
    TypeExpr::generic(
      RawType::named::<BTreeMap<Hole, Hole>>("alloc::collections::btree::map::BTreeMap"),
      vec![K::type_expr(), V::type_expr()],
    )
  }
}

impl<T: TypeToken> TypeToken for HashSet<T> {
  fn type_expr() -> TypeExpr {
    TypeExpr::generic(
      RawType::named::<HashSet<Hole>>("std::collections::hash::set::HashSet"),
      vec![T::type_expr()],
    )
  }
}
