//! Core, non-public data structures for the container.

use crate::container::Container;
use crate::error::{DiError, Result};
use crate::key::BindingKey;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, ThreadId};

thread_local! {
  // The keys currently being resolved on this thread, outermost first.
  // A key showing up twice means the object graph loops back on itself.
  static RESOLUTION_STACK: RefCell<Vec<BindingKey>> = const { RefCell::new(Vec::new()) };
}

/// An RAII guard marking a key as "being resolved" on the current thread.
///
/// Entering a key that is already on the stack fails with
/// [`DiError::DependencyLoop`]. Dropping the guard pops the key, so the stack
/// is empty again once the outermost resolution returns, whether it
/// succeeded or not.
pub(crate) struct ResolutionGuard {
  // Guards must be dropped on the thread that created them.
  _not_send: PhantomData<*const ()>,
}

impl ResolutionGuard {
  pub(crate) fn enter(key: &BindingKey) -> Result<Self> {
    RESOLUTION_STACK.with(|stack| {
      let mut stack = stack.borrow_mut();
      if let Some(start) = stack.iter().position(|k| k == key) {
        let mut path = stack[start..].to_vec();
        path.push(key.clone());
        return Err(DiError::DependencyLoop {
          key: key.clone(),
          path,
        });
      }
      stack.push(key.clone());
      Ok(Self {
        _not_send: PhantomData,
      })
    })
  }
}

impl Drop for ResolutionGuard {
  fn drop(&mut self) {
    RESOLUTION_STACK.with(|stack| {
      stack.borrow_mut().pop();
    });
  }
}

/// Singleton builds in flight across all threads: who builds each singleton,
/// and which singleton each blocked thread waits for.
///
/// A thread's own stack cannot see a loop split across threads (A waits on B
/// here, B waits on A there), so waiters check this graph before blocking.
#[derive(Default)]
struct BuildGraph {
  builders: HashMap<u64, (ThreadId, BindingKey)>,
  waiting: HashMap<ThreadId, u64>,
}

static BUILD_GRAPH: Lazy<Mutex<BuildGraph>> = Lazy::new(|| Mutex::new(BuildGraph::default()));

/// Registers the current thread as waiting for singleton `id`.
///
/// Fails with [`DiError::DependencyLoop`] when the thread building `id` is,
/// directly or through other builders, waiting for a singleton this thread
/// is building.
pub(crate) fn wait_for_build(id: u64, key: &BindingKey) -> Result<BuildWait> {
  let me = thread::current().id();
  let mut graph = BUILD_GRAPH.lock();
  let mut chain = Vec::new();
  let mut current = id;
  for _ in 0..=graph.builders.len() {
    let Some((builder, building)) = graph.builders.get(&current) else {
      break;
    };
    if *builder == me {
      chain.extend(stack_from(building, key));
      return Err(DiError::DependencyLoop {
        key: key.clone(),
        path: chain,
      });
    }
    chain.push(building.clone());
    let Some(next) = graph.waiting.get(builder) else {
      break;
    };
    current = *next;
  }
  graph.waiting.insert(me, id);
  Ok(BuildWait {
    id,
    _not_send: PhantomData,
  })
}

/// Marks the current thread as the builder of singleton `id`.
pub(crate) fn claim_build(id: u64, key: &BindingKey) -> BuildClaim {
  let me = thread::current().id();
  let mut graph = BUILD_GRAPH.lock();
  graph.waiting.remove(&me);
  graph.builders.insert(id, (me, key.clone()));
  BuildClaim {
    id,
    _not_send: PhantomData,
  }
}

pub(crate) struct BuildWait {
  id: u64,
  _not_send: PhantomData<*const ()>,
}

impl Drop for BuildWait {
  fn drop(&mut self) {
    let me = thread::current().id();
    let mut graph = BUILD_GRAPH.lock();
    if graph.waiting.get(&me) == Some(&self.id) {
      graph.waiting.remove(&me);
    }
  }
}

pub(crate) struct BuildClaim {
  id: u64,
  _not_send: PhantomData<*const ()>,
}

impl Drop for BuildClaim {
  fn drop(&mut self) {
    BUILD_GRAPH.lock().builders.remove(&self.id);
  }
}

// This thread's resolution stack from `from` onwards. The stack top is the
// key being resolved, so the result closes the loop.
fn stack_from(from: &BindingKey, key: &BindingKey) -> Vec<BindingKey> {
  RESOLUTION_STACK.with(|stack| {
    let stack = stack.borrow();
    match stack.iter().position(|k| k == from) {
      Some(start) => stack[start..].to_vec(),
      None => vec![from.clone(), key.clone()],
    }
  })
}

/// A produced value. Always holds an `Arc<T>` so that unsized trait objects
/// can be stored and handed out by reference.
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// The argument handed to a creator: `()` for providers, the factory argument
/// otherwise.
pub(crate) type Argument = Box<dyn Any + Send>;

/// A type-erased user closure.
pub(crate) type Creator = Box<dyn Fn(&Container, Argument) -> Result<AnyArc> + Send + Sync>;

pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> AnyArc {
  Arc::new(value)
}

pub(crate) fn unerase<T: ?Sized + Send + Sync + 'static>(
  key: &BindingKey,
  value: &AnyArc,
) -> Result<Arc<T>> {
  value
    .downcast_ref::<Arc<T>>()
    .cloned()
    .ok_or_else(|| DiError::TypeMismatch {
      key: key.clone(),
      expected: type_name::<T>(),
    })
}

/// Recovers the factory argument. The resolver only routes arguments whose
/// type key matches the binding, so a failure means a lying `TypeToken`.
pub(crate) fn take_argument<A: Send + 'static>(key: &BindingKey, arg: Argument) -> Result<A> {
  arg
    .downcast::<A>()
    .map(|boxed| *boxed)
    .map_err(|_| DiError::TypeMismatch {
      key: key.clone(),
      expected: type_name::<A>(),
    })
}
