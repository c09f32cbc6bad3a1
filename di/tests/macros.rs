//! Tests specifically for the resolution macros:
//! - `resolve!`
//! - `maybe_resolve!`

use fibre_di::{maybe_resolve, resolve, type_token, Container, DiError, Lifecycle};
use std::sync::Arc;

// --- Test Fixtures ---

struct MacroTestService {
  value: i32,
}
trait MacroTestTrait: Send + Sync {
  fn value(&self) -> i32;
}
impl MacroTestTrait for MacroTestService {
  fn value(&self) -> i32 {
    self.value
  }
}
struct UnregisteredService;

type_token!(MacroTestService, dyn MacroTestTrait, UnregisteredService);

fn macro_container() -> Container {
  Container::new(|b| {
    b.bind::<MacroTestService>()
      .singleton(|_| Ok(MacroTestService { value: 100 }))?;
    b.bind::<MacroTestService>()
      .named("named")
      .singleton(|_| Ok(MacroTestService { value: 101 }))?;
    b.bind::<dyn MacroTestTrait>()
      .with(Lifecycle::Singleton, |_| Ok(Arc::new(MacroTestService { value: 102 })))?;
    b.bind::<dyn MacroTestTrait>()
      .named("named_trait")
      .instance_arc(Arc::new(MacroTestService { value: 103 }))
  })
  .unwrap()
}

// --- Macro Tests ---

#[test]
fn test_maybe_resolve() {
  // Arrange
  let container = macro_container();

  // Act & Assert: Success cases
  assert_eq!(maybe_resolve!(&container, MacroTestService).unwrap().value, 100);
  assert_eq!(
    maybe_resolve!(&container, MacroTestService, "named")
      .unwrap()
      .value,
    101
  );
  assert_eq!(maybe_resolve!(&container, trait MacroTestTrait).unwrap().value(), 102);
  assert_eq!(
    maybe_resolve!(&container, trait MacroTestTrait, "named_trait")
      .unwrap()
      .value(),
    103
  );

  // Act & Assert: Failure cases
  assert!(maybe_resolve!(&container, UnregisteredService).is_none());
  assert!(maybe_resolve!(&container, MacroTestService, "missing_name").is_none());
  trait MissingTrait: Send + Sync {}
  type_token!(dyn MissingTrait);
  assert!(maybe_resolve!(&container, trait MissingTrait).is_none());
  assert!(maybe_resolve!(&container, trait MacroTestTrait, "missing_name").is_none());
}

#[test]
fn test_resolve() {
  // Arrange
  let container = macro_container();

  // Act & Assert
  assert_eq!(resolve!(&container, MacroTestService).value, 100);
  assert_eq!(resolve!(&container, MacroTestService, "named").value, 101);
  assert_eq!(resolve!(&container, trait MacroTestTrait).value(), 102);
  assert_eq!(
    resolve!(&container, trait MacroTestTrait, "named_trait").value(),
    103
  );
}

#[test]
#[should_panic(expected = "Failed to resolve required service")]
fn test_resolve_panics_on_missing() {
  let container = macro_container();
  resolve!(&container, UnregisteredService);
}

#[test]
#[should_panic(expected = "Failed to resolve required trait service")]
fn test_resolve_panics_on_missing_trait() {
  let container = Container::new(|_| Ok(())).unwrap();
  resolve!(&container, trait MacroTestTrait);
}

#[test]
#[should_panic(expected = "Failed to resolve optional service: dependency loop detected")]
fn test_maybe_resolve_still_panics_on_loops() {
  // Arrange: a binding that resolves itself.
  struct Selfish;
  type_token!(Selfish);
  let container = Container::new(|b| {
    b.bind::<Selfish>().provider(|c| {
      c.instance::<Selfish>(None)?;
      Ok(Selfish)
    })
  })
  .unwrap();

  // Act
  maybe_resolve!(&container, Selfish);
}

#[test]
fn test_missing_transitive_dependency_is_an_error_not_none() {
  // Arrange: the binding exists, its dependency does not.
  let container = Container::new(|b| {
    b.bind::<MacroTestService>().provider(|c| {
      let inner = c.instance::<i32>(Some("seed"))?;
      Ok(MacroTestService { value: *inner })
    })
  })
  .unwrap();

  // Act
  let result = container.instance_or_none::<MacroTestService>(None);

  // Assert
  assert!(matches!(result, Err(DiError::NotFound { .. })));
}
