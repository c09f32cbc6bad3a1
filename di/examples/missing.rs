use fibre_di::{resolve, type_token, Container, DiError};
use std::panic;

struct UnregisteredService;

struct Chicken;
struct Egg;

type_token!(UnregisteredService, Chicken, Egg);

fn main() -> Result<(), DiError> {
  let container = Container::new(|b| {
    b.bind::<Chicken>().provider(|c| {
      c.instance::<Egg>(None)?;
      Ok(Chicken)
    })?;
    b.bind::<Egg>().provider(|c| {
      c.instance::<Chicken>(None)?;
      Ok(Egg)
    })
  })?;

  // --- Using the panicking `resolve!` macro ---
  println!("Attempting to resolve a service that was never registered...");
  let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
    let _service = resolve!(&container, UnregisteredService);
  }));
  assert!(result.is_err(), "resolve! should have panicked.");
  println!("Successfully caught the expected panic from resolve!.");

  // --- Using the fallible methods ---
  match container.instance::<UnregisteredService>(None) {
    Err(err @ DiError::NotFound { .. }) => println!("Missing binding: {}", err),
    Err(other) => return Err(other),
    Ok(_) => panic!("Should not have found the service!"),
  }
  assert!(container.instance_or_none::<UnregisteredService>(None)?.is_none());

  // --- Dependency loops are errors, not stack overflows ---
  match container.instance::<Chicken>(None) {
    Err(err) if err.is_dependency_loop() => println!("{}", err),
    Err(other) => return Err(other),
    Ok(_) => panic!("Chicken and Egg should loop!"),
  }
  Ok(())
}
