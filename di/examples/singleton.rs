use fibre_di::{type_token, Container, DiError};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::thread;

// A simple service that gets a unique ID upon creation.
struct RequestTracker {
  id: usize,
}
type_token!(RequestTracker);

fn main() -> Result<(), DiError> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let ids = Arc::new(AtomicUsize::new(0));
  let next_id = move || ids.fetch_add(1, Ordering::SeqCst);
  let (a, b, c) = (next_id.clone(), next_id.clone(), next_id);

  let container = Container::new(move |builder| {
    // Created once, on first resolution.
    builder
      .bind::<RequestTracker>()
      .named("singleton")
      .singleton(move |_| {
        println!("Creating SINGLETON RequestTracker...");
        Ok(RequestTracker { id: a() })
      })?;

    // Created on every resolution.
    builder
      .bind::<RequestTracker>()
      .named("provider")
      .provider(move |_| {
        println!("Creating PROVIDER RequestTracker...");
        Ok(RequestTracker { id: b() })
      })?;

    // Created once per resolving thread.
    builder
      .bind::<RequestTracker>()
      .named("per_thread")
      .thread_singleton(move |_| {
        println!("Creating THREAD SINGLETON RequestTracker...");
        Ok(RequestTracker { id: c() })
      })
  })?;

  println!("--- Resolving Singletons ---");
  let s1 = container.instance::<RequestTracker>(Some("singleton"))?;
  let s2 = container.instance::<RequestTracker>(Some("singleton"))?;
  println!("Singleton 1 ID: {}, Singleton 2 ID: {}", s1.id, s2.id);
  assert!(Arc::ptr_eq(&s1, &s2), "Singleton instances should be identical");

  println!("\n--- Resolving Providers ---");
  let p1 = container.instance::<RequestTracker>(Some("provider"))?;
  let p2 = container.instance::<RequestTracker>(Some("provider"))?;
  println!("Provider 1 ID: {}, Provider 2 ID: {}", p1.id, p2.id);
  assert!(!Arc::ptr_eq(&p1, &p2), "Provider instances should be different");

  println!("\n--- Resolving Thread Singletons ---");
  let main_thread = container.instance::<RequestTracker>(Some("per_thread"))?;
  let other_thread = thread::scope(|s| {
    s.spawn(|| container.instance::<RequestTracker>(Some("per_thread")))
      .join()
      .expect("resolver thread panicked")
  })?;
  println!(
    "Main thread ID: {}, other thread ID: {}",
    main_thread.id, other_thread.id
  );
  assert!(!Arc::ptr_eq(&main_thread, &other_thread));

  println!("\n{}", container.bindings_description());
  Ok(())
}
