use fibre_di::{type_token, Container, DiError, Injector, Module, ScopeCache};
use std::sync::Arc;

struct Config {
  database_url: String,
}

struct Database {
  url: String,
}

struct Session {
  user: String,
}

type_token!(Config, Database, Session);

fn persistence_module() -> Module {
  Module::new("persistence", |b| {
    b.bind::<Database>().singleton(|c| {
      let config = c.instance::<Config>(None)?;
      Ok(Database {
        url: config.database_url.clone(),
      })
    })
  })
}

fn main() -> Result<(), DiError> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  // --- A parent container shared by every request ---
  let app = Container::new(|b| {
    b.bind::<Config>().instance(Config {
      database_url: "postgres://prod".to_string(),
    })?;
    b.import(&persistence_module(), false)
  })?;

  // --- A child for tests: same modules, one explicit override ---
  let test = Container::new(|b| {
    b.extend(&app, false)?;
    b.bind::<Config>().overrides(true).instance(Config {
      database_url: "postgres://test".to_string(),
    })
  })?;

  // The database singleton lives in the parent and resolves against the
  // parent's config.
  println!("app db:  {}", app.instance::<Database>(None)?.url);
  println!("test db: {}", test.instance::<Database>(None)?.url);
  println!("test config: {}", test.instance::<Config>(None)?.database_url);

  // --- Sessions cached per user in a store the application owns ---
  let sessions = Arc::new(ScopeCache::<String>::new());
  let web = Container::new({
    let sessions = sessions.clone();
    move |b| {
      b.extend(&app, false)?;
      b.bind::<Session>().scoped_singleton(
        sessions,
        |user: &String| user.clone(),
        |_, user: String| Ok(Session { user }),
      )
    }
  })?;

  // --- Handles declared before the container is available ---
  let injector = Injector::new();
  let login = injector.factory::<String, Session>(None)?;
  injector.inject(&web)?;

  let alice = login.get("alice".to_string())?;
  assert!(Arc::ptr_eq(&alice, &login.get("alice".to_string())?));
  sessions.remove("alice");
  assert!(!Arc::ptr_eq(&alice, &login.get("alice".to_string())?));
  println!("session for {} rebuilt after logout", alice.user);

  println!("\n{}", web.bindings_description());
  Ok(())
}
