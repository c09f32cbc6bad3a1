use fibre_di::{type_token, Container, DiError, Lifecycle};
use std::sync::Arc;

// 1. Define the abstraction (the trait)
trait Logger: Send + Sync {
  fn log(&self, message: &str);
}

// 2. Define a concrete implementation
struct ConsoleLogger;
impl Logger for ConsoleLogger {
  fn log(&self, message: &str) {
    println!("[CONSOLE LOG]: {}", message);
  }
}

// 3. Define a service that depends on the abstraction
struct ReportService {
  logger: Arc<dyn Logger>,
}

impl ReportService {
  fn generate_report(&self) {
    self.logger.log("Starting report generation.");
    self.logger.log("Finished report generation.");
  }
}

type_token!(dyn Logger, ReportService);

fn main() -> Result<(), DiError> {
  // --- Registration ---
  let container = Container::new(|b| {
    // Trait objects are bound through `with`, whose creator returns an `Arc`.
    b.bind::<dyn Logger>()
      .with(Lifecycle::Singleton, |_| Ok(Arc::new(ConsoleLogger)))?;

    // ReportService does not create its logger; it asks the container.
    b.bind::<ReportService>().singleton(|c| {
      Ok(ReportService {
        logger: c.instance::<dyn Logger>(None)?,
      })
    })
  })?;

  // --- Resolution and Usage ---
  println!("Resolving the high-level service...");
  let report_service = container.instance::<ReportService>(None)?;

  println!("Using the service...");
  report_service.generate_report();
  Ok(())
}
