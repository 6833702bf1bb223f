use sfioc::{global, resolve, Container, Inject, Injectable, Injected, TypeDescriptor};
use std::rc::Rc;

// 1. Define the abstraction (the trait)
trait Logger {
  fn log(&self, message: &str);
}

// 2. Define a concrete implementation and describe it to the container
#[derive(Default)]
struct ConsoleLogger;

impl Logger for ConsoleLogger {
  fn log(&self, message: &str) {
    println!("[CONSOLE LOG]: {}", message);
  }
}

impl Injectable for ConsoleLogger {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::defaulted().implements::<dyn Logger>(|this| this as Rc<dyn Logger>)
  }
}

// 3. Define a service that depends on the abstraction through a marked field
#[derive(Default)]
struct ReportService {
  logger: Injected<dyn Logger>,
}

impl ReportService {
  fn generate_report(&self) {
    if let Some(logger) = self.logger.get_ref() {
      logger.log("Starting report generation.");
      logger.log("Finished report generation.");
    }
  }
}

impl Injectable for ReportService {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::defaulted().field("logger", Inject::new(), |this: &Self| &this.logger)
  }
}

fn main() {
  // --- Registration ---
  let container = Container::new(&global(), "reports").expect("container name is free");

  // Serve a single ConsoleLogger as `dyn Logger`.
  container
    .bind::<dyn Logger, ConsoleLogger>()
    .expect("ConsoleLogger implements Logger")
    .as_singleton();
  container
    .bind::<ReportService, ReportService>()
    .expect("identity binding");

  // --- Resolution and Usage ---
  println!("Resolving the high-level service...");
  let report_service = resolve!(container, ReportService);

  println!("Using the service...");
  report_service.generate_report();

  let logger = resolve!(container, trait Logger);
  assert!(Rc::ptr_eq(&logger, &report_service.logger.get().expect("logger was injected")));

  global().dispose();
}
