use sfioc::{Container, ContainerBuilder, ContainerHooks, Context, Injectable, Result, TypeDescriptor};
use std::rc::Rc;

#[derive(Default)]
struct Clock;

impl Injectable for Clock {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::defaulted()
  }
}

// Bindings shared by every feature container.
struct CoreServices;

impl ContainerHooks for CoreServices {
  fn set_bindings(&self, container: &Container) -> Result<()> {
    container.bind::<Clock, Clock>()?.as_singleton();
    container.bind_shared(Rc::new("production".to_string()))?;
    Ok(())
  }
}

fn main() -> Result<()> {
  let context = Context::new();
  let core = ContainerBuilder::new("core").hooks(CoreServices).build(&context)?;

  // A feature container sees everything bound in `core`, and can shadow it.
  let tests = ContainerBuilder::new("tests").inherit_from("core").build(&context)?;
  tests.bind_shared(Rc::new("test".to_string()))?;

  let environment = tests.resolve::<String>()?;
  let clock = tests.resolve::<Clock>()?;
  println!("environment in tests: {}", environment);
  println!("environment in core:  {}", core.resolve::<String>()?);

  // The singleton lives in the container that owns the binding.
  assert!(Rc::ptr_eq(&clock, &core.resolve::<Clock>()?));

  context.dispose();
  assert!(tests.resolve::<Clock>().is_err());
  Ok(())
}
