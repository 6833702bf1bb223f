use sfioc::{resolve, Container, Context, Injectable, Param, TypeDescriptor};
use std::rc::Rc;

trait Storage {
  fn describe(&self) -> String;
}

struct DiskStorage {
  root: Rc<String>,
}

impl Storage for DiskStorage {
  fn describe(&self) -> String {
    format!("disk at {}", self.root)
  }
}

impl Injectable for DiskStorage {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::new()
      .constructor([Param::of::<String>("root").in_category("disk.root")], |args| {
        Ok(DiskStorage {
          root: args.next::<String>()?,
        })
      })
      .implements::<dyn Storage>(|this| this as Rc<dyn Storage>)
  }
}

#[derive(Default)]
struct MemoryStorage;

impl Storage for MemoryStorage {
  fn describe(&self) -> String {
    "in memory".to_string()
  }
}

impl Injectable for MemoryStorage {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::defaulted().implements::<dyn Storage>(|this| this as Rc<dyn Storage>)
  }
}

fn main() {
  let context = Context::new();
  let container = Container::new(&context, "storage").expect("container name is free");

  // The same abstract type, bound twice under different categories.
  container
    .bind_shared_with_category("disk.root", Rc::new("/var/lib/app".to_string()))
    .expect("fresh category");
  container
    .bind_with_category::<dyn Storage, DiskStorage>("primary")
    .expect("DiskStorage implements Storage")
    .as_singleton();
  container
    .bind_with_category::<dyn Storage, MemoryStorage>("cache")
    .expect("MemoryStorage implements Storage");

  let primary = resolve!(container, trait Storage, "primary");
  let cache = resolve!(container, trait Storage, "cache");
  println!("primary: {}", primary.describe());
  println!("cache:   {}", cache.describe());

  // Nothing is bound in the default category.
  match container.resolve::<dyn Storage>() {
    Ok(_) => unreachable!("no default storage was bound"),
    Err(error) => println!("default category: {}", error),
  }

  context.dispose();
}
