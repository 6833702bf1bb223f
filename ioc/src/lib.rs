//! # sfioc
//!
//! A dependency injection container driven by type descriptors.
//!
//! Types describe their injectable members and their designated constructor
//! once, through [`Injectable::descriptor`]. A [`Container`] maps abstract
//! types (usually `dyn Trait`), optionally qualified by a category string, to
//! [`Binding`]s. Resolving a type walks its constructor and member
//! dependencies recursively, detects circular dependencies, and falls back
//! to the containers it inherits from through its [`Context`].
//!
//! ## Core Concepts
//!
//! - **Binding**: a construction rule from an abstract type to a concrete
//!   type (transient or singleton) or to a supplied instance.
//! - **Category**: a string distinguishing several bindings of one type. The
//!   empty string is the default category.
//! - **Container**: a named registry of bindings.
//! - **Context**: the directory of live containers and of the inheritance
//!   edges between them. [`global()`] returns a per-thread default.
//!
//! The container is single-threaded: instances are shared as `Rc<T>`.
//!
//! ## Quick Start
//!
//! ```
//! use sfioc::{resolve, Container, Context, Inject, Injectable, Injected, Param, TypeDescriptor};
//! use std::rc::Rc;
//!
//! trait Greeter {
//!   fn greet(&self) -> String;
//! }
//!
//! struct EnglishGreeter {
//!   name: Rc<String>,
//! }
//!
//! impl Greeter for EnglishGreeter {
//!   fn greet(&self) -> String {
//!     format!("Hello, {}!", self.name)
//!   }
//! }
//!
//! impl Injectable for EnglishGreeter {
//!   fn descriptor() -> TypeDescriptor<Self> {
//!     TypeDescriptor::<Self>::new()
//!       .constructor([Param::of::<String>("name").in_category("user")], |args| {
//!         Ok(EnglishGreeter { name: args.next::<String>()? })
//!       })
//!       .implements::<dyn Greeter>(|this| this as Rc<dyn Greeter>)
//!   }
//! }
//!
//! #[derive(Default)]
//! struct Frontend {
//!   greeter: Injected<dyn Greeter>,
//! }
//!
//! impl Injectable for Frontend {
//!   fn descriptor() -> TypeDescriptor<Self> {
//!     TypeDescriptor::defaulted().field("greeter", Inject::new(), |this: &Self| &this.greeter)
//!   }
//! }
//!
//! let context = Context::new();
//! let container = Container::new(&context, "app").unwrap();
//! container.bind_shared_with_category("user", Rc::new(String::from("World"))).unwrap();
//! container.bind::<dyn Greeter, EnglishGreeter>().unwrap().as_singleton();
//! container.bind::<Frontend, Frontend>().unwrap();
//!
//! let frontend = resolve!(container, Frontend);
//! assert_eq!(frontend.greeter.get().unwrap().greet(), "Hello, World!");
//!
//! context.dispose();
//! assert!(container.is_disposed());
//! ```

mod binding;
mod config;
mod container;
mod context;
mod core;
mod dependency;
mod descriptor;
mod discovery;
mod error;
mod global;
mod macros;
mod resolver;

pub use binding::{Activation, ActivationStrategy, Binding, Lifecycle};
pub use config::{ContainerConfig, CyclePolicy};
pub use container::{Container, ContainerBuilder, ContainerHooks, ResolveSite};
pub use context::Context;
pub use crate::core::TypeKey;
pub use dependency::{Arguments, ConstructorDependency, Dependency, InjectionPoint, MemberKind};
pub use descriptor::{Inject, InjectMarker, Injectable, Injected, Param, TypeDescriptor};
pub use discovery::{discover, discover_descriptor};
pub use error::{Error, Result};
pub use global::global;
