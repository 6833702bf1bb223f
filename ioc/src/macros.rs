//! Public macros for ergonomic service resolution.

/// Resolves a service from a container, panicking if it cannot be resolved.
///
/// The `trait` arms build the `dyn Trait` type from the trait's name. For a
/// non-panicking version, call `Container::resolve` directly.
///
/// # Panics
///
/// Panics with the resolution error if the service cannot be resolved.
///
/// # Examples
///
/// ```
/// use sfioc::{resolve, Container, Context, Injectable, TypeDescriptor};
/// use std::rc::Rc;
///
/// trait Greeter {
///   fn greet(&self) -> String;
/// }
///
/// #[derive(Default)]
/// struct EnglishGreeter;
/// impl Greeter for EnglishGreeter {
///   fn greet(&self) -> String {
///     "Hello!".to_string()
///   }
/// }
/// impl Injectable for EnglishGreeter {
///   fn descriptor() -> TypeDescriptor<Self> {
///     TypeDescriptor::<Self>::defaulted().implements::<dyn Greeter>(|this| this as Rc<dyn Greeter>)
///   }
/// }
///
/// let context = Context::new();
/// let container = Container::new(&context, "app").unwrap();
/// container.bind_with_category::<dyn Greeter, EnglishGreeter>("en").unwrap();
/// container.bind_shared(Rc::new(String::from("hello"))).unwrap();
///
/// let greeter = resolve!(container, trait Greeter, "en");
/// assert_eq!(greeter.greet(), "Hello!");
/// assert_eq!(*resolve!(container, String), "hello");
/// ```
#[macro_export]
macro_rules! resolve {
  // Arm for resolving a trait object: resolve!(container, trait MyTrait)
  ($container:expr, trait $trait_ident:ident) => {
    $crate::resolve!($container, trait $trait_ident, "")
  };

  // Arm for resolving a categorized trait object: resolve!(container, trait MyTrait, "category")
  ($container:expr, trait $trait_ident:ident, $category:expr) => {
    $container
      .resolve_with_category::<dyn $trait_ident>($category)
      .unwrap_or_else(|error| {
        panic!(
          "Failed to resolve required trait service {}: {}",
          std::any::type_name::<dyn $trait_ident>(),
          error
        )
      })
  };

  // Arm for resolving a type: resolve!(container, MyService)
  ($container:expr, $type:ty) => {
    $crate::resolve!($container, $type, "")
  };

  // Arm for resolving a categorized type: resolve!(container, MyService, "category")
  ($container:expr, $type:ty, $category:expr) => {
    $container
      .resolve_with_category::<$type>($category)
      .unwrap_or_else(|error| {
        panic!(
          "Failed to resolve required service {}: {}",
          std::any::type_name::<$type>(),
          error
        )
      })
  };
}
