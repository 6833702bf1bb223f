mod common;

use common::*;
use pretty_assertions::assert_eq;
use sfioc::{
  resolve, Container, ContainerBuilder, ContainerConfig, Context, CyclePolicy, Error, Injectable, TypeDescriptor,
  TypeKey,
};
use std::cell::RefCell;
use std::rc::Rc;

// --- Test Fixtures ---

fn populated(context: &Rc<Context>, name: &str) -> Rc<Container> {
  let container = Container::new(context, name).unwrap();
  container.bind::<dyn Interface, ConcreteInterface>().unwrap();
  container.bind::<dyn AbstractService, ConcreteAbstractService>().unwrap();
  container.bind::<dyn Base, SubClassWithFieldDependencies>().unwrap();
  container
    .bind_with_category::<dyn Base, SubClassWithCircularDependencies>("Circle")
    .unwrap();
  container
    .bind_with_category::<dyn Base, OtherSubClassWithCircularDependencies>("Other")
    .unwrap();
  container
    .bind_with_category::<dyn Interface, ConcreteInterface>("First")
    .unwrap();
  container
    .bind_with_category::<dyn AbstractService, ConcreteAbstractService>("Second")
    .unwrap();
  container
    .bind_with_category::<dyn Base, SubClassWithCategory>("Third")
    .unwrap();
  container
}

// --- Registration ---

#[test]
fn test_get_bindings_lists_registrations_in_order() {
  // Arrange
  let context = Context::new();
  let container = Container::new(&context, "TestContainer").unwrap();
  container.bind::<dyn Interface, ConcreteInterface>().unwrap();
  container.bind_with_category::<dyn Interface, ConcreteInterface>("First").unwrap();
  container.bind::<dyn AbstractService, ConcreteAbstractService>().unwrap();
  container
    .bind_with_category::<dyn AbstractService, ConcreteAbstractService>("Second")
    .unwrap();
  container.bind::<dyn Base, SubClass>().unwrap();
  container.bind_with_category::<dyn Base, SubClass>("Third").unwrap();

  // Act
  let bindings: Vec<_> = container
    .get_bindings()
    .into_iter()
    .map(|(category, binding)| (category, binding.from_type(), binding.to_type()))
    .collect();

  // Assert
  assert_eq!(
    bindings,
    vec![
      (String::new(), TypeKey::of::<dyn Interface>(), TypeKey::of::<ConcreteInterface>()),
      ("First".to_owned(), TypeKey::of::<dyn Interface>(), TypeKey::of::<ConcreteInterface>()),
      (
        String::new(),
        TypeKey::of::<dyn AbstractService>(),
        TypeKey::of::<ConcreteAbstractService>()
      ),
      (
        "Second".to_owned(),
        TypeKey::of::<dyn AbstractService>(),
        TypeKey::of::<ConcreteAbstractService>()
      ),
      (String::new(), TypeKey::of::<dyn Base>(), TypeKey::of::<SubClass>()),
      ("Third".to_owned(), TypeKey::of::<dyn Base>(), TypeKey::of::<SubClass>()),
    ]
  );
}

#[test]
fn test_duplicate_binding_is_rejected() {
  // Arrange
  let context = Context::new();
  let container = Container::new(&context, "Duplicates").unwrap();
  container.bind_with_category::<dyn Interface, ConcreteInterface>("First").unwrap();

  // Act
  let result = container.bind_with_category::<dyn Interface, Tracked>("First");

  // Assert
  match result {
    Err(Error::DuplicateBinding { category, container, .. }) => {
      assert_eq!(category, "First");
      assert_eq!(container, "Duplicates");
    }
    other => panic!("expected a duplicate binding error, got {:?}", other),
  }
  assert_eq!(container.get_bindings().len(), 1);
}

// --- Resolution ---

#[test]
fn test_resolve_type() {
  // Arrange
  let context = Context::new();
  let container = populated(&context, "ContainerTests");

  // Act
  let resolved = container.resolve::<dyn Interface>().unwrap();

  // Assert
  assert!(resolved.as_any().is::<ConcreteInterface>());
}

#[test]
fn test_resolve_type_with_category() {
  // Arrange
  let context = Context::new();
  let container = populated(&context, "ContainerTests");

  // Act
  let resolved = container.resolve_with_category::<dyn Base>("Third").unwrap();

  // Assert
  assert!(resolved.as_any().is::<SubClassWithCategory>());
}

#[test]
fn test_find_binding_exposes_dependencies() {
  // Arrange
  let context = Context::new();
  let container = populated(&context, "ContainerTests");

  // Act
  let binding = container.find_binding(TypeKey::of::<dyn Base>(), "").unwrap();
  let dependencies = binding.dependencies().unwrap();

  // Assert
  assert_eq!(binding.to_type(), TypeKey::of::<SubClassWithFieldDependencies>());
  assert_eq!(dependencies.len(), 2);
  let categories: Vec<_> = dependencies
    .iter()
    .filter_map(|point| point.as_member())
    .map(|dependency| (dependency.member_name(), dependency.category()))
    .collect();
  assert_eq!(categories, vec![("interface", ""), ("interface_with_category", "First")]);
}

#[test]
fn test_resolve_injects_field_dependencies() {
  // Arrange
  let context = Context::new();
  let container = populated(&context, "ContainerTests");

  // Act
  let resolved = container.resolve::<dyn Base>().unwrap();

  // Assert
  let instance = concrete::<SubClassWithFieldDependencies>(&resolved);
  assert!(instance.interface.get().unwrap().as_any().is::<ConcreteInterface>());
  assert!(instance
    .interface_with_category
    .get()
    .unwrap()
    .as_any()
    .is::<ConcreteInterface>());
}

#[test]
fn test_resolve_injects_property_dependencies() {
  // Arrange
  let context = Context::new();
  let container = Container::new(&context, "Properties").unwrap();
  container.bind::<dyn Interface, ConcreteInterface>().unwrap();
  container.bind_with_category::<dyn Interface, ConcreteInterface>("First").unwrap();
  container.bind::<dyn Base, SubClassWithPropertyDependencies>().unwrap();

  // Act
  let resolved = container.resolve::<dyn Base>().unwrap();

  // Assert
  let instance = concrete::<SubClassWithPropertyDependencies>(&resolved);
  assert!(instance.interface.borrow().is_some());
  assert!(instance.interface_with_category.borrow().is_some());
}

#[test]
fn test_transient_member_cycle_fails() {
  // Arrange
  let context = Context::new();
  let container = populated(&context, "ContainerTests");

  // Act
  let error = container.resolve_with_category::<dyn Base>("Circle").err().unwrap();

  // Assert
  assert!(matches!(error.root_cause(), Error::CircularDependency { .. }));
  assert!(error.is_structural());
}

#[test]
fn test_singleton_member_cycle_resolves() {
  // Arrange
  let context = Context::new();
  let container = populated(&context, "OtherContainer");
  container.find_binding(TypeKey::of::<dyn Base>(), "Circle").unwrap().as_singleton();
  container.find_binding(TypeKey::of::<dyn Base>(), "Other").unwrap().as_singleton();

  // Act
  let resolved = container.resolve_with_category::<dyn Base>("Circle").unwrap();

  // Assert
  let instance = concrete::<SubClassWithCircularDependencies>(&resolved);
  assert!(instance.interface.get().unwrap().as_any().is::<ConcreteInterface>());
  let circular = instance.circular.get().unwrap();
  let other = concrete::<OtherSubClassWithCircularDependencies>(&circular);
  assert!(other.interface.get().unwrap().as_any().is::<ConcreteInterface>());
  assert!(Rc::ptr_eq(&other.circle.get().unwrap(), &resolved));
}

#[test]
fn test_strict_policy_rejects_any_revisit() {
  // Arrange
  let context = Context::new();
  let container = ContainerBuilder::new("Strict")
    .config(ContainerConfig::new().cycle_policy(CyclePolicy::Strict))
    .build(&context)
    .unwrap();
  container.bind::<dyn Interface, ConcreteInterface>().unwrap();
  container.bind::<dyn Base, DoubleInterface>().unwrap();

  let permissive = Container::new(&context, "Permissive").unwrap();
  permissive.bind::<dyn Interface, ConcreteInterface>().unwrap();
  permissive.bind::<dyn Base, DoubleInterface>().unwrap();

  // Act
  let strict_result = container.resolve::<dyn Base>();
  let permissive_result = permissive.resolve::<dyn Base>();

  // Assert
  assert!(matches!(
    strict_result.err().unwrap().root_cause(),
    Error::CircularDependency { .. }
  ));
  assert!(permissive_result.is_ok());
}

/// Two members resolved through the same default-category binding.
#[derive(Default)]
struct DoubleInterface {
  first: sfioc::Injected<dyn Interface>,
  second: sfioc::Injected<dyn Interface>,
}

impl Base for DoubleInterface {
  fn as_any(&self) -> &dyn std::any::Any {
    self
  }
}

impl sfioc::Injectable for DoubleInterface {
  fn descriptor() -> sfioc::TypeDescriptor<Self> {
    sfioc::TypeDescriptor::<Self>::defaulted()
      .field("first", sfioc::Inject::new(), |this: &Self| &this.first)
      .field("second", sfioc::Inject::new(), |this: &Self| &this.second)
      .implements::<dyn Base>(|this| this as Rc<dyn Base>)
  }
}

#[test]
fn test_categories_resolve_distinct_transients() {
  // Arrange
  let context = Context::new();
  let container = Container::new(&context, "DifferentBindingContainerName").unwrap();
  container.bind_with_category::<dyn Interface, ConcreteInterface>("Binding1").unwrap();
  container.bind_with_category::<dyn Interface, ConcreteInterface>("Binding2").unwrap();

  // Act
  let first = container.resolve_with_category::<dyn Interface>("Binding1").unwrap();
  let second = container.resolve_with_category::<dyn Interface>("Binding2").unwrap();

  // Assert
  assert!(!Rc::ptr_eq(&first, &second));
}

#[test]
fn test_categories_resolve_distinct_singletons() {
  // Arrange
  let context = Context::new();
  let container = Container::new(&context, "DifferentBindingContainerName2").unwrap();
  container
    .bind_with_category::<dyn Interface, ConcreteInterface>("Binding1")
    .unwrap()
    .as_singleton();
  container
    .bind_with_category::<dyn Interface, ConcreteInterface>("Binding2")
    .unwrap()
    .as_singleton();

  // Act
  let first = container.resolve_with_category::<dyn Interface>("Binding1").unwrap();
  let second = container.resolve_with_category::<dyn Interface>("Binding2").unwrap();

  // Assert
  assert!(!Rc::ptr_eq(&first, &second));
  assert!(Rc::ptr_eq(
    &first,
    &container.resolve_with_category::<dyn Interface>("Binding1").unwrap()
  ));
}

#[test]
fn test_categories_resolve_distinct_instances() {
  // Arrange
  let context = Context::new();
  let container = Container::new(&context, "Instanced").unwrap();
  container
    .bind_instance_with_category::<dyn Interface, _>("Binding1", Rc::new(ConcreteInterface))
    .unwrap();
  container
    .bind_instance_with_category::<dyn Interface, _>("Binding2", Rc::new(ConcreteInterface))
    .unwrap();

  // Act
  let first = container.resolve_with_category::<dyn Interface>("Binding1").unwrap();
  let second = container.resolve_with_category::<dyn Interface>("Binding2").unwrap();

  // Assert
  assert!(!Rc::ptr_eq(&first, &second));
}

#[test]
fn test_shared_instance_resolves_to_same_object() {
  // Arrange
  let instance = Rc::new(ConcreteInterface);
  let context = Context::new();
  let container = Container::new(&context, "SameInstance").unwrap();
  container
    .bind_instance_with_category::<dyn Interface, _>("Binding1", Rc::clone(&instance))
    .unwrap()
    .as_transient();
  container
    .bind_instance_with_category::<dyn Interface, _>("Binding2", Rc::clone(&instance))
    .unwrap()
    .as_singleton();

  // Act
  let first = container.resolve_with_category::<dyn Interface>("Binding1").unwrap();
  let second = container.resolve_with_category::<dyn Interface>("Binding2").unwrap();

  // Assert
  assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn test_bind_shared_value() {
  // Arrange
  let context = Context::new();
  let container = Container::new(&context, "Shared").unwrap();
  let greeting = Rc::new(String::from("hello"));
  container.bind_shared(Rc::clone(&greeting)).unwrap();
  container
    .bind_shared_with_category::<dyn Interface>("dyn", Rc::new(ConcreteInterface))
    .unwrap();

  // Act
  let resolved = resolve!(container, String);
  let interface = resolve!(container, trait Interface, "dyn");

  // Assert
  assert!(Rc::ptr_eq(&resolved, &greeting));
  assert!(interface.as_any().is::<ConcreteInterface>());
}

#[test]
fn test_resolve_with_designated_constructor() {
  // Arrange
  let context = Context::new();
  let container = Container::new(&context, "DefaultConstructor").unwrap();
  container.bind::<dyn Base, SubClassWithConstructorDependencies>().unwrap();
  container.bind::<dyn Interface, ConcreteInterface>().unwrap();
  container
    .bind_with_category::<dyn AbstractService, ConcreteAbstractService>("First")
    .unwrap();

  // Act
  let resolved = container.resolve::<dyn Base>().unwrap();

  // Assert
  let instance = concrete::<SubClassWithConstructorDependencies>(&resolved);
  assert!(instance.interface.as_any().is::<ConcreteInterface>());
  assert!(instance.abstract_service.as_any().is::<ConcreteAbstractService>());
}

#[test]
fn test_resolve_with_inherited_designated_constructor() {
  // Arrange
  let context = Context::new();
  let container = Container::new(&context, "InheritedDefaultConstructor").unwrap();
  container.bind::<dyn Base, SubSubClassWithConstructorDependencies>().unwrap();
  container.bind::<dyn Interface, ConcreteInterface>().unwrap();
  container
    .bind_with_category::<dyn AbstractService, ConcreteAbstractService>("First")
    .unwrap();

  // Act
  let resolved = container.resolve::<dyn Base>().unwrap();

  // Assert
  let instance = concrete::<SubSubClassWithConstructorDependencies>(&resolved);
  assert!(instance.base.interface.as_any().is::<ConcreteInterface>());
  assert!(instance
    .base
    .abstract_service
    .as_any()
    .is::<ConcreteAbstractService>());
}

#[test]
fn test_transient_constructor_cycle_fails() {
  // Arrange
  let context = Context::new();
  let container = Container::new(&context, "CircularDefaultConstructor1").unwrap();
  container
    .bind_with_category::<dyn Base, DefaultConstructorCircularDependency>("First")
    .unwrap();
  container
    .bind_with_category::<dyn Base, DefaultConstructorCircularDependencyOther>("Second")
    .unwrap();

  // Act
  let error = container.resolve_with_category::<dyn Base>("First").err().unwrap();

  // Assert
  assert!(matches!(error, Error::Dependency { .. }));
  assert!(matches!(error.root_cause(), Error::CircularDependency { .. }));
}

#[test]
fn test_singleton_constructor_cycle_fails() {
  // Arrange
  let context = Context::new();
  let container = Container::new(&context, "CircularDefaultConstructor2").unwrap();
  container
    .bind_with_category::<dyn Base, DefaultConstructorCircularDependency>("First")
    .unwrap()
    .as_singleton();
  container
    .bind_with_category::<dyn Base, DefaultConstructorCircularDependencyOther>("Second")
    .unwrap()
    .as_singleton();

  // Act
  let error = container.resolve_with_category::<dyn Base>("First").err().unwrap();

  // Assert
  assert!(matches!(error.root_cause(), Error::CircularDependency { .. }));
}

#[test]
fn test_seeded_instance_breaks_constructor_cycle() {
  // Arrange
  let first = Rc::new(DefaultConstructorCircularDependency { base: None });
  let second = Rc::new(DefaultConstructorCircularDependencyOther {
    base: Some(Rc::clone(&first) as Rc<dyn Base>),
  });
  let context = Context::new();
  let container = Container::new(&context, "CircularDefaultConstructor3").unwrap();
  container
    .bind_with_category::<dyn Base, DefaultConstructorCircularDependency>("First")
    .unwrap();
  container
    .bind_instance_with_category::<dyn Base, _>("Second", Rc::clone(&second))
    .unwrap();

  // Act
  let resolved = container.resolve_with_category::<dyn Base>("First").unwrap();

  // Assert
  let first_resolved = concrete::<DefaultConstructorCircularDependency>(&resolved);
  let second_resolved = first_resolved.base.as_ref().unwrap();
  let second_as_base: Rc<dyn Base> = second;
  assert!(Rc::ptr_eq(second_resolved, &second_as_base));

  let inner = concrete::<DefaultConstructorCircularDependencyOther>(second_resolved);
  let inner_first = inner.base.as_ref().unwrap();
  assert!(concrete::<DefaultConstructorCircularDependency>(inner_first).base.is_none());
  assert!(!Rc::ptr_eq(inner_first, &resolved));
}

#[test]
fn test_missing_dependency_is_wrapped_with_context() {
  // Arrange
  let context = Context::new();
  let container = Container::new(&context, "Missing").unwrap();
  container.bind::<dyn Base, SubClassWithFieldDependencies>().unwrap();
  container.bind::<dyn Interface, ConcreteInterface>().unwrap();

  // Act
  let error = container.resolve::<dyn Base>().err().unwrap();

  // Assert
  match &error {
    Error::Dependency { owner, member, .. } => {
      assert_eq!(*owner, TypeKey::of::<SubClassWithFieldDependencies>().name());
      assert_eq!(member, "interface_with_category");
    }
    other => panic!("expected a wrapped error, got {:?}", other),
  }
  match error.root_cause() {
    Error::BindingNotFound { category, .. } => assert_eq!(category, "First"),
    other => panic!("expected a missing binding, got {:?}", other),
  }
  assert!(std::error::Error::source(&error).is_some());
  assert!(error.is_lookup());
}

#[test]
fn test_failed_singleton_is_evicted() {
  // Arrange
  let context = Context::new();
  let container = Container::new(&context, "Evict").unwrap();
  let binding = container.bind::<dyn Base, SubClassWithFieldDependencies>().unwrap();
  binding.as_singleton();
  container.bind::<dyn Interface, ConcreteInterface>().unwrap();

  // Act
  let first = container.resolve::<dyn Base>();
  container.bind_with_category::<dyn Interface, ConcreteInterface>("First").unwrap();
  let second = container.resolve::<dyn Base>().unwrap();

  // Assert
  assert!(first.is_err());
  let instance = concrete::<SubClassWithFieldDependencies>(&second);
  assert!(instance.interface.is_set());
  assert!(instance.interface_with_category.is_set());
}

#[test]
fn test_failed_singleton_is_kept_when_configured() {
  // Arrange
  let context = Context::new();
  let container = ContainerBuilder::new("Keep")
    .config(ContainerConfig::new().reset_singleton_on_failure(false))
    .build(&context)
    .unwrap();
  let binding = container.bind::<dyn Base, SubClassWithFieldDependencies>().unwrap();
  binding.as_singleton();
  container.bind::<dyn Interface, ConcreteInterface>().unwrap();

  // Act
  let first = container.resolve::<dyn Base>();

  // Assert
  assert!(first.is_err());
  assert!(binding.has_instance());
}

#[test]
fn test_unbound_type_is_not_found() {
  // Arrange
  let context = Context::new();
  let container = Container::new(&context, "Empty").unwrap();

  // Act
  let error = container.resolve::<dyn Interface>().err().unwrap();

  // Assert
  assert!(matches!(error, Error::BindingNotFound { .. }));
}

#[test]
fn test_disposed_container_rejects_use() {
  // Arrange
  let context = Context::new();
  let container = populated(&context, "Disposed");
  let binding = container.find_binding(TypeKey::of::<dyn Interface>(), "").unwrap();
  binding.as_singleton();
  container.resolve::<dyn Interface>().unwrap();

  // Act
  container.dispose();
  container.dispose();

  // Assert
  assert!(container.is_disposed());
  assert!(!binding.has_instance());
  assert!(container.get_bindings().is_empty());
  assert!(matches!(
    container.resolve::<dyn Interface>(),
    Err(Error::ContainerDisposed(_))
  ));
  assert!(matches!(
    container.bind::<dyn Interface, ConcreteInterface>(),
    Err(Error::ContainerDisposed(_))
  ));
}

/// Writes its label to a shared log when released.
struct Labeled {
  label: &'static str,
  log: Rc<RefCell<Vec<&'static str>>>,
}

impl Injectable for Labeled {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::new().on_release(|this| this.log.borrow_mut().push(this.label))
  }
}

#[test]
fn test_dispose_releases_bindings_in_registration_order() {
  // Arrange
  let context = Context::new();
  let container = Container::new(&context, "Ordered").unwrap();
  let log = Rc::new(RefCell::new(Vec::new()));
  for label in ["c", "a", "d", "b"] {
    let instance = Rc::new(Labeled {
      label,
      log: Rc::clone(&log),
    });
    container
      .bind_instance_with_category::<Labeled, _>(label, instance)
      .unwrap();
  }

  // Act
  container.dispose();

  // Assert
  assert_eq!(*log.borrow(), vec!["c", "a", "d", "b"]);
}

#[test]
#[should_panic(expected = "Failed to resolve required service")]
fn test_resolve_macro_panics_when_missing() {
  let context = Context::new();
  let container = Container::new(&context, "MacroPanics").unwrap();
  let _ = resolve!(container, String);
}
