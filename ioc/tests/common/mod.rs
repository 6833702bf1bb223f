#![allow(dead_code)]

use sfioc::{Inject, Injectable, Injected, Param, TypeDescriptor};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

/// Installs a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

// --- Abstract types ---

pub trait Interface: Any {
  fn as_any(&self) -> &dyn Any;
}

pub trait AbstractService: Any {
  fn as_any(&self) -> &dyn Any;
}

pub trait Base: Any {
  fn as_any(&self) -> &dyn Any;
}

/// Downcasts a resolved `dyn Base` to its concrete type.
pub fn concrete<T: Any>(base: &Rc<dyn Base>) -> &T {
  base
    .as_any()
    .downcast_ref::<T>()
    .unwrap_or_else(|| panic!("expected a {}", std::any::type_name::<T>()))
}

macro_rules! impl_as_any {
  ($trait_name:ident for $($type:ty),+) => {
    $(
      impl $trait_name for $type {
        fn as_any(&self) -> &dyn Any {
          self
        }
      }
    )+
  };
}

// --- Leaf types ---

#[derive(Default)]
pub struct ConcreteInterface;
impl_as_any!(Interface for ConcreteInterface);
impl Injectable for ConcreteInterface {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::defaulted().implements::<dyn Interface>(|this| this as Rc<dyn Interface>)
  }
}

#[derive(Default)]
pub struct ConcreteAbstractService;
impl_as_any!(AbstractService for ConcreteAbstractService);
impl Injectable for ConcreteAbstractService {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::defaulted()
      .implements::<dyn AbstractService>(|this| this as Rc<dyn AbstractService>)
  }
}

#[derive(Default)]
pub struct SubClass;

#[derive(Default)]
pub struct SubClassWithCategory;

impl_as_any!(Base for SubClass, SubClassWithCategory);

impl Injectable for SubClass {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::defaulted().implements::<dyn Base>(|this| this as Rc<dyn Base>)
  }
}

impl Injectable for SubClassWithCategory {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::defaulted().implements::<dyn Base>(|this| this as Rc<dyn Base>)
  }
}

// --- Member dependencies ---

#[derive(Default)]
pub struct SubClassWithFieldDependencies {
  pub interface: Injected<dyn Interface>,
  pub interface_with_category: Injected<dyn Interface>,
}
impl_as_any!(Base for SubClassWithFieldDependencies);
impl Injectable for SubClassWithFieldDependencies {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::defaulted()
      .field("interface", Inject::new(), |this: &Self| &this.interface)
      .field(
        "interface_with_category",
        Inject::with_category("First"),
        |this: &Self| &this.interface_with_category,
      )
      .implements::<dyn Base>(|this| this as Rc<dyn Base>)
  }
}

#[derive(Default)]
pub struct SubClassWithPropertyDependencies {
  pub interface: RefCell<Option<Rc<dyn Interface>>>,
  pub interface_with_category: RefCell<Option<Rc<dyn Interface>>>,
}
impl_as_any!(Base for SubClassWithPropertyDependencies);
impl Injectable for SubClassWithPropertyDependencies {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::defaulted()
      .property("interface", Inject::new(), |this: &Self, value: Rc<dyn Interface>| {
        *this.interface.borrow_mut() = Some(value);
      })
      .property(
        "interface_with_category",
        Inject::with_category("First"),
        |this: &Self, value: Rc<dyn Interface>| {
          *this.interface_with_category.borrow_mut() = Some(value);
        },
      )
      .implements::<dyn Base>(|this| this as Rc<dyn Base>)
  }
}

#[derive(Default)]
pub struct SubClassWithCircularDependencies {
  pub interface: Injected<dyn Interface>,
  pub circular: Injected<dyn Base>,
}
impl_as_any!(Base for SubClassWithCircularDependencies);
impl Injectable for SubClassWithCircularDependencies {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::defaulted()
      .field("interface", Inject::new(), |this: &Self| &this.interface)
      .field("circular", Inject::with_category("Other"), |this: &Self| &this.circular)
      .implements::<dyn Base>(|this| this as Rc<dyn Base>)
  }
}

#[derive(Default)]
pub struct OtherSubClassWithCircularDependencies {
  pub interface: Injected<dyn Interface>,
  pub circle: Injected<dyn Base>,
}
impl_as_any!(Base for OtherSubClassWithCircularDependencies);
impl Injectable for OtherSubClassWithCircularDependencies {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::defaulted()
      .field("interface", Inject::new(), |this: &Self| &this.interface)
      .field("circle", Inject::with_category("Circle"), |this: &Self| &this.circle)
      .implements::<dyn Base>(|this| this as Rc<dyn Base>)
  }
}

// --- Constructor dependencies ---

pub struct SubClassWithConstructorArgs {
  pub i: i32,
  pub f: f32,
}
impl_as_any!(Base for SubClassWithConstructorArgs);
impl Injectable for SubClassWithConstructorArgs {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::new()
      .constructor([Param::of::<i32>("i"), Param::of::<f32>("f")], |args| {
        Ok(SubClassWithConstructorArgs {
          i: *args.next::<i32>()?,
          f: *args.next::<f32>()?,
        })
      })
      .implements::<dyn Base>(|this| this as Rc<dyn Base>)
  }
}

pub struct SubClassWithConstructorDependencies {
  pub interface: Rc<dyn Interface>,
  pub abstract_service: Rc<dyn AbstractService>,
}
impl_as_any!(Base for SubClassWithConstructorDependencies);
impl Injectable for SubClassWithConstructorDependencies {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::new()
      .constructor(
        [
          Param::of::<dyn Interface>("interface"),
          Param::of::<dyn AbstractService>("abstract_service").in_category("First"),
        ],
        |args| {
          Ok(SubClassWithConstructorDependencies {
            interface: args.next::<dyn Interface>()?,
            abstract_service: args.next::<dyn AbstractService>()?,
          })
        },
      )
      .implements::<dyn Base>(|this| this as Rc<dyn Base>)
  }
}

/// Declares no constructor of its own and uses the one of its base.
pub struct SubSubClassWithConstructorDependencies {
  pub base: SubClassWithConstructorDependencies,
}
impl_as_any!(Base for SubSubClassWithConstructorDependencies);
impl Injectable for SubSubClassWithConstructorDependencies {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::new()
      .extends(|this: &Self| &this.base, |base| SubSubClassWithConstructorDependencies { base })
      .implements::<dyn Base>(|this| this as Rc<dyn Base>)
  }
}

pub struct DefaultConstructorCircularDependency {
  pub base: Option<Rc<dyn Base>>,
}
impl_as_any!(Base for DefaultConstructorCircularDependency);
impl Injectable for DefaultConstructorCircularDependency {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::new()
      .constructor([Param::of::<dyn Base>("base").in_category("Second")], |args| {
        Ok(DefaultConstructorCircularDependency {
          base: Some(args.next::<dyn Base>()?),
        })
      })
      .implements::<dyn Base>(|this| this as Rc<dyn Base>)
  }
}

pub struct DefaultConstructorCircularDependencyOther {
  pub base: Option<Rc<dyn Base>>,
}
impl_as_any!(Base for DefaultConstructorCircularDependencyOther);
impl Injectable for DefaultConstructorCircularDependencyOther {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::new()
      .constructor([Param::of::<dyn Base>("base").in_category("First")], |args| {
        Ok(DefaultConstructorCircularDependencyOther {
          base: Some(args.next::<dyn Base>()?),
        })
      })
      .implements::<dyn Base>(|this| this as Rc<dyn Base>)
  }
}

// --- Release hooks ---

/// Counts how often the release hook ran on one of its instances.
#[derive(Default)]
pub struct Tracked {
  pub released: Rc<Cell<u32>>,
}
impl_as_any!(Interface for Tracked);
impl Injectable for Tracked {
  fn descriptor() -> TypeDescriptor<Self> {
    TypeDescriptor::<Self>::defaulted()
      .implements::<dyn Interface>(|this| this as Rc<dyn Interface>)
      .on_release(|this| this.released.set(this.released.get() + 1))
  }
}
