//! Construction policy for one registration.

use crate::core::TypeKey;
use crate::dependency::{Arguments, Dependency, InjectionPoint};
use crate::descriptor::{Injectable, TypeDescriptor, TypeInfo};
use crate::discovery::{designated_constructor, discover_info};
use crate::error::{Error, Result};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// How often a binding constructs its bound-to type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
  /// A new instance for every resolution.
  #[default]
  Transient,
  /// One instance, created on first resolution and cached.
  Singleton,
}

/// What a resolution step knows about the slot being filled.
#[derive(Clone, Copy)]
pub struct Activation<'a> {
  dependency: Option<&'a Dependency>,
  onto: Option<&'a dyn Any>,
}

impl<'a> Activation<'a> {
  pub(crate) fn new(dependency: Option<&'a Dependency>, onto: Option<&'a dyn Any>) -> Self {
    Self { dependency, onto }
  }

  /// The dependency record being resolved; `None` for a root resolution.
  pub fn dependency(&self) -> Option<&'a Dependency> {
    self.dependency
  }

  /// The instance the result will be injected into. Only member dependencies
  /// have one.
  pub fn onto(&self) -> Option<&'a dyn Any> {
    self.onto
  }

  pub fn onto_as<T: Any>(&self) -> Option<&'a T> {
    self.onto.and_then(|onto| onto.downcast_ref::<T>())
  }
}

impl fmt::Debug for Activation<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Activation")
      .field("dependency", &self.dependency)
      .field("has_onto", &self.onto.is_some())
      .finish()
  }
}

/// A pluggable way of producing instances for a binding.
///
/// The strategy is consulted before descriptor-based construction. Returning
/// `Ok(None)` falls back to the descriptor. A returned instance must be an
/// `Rc` of the binding's bound-to type erased to `Rc<dyn Any>`.
pub trait ActivationStrategy: 'static {
  fn activate(&self, binding: &Binding, activation: &Activation<'_>) -> Result<Option<Rc<dyn Any>>>;
}

/// A registered construction rule from an abstract type to a concrete type
/// or to a supplied instance.
pub struct Binding {
  from: TypeKey,
  to: TypeKey,
  info: TypeInfo,
  lifecycle: Cell<Lifecycle>,
  supplied: bool,
  instance: RefCell<Option<Rc<dyn Any>>>,
  dependencies: RefCell<Option<Rc<[InjectionPoint]>>>,
  strategy: Option<Rc<dyn ActivationStrategy>>,
}

impl Binding {
  /// A binding that constructs `T` to satisfy `F`.
  ///
  /// Fails with `BindingTypeMismatch` unless the descriptor of `T` declares
  /// that it implements `F` (or `F` is `T` itself).
  pub fn new<F, T>() -> Result<Self>
  where
    F: ?Sized + Any,
    T: Injectable,
  {
    Self::from_info(TypeKey::of::<F>(), T::descriptor().into_info(), None, None)
  }

  /// A binding that always returns `instance`, whatever its lifecycle.
  pub fn with_instance<F, T>(instance: Rc<T>) -> Result<Self>
  where
    F: ?Sized + Any,
    T: Injectable,
  {
    Self::from_info(
      TypeKey::of::<F>(),
      T::descriptor().into_info(),
      Some(instance as Rc<dyn Any>),
      None,
    )
  }

  /// A binding that always returns a value already shared as `Rc<F>`.
  ///
  /// No descriptor is needed, which makes this the way to bind trait objects
  /// and plain values built outside the container.
  pub fn shared<F: ?Sized + Any>(instance: Rc<F>) -> Self {
    let info = TypeDescriptor::<Rc<F>>::new()
      .implements::<F>(|this| Rc::clone(&*this))
      .into_info();
    let from = TypeKey::of::<F>();
    Self {
      from,
      to: from,
      info,
      lifecycle: Cell::new(Lifecycle::Singleton),
      supplied: true,
      instance: RefCell::new(Some(Rc::new(instance) as Rc<dyn Any>)),
      dependencies: RefCell::new(None),
      strategy: None,
    }
  }

  /// A binding whose instances come from `strategy` first.
  pub fn with_strategy<F, T, S>(strategy: S) -> Result<Self>
  where
    F: ?Sized + Any,
    T: Injectable,
    S: ActivationStrategy,
  {
    Self::from_info(
      TypeKey::of::<F>(),
      T::descriptor().into_info(),
      None,
      Some(Rc::new(strategy)),
    )
  }

  fn from_info(
    from: TypeKey,
    info: TypeInfo,
    instance: Option<Rc<dyn Any>>,
    strategy: Option<Rc<dyn ActivationStrategy>>,
  ) -> Result<Self> {
    let to = info.key();
    if info.upcast_to(from).is_none() {
      return Err(Error::BindingTypeMismatch {
        from: from.name(),
        to: to.name(),
      });
    }
    let supplied = instance.is_some();
    let lifecycle = if supplied {
      Lifecycle::Singleton
    } else {
      Lifecycle::default()
    };
    Ok(Self {
      from,
      to,
      info,
      lifecycle: Cell::new(lifecycle),
      supplied,
      instance: RefCell::new(instance),
      dependencies: RefCell::new(None),
      strategy,
    })
  }

  pub fn as_singleton(&self) -> &Self {
    self.lifecycle.set(Lifecycle::Singleton);
    self
  }

  pub fn as_transient(&self) -> &Self {
    self.lifecycle.set(Lifecycle::Transient);
    self
  }

  pub fn lifecycle(&self) -> Lifecycle {
    self.lifecycle.get()
  }

  pub fn from_type(&self) -> TypeKey {
    self.from
  }

  pub fn to_type(&self) -> TypeKey {
    self.to
  }

  /// Whether the instance was supplied at registration.
  pub fn is_supplied(&self) -> bool {
    self.supplied
  }

  /// Whether resolving this binding would return a stored instance.
  pub fn has_instance(&self) -> bool {
    self.cached_instance().is_some()
  }

  pub fn has_cached_dependencies(&self) -> bool {
    self.dependencies.borrow().is_some()
  }

  /// The discovered dependency list of the bound-to type, computed once.
  pub fn dependencies(&self) -> Result<Rc<[InjectionPoint]>> {
    if let Some(cached) = self.dependencies.borrow().as_ref() {
      return Ok(Rc::clone(cached));
    }
    let discovered: Rc<[InjectionPoint]> = discover_info(&self.info)?.into();
    *self.dependencies.borrow_mut() = Some(Rc::clone(&discovered));
    Ok(discovered)
  }

  /// Produces an instance following the lifecycle rules, without injecting
  /// members. `args` feed the designated constructor.
  pub fn resolve(&self, args: Arguments) -> Result<Rc<dyn Any>> {
    match self.activate(args, &Activation::new(None, None))? {
      Some((instance, _)) => Ok(instance),
      None => Err(self.produced_nothing()),
    }
  }

  /// [`Binding::resolve`], upcast to one of the types the bound-to type
  /// implements.
  pub fn resolve_as<T: ?Sized + Any>(&self, args: Arguments) -> Result<Rc<T>> {
    let instance = self.resolve(args)?;
    let boxed = self.upcast(&instance, TypeKey::of::<T>())?;
    boxed
      .downcast::<Rc<T>>()
      .map(|value| *value)
      .map_err(|_| Error::BindingTypeMismatch {
        from: std::any::type_name::<T>(),
        to: self.to.name(),
      })
  }

  /// Releases the cached instance and the dependency cache. Idempotent.
  ///
  /// A binding to a supplied instance refuses to resolve afterwards.
  pub fn dispose(&self) {
    let released = self.instance.borrow_mut().take();
    if let (Some(instance), Some(release)) = (released, self.info.release()) {
      release(&*instance);
    }
    self.dependencies.borrow_mut().take();
  }

  pub(crate) fn cached_instance(&self) -> Option<Rc<dyn Any>> {
    if self.supplied || self.lifecycle() == Lifecycle::Singleton {
      self.instance.borrow().clone()
    } else {
      None
    }
  }

  /// Returns the stored instance, or creates one. The flag is `true` when the
  /// instance was just created and still needs its members injected.
  pub(crate) fn activate(
    &self,
    args: Arguments,
    activation: &Activation<'_>,
  ) -> Result<Option<(Rc<dyn Any>, bool)>> {
    if let Some(instance) = self.cached_instance() {
      return Ok(Some((instance, false)));
    }
    if self.supplied {
      return Err(Error::ResolutionFailed {
        type_name: self.from.name(),
        reason: "the supplied instance has been released".to_owned(),
      });
    }

    let from_strategy = match &self.strategy {
      Some(strategy) => strategy.activate(self, activation)?,
      None => None,
    };
    let created = match from_strategy {
      Some(instance) => Some(instance),
      None => self.construct(args)?,
    };
    let Some(instance) = created else {
      return Ok(None);
    };

    if self.lifecycle() == Lifecycle::Singleton {
      *self.instance.borrow_mut() = Some(Rc::clone(&instance));
    }
    Ok(Some((instance, true)))
  }

  /// Drops a cached singleton. Supplied instances are kept.
  pub(crate) fn evict(&self) {
    if !self.supplied {
      self.instance.borrow_mut().take();
    }
  }

  /// Boxes `instance` as an `Rc<target>`.
  pub(crate) fn upcast(&self, instance: &Rc<dyn Any>, target: TypeKey) -> Result<Box<dyn Any>> {
    let upcast = self.info.upcast_to(target).ok_or(Error::BindingTypeMismatch {
      from: target.name(),
      to: self.to.name(),
    })?;
    upcast(Rc::clone(instance)).ok_or_else(|| Error::ResolutionFailed {
      type_name: self.to.name(),
      reason: "the stored instance has a different concrete type".to_owned(),
    })
  }

  pub(crate) fn produced_nothing(&self) -> Error {
    Error::ResolutionFailed {
      type_name: self.from.name(),
      reason: format!("{} has no constructor that can be used", self.to.name()),
    }
  }

  fn construct(&self, mut args: Arguments) -> Result<Option<Rc<dyn Any>>> {
    args.set_owner(self.to);
    let constructor = designated_constructor(&self.info)?;
    let created = match (constructor, args.is_empty(), self.info.default_factory()) {
      (Some(constructor), false, _) | (Some(constructor), true, None) => {
        Some((constructor.construct)(&mut args)?)
      }
      (_, _, Some(factory)) => Some(factory()?),
      (None, _, None) => None,
    };
    Ok(created.map(Rc::from))
  }
}

impl fmt::Debug for Binding {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Binding")
      .field("from", &self.from)
      .field("to", &self.to)
      .field("lifecycle", &self.lifecycle())
      .field("supplied", &self.supplied)
      .field("has_instance", &self.has_instance())
      .field("has_strategy", &self.strategy.is_some())
      .finish()
  }
}
