//! Registration-time type metadata.
//!
//! Rust has no runtime reflection, so every injectable type describes itself
//! once through a [`TypeDescriptor`]: its injectable members, its designated
//! constructor, the abstract types it satisfies and, optionally, the type it
//! embeds as a base. Dependency discovery reads nothing but this descriptor.

use crate::core::TypeKey;
use crate::dependency::{Arguments, Assign, MemberKind};
use crate::error::{Error, Result};
use once_cell::unsync::OnceCell;
use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use tracing::warn;

/// A type the container knows how to construct and populate.
///
/// # Examples
///
/// ```
/// use sfioc::{Inject, Injectable, Injected, TypeDescriptor};
///
/// trait Clock {
///   fn now(&self) -> u64;
/// }
///
/// #[derive(Default)]
/// struct Scheduler {
///   clock: Injected<dyn Clock>,
/// }
///
/// impl Injectable for Scheduler {
///   fn descriptor() -> TypeDescriptor<Self> {
///     TypeDescriptor::defaulted().field("clock", Inject::new(), |this: &Self| &this.clock)
///   }
/// }
/// ```
pub trait Injectable: Any + Sized {
  fn descriptor() -> TypeDescriptor<Self>;
}

/// A marker placed on an injectable member.
///
/// Custom markers can refuse to apply to a host type and can attach a payload
/// to the dependency they produce, which lets integration layers define their
/// own dependency kinds.
pub trait InjectMarker: 'static {
  fn category(&self) -> &str;

  /// Whether this marker may be used on a member of `host`. A refused member
  /// is skipped during discovery with a warning.
  fn can_be_used_on(&self, host: TypeKey) -> bool {
    let _ = host;
    true
  }

  /// Payload carried by the produced dependency, see `Dependency::extension`.
  fn extension(&self) -> Option<Rc<dyn Any>> {
    None
  }
}

/// The standard injectable-member marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inject {
  category: String,
}

impl Inject {
  /// Injects from the default category.
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_category(category: impl Into<String>) -> Self {
    Self {
      category: category.into(),
    }
  }
}

impl InjectMarker for Inject {
  fn category(&self) -> &str {
    &self.category
  }
}

/// A write-once slot for an injected field.
///
/// Instances are shared through `Rc` before their members are injected, so
/// fields are filled through `&self`.
pub struct Injected<T: ?Sized> {
  cell: OnceCell<Rc<T>>,
}

impl<T: ?Sized> Injected<T> {
  pub fn new() -> Self {
    Self {
      cell: OnceCell::new(),
    }
  }

  /// A slot that already holds `value`.
  pub fn with_value(value: Rc<T>) -> Self {
    Self {
      cell: OnceCell::with_value(value),
    }
  }

  pub fn get(&self) -> Option<Rc<T>> {
    self.cell.get().cloned()
  }

  pub fn get_ref(&self) -> Option<&Rc<T>> {
    self.cell.get()
  }

  pub fn is_set(&self) -> bool {
    self.cell.get().is_some()
  }

  /// Fills the slot, handing the value back if it was already filled.
  pub fn set(&self, value: Rc<T>) -> Result<(), Rc<T>> {
    self.cell.set(value)
  }
}

impl<T: ?Sized> Default for Injected<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: ?Sized> fmt::Debug for Injected<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Injected")
      .field("type", &type_name::<T>())
      .field("set", &self.is_set())
      .finish()
  }
}

/// One parameter of a designated constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
  pub(crate) name: String,
  pub(crate) target: TypeKey,
  pub(crate) category: String,
}

impl Param {
  pub fn of<T: ?Sized + Any>(name: &str) -> Self {
    Self {
      name: name.to_owned(),
      target: TypeKey::of::<T>(),
      category: String::new(),
    }
  }

  /// Resolves this parameter from `category` instead of the default one.
  pub fn in_category(mut self, category: &str) -> Self {
    self.category = category.to_owned();
    self
  }
}

pub(crate) type Construct = Rc<dyn Fn(&mut Arguments) -> Result<Box<dyn Any>>>;
pub(crate) type Factory = Rc<dyn Fn() -> Result<Box<dyn Any>>>;
/// Turns an erased concrete instance into a boxed `Rc<Abstract>`.
pub(crate) type Upcast = Rc<dyn Fn(Rc<dyn Any>) -> Option<Box<dyn Any>>>;
pub(crate) type Release = Rc<dyn Fn(&dyn Any)>;

#[derive(Clone)]
pub(crate) struct MemberSpec {
  pub(crate) name: String,
  pub(crate) kind: MemberKind,
  pub(crate) target: TypeKey,
  pub(crate) marker: Rc<dyn InjectMarker>,
  pub(crate) assign: Assign,
}

#[derive(Clone)]
pub(crate) struct ConstructorSpec {
  pub(crate) params: Vec<Param>,
  pub(crate) construct: Construct,
}

/// The type-erased form of a descriptor.
#[derive(Clone)]
pub(crate) struct TypeInfo {
  key: TypeKey,
  members: Vec<MemberSpec>,
  inherited_members: Vec<MemberSpec>,
  constructors: Vec<ConstructorSpec>,
  inherited_constructors: Vec<ConstructorSpec>,
  default: Option<Factory>,
  inherited_default: Option<Factory>,
  upcasts: Vec<(TypeKey, Upcast)>,
  release: Option<Release>,
}

impl TypeInfo {
  pub(crate) fn key(&self) -> TypeKey {
    self.key
  }

  /// Declared members first, then members inherited from the base chain.
  pub(crate) fn members(&self) -> impl Iterator<Item = &MemberSpec> {
    self.members.iter().chain(self.inherited_members.iter())
  }

  /// The type's own designated constructors, or the nearest base's when the
  /// type declares none.
  pub(crate) fn constructors(&self) -> &[ConstructorSpec] {
    if self.constructors.is_empty() {
      &self.inherited_constructors
    } else {
      &self.constructors
    }
  }

  pub(crate) fn default_factory(&self) -> Option<&Factory> {
    self.default.as_ref().or(self.inherited_default.as_ref())
  }

  pub(crate) fn upcast_to(&self, target: TypeKey) -> Option<&Upcast> {
    self
      .upcasts
      .iter()
      .find(|(key, _)| *key == target)
      .map(|(_, upcast)| upcast)
  }

  pub(crate) fn release(&self) -> Option<&Release> {
    self.release.as_ref()
  }
}

/// Builder for the metadata of one injectable type.
///
/// Every descriptor satisfies its own type; further abstract types are added
/// with [`TypeDescriptor::implements`].
pub struct TypeDescriptor<T> {
  info: TypeInfo,
  _marker: PhantomData<fn() -> T>,
}

impl<T: Any> TypeDescriptor<T> {
  /// A descriptor without any constructor; add one before binding the type
  /// unless instances are always supplied up front.
  pub fn new() -> Self {
    let identity: Upcast = Rc::new(|instance: Rc<dyn Any>| {
      instance
        .downcast::<T>()
        .ok()
        .map(|instance| Box::new(instance) as Box<dyn Any>)
    });
    Self {
      info: TypeInfo {
        key: TypeKey::of::<T>(),
        members: Vec::new(),
        inherited_members: Vec::new(),
        constructors: Vec::new(),
        inherited_constructors: Vec::new(),
        default: None,
        inherited_default: None,
        upcasts: vec![(TypeKey::of::<T>(), identity)],
        release: None,
      },
      _marker: PhantomData,
    }
  }

  /// A descriptor whose default constructor is `T::default`.
  pub fn defaulted() -> Self
  where
    T: Default,
  {
    Self::new().default_constructor(T::default)
  }

  pub fn key(&self) -> TypeKey {
    self.info.key
  }

  /// Sets the parameterless constructor.
  pub fn default_constructor<F>(mut self, factory: F) -> Self
  where
    F: Fn() -> T + 'static,
  {
    self.info.default = Some(Rc::new(move || Ok(Box::new(factory()) as Box<dyn Any>)));
    self
  }

  /// Marks a designated constructor. Its parameters are resolved in order
  /// and handed to `construct`, which reads them back with
  /// [`Arguments::next`].
  ///
  /// Declaring more than one designated constructor is a configuration
  /// error reported when the type's dependencies are discovered.
  pub fn constructor<P, F>(mut self, params: P, construct: F) -> Self
  where
    P: IntoIterator<Item = Param>,
    F: Fn(&mut Arguments) -> Result<T> + 'static,
  {
    let construct: Construct = Rc::new(move |args: &mut Arguments| {
      construct(args).map(|instance| Box::new(instance) as Box<dyn Any>)
    });
    self.info.constructors.push(ConstructorSpec {
      params: params.into_iter().collect(),
      construct,
    });
    self
  }

  /// Marks an injectable field stored in an [`Injected`] slot.
  pub fn field<D, M, S>(self, name: &str, marker: M, slot: S) -> Self
  where
    D: ?Sized + Any,
    M: InjectMarker,
    S: Fn(&T) -> &Injected<D> + 'static,
  {
    let member = name.to_owned();
    let assign: Assign = Rc::new(move |onto: &dyn Any, value: Box<dyn Any>| {
      let host = downcast_host::<T>(onto)?;
      let value = downcast_value::<D>(value)?;
      if slot(host).set(value).is_err() {
        warn!(
          member = %member,
          host = type_name::<T>(),
          "injectable field is already set, keeping the first value"
        );
      }
      Ok(())
    });
    self.push_member(name, MemberKind::Field, TypeKey::of::<D>(), marker, assign)
  }

  /// Marks an injectable property written through `setter`.
  pub fn property<D, M, S>(self, name: &str, marker: M, setter: S) -> Self
  where
    D: ?Sized + Any,
    M: InjectMarker,
    S: Fn(&T, Rc<D>) + 'static,
  {
    let assign: Assign = Rc::new(move |onto: &dyn Any, value: Box<dyn Any>| {
      let host = downcast_host::<T>(onto)?;
      setter(host, downcast_value::<D>(value)?);
      Ok(())
    });
    self.push_member(name, MemberKind::Property, TypeKey::of::<D>(), marker, assign)
  }

  /// Declares that `T` satisfies the abstract type `I`.
  ///
  /// ```
  /// use sfioc::TypeDescriptor;
  /// use std::rc::Rc;
  ///
  /// trait Greeter {}
  /// #[derive(Default)]
  /// struct English;
  /// impl Greeter for English {}
  ///
  /// let descriptor = TypeDescriptor::<English>::defaulted()
  ///   .implements::<dyn Greeter>(|this| this as Rc<dyn Greeter>);
  /// # let _ = descriptor;
  /// ```
  pub fn implements<I: ?Sized + Any>(mut self, upcast: impl Fn(Rc<T>) -> Rc<I> + 'static) -> Self {
    let key = TypeKey::of::<I>();
    let upcast: Upcast = Rc::new(move |instance: Rc<dyn Any>| {
      instance
        .downcast::<T>()
        .ok()
        .map(|instance| Box::new(upcast(instance)) as Box<dyn Any>)
    });
    self.info.upcasts.retain(|(existing, _)| *existing != key);
    self.info.upcasts.push((key, upcast));
    self
  }

  /// Embeds `P` as the base of `T`.
  ///
  /// Members of `P` (including those `P` inherits) are injected into the
  /// value returned by `project`. The constructors of `P` are used, wrapped
  /// by `embed`, only when `T` declares no designated constructor of its own.
  pub fn extends<P, Proj, Embed>(mut self, project: Proj, embed: Embed) -> Self
  where
    P: Injectable,
    Proj: Fn(&T) -> &P + 'static,
    Embed: Fn(P) -> T + 'static,
  {
    let base = P::descriptor().info;
    let project = Rc::new(project);
    let embed = Rc::new(embed);

    for member in base.members() {
      let inner = Rc::clone(&member.assign);
      let project = Rc::clone(&project);
      let assign: Assign = Rc::new(move |onto: &dyn Any, value: Box<dyn Any>| {
        let host = downcast_host::<T>(onto)?;
        inner(project(host) as &dyn Any, value)
      });
      self.info.inherited_members.push(MemberSpec {
        assign,
        ..member.clone()
      });
    }

    for constructor in base.constructors() {
      let inner = Rc::clone(&constructor.construct);
      let embed = Rc::clone(&embed);
      let construct: Construct = Rc::new(move |args: &mut Arguments| {
        let base = downcast_owned::<P>(inner(args)?)?;
        Ok(Box::new(embed(base)) as Box<dyn Any>)
      });
      self.info.inherited_constructors.push(ConstructorSpec {
        params: constructor.params.clone(),
        construct,
      });
    }

    if let Some(factory) = base.default_factory().cloned() {
      self.info.inherited_default = Some(Rc::new(move || {
        let base = downcast_owned::<P>(factory()?)?;
        Ok(Box::new(embed(base)) as Box<dyn Any>)
      }));
    }
    self
  }

  /// Sets the hook run on a cached instance when its binding is disposed.
  pub fn on_release<F>(mut self, release: F) -> Self
  where
    F: Fn(&T) + 'static,
  {
    self.info.release = Some(Rc::new(move |instance: &dyn Any| {
      if let Some(instance) = instance.downcast_ref::<T>() {
        release(instance);
      }
    }));
    self
  }

  pub(crate) fn info(&self) -> &TypeInfo {
    &self.info
  }

  pub(crate) fn into_info(self) -> TypeInfo {
    self.info
  }

  fn push_member<M: InjectMarker>(
    mut self,
    name: &str,
    kind: MemberKind,
    target: TypeKey,
    marker: M,
    assign: Assign,
  ) -> Self {
    self.info.members.push(MemberSpec {
      name: name.to_owned(),
      kind,
      target,
      marker: Rc::new(marker),
      assign,
    });
    self
  }
}

impl<T: Any> Default for TypeDescriptor<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> fmt::Debug for TypeDescriptor<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TypeDescriptor")
      .field("type", &self.info.key)
      .field("members", &(self.info.members.len() + self.info.inherited_members.len()))
      .field("constructors", &self.info.constructors().len())
      .field("has_default", &self.info.default_factory().is_some())
      .finish_non_exhaustive()
  }
}

fn downcast_host<T: Any>(onto: &dyn Any) -> Result<&T> {
  onto
    .downcast_ref::<T>()
    .ok_or_else(|| Error::ResolutionFailed {
      type_name: type_name::<T>(),
      reason: "the injection target has a different concrete type".to_owned(),
    })
}

fn downcast_value<D: ?Sized + Any>(value: Box<dyn Any>) -> Result<Rc<D>> {
  value
    .downcast::<Rc<D>>()
    .map(|value| *value)
    .map_err(|_| Error::ResolutionFailed {
      type_name: type_name::<D>(),
      reason: "the resolved value has a different type".to_owned(),
    })
}

fn downcast_owned<P: Any>(value: Box<dyn Any>) -> Result<P> {
  value
    .downcast::<P>()
    .map(|value| *value)
    .map_err(|_| Error::ResolutionFailed {
      type_name: type_name::<P>(),
      reason: "the base constructor produced a different type".to_owned(),
    })
}
