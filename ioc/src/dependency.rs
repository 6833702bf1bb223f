//! Value objects describing the slots that resolution fills.

use crate::core::TypeKey;
use crate::error::{Error, Result};
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Where a dependency is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
  /// An `Injected<T>` slot on the instance.
  Field,
  /// A setter invoked on the instance.
  Property,
  /// An argument of the designated constructor.
  Constructor,
}

/// Assigns a resolved value (a boxed `Rc<Target>`) onto an instance.
pub(crate) type Assign = Rc<dyn Fn(&dyn Any, Box<dyn Any>) -> Result<()>>;

/// One resolvable slot: a constructor argument or an injectable member.
#[derive(Clone)]
pub struct Dependency {
  member_name: String,
  kind: MemberKind,
  target: TypeKey,
  category: String,
  extension: Option<Rc<dyn Any>>,
  assign: Option<Assign>,
}

impl Dependency {
  pub(crate) fn argument(name: &str, target: TypeKey, category: &str) -> Self {
    Self {
      member_name: name.to_owned(),
      kind: MemberKind::Constructor,
      target,
      category: category.to_owned(),
      extension: None,
      assign: None,
    }
  }

  pub(crate) fn member(
    name: &str,
    kind: MemberKind,
    target: TypeKey,
    category: &str,
    extension: Option<Rc<dyn Any>>,
    assign: Assign,
  ) -> Self {
    Self {
      member_name: name.to_owned(),
      kind,
      target,
      category: category.to_owned(),
      extension,
      assign: Some(assign),
    }
  }

  pub fn member_name(&self) -> &str {
    &self.member_name
  }

  pub fn kind(&self) -> MemberKind {
    self.kind
  }

  /// The abstract type resolved to fill this slot.
  pub fn target(&self) -> TypeKey {
    self.target
  }

  /// The category qualifier; empty for the default category.
  pub fn category(&self) -> &str {
    &self.category
  }

  pub fn is_argument(&self) -> bool {
    self.kind == MemberKind::Constructor
  }

  /// The payload attached by the marker that produced this dependency.
  pub fn extension<E: Any>(&self) -> Option<&E> {
    self.extension.as_deref().and_then(|payload| payload.downcast_ref::<E>())
  }

  pub(crate) fn assign(&self, onto: &dyn Any, value: Box<dyn Any>) -> Result<()> {
    match &self.assign {
      Some(assign) => assign(onto, value),
      None => Err(Error::ResolutionFailed {
        type_name: self.target.name(),
        reason: format!("'{}' is a constructor argument, not a member", self.member_name),
      }),
    }
  }
}

impl fmt::Debug for Dependency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Dependency")
      .field("member_name", &self.member_name)
      .field("kind", &self.kind)
      .field("target", &self.target)
      .field("category", &self.category)
      .field("has_extension", &self.extension.is_some())
      .finish()
  }
}

/// The argument list of a type's designated constructor.
#[derive(Debug, Clone)]
pub struct ConstructorDependency {
  arguments: Vec<Dependency>,
}

impl ConstructorDependency {
  pub(crate) fn new(arguments: Vec<Dependency>) -> Self {
    Self { arguments }
  }

  pub fn member_name(&self) -> &str {
    "constructor"
  }

  pub fn arguments(&self) -> &[Dependency] {
    &self.arguments
  }
}

/// One entry of a discovered dependency list.
///
/// A list holds at most one `Constructor` entry, and when present it is the
/// first element.
#[derive(Debug, Clone)]
pub enum InjectionPoint {
  Constructor(ConstructorDependency),
  Member(Dependency),
}

impl InjectionPoint {
  pub fn member_name(&self) -> &str {
    match self {
      InjectionPoint::Constructor(constructor) => constructor.member_name(),
      InjectionPoint::Member(dependency) => dependency.member_name(),
    }
  }

  pub fn kind(&self) -> MemberKind {
    match self {
      InjectionPoint::Constructor(_) => MemberKind::Constructor,
      InjectionPoint::Member(dependency) => dependency.kind(),
    }
  }

  pub fn as_constructor(&self) -> Option<&ConstructorDependency> {
    match self {
      InjectionPoint::Constructor(constructor) => Some(constructor),
      InjectionPoint::Member(_) => None,
    }
  }

  pub fn as_member(&self) -> Option<&Dependency> {
    match self {
      InjectionPoint::Member(dependency) => Some(dependency),
      InjectionPoint::Constructor(_) => None,
    }
  }
}

/// Ordered constructor arguments, each held as an `Rc` of its declared type.
///
/// Constructors registered with `TypeDescriptor::constructor` pull their
/// parameters out in declaration order with [`Arguments::next`].
#[derive(Default)]
pub struct Arguments {
  owner: Option<TypeKey>,
  values: VecDeque<Box<dyn Any>>,
  taken: usize,
}

impl Arguments {
  pub fn new() -> Self {
    Self::default()
  }

  pub(crate) fn for_owner(owner: TypeKey) -> Self {
    Self {
      owner: Some(owner),
      ..Self::default()
    }
  }

  /// Appends a plain value.
  pub fn with<T: Any>(self, value: T) -> Self {
    self.with_rc(Rc::new(value))
  }

  /// Appends a shared value, which may be a trait object.
  pub fn with_rc<T: ?Sized + Any>(mut self, value: Rc<T>) -> Self {
    self.values.push_back(Box::new(value));
    self
  }

  pub(crate) fn push_boxed(&mut self, value: Box<dyn Any>) {
    self.values.push_back(value);
  }

  pub(crate) fn set_owner(&mut self, owner: TypeKey) {
    self.owner.get_or_insert(owner);
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Takes the next argument, which must be an `Rc<T>`.
  pub fn next<T: ?Sized + Any>(&mut self) -> Result<Rc<T>> {
    let position = self.taken;
    self.taken += 1;
    let mismatch = || Error::ArgumentMismatch {
      owner: self.owner.map_or("<unknown>", |owner| owner.name()),
      position,
      expected: std::any::type_name::<T>(),
    };
    let value = match self.values.pop_front() {
      Some(value) => value,
      None => return Err(mismatch()),
    };
    value
      .downcast::<Rc<T>>()
      .map(|value| *value)
      .map_err(|_| mismatch())
  }
}

impl fmt::Debug for Arguments {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Arguments")
      .field("owner", &self.owner)
      .field("remaining", &self.values.len())
      .field("taken", &self.taken)
      .finish()
  }
}
