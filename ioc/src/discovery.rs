//! Dependency discovery over type descriptors.

use crate::dependency::{ConstructorDependency, Dependency, InjectionPoint};
use crate::descriptor::{ConstructorSpec, Injectable, TypeDescriptor, TypeInfo};
use crate::error::{Error, Result};
use std::any::Any;
use std::rc::Rc;
use tracing::warn;

/// Produces the ordered dependency list used to populate a new `T`.
///
/// A designated constructor with parameters yields one
/// [`InjectionPoint::Constructor`] at the front of the list; marked members
/// follow in declaration order, declared members before inherited ones.
pub fn discover<T: Injectable>() -> Result<Vec<InjectionPoint>> {
  discover_info(T::descriptor().info())
}

/// Like [`discover`], for a descriptor built by hand.
pub fn discover_descriptor<T: Any>(descriptor: &TypeDescriptor<T>) -> Result<Vec<InjectionPoint>> {
  discover_info(descriptor.info())
}

pub(crate) fn discover_info(info: &TypeInfo) -> Result<Vec<InjectionPoint>> {
  let mut points = Vec::new();

  if let Some(constructor) = designated_constructor(info)? {
    if !constructor.params.is_empty() {
      let arguments = constructor
        .params
        .iter()
        .map(|param| Dependency::argument(&param.name, param.target, &param.category))
        .collect();
      points.push(InjectionPoint::Constructor(ConstructorDependency::new(arguments)));
    }
  }

  for member in info.members() {
    if !member.marker.can_be_used_on(info.key()) {
      warn!(
        member = %member.name,
        host = info.key().name(),
        "marker cannot be used on this type, skipping member"
      );
      continue;
    }
    points.push(InjectionPoint::Member(Dependency::member(
      &member.name,
      member.kind,
      member.target,
      member.marker.category(),
      member.marker.extension(),
      Rc::clone(&member.assign),
    )));
  }

  Ok(points)
}

/// The single designated constructor of a type, if it declares one.
pub(crate) fn designated_constructor(info: &TypeInfo) -> Result<Option<&ConstructorSpec>> {
  match info.constructors() {
    [] => Ok(None),
    [constructor] => Ok(Some(constructor)),
    _ => Err(Error::DuplicateDefaultConstructor(info.key().name())),
  }
}
