//! Core data structures shared by the binding registry and the resolver.

use crate::binding::{Binding, Lifecycle};
use crate::config::CyclePolicy;
use crate::error::{Error, Result};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Runtime identity of a type, usable for sized types and trait objects alike.
///
/// Two keys are equal when their `TypeId`s are equal; the type name is only
/// carried along for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
  id: TypeId,
  name: &'static str,
}

impl TypeKey {
  pub fn of<T: ?Sized + Any>() -> Self {
    Self {
      id: TypeId::of::<T>(),
      name: std::any::type_name::<T>(),
    }
  }

  pub fn id(&self) -> TypeId {
    self.id
  }

  /// The fully qualified type name, e.g. `dyn my_app::Greeter`.
  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn is<T: ?Sized + Any>(&self) -> bool {
    self.id == TypeId::of::<T>()
  }
}

impl PartialEq for TypeKey {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.id.hash(state);
  }
}

impl fmt::Debug for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "TypeKey({})", self.name)
  }
}

impl fmt::Display for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name)
  }
}

/// Bindings visited per owner type during one root resolution call.
pub(crate) type VisitLog = RefCell<HashMap<TypeKey, Vec<Rc<Binding>>>>;

/// An RAII guard that records a binding as being built for an owner type.
///
/// Creating the guard fails with `CircularDependency` when the binding is
/// already recorded for the owner and the cycle policy forbids the revisit.
/// Under `CyclePolicy::Permissive` the record is dropped again once the
/// dependency subtree is finished, so only bindings that are still being
/// built count as visited. Under `CyclePolicy::Strict` records live for the
/// whole root resolution.
pub(crate) struct VisitGuard<'a> {
  log: &'a VisitLog,
  owner: TypeKey,
  recorded: Option<Rc<Binding>>,
}

impl<'a> VisitGuard<'a> {
  pub(crate) fn enter(
    log: &'a VisitLog,
    owner: TypeKey,
    binding: &Rc<Binding>,
    is_argument: bool,
    policy: CyclePolicy,
  ) -> Result<Self> {
    let mut visits = log.borrow_mut();
    let seen = visits.entry(owner).or_default();

    if let Some(previous) = seen.iter().find(|visited| Rc::ptr_eq(visited, binding)) {
      let fatal = match policy {
        CyclePolicy::Strict => true,
        CyclePolicy::Permissive => is_argument || previous.lifecycle() == Lifecycle::Transient,
      };
      if fatal {
        return Err(Error::CircularDependency {
          owner: owner.name(),
          target: binding.to_type().name(),
        });
      }
      // A singleton back-reference: already recorded, nothing to undo later.
      return Ok(Self {
        log,
        owner,
        recorded: None,
      });
    }

    seen.push(Rc::clone(binding));
    let recorded = match policy {
      CyclePolicy::Permissive => Some(Rc::clone(binding)),
      CyclePolicy::Strict => None,
    };
    Ok(Self {
      log,
      owner,
      recorded,
    })
  }
}

impl Drop for VisitGuard<'_> {
  fn drop(&mut self) {
    let Some(binding) = self.recorded.take() else {
      return;
    };
    if let Ok(mut visits) = self.log.try_borrow_mut() {
      if let Some(seen) = visits.get_mut(&self.owner) {
        if let Some(position) = seen.iter().rposition(|visited| Rc::ptr_eq(visited, &binding)) {
          seen.remove(position);
        }
      }
    }
  }
}
