//! The registry of live containers and the inheritance edges between them.

use crate::binding::Binding;
use crate::container::{Container, ContainerHooks};
use crate::core::TypeKey;
use crate::error::{Error, Result};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::debug;

/// A directory of live containers, keyed by name.
///
/// The context only references its containers; whoever built a container
/// owns it. A container that is dropped without being disposed simply stops
/// being found, and its name becomes free again.
///
/// Inheritance edges are kept by name and outlive the containers they
/// connect, so an edge may point at a container that is registered later.
#[derive(Default)]
pub struct Context {
  containers: RefCell<HashMap<String, Weak<Container>>>,
  inheritance: RefCell<HashMap<String, Vec<String>>>,
  disposing: Cell<bool>,
}

impl Context {
  pub fn new() -> Rc<Self> {
    Rc::new(Self::default())
  }

  /// Registers `container` under its name.
  ///
  /// Fails with `DuplicateContainerIdentity` if a live container already
  /// uses the name.
  pub fn add_container(&self, container: &Rc<Container>) -> Result<()> {
    let mut containers = self.containers.borrow_mut();
    let name = container.name();
    if containers.get(name).is_some_and(|existing| existing.strong_count() > 0) {
      return Err(Error::DuplicateContainerIdentity(name.to_owned()));
    }
    containers.insert(name.to_owned(), Rc::downgrade(container));
    debug!(container = name, "registered container");
    Ok(())
  }

  /// Forgets the container registered under `name`. Unknown names and calls
  /// made while the context is being disposed are ignored.
  pub fn remove_container(&self, name: &str) {
    if self.disposing.get() {
      debug!(container = name, "context is being disposed, not removing container");
      return;
    }
    if self.containers.borrow_mut().remove(name).is_none() {
      debug!(container = name, "container is not registered");
      return;
    }
    debug!(container = name, "removed container");
  }

  /// Makes `child` inherit from `parent`. Adding an existing edge is a no-op.
  pub fn add_inheritance(&self, child: &str, parent: &str) {
    let mut inheritance = self.inheritance.borrow_mut();
    let parents = inheritance.entry(child.to_owned()).or_default();
    if parents.iter().any(|existing| existing == parent) {
      return;
    }
    parents.push(parent.to_owned());
    debug!(child, parent, "added inheritance edge");
  }

  /// The containers `child` inherits from, in the order the edges were added.
  pub fn inherited_from(&self, child: &str) -> Vec<String> {
    self
      .inheritance
      .borrow()
      .get(child)
      .cloned()
      .unwrap_or_default()
  }

  /// Searches the containers `child` inherits from, depth first and in edge
  /// order, and returns the first binding found.
  ///
  /// Edges to containers that are missing, dropped or disposed are skipped.
  pub fn find_inherited_binding(&self, child: &str, target: TypeKey, category: &str) -> Option<Rc<Binding>> {
    let mut searched = HashSet::from([child.to_owned()]);
    self.find_inherited(child, target, category, &mut searched)
  }

  pub(crate) fn find_inherited(
    &self,
    child: &str,
    target: TypeKey,
    category: &str,
    searched: &mut HashSet<String>,
  ) -> Option<Rc<Binding>> {
    for parent in self.inherited_from(child) {
      if searched.contains(&parent) {
        continue;
      }
      let Some(container) = self.live(&parent) else {
        continue;
      };
      if let Ok(binding) = container.find_binding_tracked(target, category, searched) {
        return Some(binding);
      }
    }
    None
  }

  /// The live container registered under `name`.
  pub fn get_container(&self, name: &str) -> Result<Rc<Container>> {
    self
      .live(name)
      .ok_or_else(|| Error::ContainerNotFound(name.to_owned()))
  }

  /// The live container registered under `name`, provided it was built with
  /// hooks of type `H`.
  pub fn get_container_by_type<H: ContainerHooks>(&self, name: &str) -> Result<Rc<Container>> {
    self
      .live(name)
      .filter(|container| container.kind() == TypeKey::of::<H>())
      .ok_or_else(|| Error::ContainerNotFound(name.to_owned()))
  }

  pub fn contains(&self, name: &str) -> bool {
    self.live(name).is_some()
  }

  /// The number of live containers.
  pub fn len(&self) -> usize {
    self
      .containers
      .borrow()
      .values()
      .filter(|container| container.strong_count() > 0)
      .count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Names of the live containers, sorted.
  pub fn container_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self
      .containers
      .borrow()
      .iter()
      .filter(|(_, container)| container.strong_count() > 0)
      .map(|(name, _)| name.clone())
      .collect();
    names.sort();
    names
  }

  /// Disposes every live container in name order, then clears all registry
  /// state, inheritance edges included.
  ///
  /// Containers registered by a hook while the context is being disposed are
  /// disposed in a further pass.
  pub fn dispose(&self) {
    self.disposing.set(true);
    loop {
      let mut live: Vec<Rc<Container>> = self
        .containers
        .borrow()
        .values()
        .filter_map(Weak::upgrade)
        .filter(|container| !container.is_disposed())
        .collect();
      if live.is_empty() {
        break;
      }
      live.sort_by(|a, b| a.name().cmp(b.name()));
      debug!(containers = live.len(), "disposing context");
      for container in &live {
        container.dispose();
      }
    }
    self.containers.borrow_mut().clear();
    self.inheritance.borrow_mut().clear();
    self.disposing.set(false);
  }

  fn live(&self, name: &str) -> Option<Rc<Container>> {
    self.containers.borrow().get(name).and_then(Weak::upgrade)
  }
}

impl fmt::Debug for Context {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Context")
      .field("containers", &self.container_names())
      .field("inheritance", &self.inheritance.borrow())
      .field("disposing", &self.disposing.get())
      .finish()
  }
}
