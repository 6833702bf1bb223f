//! The `Container` registry and its builder.

use crate::binding::{ActivationStrategy, Binding};
use crate::config::ContainerConfig;
use crate::context::Context;
use crate::core::TypeKey;
use crate::dependency::Dependency;
use crate::descriptor::Injectable;
use crate::error::{Error, Result};
use crate::resolver::Resolver;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::debug;

/// Setup and resolution hooks of a container.
///
/// The hooks type also identifies the container kind for
/// [`Context::get_container_by_type`]. `()` is the no-op implementation.
pub trait ContainerHooks: 'static {
  /// Registers the container's bindings. Called once while the container is
  /// built; an error aborts the build.
  fn set_bindings(&self, container: &Container) -> Result<()> {
    let _ = container;
    Ok(())
  }

  /// Called once, after `set_bindings` succeeded.
  fn on_setup_complete(&self, container: &Container) {
    let _ = container;
  }

  /// Called before every binding lookup of a resolution. This is the place
  /// to install a one-shot binding with [`Container::override_next_lookup`].
  fn pre_resolve(&self, container: &Container, site: &ResolveSite<'_>) {
    let _ = (container, site);
  }

  /// Called when the container is disposed, before its bindings are.
  fn on_dispose(&self, container: &Container) {
    let _ = container;
  }
}

impl ContainerHooks for () {}

/// The slot a binding lookup is about to fill.
#[derive(Clone, Copy)]
pub struct ResolveSite<'a> {
  /// The abstract type being looked up.
  pub target: TypeKey,
  /// The type whose dependency this is; `None` for a root resolution.
  pub owner: Option<TypeKey>,
  pub category: &'a str,
  pub dependency: Option<&'a Dependency>,
  /// The instance the result will be injected into, for member dependencies.
  pub onto: Option<&'a dyn Any>,
}

impl fmt::Debug for ResolveSite<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ResolveSite")
      .field("target", &self.target)
      .field("owner", &self.owner)
      .field("category", &self.category)
      .field("dependency", &self.dependency)
      .field("has_onto", &self.onto.is_some())
      .finish()
  }
}

/// Builder for a [`Container`].
pub struct ContainerBuilder {
  name: String,
  parents: Vec<String>,
  config: ContainerConfig,
  kind: TypeKey,
  hooks: Box<dyn ContainerHooks>,
}

impl ContainerBuilder {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      parents: Vec::new(),
      config: ContainerConfig::default(),
      kind: TypeKey::of::<()>(),
      hooks: Box::new(()),
    }
  }

  /// Adds an inheritance edge to the container registered as `parent`.
  /// Edges are searched in the order they were added.
  pub fn inherit_from(mut self, parent: impl Into<String>) -> Self {
    self.parents.push(parent.into());
    self
  }

  pub fn config(mut self, config: ContainerConfig) -> Self {
    self.config = config;
    self
  }

  pub fn hooks<H: ContainerHooks>(mut self, hooks: H) -> Self {
    self.kind = TypeKey::of::<H>();
    self.hooks = Box::new(hooks);
    self
  }

  /// Registers the container in `context`, adds its inheritance edges and
  /// runs its setup hooks.
  ///
  /// Fails with `DuplicateContainerIdentity` if a live container already
  /// uses the name, or with the error returned by `set_bindings`, in which
  /// case the container is removed from `context` again.
  pub fn build(self, context: &Rc<Context>) -> Result<Rc<Container>> {
    let container = Rc::new(Container {
      name: self.name,
      kind: self.kind,
      config: self.config,
      context: Rc::downgrade(context),
      hooks: self.hooks,
      bindings: RefCell::new(HashMap::new()),
      order: RefCell::new(Vec::new()),
      override_binding: RefCell::new(None),
      disposed: Cell::new(false),
    });

    context.add_container(&container)?;
    for parent in &self.parents {
      context.add_inheritance(&container.name, parent);
    }

    if let Err(error) = container.hooks.set_bindings(&container) {
      container.dispose();
      return Err(error);
    }
    container.hooks.on_setup_complete(&container);
    Ok(container)
  }
}

impl fmt::Debug for ContainerBuilder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ContainerBuilder")
      .field("name", &self.name)
      .field("parents", &self.parents)
      .field("config", &self.config)
      .field("kind", &self.kind)
      .finish_non_exhaustive()
  }
}

type BindingKey = (TypeKey, String);

/// A named registry of bindings keyed by abstract type and category.
///
/// Containers are single-threaded. A container is registered in exactly one
/// [`Context`], which it uses to reach the containers it inherits from.
pub struct Container {
  name: String,
  kind: TypeKey,
  config: ContainerConfig,
  context: Weak<Context>,
  hooks: Box<dyn ContainerHooks>,
  bindings: RefCell<HashMap<BindingKey, Rc<Binding>>>,
  order: RefCell<Vec<BindingKey>>,
  override_binding: RefCell<Option<Rc<Binding>>>,
  disposed: Cell<bool>,
}

impl Container {
  /// Builds a container with default configuration and no hooks.
  pub fn new(context: &Rc<Context>, name: impl Into<String>) -> Result<Rc<Self>> {
    ContainerBuilder::new(name).build(context)
  }

  pub fn builder(name: impl Into<String>) -> ContainerBuilder {
    ContainerBuilder::new(name)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// The hooks type the container was built with.
  pub fn kind(&self) -> TypeKey {
    self.kind
  }

  pub fn config(&self) -> &ContainerConfig {
    &self.config
  }

  /// The registry the container belongs to, if it is still alive.
  pub fn context(&self) -> Option<Rc<Context>> {
    self.context.upgrade()
  }

  pub fn is_disposed(&self) -> bool {
    self.disposed.get()
  }

  // --- BINDING ---

  /// Binds `F` to the concrete type `T` in the default category.
  ///
  /// The returned binding is transient until configured otherwise:
  ///
  /// ```
  /// use sfioc::{Container, Context, TypeDescriptor, Injectable};
  /// use std::rc::Rc;
  ///
  /// #[derive(Default)]
  /// struct Config;
  /// impl Injectable for Config {
  ///   fn descriptor() -> TypeDescriptor<Self> {
  ///     TypeDescriptor::defaulted()
  ///   }
  /// }
  ///
  /// let context = Context::new();
  /// let container = Container::new(&context, "app").unwrap();
  /// container.bind::<Config, Config>().unwrap().as_singleton();
  ///
  /// let first = container.resolve::<Config>().unwrap();
  /// let second = container.resolve::<Config>().unwrap();
  /// assert!(Rc::ptr_eq(&first, &second));
  /// ```
  pub fn bind<F, T>(&self) -> Result<Rc<Binding>>
  where
    F: ?Sized + Any,
    T: Injectable,
  {
    self.bind_with_category::<F, T>("")
  }

  pub fn bind_with_category<F, T>(&self, category: &str) -> Result<Rc<Binding>>
  where
    F: ?Sized + Any,
    T: Injectable,
  {
    self.add_binding(category, Binding::new::<F, T>()?)
  }

  /// Binds `F` to a supplied instance of `T`.
  pub fn bind_instance<F, T>(&self, instance: Rc<T>) -> Result<Rc<Binding>>
  where
    F: ?Sized + Any,
    T: Injectable,
  {
    self.bind_instance_with_category::<F, T>("", instance)
  }

  pub fn bind_instance_with_category<F, T>(&self, category: &str, instance: Rc<T>) -> Result<Rc<Binding>>
  where
    F: ?Sized + Any,
    T: Injectable,
  {
    self.add_binding(category, Binding::with_instance::<F, T>(instance)?)
  }

  /// Binds `F` to a value that is already shared as `Rc<F>`.
  pub fn bind_shared<F: ?Sized + Any>(&self, instance: Rc<F>) -> Result<Rc<Binding>> {
    self.bind_shared_with_category("", instance)
  }

  pub fn bind_shared_with_category<F: ?Sized + Any>(
    &self,
    category: &str,
    instance: Rc<F>,
  ) -> Result<Rc<Binding>> {
    self.add_binding(category, Binding::shared(instance))
  }

  pub fn bind_with_strategy<F, T, S>(&self, category: &str, strategy: S) -> Result<Rc<Binding>>
  where
    F: ?Sized + Any,
    T: Injectable,
    S: ActivationStrategy,
  {
    self.add_binding(category, Binding::with_strategy::<F, T, S>(strategy)?)
  }

  /// Registers a prepared binding under its `from` type and `category`.
  ///
  /// Fails with `DuplicateBinding` if the pair is already bound here.
  pub fn add_binding(&self, category: &str, binding: Binding) -> Result<Rc<Binding>> {
    self.ensure_live()?;
    let key = (binding.from_type(), category.to_owned());
    let mut bindings = self.bindings.borrow_mut();
    if bindings.contains_key(&key) {
      return Err(Error::DuplicateBinding {
        type_name: key.0.name(),
        category: key.1,
        container: self.name.clone(),
      });
    }

    debug!(
      container = %self.name,
      from = binding.from_type().name(),
      to = binding.to_type().name(),
      category,
      "bound type"
    );
    let binding = Rc::new(binding);
    bindings.insert(key.clone(), Rc::clone(&binding));
    self.order.borrow_mut().push(key);
    Ok(binding)
  }

  /// Adds an inheritance edge to the container registered as `parent`.
  pub fn inherit_from(&self, parent: &str) -> Result<()> {
    self.ensure_live()?;
    let context = self.live_context()?;
    context.add_inheritance(&self.name, parent);
    Ok(())
  }

  /// Installs a binding that the next lookup of a resolution returns instead
  /// of the registered one, even when nothing is registered. The slot is
  /// cleared by that lookup.
  pub fn override_next_lookup(&self, binding: Binding) {
    *self.override_binding.borrow_mut() = Some(Rc::new(binding));
  }

  // --- LOOKUP ---

  /// Finds the binding for `target` and `category` in this container or,
  /// failing that, in the containers it inherits from.
  pub fn find_binding(&self, target: TypeKey, category: &str) -> Result<Rc<Binding>> {
    let mut searched = HashSet::new();
    self.find_binding_tracked(target, category, &mut searched)
  }

  pub(crate) fn find_binding_tracked(
    &self,
    target: TypeKey,
    category: &str,
    searched: &mut HashSet<String>,
  ) -> Result<Rc<Binding>> {
    self.ensure_live()?;
    searched.insert(self.name.clone());

    let local = self
      .bindings
      .borrow()
      .get(&(target, category.to_owned()))
      .cloned();
    if let Some(binding) = local {
      return Ok(binding);
    }

    self
      .context
      .upgrade()
      .and_then(|context| context.find_inherited(&self.name, target, category, searched))
      .ok_or_else(|| Error::BindingNotFound {
        type_name: target.name(),
        category: category.to_owned(),
        container: self.name.clone(),
      })
  }

  /// Every `(category, binding)` pair registered here, in registration order.
  pub fn get_bindings(&self) -> Vec<(String, Rc<Binding>)> {
    let bindings = self.bindings.borrow();
    self
      .order
      .borrow()
      .iter()
      .filter_map(|key| bindings.get(key).map(|binding| (key.1.clone(), Rc::clone(binding))))
      .collect()
  }

  pub(crate) fn lookup(&self, site: &ResolveSite<'_>) -> Result<Rc<Binding>> {
    self.hooks.pre_resolve(self, site);
    let overridden = self.override_binding.borrow_mut().take();
    match overridden {
      Some(binding) => Ok(binding),
      None => self.find_binding(site.target, site.category),
    }
  }

  // --- RESOLUTION ---

  /// Resolves `T` from the default category.
  pub fn resolve<T: ?Sized + Any>(&self) -> Result<Rc<T>> {
    self.resolve_with_category::<T>("")
  }

  /// Resolves `T` and, transitively, everything it depends on.
  pub fn resolve_with_category<T: ?Sized + Any>(&self, category: &str) -> Result<Rc<T>> {
    self.ensure_live()?;
    let target = TypeKey::of::<T>();
    let resolved = Resolver::new(self).resolve_root(target, category)?;
    resolved
      .downcast::<Rc<T>>()
      .map(|value| *value)
      .map_err(|_| Error::ResolutionFailed {
        type_name: target.name(),
        reason: "the binding produced a value of another type".to_owned(),
      })
  }

  // --- TEARDOWN ---

  /// Removes the container from its context and disposes every binding it
  /// owns, in registration order. Later calls are no-ops.
  pub fn dispose(&self) {
    if self.disposed.replace(true) {
      return;
    }
    if let Some(context) = self.context.upgrade() {
      context.remove_container(&self.name);
    }
    self.hooks.on_dispose(self);

    let order = self.order.take();
    let mut registered = self.bindings.take();
    let bindings: Vec<Rc<Binding>> = order.iter().filter_map(|key| registered.remove(key)).collect();
    self.override_binding.borrow_mut().take();
    for binding in &bindings {
      binding.dispose();
    }
    debug!(container = %self.name, bindings = bindings.len(), "disposed container");
  }

  // --- PRIVATE HELPERS ---

  fn ensure_live(&self) -> Result<()> {
    if self.disposed.get() {
      return Err(Error::ContainerDisposed(self.name.clone()));
    }
    Ok(())
  }

  fn live_context(&self) -> Result<Rc<Context>> {
    self
      .context
      .upgrade()
      .ok_or_else(|| Error::ContainerNotFound(self.name.clone()))
  }
}

impl fmt::Debug for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Container")
      .field("name", &self.name)
      .field("kind", &self.kind)
      .field("bindings", &self.order.borrow().len())
      .field("disposed", &self.disposed.get())
      .finish_non_exhaustive()
  }
}
