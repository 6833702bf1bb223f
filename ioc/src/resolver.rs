//! The recursive resolver behind `Container::resolve`.

use crate::binding::{Activation, Binding, Lifecycle};
use crate::container::{Container, ResolveSite};
use crate::core::{TypeKey, VisitGuard, VisitLog};
use crate::dependency::{Arguments, Dependency, InjectionPoint};
use crate::error::{Error, Result};
use std::any::Any;
use std::rc::Rc;
use tracing::trace;

/// State for one root resolution call.
///
/// Bindings are looked up through the container that started the call, so
/// the dependencies of a binding inherited from a parent container are
/// resolved against the child first.
pub(crate) struct Resolver<'c> {
  container: &'c Container,
  visits: VisitLog,
}

impl<'c> Resolver<'c> {
  pub(crate) fn new(container: &'c Container) -> Self {
    Self {
      container,
      visits: VisitLog::default(),
    }
  }

  /// Resolves `target` and returns it boxed as an `Rc<target>`.
  pub(crate) fn resolve_root(&self, target: TypeKey, category: &str) -> Result<Box<dyn Any>> {
    self.resolve(&ResolveSite {
      target,
      owner: None,
      category,
      dependency: None,
      onto: None,
    })
  }

  fn resolve(&self, site: &ResolveSite<'_>) -> Result<Box<dyn Any>> {
    let binding = self.container.lookup(site)?;
    let instance = self.resolve_binding(&binding, site)?;
    binding.upcast(&instance, site.target)
  }

  fn resolve_binding(&self, binding: &Rc<Binding>, site: &ResolveSite<'_>) -> Result<Rc<dyn Any>> {
    // Stored instances are complete and cannot close a new cycle.
    if let Some(instance) = binding.cached_instance() {
      trace!(target_type = site.target.name(), "using stored instance");
      return Ok(instance);
    }

    let _visit = match site.owner {
      Some(owner) => Some(VisitGuard::enter(
        &self.visits,
        owner,
        binding,
        site.dependency.is_some_and(Dependency::is_argument),
        self.container.config().cycle_policy,
      )?),
      None => None,
    };

    let built = binding.to_type();
    let points = binding.dependencies()?;

    let mut args = Arguments::for_owner(built);
    if let Some(constructor) = points.first().and_then(InjectionPoint::as_constructor) {
      for argument in constructor.arguments() {
        let value = self
          .resolve(&ResolveSite {
            target: argument.target(),
            owner: Some(built),
            category: argument.category(),
            dependency: Some(argument),
            onto: None,
          })
          .map_err(|source| wrap(source, argument, built))?;
        args.push_boxed(value);
      }
    }

    let activation = Activation::new(site.dependency, site.onto);
    let (instance, fresh) = binding
      .activate(args, &activation)?
      .ok_or_else(|| binding.produced_nothing())?;

    if fresh {
      if let Err(error) = self.inject_members(&points, built, &instance) {
        if binding.lifecycle() == Lifecycle::Singleton
          && self.container.config().reset_singleton_on_failure
        {
          binding.evict();
        }
        return Err(error);
      }
    }
    Ok(instance)
  }

  fn inject_members(
    &self,
    points: &[InjectionPoint],
    built: TypeKey,
    instance: &Rc<dyn Any>,
  ) -> Result<()> {
    let onto: &dyn Any = &**instance;
    for member in points.iter().filter_map(InjectionPoint::as_member) {
      let value = self
        .resolve(&ResolveSite {
          target: member.target(),
          owner: Some(built),
          category: member.category(),
          dependency: Some(member),
          onto: Some(onto),
        })
        .map_err(|source| wrap(source, member, built))?;
      member
        .assign(onto, value)
        .map_err(|source| wrap(source, member, built))?;
      trace!(
        owner = built.name(),
        member = member.member_name(),
        "injected dependency"
      );
    }
    Ok(())
  }
}

fn wrap(source: Error, dependency: &Dependency, owner: TypeKey) -> Error {
  Error::Dependency {
    target: dependency.target().name(),
    owner: owner.name(),
    member: dependency.member_name().to_owned(),
    source: Box::new(source),
  }
}
