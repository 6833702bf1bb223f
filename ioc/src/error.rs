use thiserror::Error;

/// The error type for every fallible operation of the container.
///
/// Variants fall into three groups:
///
/// - configuration errors, raised eagerly while bindings, containers and
///   descriptors are set up;
/// - lookup errors, raised when a binding or container cannot be found;
/// - structural errors, raised while a dependency graph is being resolved.
///
/// Failures deep inside a dependency graph are wrapped in
/// [`Error::Dependency`] once per frame. [`Error::root_cause`] returns the
/// innermost error.
#[derive(Debug, Error)]
pub enum Error {
  #[error("type {to} does not satisfy the contract of {from}")]
  BindingTypeMismatch {
    from: &'static str,
    to: &'static str,
  },

  #[error("type {type_name} with category '{category}' is already bound in container '{container}'")]
  DuplicateBinding {
    type_name: &'static str,
    category: String,
    container: String,
  },

  #[error("a container named '{0}' is already registered")]
  DuplicateContainerIdentity(String),

  #[error("type {0} declares more than one designated constructor")]
  DuplicateDefaultConstructor(&'static str),

  #[error("type {type_name} with category '{category}' is not bound in container '{container}'")]
  BindingNotFound {
    type_name: &'static str,
    category: String,
    container: String,
  },

  #[error("no container registered under '{0}'")]
  ContainerNotFound(String),

  #[error("container '{0}' has been disposed")]
  ContainerDisposed(String),

  #[error("circular dependency detected in {owner} on {target}")]
  CircularDependency {
    owner: &'static str,
    target: &'static str,
  },

  #[error("could not resolve {type_name}: {reason}")]
  ResolutionFailed {
    type_name: &'static str,
    reason: String,
  },

  #[error("argument {position} of the {owner} constructor is not a {expected}")]
  ArgumentMismatch {
    owner: &'static str,
    position: usize,
    expected: &'static str,
  },

  #[error("could not resolve {target} for '{member}' of {owner}")]
  Dependency {
    target: &'static str,
    owner: &'static str,
    member: String,
    #[source]
    source: Box<Error>,
  },
}

impl Error {
  /// Returns the innermost error, skipping every [`Error::Dependency`] wrapper.
  pub fn root_cause(&self) -> &Error {
    let mut current = self;
    while let Error::Dependency { source, .. } = current {
      current = source;
    }
    current
  }

  /// Structural defects in bindings, containers or descriptors.
  pub fn is_configuration(&self) -> bool {
    matches!(
      self.root_cause(),
      Error::BindingTypeMismatch { .. }
        | Error::DuplicateBinding { .. }
        | Error::DuplicateContainerIdentity(_)
        | Error::DuplicateDefaultConstructor(_)
    )
  }

  /// A binding or container that could not be found.
  pub fn is_lookup(&self) -> bool {
    matches!(
      self.root_cause(),
      Error::BindingNotFound { .. } | Error::ContainerNotFound(_) | Error::ContainerDisposed(_)
    )
  }

  /// A dependency graph that cannot be built.
  pub fn is_structural(&self) -> bool {
    matches!(
      self.root_cause(),
      Error::CircularDependency { .. }
        | Error::ResolutionFailed { .. }
        | Error::ArgumentMismatch { .. }
    )
  }
}

/// A specialized `Result` type for container operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
