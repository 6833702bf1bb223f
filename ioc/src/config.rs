//! Per-container configuration.

/// Decides when revisiting a binding during one resolution is a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePolicy {
  /// A binding revisited while it is still being built for the same owner is
  /// a cycle when the revisit is a constructor argument or the binding is
  /// transient. Member back-references to singletons are allowed.
  #[default]
  Permissive,
  /// Any revisit of a binding for the same owner during one root resolution
  /// is a cycle, including siblings that were already completed.
  Strict,
}

/// Settings applied to a single container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
  pub cycle_policy: CyclePolicy,
  /// Evict a freshly created singleton from its binding when injecting its
  /// members fails, so no half-built instance is handed out later.
  pub reset_singleton_on_failure: bool,
}

impl Default for ContainerConfig {
  fn default() -> Self {
    Self {
      cycle_policy: CyclePolicy::default(),
      reset_singleton_on_failure: true,
    }
  }
}

impl ContainerConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cycle_policy(mut self, policy: CyclePolicy) -> Self {
    self.cycle_policy = policy;
    self
  }

  pub fn reset_singleton_on_failure(mut self, reset: bool) -> Self {
    self.reset_singleton_on_failure = reset;
    self
  }
}
