//! The default context of the current thread.

use crate::context::Context;
use std::rc::Rc;

thread_local! {
  // Created on first access, one per thread.
  static GLOBAL_CONTEXT: Rc<Context> = Context::new();
}

/// Returns the default context of the current thread.
///
/// Applications that do not want to pass a `Context` around can register
/// every container here. `Context::dispose` on it tears them all down.
///
/// # Examples
///
/// ```
/// use sfioc::{global, Container};
///
/// let container = Container::new(&global(), "services").unwrap();
/// assert!(global().contains("services"));
///
/// container.dispose();
/// assert!(!global().contains("services"));
/// ```
pub fn global() -> Rc<Context> {
  GLOBAL_CONTEXT.with(Rc::clone)
}
