use std::collections::HashMap;
use std::fmt;

use crate::sanitize::sanitize;

/// A named, zero-argument callback whose output replaces `<!-- handler: NAME -->`.
pub type Handler = Box<dyn Fn() -> String + Send + Sync>;

/// Shared rendering context: global assignments and the handler registry.
///
/// One environment can serve any number of templates. Templates only ever borrow
/// it, so a single `Environment` (or an `Arc<Environment>`) may be read from many
/// threads at once while mutation requires exclusive access.
#[derive(Default)]
pub struct Environment {
    globals: HashMap<String, String>,
    handlers: HashMap<String, Handler>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `{name}` to `value` in every template rendered with this environment.
    ///
    /// Globals are never consumed: every occurrence is replaced on every pass.
    pub fn assign_global(&mut self, name: impl Into<String>, value: &str) {
        self.globals.insert(name.into(), sanitize(value));
    }

    /// Register a handler, replacing any previous one with the same name.
    pub fn add_handler<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// The sanitized value bound to a global, if any.
    pub fn global(&self, name: &str) -> Option<&str> {
        self.globals.get(name).map(String::as_str)
    }

    pub(crate) fn globals(&self) -> impl Iterator<Item = (&str, &str)> {
        self.globals.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Run the handler registered as `name`, or `None` when there is none.
    pub(crate) fn call_handler(&self, name: &str) -> Option<String> {
        self.handlers.get(name).map(|handler| handler())
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut handlers: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        handlers.sort_unstable();
        f.debug_struct("Environment")
            .field("globals", &self.globals)
            .field("handlers", &handlers)
            .finish()
    }
}
