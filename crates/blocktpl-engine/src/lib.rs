pub mod environment;
pub mod io;
pub mod sanitize;
pub mod template;

// Re-export key types for easier usage
pub use environment::{Environment, Handler};
pub use io::*;
pub use template::{ROOT, Template, TemplateError};
