//! Template-syntax escaping for assigned values.
//!
//! Values handed to [`Environment::assign_global`](crate::Environment::assign_global)
//! and [`Template::assign`](crate::Template::assign) are escaped before they enter a
//! document so they can never be read back as a block marker, handler marker,
//! variable token or placeholder. The escapes are reversed exactly once, when the
//! finished document leaves [`Template::out`](crate::Template::out).
//!
//! This is not HTML sanitization. Untrusted markup must be cleaned by the caller.

use crate::template::ROOT;

/// Escaped form of the root sentinel.
const ESCAPED_ROOT: &str = "[\\_GTPL_ROOT_]";
/// Opener shared by block and handler markers.
const MARKER_OPEN: &str = "<!--";
const ESCAPED_MARKER_OPEN: &str = "<!--\\";
const VARIABLE_OPEN: &str = "{";
const ESCAPED_VARIABLE_OPEN: &str = "{\\";

/// Escape reserved token shapes in `content`.
pub fn sanitize(content: &str) -> String {
    content
        .replace(ROOT, ESCAPED_ROOT)
        .replace(MARKER_OPEN, ESCAPED_MARKER_OPEN)
        .replace(VARIABLE_OPEN, ESCAPED_VARIABLE_OPEN)
}

/// Reverse [`sanitize`].
///
/// Round-trips any text that did not already contain one of the escape sequences.
pub fn desanitize(content: &str) -> String {
    content
        .replace(ESCAPED_ROOT, ROOT)
        .replace(ESCAPED_MARKER_OPEN, MARKER_OPEN)
        .replace(ESCAPED_VARIABLE_OPEN, VARIABLE_OPEN)
}
