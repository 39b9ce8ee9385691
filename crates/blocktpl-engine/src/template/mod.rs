/*!
 * # Templates
 *
 * A template is a text document cut into named, nestable blocks:
 *
 * ```text
 * <table>
 * <!-- block: rows -->
 *   <!-- block: row --><tr><td>{name}</td></tr><!-- /block: row -->
 * <!-- /block: rows -->
 * </table>
 * ```
 *
 * Opening a template extracts every block into a table keyed by its qualified
 * path (`[_GTPL_ROOT_].rows.row`) and leaves a placeholder where it stood. The
 * caller then fills blocks innermost first:
 *
 * - [`Template::assign`] binds a local `{name}` for the next resolution only.
 * - [`Template::parse`] substitutes variables and handlers into a block and
 *   splices the result into its parent, just before the block's placeholder.
 *   The placeholder survives, so parsing the same block again appends another
 *   copy. That is how rows repeat.
 * - [`Template::out`] does a last substitution pass on the root, drops every
 *   placeholder that is still there and returns the finished text.
 *
 * Globals and handlers live in an [`Environment`] that is passed in explicitly.
 *
 * ```rust
 * use blocktpl_engine::{Environment, Template};
 *
 * let env = Environment::new();
 * let mut tpl = Template::open(
 *     b"<!-- block: rows --><!-- block: row -->{v}<!-- /block: row --><!-- /block: rows -->",
 * )
 * .unwrap();
 *
 * for v in ["a", "b"] {
 *     tpl.assign("v", v);
 *     tpl.parse(&env, "rows.row");
 * }
 * tpl.parse(&env, "rows");
 *
 * assert_eq!(tpl.out(&env), "ab");
 * ```
 */

mod blocks;
mod preprocess;
mod substitute;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::environment::Environment;
use crate::sanitize::{desanitize, sanitize};

use blocks::{BlockId, BlockTable, Segment, text_without_slots};
use preprocess::preprocess;
use substitute::substitute;

/// First segment of every qualified block path.
///
/// Never write this literally in a template.
pub const ROOT: &str = "[_GTPL_ROOT_]";

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to find a match for block: {name}")]
    UnmatchedBlock { name: String },
    #[error("Block defined twice at the same level: {path}")]
    DuplicateBlock { path: String },
    #[error("Template is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// An open template: its block table plus pending local assignments.
#[derive(Debug, Clone)]
pub struct Template {
    blocks: BlockTable,
    locals: HashMap<String, String>,
}

impl Template {
    /// Preprocess a template held in memory.
    ///
    /// A template that fails here is unusable; there is no partial result.
    pub fn open(bytes: &[u8]) -> Result<Self, TemplateError> {
        let text = std::str::from_utf8(bytes)?;
        Self::from_source(text)
    }

    fn from_source(source: &str) -> Result<Self, TemplateError> {
        let blocks = preprocess(source)?;
        debug!("opened template with {} block(s)", blocks.iter().count() - 1);
        Ok(Self {
            blocks,
            locals: HashMap::new(),
        })
    }

    /// Bind `{name}` for the next resolution.
    ///
    /// The binding fills one occurrence and is then forgotten, so repeated rows
    /// need a fresh `assign` before each [`parse`](Self::parse).
    pub fn assign(&mut self, name: impl Into<String>, value: &str) {
        self.locals.insert(name.into(), sanitize(value));
    }

    /// Resolve the block at `path` (relative to the root, e.g. `"rows.row"`) and
    /// splice it into its parent.
    ///
    /// Resolving a path that does not exist does nothing beyond consuming the
    /// pending local assignments.
    pub fn parse(&mut self, env: &Environment, path: &str) {
        let qualified = format!("{ROOT}.{path}");
        let Some(block) = self.blocks.lookup(&qualified) else {
            debug!("no block at {qualified}; nothing to resolve");
            self.locals.clear();
            return;
        };
        let Some(parent) = self.blocks.node(block).parent else {
            self.locals.clear();
            return;
        };

        let segments = self.blocks.node(block).segments.clone();
        let resolved = substitute(segments, env, &mut self.locals);
        if !self.blocks.splice(parent, block, resolved) {
            debug!("{qualified} has no placeholder left in its parent");
        }
    }

    /// Render the document.
    ///
    /// Meant to be called once, after all parsing. The rendered root replaces
    /// the root's content, so unresolved blocks can no longer be parsed into it.
    pub fn out(&mut self, env: &Environment) -> String {
        let segments = self.blocks.node(BlockId::ROOT).segments.clone();
        let resolved = substitute(segments, env, &mut self.locals);
        let content = collapse_blank_lines(&text_without_slots(&resolved));

        let rendered = desanitize(&content);
        self.blocks
            .set_segments(BlockId::ROOT, vec![Segment::Text(content)]);
        rendered
    }

    /// Qualified paths of all blocks, root first, in discovery order.
    pub fn block_paths(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().map(|node| node.path.as_str())
    }

    /// Whether `path` (relative to the root) names a block.
    pub fn has_block(&self, path: &str) -> bool {
        self.blocks.lookup(&format!("{ROOT}.{path}")).is_some()
    }

    /// Local names assigned but not yet consumed, sorted.
    pub fn pending_assignments(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.locals.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::from_source(source)
    }
}

/// Drop blank and whitespace-only lines, and trailing whitespace after the last
/// line break.
fn collapse_blank_lines(content: &str) -> String {
    static BLANK_LINES: OnceLock<Regex> = OnceLock::new();
    let blank_lines = BLANK_LINES.get_or_init(|| {
        Regex::new(r"(?m)^\s*$[\r\n]*|[\r\n]+\s+\z").expect("Invalid blank line regex")
    });
    blank_lines.replace_all(content, "").into_owned()
}
