use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use super::TemplateError;
use super::blocks::{BlockId, BlockTable, Segment};

fn begin_marker() -> &'static Regex {
    static BEGIN_MARKER: OnceLock<Regex> = OnceLock::new();
    BEGIN_MARKER.get_or_init(|| {
        Regex::new(r"<!-- block: ([A-Za-z0-9_-]+) -->").expect("Invalid block marker regex")
    })
}

fn end_marker(name: &str) -> String {
    format!("<!-- /block: {name} -->")
}

/// A forward-only position in one block's source text.
struct Cursor<'a> {
    /// The text being scanned.
    s: &'a str,
    /// Current index into `s`.
    i: usize,
    /// Start of text not yet emitted as a segment.
    pending: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            s,
            i: 0,
            pending: 0,
        }
    }

    /// Text between the last emitted position and `end`.
    fn take_text(&mut self, end: usize) -> Option<Segment> {
        let text = &self.s[self.pending..end];
        self.pending = end;
        (!text.is_empty()).then(|| Segment::Text(text.to_string()))
    }

    /// Move past `end`, discarding everything before it.
    fn skip_to(&mut self, end: usize) {
        self.i = end;
        self.pending = end;
    }
}

/// Split `source` into a tree of blocks rooted at [`BlockId::ROOT`].
///
/// Each `<!-- block: NAME -->...<!-- /block: NAME -->` region becomes its own
/// entry and is replaced in its parent by a slot. The closing marker is the first
/// one with the same name after the opener.
pub(crate) fn preprocess(source: &str) -> Result<BlockTable, TemplateError> {
    let mut table = BlockTable::new();
    scan(&mut table, BlockId::ROOT, source)?;
    Ok(table)
}

fn scan(table: &mut BlockTable, block: BlockId, content: &str) -> Result<(), TemplateError> {
    let mut cur = Cursor::new(content);
    let mut segments = Vec::new();

    while let Some(caps) = begin_marker().captures_at(cur.s, cur.i) {
        let (Some(open), Some(name)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let name = name.as_str();

        let close = end_marker(name);
        let inner_start = open.end();
        let inner_end = match cur.s[inner_start..].find(&close) {
            Some(offset) => inner_start + offset,
            None => {
                return Err(TemplateError::UnmatchedBlock {
                    name: name.to_string(),
                });
            }
        };

        segments.extend(cur.take_text(open.start()));
        let child = table.add_child(block, name)?;
        debug!("found block {}", table.node(child).path);
        segments.push(Segment::Slot(child));

        scan(table, child, &cur.s[inner_start..inner_end])?;
        cur.skip_to(inner_end + close.len());
    }

    segments.extend(cur.take_text(cur.s.len()));
    table.set_segments(block, segments);
    Ok(())
}
