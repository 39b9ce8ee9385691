use std::collections::HashMap;
use std::sync::OnceLock;

use log::{debug, trace};
use regex::Regex;

use crate::environment::Environment;

use super::blocks::Segment;

fn handler_marker() -> &'static Regex {
    static HANDLER_MARKER: OnceLock<Regex> = OnceLock::new();
    HANDLER_MARKER.get_or_init(|| {
        Regex::new(r"<!-- handler: ([A-Za-z0-9_-]+) -->").expect("Invalid handler marker regex")
    })
}

/// Variables first, then handlers, over the text of a block. Slots pass
/// through untouched.
pub(crate) fn substitute(
    mut segments: Vec<Segment>,
    env: &Environment,
    locals: &mut HashMap<String, String>,
) -> Vec<Segment> {
    assign_variables(&mut segments, env, locals);
    for text in texts_mut(&mut segments) {
        *text = run_handlers(std::mem::take(text), env);
    }
    segments
}

/// Replace `{name}` tokens.
///
/// Globals replace every occurrence. Each pending local replaces the first
/// occurrence, in segment order, and is dropped from `locals` whether or not it
/// matched.
pub(crate) fn assign_variables(
    segments: &mut [Segment],
    env: &Environment,
    locals: &mut HashMap<String, String>,
) {
    for (name, value) in env.globals() {
        let token = format!("{{{name}}}");
        for text in texts_mut(segments) {
            if text.contains(&token) {
                *text = text.replace(&token, value);
            }
        }
    }

    for (name, value) in locals.drain() {
        trace!("consuming local {name}");
        let token = format!("{{{name}}}");
        if let Some(text) = texts_mut(segments).find(|text| text.contains(&token)) {
            *text = text.replacen(&token, &value, 1);
        }
    }
}

fn texts_mut(segments: &mut [Segment]) -> impl Iterator<Item = &mut String> {
    segments.iter_mut().filter_map(|segment| match segment {
        Segment::Text(text) => Some(text),
        Segment::Slot(_) => None,
    })
}

/// Expand `<!-- handler: NAME -->` markers until none remain.
///
/// Handler output is scanned again, so a handler may emit further markers. A
/// handler that emits its own marker never terminates.
pub(crate) fn run_handlers(mut content: String, env: &Environment) -> String {
    while let Some((marker, name)) = handler_marker()
        .captures(&content)
        .map(|caps| (caps[0].to_string(), caps[1].to_string()))
    {
        let output = env.call_handler(&name).unwrap_or_else(|| {
            debug!("no handler registered as {name}; rendering it empty");
            String::new()
        });
        content = content.replace(&marker, &output);
    }
    content
}
