//! Rendering tests for templates.
//!
//! Fixture templates (.html) and their rendered snapshots (.snap) are co-located
//! in `fixtures/`.


use std::str::FromStr;

use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::environment::Environment;
use crate::template::{Template, TemplateError};

// Fixture-based snapshot tests

#[test]
fn fixture_table() {
    let mut env = Environment::new();
    env.assign_global("title", "Stock {live}");

    let mut tpl = open_fixture("table");
    for (name, qty) in [("apples", "3"), ("pears", "5")] {
        tpl.assign("name", name);
        tpl.assign("qty", qty);
        tpl.parse(&env, "rows.row");
    }
    tpl.parse(&env, "rows");

    assert_fixture("table", &tpl.out(&env));
}

#[test]
fn fixture_page() {
    let mut env = Environment::new();
    env.add_handler("header", || "<header>Site</header>".to_string());
    env.add_handler("footer", || "<footer>&copy;</footer>".to_string());
    env.assign_global("a_global_var", "Global Variable Here");

    let mut tpl = open_fixture("page");
    tpl.parse(&env, "top_body");
    tpl.assign("foo", "Something about foobar!");
    tpl.parse(&env, "content_body.some_row");
    tpl.assign("foo", "Putting something else here...");
    tpl.parse(&env, "content_body.some_row");
    tpl.parse(&env, "content_body");

    assert_fixture("page", &tpl.out(&env));
}

#[test]
fn fixture_menu() {
    let env = Environment::new();

    let mut tpl = open_fixture("menu");
    tpl.assign("href", "/");
    tpl.assign("label", "Home");
    tpl.parse(&env, "item");

    tpl.parse(&env, "item.badge");
    tpl.assign("href", "/news");
    tpl.assign("label", "News {today}");
    tpl.parse(&env, "item");

    assert_fixture("menu", &tpl.out(&env));
}

fn fixtures_dir() -> String {
    format!("{}/src/template/tests/fixtures", env!("CARGO_MANIFEST_DIR"))
}

fn open_fixture(name: &str) -> Template {
    let source = std::fs::read(format!("{}/{name}.html", fixtures_dir())).unwrap();
    Template::open(&source).unwrap()
}

fn assert_fixture(name: &str, output: &str) {
    invariants::check(output);

    let fixtures_dir = fixtures_dir();
    insta::with_settings!({
        snapshot_path => fixtures_dir.as_str(),
        prepend_module_to_snapshot => false,
    }, {
        insta::assert_snapshot!(name, output);
    });
}

// Resolution tests

#[test]
fn repeated_rows_concatenate_in_call_order() {
    let env = Environment::new();
    let mut tpl = Template::from_str(
        "<!-- block: rows --><!-- block: row -->{v}<!-- /block: row --><!-- /block: rows -->",
    )
    .unwrap();

    tpl.assign("v", "a");
    tpl.parse(&env, "rows.row");
    tpl.assign("v", "b");
    tpl.parse(&env, "rows.row");
    tpl.parse(&env, "rows");

    assert_eq!(tpl.out(&env), "ab");
}

#[test]
fn siblings_splice_at_their_own_placeholder() {
    let env = Environment::new();
    let mut tpl = Template::from_str(
        "<!-- block: a -->A<!-- /block: a -->|<!-- block: b -->B<!-- /block: b -->",
    )
    .unwrap();

    tpl.parse(&env, "b");
    tpl.parse(&env, "a");

    assert_eq!(tpl.out(&env), "A|B");
}

#[test]
fn unresolved_blocks_vanish() {
    let env = Environment::new();
    let mut tpl =
        Template::from_str("before<!-- block: x -->hidden<!-- /block: x -->after").unwrap();
    assert_eq!(tpl.out(&env), "beforeafter");
}

#[test]
fn unresolved_nested_block_vanishes_from_resolved_parent() {
    let env = Environment::new();
    let mut tpl = Template::from_str(
        "<!-- block: p -->[<!-- block: c -->c<!-- /block: c -->]<!-- /block: p -->",
    )
    .unwrap();
    tpl.parse(&env, "p");
    assert_eq!(tpl.out(&env), "[]");
}

#[test]
fn text_after_an_unresolved_block_is_kept_even_if_it_looks_like_a_path() {
    // Flattened, the root would read `[_GTPL_ROOT_].a.x|end`, which names block a.x.
    let env = Environment::new();
    let source = "<!-- block: a -->[<!-- block: x -->x<!-- /block: x -->]<!-- /block: a -->.x|end";
    let mut tpl = Template::from_str(source).unwrap();
    assert!(tpl.has_block("a.x"));
    assert_eq!(tpl.out(&env), ".x|end");

    let mut tpl = Template::from_str(source).unwrap();
    tpl.parse(&env, "a");
    assert_eq!(tpl.out(&env), "[].x|end");
}

#[test]
fn child_resolved_before_parent_appears_in_parent() {
    let env = Environment::new();
    let mut tpl = Template::from_str(
        "<!-- block: p -->[<!-- block: c -->c<!-- /block: c -->]<!-- /block: p -->",
    )
    .unwrap();
    tpl.parse(&env, "p.c");
    tpl.parse(&env, "p.c");
    tpl.parse(&env, "p");
    assert_eq!(tpl.out(&env), "[cc]");
}

#[test]
fn parent_parsed_twice_repeats_accumulated_children() {
    // Block content is never reset, so a second parse of the parent carries the
    // first child unit again.
    let env = Environment::new();
    let mut tpl = Template::from_str(
        "<!-- block: t --><!-- block: cell -->{c}<!-- /block: cell -->;<!-- /block: t -->",
    )
    .unwrap();
    tpl.assign("c", "1");
    tpl.parse(&env, "t.cell");
    tpl.parse(&env, "t");
    tpl.assign("c", "2");
    tpl.parse(&env, "t.cell");
    tpl.parse(&env, "t");
    assert_eq!(tpl.out(&env), "1;12;");
}

#[test]
fn global_fills_every_occurrence_in_every_pass() {
    let mut env = Environment::new();
    env.assign_global("g", "G");
    let mut tpl =
        Template::from_str("{g}<!-- block: b -->{g}{g}<!-- /block: b -->{g}").unwrap();
    tpl.parse(&env, "b");
    tpl.parse(&env, "b");
    assert_eq!(tpl.out(&env), "GGGGGG");
}

#[test]
fn local_fills_one_occurrence_until_reassigned() {
    let env = Environment::new();
    let mut tpl = Template::from_str("<!-- block: b -->{v}-{v}<!-- /block: b -->").unwrap();

    tpl.assign("v", "x");
    tpl.parse(&env, "b");
    assert!(tpl.pending_assignments().is_empty());

    assert_eq!(tpl.out(&env), "x-{v}");
}

#[test]
fn locals_reach_the_root_at_output() {
    let env = Environment::new();
    let mut tpl = Template::from_str("<title>{title}</title>").unwrap();
    tpl.assign("title", "Home");
    assert_eq!(tpl.out(&env), "<title>Home</title>");
}

#[test]
fn assigned_values_cannot_inject_template_syntax() {
    let mut env = Environment::new();
    env.add_handler("secret", || "leaked".to_string());
    let mut tpl = Template::from_str("<!-- block: b -->{v}<!-- /block: b -->").unwrap();

    tpl.assign("v", "<!-- handler: secret --> {other} [_GTPL_ROOT_].b");
    tpl.assign("other", "nope");
    tpl.parse(&env, "b");

    assert_eq!(
        tpl.out(&env),
        "<!-- handler: secret --> {other} [_GTPL_ROOT_].b"
    );
}

#[test]
fn unknown_handler_renders_as_empty_text() {
    let env = Environment::new();
    let mut tpl = Template::from_str("a<!-- handler: missing -->b").unwrap();
    assert_eq!(tpl.out(&env), "ab");
}

#[test]
fn handler_can_render_another_template() {
    let mut env = Environment::new();
    env.add_handler("header", || {
        let shared = Environment::new();
        let Ok(mut layout) = Template::from_str(
            "<!-- block: header --><h1>Hi</h1><!-- /block: header --><!-- block: footer -->bye<!-- /block: footer -->",
        ) else {
            return String::new();
        };
        layout.parse(&shared, "header");
        layout.out(&shared)
    });

    let mut tpl = Template::from_str("<!-- handler: header -->\n<p>body</p>").unwrap();
    assert_eq!(tpl.out(&env), "<h1>Hi</h1>\n<p>body</p>");
}

#[test]
fn handlers_inside_blocks_run_at_parse_time() {
    let mut env = Environment::new();
    env.add_handler("n", || "7".to_string());
    let mut tpl = Template::from_str("<!-- block: b -->n=<!-- handler: n --><!-- /block: b -->").unwrap();
    tpl.parse(&env, "b");
    assert_eq!(tpl.out(&env), "n=7");
}

#[test]
fn parsing_a_missing_block_is_a_no_op() {
    let env = Environment::new();
    let mut tpl = Template::from_str("<!-- block: b -->{v}<!-- /block: b -->").unwrap();

    tpl.assign("v", "x");
    tpl.parse(&env, "nope");
    tpl.parse(&env, "b.nope");
    tpl.parse(&env, "");

    // The miss still consumed the assignment.
    assert!(tpl.pending_assignments().is_empty());
    tpl.parse(&env, "b");
    assert_eq!(tpl.out(&env), "{v}");
}

#[test]
fn output_is_stable_when_called_twice() {
    let env = Environment::new();
    let mut tpl = Template::from_str("a\n\n<!-- block: b -->x<!-- /block: b -->\n  \nc").unwrap();
    tpl.parse(&env, "b");
    let first = tpl.out(&env);
    assert_eq!(first, "a\nx\nc");
    assert_eq!(tpl.out(&env), first);
}

#[rstest]
#[case("a\n\n\nb", "a\nb")]
#[case("a\n   \n\t\nb", "a\nb")]
#[case("\n\na", "a")]
#[case("a\n  \n", "a")]
#[case("a\nb\n", "a\nb\n")]
#[case("a\r\n\r\nb", "a\r\nb")]
fn blank_lines_are_collapsed(#[case] source: &str, #[case] expected: &str) {
    let env = Environment::new();
    let mut tpl = Template::from_str(source).unwrap();
    assert_eq!(tpl.out(&env), expected);
}

// Open / inspection tests

#[test]
fn block_paths_list_discovery_order() {
    let tpl = Template::from_str(
        "<!-- block: a --><!-- block: x --><!-- /block: x --><!-- /block: a --><!-- block: b --><!-- /block: b -->",
    )
    .unwrap();
    let paths: Vec<&str> = tpl.block_paths().collect();
    assert_eq!(
        paths,
        vec![
            "[_GTPL_ROOT_]",
            "[_GTPL_ROOT_].a",
            "[_GTPL_ROOT_].a.x",
            "[_GTPL_ROOT_].b"
        ]
    );
    assert!(tpl.has_block("a.x"));
    assert!(!tpl.has_block("x"));
}

#[test]
fn pending_assignments_are_sorted() {
    let mut tpl = Template::from_str("").unwrap();
    tpl.assign("b", "1");
    tpl.assign("a", "2");
    assert_eq!(tpl.pending_assignments(), vec!["a", "b"]);
}

#[test]
fn unmatched_block_fails_open() {
    let err = Template::open(b"<!-- block: a -->x").unwrap_err();
    assert!(matches!(err, TemplateError::UnmatchedBlock { ref name } if name == "a"));
    assert_eq!(err.to_string(), "Failed to find a match for block: a");
}

#[test]
fn duplicate_sibling_blocks_fail_open() {
    let err = Template::open(
        b"<!-- block: r -->1<!-- /block: r --><!-- block: r -->2<!-- /block: r -->",
    )
    .unwrap_err();
    assert!(matches!(err, TemplateError::DuplicateBlock { .. }));
}

#[test]
fn invalid_utf8_fails_open() {
    let err = Template::open(&[0x66, 0xff, 0x6f]).unwrap_err();
    assert!(matches!(err, TemplateError::InvalidUtf8(_)));
}
