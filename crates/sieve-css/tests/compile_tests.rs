//! Integration tests for structural selector matching.

use std::collections::HashSet;
use std::rc::Rc;

use sieve_css::compile::{Nth, PseudoRegistry};
use sieve_css::{CompileError, Context, MatchOptions, compile, parse};
use sieve_dom::{Adapter, DomTree, NodeId};

/// ```text
/// html
/// └── body
///     ├── div#main.box
///     │   ├── p#p1.a "one"
///     │   ├── p#p2 "two" <span#s1>
///     │   └── ul
///     │       ├── li#l1[lang=en-US]
///     │       ├── li#l2.b
///     │       └── li#l3
///     ├── div#empty <!-- only a comment -->
///     └── form
///         ├── input#i1[type=checkbox][checked]
///         ├── input#i2[type=text][disabled]
///         ├── input#i3
///         └── a#link[href=/x]
/// ```
fn fixture() -> DomTree {
    let mut tree = DomTree::new();
    let html = tree.create_element(NodeId::ROOT, "html", &[]);
    let body = tree.create_element(html, "body", &[]);
    let main = tree.create_element(body, "div", &[("id", "main"), ("class", "box")]);
    let p1 = tree.create_element(main, "p", &[("id", "p1"), ("class", "a")]);
    let _ = tree.create_text(p1, "one");
    let p2 = tree.create_element(main, "p", &[("id", "p2")]);
    let _ = tree.create_text(p2, "two");
    let _ = tree.create_element(p2, "span", &[("id", "s1")]);
    let ul = tree.create_element(main, "ul", &[]);
    let _ = tree.create_element(ul, "li", &[("id", "l1"), ("lang", "en-US")]);
    let _ = tree.create_element(ul, "li", &[("id", "l2"), ("class", "b")]);
    let _ = tree.create_element(ul, "li", &[("id", "l3")]);
    let empty = tree.create_element(body, "div", &[("id", "empty")]);
    let _ = tree.create_comment(empty, "nothing here");
    let form = tree.create_element(body, "form", &[]);
    let _ = tree.create_element(form, "input", &[("id", "i1"), ("type", "checkbox"), ("checked", "")]);
    let _ = tree.create_element(form, "input", &[("id", "i2"), ("type", "text"), ("disabled", "")]);
    let _ = tree.create_element(form, "input", &[("id", "i3")]);
    let _ = tree.create_element(form, "a", &[("id", "link"), ("href", "/x")]);
    tree
}

fn id(tree: &DomTree, value: &str) -> NodeId {
    tree.element_by_id(value).unwrap()
}

/// Ids (or tag names for id-less elements) of the matches.
fn labels(tree: &DomTree, nodes: &[NodeId]) -> Vec<String> {
    nodes
        .iter()
        .map(|&n| {
            tree.attribute(n, "id")
                .or_else(|| tree.name(n))
                .unwrap_or("?")
                .to_string()
        })
        .collect()
}

fn select_with(tree: &DomTree, selector: &str, options: &MatchOptions<'_, DomTree>) -> Vec<String> {
    let group = parse(selector).unwrap();
    let query = compile(tree, &group, options, None).unwrap();
    labels(tree, &query.query_all(&Context::Node(NodeId::ROOT), None))
}

fn select(tree: &DomTree, selector: &str) -> Vec<String> {
    select_with(tree, selector, &MatchOptions::default())
}

fn compile_err(selector: &str) -> CompileError {
    let tree = fixture();
    let group = parse(selector).unwrap();
    match compile(&tree, &group, &MatchOptions::default(), None) {
        Ok(_) => panic!("{selector} should not compile"),
        Err(err) => err,
    }
}

// ========== simple selectors ==========

#[test]
fn test_type_selector_is_case_insensitive_in_html() {
    let tree = fixture();
    assert_eq!(select(&tree, "P"), ["p1", "p2"]);
    assert_eq!(select(&tree, "*.box"), ["main"]);
}

#[test]
fn test_xml_mode_compares_names_exactly() {
    let tree = fixture();
    let options = MatchOptions {
        xml_mode: true,
        ..MatchOptions::default()
    };
    assert!(select_with(&tree, "P", &options).is_empty());
    assert_eq!(select_with(&tree, "p", &options), ["p1", "p2"]);
}

#[test]
fn test_attribute_selectors() {
    let tree = fixture();
    assert_eq!(select(&tree, "[lang|=en]"), ["l1"]);
    assert_eq!(select(&tree, "[LANG$=us i]"), ["l1"]);
    assert_eq!(select(&tree, "input[type!=text]"), ["i1", "i3"]);
    assert_eq!(select(&tree, "input[type!='']"), ["i1", "i2"]);
    assert_eq!(select(&tree, "[href^='/']"), ["link"]);
    assert!(select(&tree, "[class~='a b']").is_empty());
    assert!(select(&tree, "[href^='']").is_empty());
}

// ========== combinators ==========

#[test]
fn test_combinators() {
    let tree = fixture();
    assert_eq!(select(&tree, "div > p"), ["p1", "p2"]);
    assert_eq!(select(&tree, "body span"), ["s1"]);
    assert_eq!(select(&tree, "li + li"), ["l2", "l3"]);
    assert_eq!(select(&tree, "#l1 ~ li"), ["l2", "l3"]);
    assert_eq!(select(&tree, "p + ul > li.b"), ["l2"]);
    assert_eq!(select(&tree, "div, span"), ["main", "s1", "empty"]);
}

#[test]
fn test_adjacent_skips_text_and_comments() {
    let mut tree = DomTree::new();
    let parent = tree.create_element(NodeId::ROOT, "div", &[]);
    let _ = tree.create_element(parent, "h1", &[]);
    let _ = tree.create_text(parent, "\n  ");
    let _ = tree.create_comment(parent, "x");
    let _ = tree.create_element(parent, "p", &[("id", "after")]);
    assert_eq!(select(&tree, "h1 + p"), ["after"]);
}

// ========== pseudo-classes ==========

#[test]
fn test_structural_pseudo_classes() {
    let tree = fixture();
    assert_eq!(select(&tree, "li:first-child"), ["l1"]);
    assert_eq!(select(&tree, "li:last-child"), ["l3"]);
    assert_eq!(select(&tree, ":only-child"), ["html", "body", "s1"]);
    assert_eq!(select(&tree, "li:nth-child(2)"), ["l2"]);
    assert_eq!(select(&tree, "li:nth-child(odd)"), ["l1", "l3"]);
    assert_eq!(select(&tree, "li:nth-last-child(1)"), ["l3"]);
    assert_eq!(select(&tree, "div:first-of-type"), ["main"]);
    assert_eq!(select(&tree, "p:last-of-type"), ["p2"]);
    assert_eq!(select(&tree, "ul:only-of-type"), ["ul"]);
    assert_eq!(select(&tree, ":root"), ["html"]);
    assert_eq!(select(&tree, "div:empty"), ["empty"]);
}

#[test]
fn test_logical_pseudo_classes() {
    let tree = fixture();
    assert_eq!(select(&tree, "li:not(.b)"), ["l1", "l3"]);
    assert_eq!(select(&tree, "li:is(#l1, #l3)"), ["l1", "l3"]);
    assert_eq!(select(&tree, ":where(p, ul) > *"), ["s1", "l1", "l2", "l3"]);
    assert_eq!(select(&tree, "p:has(> span)"), ["p2"]);
    assert_eq!(select(&tree, "div:has(li.b)"), ["main"]);
    assert_eq!(select(&tree, "li:has(+ li)"), ["l1", "l2"]);
    assert_eq!(select(&tree, "p:contains(two)"), ["p2"]);
    assert_eq!(select(&tree, "p:icontains(ONE)"), ["p1"]);
}

#[test]
fn test_shorthand_pseudo_classes() {
    let tree = fixture();
    assert_eq!(select(&tree, ":checked"), ["i1"]);
    assert_eq!(select(&tree, "input:disabled"), ["i2"]);
    assert_eq!(select(&tree, "input:enabled"), ["i1", "i3"]);
    assert_eq!(select(&tree, ":link"), ["link"]);
    assert_eq!(select(&tree, ":checkbox"), ["i1"]);
    assert_eq!(select(&tree, ":text"), ["i2", "i3"]);
    assert_eq!(select(&tree, "div:parent"), ["main"]);
    assert!(select(&tree, ":header").is_empty());
}

#[test]
fn test_interactive_states_and_pseudo_elements_never_match() {
    let tree = fixture();
    assert!(select(&tree, "a:hover").is_empty());
    assert!(select(&tree, "p::before").is_empty());
    assert!(select(&tree, "p:after").is_empty());
}

#[test]
fn test_custom_pseudo_classes() {
    let tree = fixture();
    let pseudos = PseudoRegistry::new()
        .with_selector("toggle", "input[type=checkbox]")
        .with_predicate("lang", |tree: &DomTree, node, lang| {
            tree.attribute(node, "lang")
                .zip(lang)
                .is_some_and(|(actual, wanted)| actual.starts_with(wanted))
        })
        .with_selector("first-child", "#l2");
    let options = MatchOptions {
        pseudos: Some(&pseudos),
        ..MatchOptions::default()
    };
    assert_eq!(select_with(&tree, ":toggle", &options), ["i1"]);
    assert_eq!(select_with(&tree, ":lang(en)", &options), ["l1"]);
    assert!(select_with(&tree, ":lang(fr)", &options).is_empty());
    assert_eq!(select_with(&tree, "li:first-child", &options), ["l2"]);
}

// ========== errors ==========

#[test]
fn test_compile_errors() {
    assert_eq!(
        compile_err(":bogus"),
        CompileError::UnknownPseudoClass("bogus".to_string())
    );
    assert_eq!(
        compile_err("p:first"),
        CompileError::UnknownPseudoClass("first".to_string())
    );
    assert_eq!(
        compile_err("li:nth-child"),
        CompileError::MissingArgument("nth-child".to_string())
    );
    assert_eq!(
        compile_err("li:first-child(2)"),
        CompileError::UnexpectedArgument("first-child".to_string())
    );
    assert_eq!(
        compile_err("li:nth-child(x)"),
        CompileError::InvalidNth("x".to_string())
    );
    assert_eq!(
        compile_err("p:not(:eq(1))"),
        CompileError::UnknownPseudoClass("eq".to_string())
    );
}

#[test]
fn test_leading_combinator_rejected_without_relative_selectors() {
    let tree = fixture();
    let group = parse("> p").unwrap();
    let options = MatchOptions {
        relative_selector: false,
        ..MatchOptions::default()
    };
    assert!(matches!(
        compile(&tree, &group, &options, None),
        Err(CompileError::RelativeSelectorNotAllowed)
    ));
}

// ========== scope and context ==========

#[test]
fn test_scope_without_context_is_root() {
    let tree = fixture();
    assert_eq!(select(&tree, ":scope"), ["html"]);
    assert_eq!(select(&tree, ":scope > body"), ["body"]);
}

#[test]
fn test_relative_selector_from_element_context() {
    let tree = fixture();
    let main = Context::Node(id(&tree, "main"));
    let group = parse("> p").unwrap();
    let query = compile(&tree, &group, &MatchOptions::default(), Some(&main)).unwrap();
    assert!(!query.should_test_next_siblings());
    assert!(std::ptr::eq(query.adapter(), &tree));
    assert_eq!(labels(&tree, &query.query_all(&main, None)), ["p1", "p2"]);
}

#[test]
fn test_context_anchors_plain_selectors() {
    let tree = fixture();
    let main = Context::Node(id(&tree, "main"));
    // Rewritten to `:scope body p`: nothing inside #main has a body ancestor
    // below the scope.
    let group = parse("body p").unwrap();
    let query = compile(&tree, &group, &MatchOptions::default(), Some(&main)).unwrap();
    assert!(query.query_all(&main, None).is_empty());
}

#[test]
fn test_sibling_relative_selector_tests_next_siblings() {
    let tree = fixture();
    let p2 = Context::Node(id(&tree, "p2"));
    let group = parse("+ ul").unwrap();
    let query = compile(&tree, &group, &MatchOptions::default(), Some(&p2)).unwrap();
    assert!(query.should_test_next_siblings());
    assert_eq!(labels(&tree, &query.query_all(&p2, None)), ["ul"]);
}

#[test]
fn test_list_context_includes_the_listed_elements() {
    let tree = fixture();
    let list = Context::List(vec![id(&tree, "p1"), id(&tree, "p2")]);
    let group = parse("p").unwrap();
    let query = compile(&tree, &group, &MatchOptions::default(), Some(&list)).unwrap();
    assert_eq!(labels(&tree, &query.query_all(&list, None)), ["p1", "p2"]);
}

#[test]
fn test_anchor_restricts_leftmost_compound() {
    let tree = fixture();
    let anchor: HashSet<NodeId> = [id(&tree, "l2")].into_iter().collect();
    let options = MatchOptions {
        relative_selector: false,
        anchor: Some(Rc::new(anchor)),
        ..MatchOptions::default()
    };
    assert_eq!(select_with(&tree, "li + li", &options), ["l3"]);
    assert_eq!(select_with(&tree, "li", &options), ["l2"]);
}

#[test]
fn test_query_all_respects_limit_and_filter_does_not_descend() {
    let tree = fixture();
    let root = Context::Node(NodeId::ROOT);
    let group = parse("li").unwrap();
    let query = compile(&tree, &group, &MatchOptions::default(), Some(&root)).unwrap();
    assert_eq!(labels(&tree, &query.query_all(&root, Some(2))), ["l1", "l2"]);
    let main = id(&tree, "main");
    let l1 = id(&tree, "l1");
    assert_eq!(query.filter(&[main, l1]), vec![l1]);
}

// ========== An+B ==========

#[test]
fn test_nth_parse() {
    assert_eq!(Nth::parse("odd"), Some(Nth { a: 2, b: 1 }));
    assert_eq!(Nth::parse(" EVEN "), Some(Nth { a: 2, b: 0 }));
    assert_eq!(Nth::parse("3"), Some(Nth { a: 0, b: 3 }));
    assert_eq!(Nth::parse("-n + 3"), Some(Nth { a: -1, b: 3 }));
    assert_eq!(Nth::parse("2n+1"), Some(Nth { a: 2, b: 1 }));
    assert_eq!(Nth::parse("n"), Some(Nth { a: 1, b: 0 }));
    assert_eq!(Nth::parse("3n-2"), Some(Nth { a: 3, b: -2 }));
    assert_eq!(Nth::parse("2n1"), None);
    assert_eq!(Nth::parse("x"), None);
}

#[test]
fn test_nth_matches() {
    let odd = Nth { a: 2, b: 1 };
    assert!(odd.matches(1) && odd.matches(3) && !odd.matches(2));
    let first_three = Nth { a: -1, b: 3 };
    assert!(first_three.matches(1) && first_three.matches(3) && !first_three.matches(4));
    let exact = Nth { a: 0, b: 2 };
    assert!(exact.matches(2) && !exact.matches(4));
}

#[test]
fn test_nth_matches_extreme_offsets() {
    let from_min = Nth { a: 1, b: i64::MIN };
    assert!(from_min.matches(1) && from_min.matches(i64::MAX));
    let below_min = Nth { a: -1, b: i64::MIN };
    assert!(!below_min.matches(1));
    let to_max = Nth { a: -2, b: i64::MAX };
    assert!(to_max.matches(1) && !to_max.matches(2));
    let huge_step = Nth { a: i64::MIN, b: 0 };
    assert!(!huge_step.matches(1));
    assert!(Nth { a: i64::MAX, b: 1 }.matches(1));
}

#[test]
fn test_nth_child_with_extreme_offset_selects_every_child() {
    assert_eq!(
        Nth::parse("n-9223372036854775808"),
        Some(Nth { a: 1, b: i64::MIN })
    );
    let tree = fixture();
    assert_eq!(
        select(&tree, "div > :nth-child(n-9223372036854775808)"),
        select(&tree, "div > *")
    );
    assert_eq!(
        select(&tree, "li:nth-child(-n+9223372036854775807)"),
        ["l1", "l2", "l3"]
    );
}
