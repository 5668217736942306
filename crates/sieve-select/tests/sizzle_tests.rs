//! Positional selector scenarios modelled on the jQuery/Sizzle positional suite.

use sieve_dom::{Adapter, DomTree, NodeId};
use sieve_select::{Options, Root, filter, is, select};

/// ```text
/// html
/// ├── head
/// └── body
///     ├── h1#qunit-header
///     ├── div#qunit-fixture
///     │   ├── p#firstp        a#simon1
///     │   ├── p#ap            a#google a#groups
///     │   ├── div#foo
///     │   │   ├── p#sndp      code
///     │   │   ├── p#en[lang]  a#yahoo
///     │   │   └── p#sap       code > a#anchor2, a#simon.blog.link
///     │   ├── p#first
///     │   ├── div#nothiddendiv.nothiddendiv > div#nothiddendivchild
///     │   ├── ol#listWithTabIndex > li#foodWithNegativeTabIndex "Rice", li#foodNoTabIndex, li, li
///     │   ├── form#form > select#select1 > option#option1a..d
///     │   │             > select#select2 > option#option2a..d
///     │   └── div#siblingTest > em#siblingfirst, em#siblingnext,
///     │                         em#siblingthird > em#siblingchild > em#siblinggrandchild
///     │                                           > em#siblinggreatgrandchild,
///     │                         span#siblingspan
///     └── div#last
/// ```
struct Sizzle {
    tree: DomTree,
}

impl Sizzle {
    fn new() -> Self {
        let mut tree = DomTree::new();
        let html = tree.create_element(NodeId::ROOT, "html", &[]);
        let _ = tree.create_element(html, "head", &[]);
        let body = tree.create_element(html, "body", &[]);
        let header = tree.create_element(body, "h1", &[("id", "qunit-header")]);
        let _ = tree.create_text(header, "Sizzle");
        let fixture = tree.create_element(body, "div", &[("id", "qunit-fixture")]);

        let firstp = tree.create_element(fixture, "p", &[("id", "firstp")]);
        let _ = tree.create_text(firstp, "See ");
        let _ = tree.create_element(firstp, "a", &[("id", "simon1"), ("href", "#1")]);

        let ap = tree.create_element(fixture, "p", &[("id", "ap")]);
        let _ = tree.create_text(ap, "Here are some links in a normal paragraph: ");
        let _ = tree.create_element(ap, "a", &[("id", "google"), ("href", "#2")]);
        let _ = tree.create_element(ap, "a", &[("id", "groups"), ("href", "#3")]);

        let foo = tree.create_element(fixture, "div", &[("id", "foo")]);
        let sndp = tree.create_element(foo, "p", &[("id", "sndp")]);
        let _ = tree.create_element(sndp, "code", &[]);
        let en = tree.create_element(foo, "p", &[("id", "en"), ("lang", "en")]);
        let _ = tree.create_element(en, "a", &[("id", "yahoo"), ("href", "#4")]);
        let sap = tree.create_element(foo, "p", &[("id", "sap")]);
        let code = tree.create_element(sap, "code", &[]);
        let _ = tree.create_element(code, "a", &[("id", "anchor2"), ("href", "#5")]);
        let _ = tree.create_element(sap, "a", &[("id", "simon"), ("class", "blog link")]);

        let first = tree.create_element(fixture, "p", &[("id", "first")]);
        let _ = tree.create_text(first, "Try them out:");

        let nothidden = tree.create_element(
            fixture,
            "div",
            &[("id", "nothiddendiv"), ("class", "nothiddendiv")],
        );
        let _ = tree.create_element(nothidden, "div", &[("id", "nothiddendivchild")]);

        let list = tree.create_element(fixture, "ol", &[("id", "listWithTabIndex")]);
        for (id, food) in [
            ("foodWithNegativeTabIndex", "Rice"),
            ("foodNoTabIndex", "Beans"),
            ("", "Blinis"),
            ("", "Tofu"),
        ] {
            let li = if id.is_empty() {
                tree.create_element(list, "li", &[])
            } else {
                tree.create_element(list, "li", &[("id", id)])
            };
            let _ = tree.create_text(li, food);
        }

        let form = tree.create_element(fixture, "form", &[("id", "form")]);
        for select_id in ["1", "2"] {
            let id = format!("select{select_id}");
            let select = tree.create_element(form, "select", &[("id", id.as_str())]);
            for option in ["a", "b", "c", "d"] {
                let id = format!("option{select_id}{option}");
                let _ = tree.create_element(select, "option", &[("id", id.as_str())]);
            }
        }

        let siblings = tree.create_element(fixture, "div", &[("id", "siblingTest")]);
        let _ = tree.create_element(siblings, "em", &[("id", "siblingfirst")]);
        let _ = tree.create_element(siblings, "em", &[("id", "siblingnext")]);
        let third = tree.create_element(siblings, "em", &[("id", "siblingthird")]);
        let child = tree.create_element(third, "em", &[("id", "siblingchild")]);
        let grandchild = tree.create_element(child, "em", &[("id", "siblinggrandchild")]);
        let _ = tree.create_element(grandchild, "em", &[("id", "siblinggreatgrandchild")]);
        let _ = tree.create_element(siblings, "span", &[("id", "siblingspan")]);

        let _ = tree.create_element(body, "div", &[("id", "last")]);
        Self { tree }
    }

    fn id(&self, value: &str) -> NodeId {
        self.tree.element_by_id(value).unwrap()
    }

    fn ids(&self, nodes: &[NodeId]) -> Vec<String> {
        nodes
            .iter()
            .map(|&n| self.tree.attribute(n, "id").unwrap_or("").to_string())
            .collect()
    }

    /// Select from `context` (the whole document when `None`).
    fn t(&self, selector: &str, expected: &[&str], context: Option<&str>) {
        let root = context.map_or(Root::Node(NodeId::ROOT), |id| Root::Node(self.id(id)));
        let found = select(&self.tree, selector, &root, &Options::default(), None).unwrap();
        assert_eq!(self.ids(&found), expected, "{selector}");
    }
}

#[test]
fn test_pseudo_position() {
    let s = Sizzle::new();
    s.t("div:first", &["qunit-fixture"], None);
    s.t("div:fiRst", &["qunit-fixture"], None);
    s.t("#qunit-fixture p:nth(1)", &["ap"], None);
    s.t("#qunit-fixture p:first", &["firstp"], None);
    s.t("p:last", &["first"], None);
    s.t("#qunit-fixture p:even", &["firstp", "sndp", "sap"], None);
    s.t("#qunit-fixture p:odd", &["ap", "en", "first"], None);
    s.t("#qunit-fixture p:eq(1)", &["ap"], None);
    s.t("#qunit-fixture p:eq(-1)", &["first"], None);
    s.t("#qunit-fixture p:gt(0)", &["ap", "sndp", "en", "sap", "first"], None);
    s.t("#qunit-fixture p:lt(3)", &["firstp", "ap", "sndp"], None);
}

#[test]
fn test_position_filtering() {
    let s = Sizzle::new();
    s.t("div#nothiddendiv:eq(0)", &["nothiddendiv"], None);
    s.t("div#nothiddendiv:last", &["nothiddendiv"], None);
    s.t("div#nothiddendiv:not(:gt(0))", &["nothiddendiv"], None);
    s.t("#foo > :not(:first)", &["en", "sap"], None);
    s.t(
        "#qunit-fixture select > :not(:gt(2))",
        &["option1a", "option1b", "option1c"],
        None,
    );
    s.t(
        "#qunit-fixture select:lt(2) :not(:first)",
        &[
            "option1b", "option1c", "option1d", "option2a", "option2b", "option2c", "option2d",
        ],
        None,
    );
    s.t("div.nothiddendiv:eq(0)", &["nothiddendiv"], None);
    s.t("div.nothiddendiv:not(:lt(0))", &["nothiddendiv"], None);
}

#[test]
fn test_element_position() {
    let s = Sizzle::new();
    s.t("#qunit-fixture div div:eq(0)", &["nothiddendivchild"], None);
    s.t("#select1 option:eq(3)", &["option1d"], None);
    s.t("#qunit-fixture div div:first", &["nothiddendivchild"], None);
    s.t("#qunit-fixture div > div:first", &["nothiddendivchild"], None);
    s.t("div#nothiddendiv:first > div:first", &["nothiddendivchild"], None);
    s.t(
        "#listWithTabIndex li:eq(0):contains(Rice)",
        &["foodWithNegativeTabIndex"],
        None,
    );
    s.t(
        "#qunit-fixture em>em>em>em:first-child,div>em:first",
        &["siblingfirst", "siblinggreatgrandchild"],
        None,
    );
    s.t("h1:first, div:first", &["qunit-header", "qunit-fixture"], None);
}

#[test]
fn test_isolated_position_from_context() {
    let s = Sizzle::new();
    let body = s.tree.element_by_id("qunit-fixture").and_then(|f| s.tree.parent(f)).unwrap();
    let found = select(&s.tree, ":last", &Root::Node(body), &Options::default(), None).unwrap();
    assert_eq!(s.ids(&found), ["last"]);
    s.t(":last", &["siblingTest"], Some("qunit-fixture"));
}

#[test]
fn test_not_position() {
    let s = Sizzle::new();
    s.t("#foo p:not(:last)", &["sndp", "en"], None);
    s.t("#foo p:not(:last) a", &["yahoo"], None);
    s.t("#foo p:not(:first, :last)", &["en"], None);
    s.t("#foo p:not(:first, :even)", &["en"], None);
    s.t("#foo p:not(:first, :odd)", &["sap"], None);
    s.t("#foo p:not(:odd, :first)", &["sap"], None);
    s.t("#foo p:not([id]:first)", &["en", "sap"], None);
    s.t("#foo p:not(:first[id])", &["en", "sap"], None);
    s.t("#foo p:not([lang]:first)", &["sndp", "sap"], None);
    s.t("#foo p:not(:first[lang])", &["sndp", "en", "sap"], None);
    s.t("#foo p:not(:first) .link", &["simon"], None);
}

#[test]
fn test_child_and_adjacent_position() {
    let s = Sizzle::new();
    s.t("~ em:first", &["siblingnext"], Some("siblingfirst"));
    let found = select(
        &s.tree,
        "#listWithTabIndex li:eq(2) ~ li",
        &Root::Node(NodeId::ROOT),
        &Options::default(),
        None,
    )
    .unwrap();
    assert_eq!(found.len(), 1);
    s.t("> :first", &["nothiddendivchild"], Some("nothiddendiv"));
    s.t("> :eq(0)", &["nothiddendivchild"], Some("nothiddendiv"));
    s.t("> *:first", &["nothiddendivchild"], Some("nothiddendiv"));
}

#[test]
fn test_plain_selectors_are_unchanged() {
    let s = Sizzle::new();
    s.t(
        "#qunit-fixture p",
        &["firstp", "ap", "sndp", "en", "sap", "first"],
        None,
    );
    s.t(" #qunit-fixture p", &["firstp", "ap", "sndp", "en", "sap", "first"], None);
    s.t(
        "#foo :not(code)",
        &["sndp", "en", "yahoo", "sap", "anchor2", "simon"],
        None,
    );
}

#[test]
fn test_empty_selector_selects_nothing() {
    let s = Sizzle::new();
    let root = Root::Node(NodeId::ROOT);
    for selector in ["", " ", "\t"] {
        assert!(
            select(&s.tree, selector, &root, &Options::default(), None)
                .unwrap()
                .is_empty()
        );
    }
    let form = s.id("form");
    assert!(!is(&s.tree, form, "", &Options::default()).unwrap());
}

#[test]
fn test_text_node_root_selects_nothing() {
    let mut s = Sizzle::new();
    let text = s.tree.create_text(NodeId::ROOT, "");
    let found = select(&s.tree, "div", &Root::Node(text), &Options::default(), None).unwrap();
    assert!(found.is_empty());
}

#[test]
fn test_filter_positional_with_traversal_uses_document() {
    let s = Sizzle::new();
    let elements = [s.id("firstp"), s.id("sndp"), s.id("en")];
    let found = filter(&s.tree, "#foo p:first", &elements, &Options::default()).unwrap();
    assert_eq!(s.ids(&found), ["sndp"]);
}

#[test]
fn test_filter_positional_without_traversal_uses_the_list() {
    let s = Sizzle::new();
    let elements = [s.id("firstp"), s.id("ap"), s.id("sndp"), s.id("en")];
    let found = filter(&s.tree, "p:odd", &elements, &Options::default()).unwrap();
    assert_eq!(s.ids(&found), ["ap", "en"]);
    let found = filter(&s.tree, "p:odd, #firstp", &elements, &Options::default()).unwrap();
    assert_eq!(s.ids(&found), ["firstp", "ap", "en"]);
}

#[test]
fn test_is_with_positionals() {
    let s = Sizzle::new();
    let ap = s.id("ap");
    let options = Options::default();
    assert!(is(&s.tree, ap, "p:first", &options).unwrap());
    assert!(!is(&s.tree, ap, "p:eq(1)", &options).unwrap());
    assert!(is(&s.tree, ap, "#qunit-fixture p:eq(1)", &options).unwrap());
    assert!(!is(&s.tree, ap, "#qunit-fixture p:eq(0)", &options).unwrap());
}
