//! Selector-list and tree helpers used by the query entry points.

use sieve_css::selector::{SelectorChain, SelectorGroup};
use sieve_dom::{Adapter, document_root};

use crate::positionals::is_filter;

/// Split a selector list into chains without positional filters and chains
/// with at least one, keeping the input order within each half.
#[must_use]
pub fn group_selectors(group: SelectorGroup) -> (SelectorGroup, SelectorGroup) {
    group
        .into_iter()
        .partition(|chain: &SelectorChain| !chain.iter().any(is_filter))
}

/// The document a set of elements lives in: the explicit root when one was
/// configured, otherwise the top of the first element's tree.
#[must_use]
pub fn get_document_root<A: Adapter + ?Sized>(
    adapter: &A,
    explicit: Option<A::Node>,
    elements: &[A::Node],
) -> Option<A::Node> {
    explicit.or_else(|| elements.first().map(|&first| document_root(adapter, first)))
}

#[cfg(test)]
mod tests {
    use sieve_css::parse;
    use sieve_dom::{DomTree, NodeId};

    use super::*;

    #[test]
    fn test_group_selectors_splits_plain_and_filtered() {
        let (plain, filtered) = group_selectors(parse("foo, bar, baz, :first, :last").unwrap());
        assert_eq!(plain.len(), 3);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_group_selectors_looks_inside_not() {
        let group = parse(":not(:last), :not(:not(:first)), :not(.a)").unwrap();
        let (plain, filtered) = group_selectors(group);
        assert_eq!(plain, parse(":not(.a)").unwrap());
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_get_document_root() {
        let mut tree = DomTree::new();
        let div = tree.create_element(NodeId::ROOT, "div", &[]);
        let p = tree.create_element(div, "p", &[]);
        assert_eq!(get_document_root(&tree, None, &[p]), Some(NodeId::ROOT));
        assert_eq!(get_document_root(&tree, Some(div), &[p]), Some(div));
        assert_eq!(get_document_root(&tree, None, &[]), None);
    }
}
