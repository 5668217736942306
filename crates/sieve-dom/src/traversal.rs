//! Tree-walking primitives shared by the structural matcher and the
//! positional selector core.
//!
//! All functions are generic over [`Adapter`] and only read the tree.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::Adapter;

/// Collect every node of `nodes` (and, when `recurse` is set, every
/// descendant) for which `test` holds, in tree order.
///
/// Stops as soon as `limit` nodes were collected; `None` means unbounded and
/// `Some(0)` yields nothing.
pub fn find<A, F>(
    adapter: &A,
    mut test: F,
    nodes: &[A::Node],
    recurse: bool,
    limit: Option<usize>,
) -> Vec<A::Node>
where
    A: Adapter + ?Sized,
    F: FnMut(A::Node) -> bool,
{
    let mut result = Vec::new();
    if limit == Some(0) {
        return result;
    }

    // Explicit stack of sibling runs, so deep trees don't recurse.
    let mut stack: Vec<(&[A::Node], usize)> = vec![(nodes, 0)];
    while let Some(top) = stack.last_mut() {
        let (run, index) = *top;
        let Some(&node) = run.get(index) else {
            let _ = stack.pop();
            continue;
        };
        top.1 += 1;

        if test(node) {
            result.push(node);
            if limit.is_some_and(|limit| result.len() >= limit) {
                return result;
            }
        }

        if recurse {
            let children = adapter.children(node);
            if !children.is_empty() {
                stack.push((children, 0));
            }
        }
    }
    result
}

/// Walk up from `node` to the top of its tree.
pub fn document_root<A: Adapter + ?Sized>(adapter: &A, node: A::Node) -> A::Node {
    let mut current = node;
    while let Some(parent) = adapter.parent(current) {
        current = parent;
    }
    current
}

/// Path of nodes from the top of the tree down to `node`, inclusive.
fn path_from_root<A: Adapter + ?Sized>(adapter: &A, node: A::Node) -> Vec<A::Node> {
    let mut path = vec![node];
    let mut current = node;
    while let Some(parent) = adapter.parent(current) {
        path.push(parent);
        current = parent;
    }
    path.reverse();
    path
}

/// [§ 4.4 compareDocumentPosition](https://dom.spec.whatwg.org/#dom-node-comparedocumentposition)
///
/// Order two nodes by tree order: an ancestor precedes its descendants,
/// otherwise the branch that comes first under the common ancestor wins.
/// Nodes in disconnected trees compare equal, so this is not a total order
/// across trees; [`unique_sort`] orders such nodes by tree first.
pub fn compare_document_position<A: Adapter + ?Sized>(
    adapter: &A,
    a: A::Node,
    b: A::Node,
) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let path_a = path_from_root(adapter, a);
    let path_b = path_from_root(adapter, b);
    if path_a[0] != path_b[0] {
        return Ordering::Equal;
    }

    let shared = path_a
        .iter()
        .zip(&path_b)
        .take_while(|(x, y)| x == y)
        .count();

    match (path_a.get(shared), path_b.get(shared)) {
        // One of them is an ancestor of the other.
        (None, _) => Ordering::Less,
        (_, None) => Ordering::Greater,
        (Some(&branch_a), Some(&branch_b)) => {
            let siblings = adapter.children(path_a[shared - 1]);
            let index_a = siblings.iter().position(|&n| n == branch_a);
            let index_b = siblings.iter().position(|&n| n == branch_b);
            index_a.cmp(&index_b)
        }
    }
}

/// Child indices leading from the top of the tree down to `node`.
///
/// Comparing two of these lexicographically is tree order: a prefix (an
/// ancestor) sorts first.
fn tree_position<A: Adapter + ?Sized>(adapter: &A, node: A::Node) -> Vec<usize> {
    let mut position = Vec::new();
    let mut current = node;
    while let Some(parent) = adapter.parent(current) {
        let index = adapter
            .children(parent)
            .iter()
            .position(|&n| n == current)
            .unwrap_or(usize::MAX);
        position.push(index);
        current = parent;
    }
    position.reverse();
    position
}

/// Remove duplicate nodes and sort the rest into document order.
///
/// Nodes from disconnected trees are grouped by tree, and the trees are
/// ordered by where their first node appears in the input.
pub fn unique_sort<A: Adapter + ?Sized>(adapter: &A, nodes: Vec<A::Node>) -> Vec<A::Node> {
    let mut seen = HashSet::with_capacity(nodes.len());
    let mut roots: HashMap<A::Node, usize> = HashMap::new();
    let mut keyed: Vec<((usize, Vec<usize>), A::Node)> = nodes
        .into_iter()
        .filter(|&n| seen.insert(n))
        .map(|n| {
            let next = roots.len();
            let tree = *roots.entry(document_root(adapter, n)).or_insert(next);
            ((tree, tree_position(adapter, n)), n)
        })
        .collect();
    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
    keyed.into_iter().map(|(_, node)| node).collect()
}

/// Drop duplicates and every node that has an ancestor in the list.
///
/// Searching the remaining nodes with `recurse` visits each subtree exactly
/// once. The relative order of the survivors is preserved.
pub fn remove_subsets<A: Adapter + ?Sized>(adapter: &A, nodes: &[A::Node]) -> Vec<A::Node> {
    let members: HashSet<A::Node> = nodes.iter().copied().collect();
    let mut seen = HashSet::with_capacity(nodes.len());

    nodes
        .iter()
        .copied()
        .filter(|&node| {
            let mut ancestor = adapter.parent(node);
            while let Some(current) = ancestor {
                if members.contains(&current) {
                    return false;
                }
                ancestor = adapter.parent(current);
            }
            seen.insert(node)
        })
        .collect()
}

/// The element siblings that follow `node` under the same parent.
fn following_element_siblings<A: Adapter + ?Sized>(adapter: &A, node: A::Node) -> Vec<A::Node> {
    let Some(parent) = adapter.parent(node) else {
        return Vec::new();
    };
    let siblings = adapter.children(parent);
    siblings
        .iter()
        .position(|&n| n == node)
        .map(|index| {
            siblings[index + 1..]
                .iter()
                .copied()
                .filter(|&n| adapter.is_tag(n))
                .collect()
        })
        .unwrap_or_default()
}

/// The list itself, followed by the element siblings after each of its
/// nodes.
///
/// Sibling combinators look backwards from the subject, so a query anchored
/// at `nodes` has to visit their later siblings as candidate subjects.
pub fn append_next_siblings<A: Adapter + ?Sized>(adapter: &A, nodes: &[A::Node]) -> Vec<A::Node> {
    let mut out = nodes.to_vec();
    for &node in nodes {
        out.extend(following_element_siblings(adapter, node));
    }
    out
}
