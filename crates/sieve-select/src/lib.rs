//! Positional CSS selector queries over generic node trees.
//!
//! # Scope
//!
//! This crate adds the jQuery positional filters to a structural selector
//! matcher:
//! - **Positional filters** ([`positionals`])
//!   - `:first`, `:last`, `:eq(n)`, `:nth(n)`, `:gt(n)`, `:lt(n)`, `:even`, `:odd`
//!   - `:not(...)` around any of them
//! - **Query entry points**
//!   - [`select`]: matching descendants of a node or node list
//!   - [`filter`]: matching members of an element list
//!   - [`is`] / [`some`]: boolean tests
//!
//! Everything else in a selector is handed to [`sieve_css`]. A selector
//! without positional filters behaves exactly as it does there.
//!
//! # How positional chains are evaluated
//!
//! A chain such as `ul li:odd > a:first` is cut at each positional filter.
//! The part before the cut (`ul li`) is matched structurally to get an
//! ordered candidate list, which the filter narrows (`:odd`). The rest of the
//! chain (`> a:first`) is then evaluated against the narrowed list only, with
//! a scope anchor that stops combinators from reaching elements outside it.
//!
//! ```
//! use sieve_dom::{DomTree, NodeId};
//! use sieve_select::{Options, Root, select};
//!
//! let mut tree = DomTree::new();
//! let div = tree.create_element(NodeId::ROOT, "div", &[]);
//! let first = tree.create_element(div, "p", &[]);
//! let second = tree.create_element(div, "p", &[]);
//!
//! let found = select(&tree, "p:last", &Root::Node(div), &Options::default(), None).unwrap();
//! assert_eq!(found, vec![second]);
//! # let _ = first;
//! ```

pub mod helpers;
pub mod positionals;

use std::collections::HashSet;
use std::rc::Rc;

use sieve_css::compile::prepare_context;
use sieve_css::selector::{SelectorChain, SelectorGroup, Token, Traversal};
use sieve_css::{CompileError, MatchOptions, ParseError, compile, parse};
use sieve_dom::{Adapter, find, unique_sort};
use thiserror::Error;
use tracing::{debug, trace};

use helpers::{get_document_root, group_selectors};
use positionals::{Limit, as_filter, filter_by_position, get_limit, is_filter};

pub use sieve_css::{Context, PseudoRegistry};

/// Where a query starts: a single node (searched below) or a node list
/// (searched including the listed nodes).
pub type Root<N> = Context<N>;

/// Why a query could not run.
///
/// Both variants carry the collaborator's error unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    /// The selector text is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The selector parsed but the structural matcher rejected it.
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// A selector: CSS text, or a predicate over elements.
pub enum Query<'q, N> {
    /// Selector text, e.g. `"ul > li:eq(2)"`.
    Css(&'q str),
    /// Arbitrary test; only ever called on elements.
    Predicate(&'q dyn Fn(N) -> bool),
}

impl<'q, N> From<&'q str> for Query<'q, N> {
    fn from(text: &'q str) -> Self {
        Self::Css(text)
    }
}

impl<'q, N> Query<'q, N> {
    /// Wrap a predicate.
    #[must_use]
    pub fn predicate(test: &'q dyn Fn(N) -> bool) -> Self {
        Self::Predicate(test)
    }
}

/// Query configuration.
///
/// Never mutated while a query runs: every re-scoping step works on a
/// modified clone.
pub struct Options<'a, A: Adapter + ?Sized> {
    /// Elements `:scope` refers to.
    pub context: Option<Context<A::Node>>,
    /// Document root to use when `filter` needs to search the whole tree.
    /// Computed from the elements when unset.
    pub root: Option<A::Node>,
    /// Compare names exactly instead of ASCII case-insensitively.
    pub xml_mode: bool,
    /// Rewrite selectors relative to the context (`> p` becomes `:scope > p`).
    pub relative_selector: bool,
    /// Caller-owned custom pseudo-classes.
    pub pseudos: Option<&'a PseudoRegistry<A>>,
    /// Narrowed set that the leftmost compound of a re-scoped chain must
    /// match within.
    anchor: Option<Rc<HashSet<A::Node>>>,
}

impl<A: Adapter + ?Sized> Default for Options<'_, A> {
    fn default() -> Self {
        Self {
            context: None,
            root: None,
            xml_mode: false,
            relative_selector: true,
            pseudos: None,
            anchor: None,
        }
    }
}

impl<A: Adapter + ?Sized> Clone for Options<'_, A> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            root: self.root,
            xml_mode: self.xml_mode,
            relative_selector: self.relative_selector,
            pseudos: self.pseudos,
            anchor: self.anchor.clone(),
        }
    }
}

impl<'a, A: Adapter + ?Sized> Options<'a, A> {
    /// Set the `:scope` elements.
    #[must_use]
    pub fn with_context(mut self, context: Context<A::Node>) -> Self {
        self.context = Some(context);
        self
    }

    /// Set the document root.
    #[must_use]
    pub fn with_root(mut self, root: A::Node) -> Self {
        self.root = Some(root);
        self
    }

    /// Toggle XML name matching.
    #[must_use]
    pub const fn with_xml_mode(mut self, xml_mode: bool) -> Self {
        self.xml_mode = xml_mode;
        self
    }

    /// Toggle relative selector rewriting.
    #[must_use]
    pub const fn with_relative_selector(mut self, relative_selector: bool) -> Self {
        self.relative_selector = relative_selector;
        self
    }

    /// Use custom pseudo-classes.
    #[must_use]
    pub const fn with_pseudos(mut self, pseudos: &'a PseudoRegistry<A>) -> Self {
        self.pseudos = Some(pseudos);
        self
    }

    fn match_options(&self) -> MatchOptions<'a, A> {
        MatchOptions {
            context: self.context.clone(),
            xml_mode: self.xml_mode,
            relative_selector: self.relative_selector,
            pseudos: self.pseudos,
            anchor: self.anchor.clone(),
        }
    }
}

/// Whether `element` matches `query`.
///
/// # Errors
///
/// Returns a [`SelectError`] if the selector text doesn't parse or compile.
pub fn is<'q, A>(
    adapter: &A,
    element: A::Node,
    query: impl Into<Query<'q, A::Node>>,
    options: &Options<'_, A>,
) -> Result<bool, SelectError>
where
    A: Adapter + ?Sized,
    A::Node: 'q,
{
    some(adapter, &[element], query, options)
}

/// Whether any of `elements` matches `query`. Stops at the first success.
///
/// # Errors
///
/// Returns a [`SelectError`] if the selector text doesn't parse or compile.
pub fn some<'q, A>(
    adapter: &A,
    elements: &[A::Node],
    query: impl Into<Query<'q, A::Node>>,
    options: &Options<'_, A>,
) -> Result<bool, SelectError>
where
    A: Adapter + ?Sized,
    A::Node: 'q,
{
    let text = match query.into() {
        Query::Predicate(test) => return Ok(elements.iter().any(|&element| test(element))),
        Query::Css(text) => text,
    };

    let (plain, filtered) = group_selectors(parse(text)?);

    if !plain.is_empty() {
        let query = compile(adapter, &plain, &options.match_options(), None)?;
        if elements.iter().any(|&element| query.matches(element)) {
            return Ok(true);
        }
    }

    for chain in filtered {
        if !filter_by_selector(adapter, chain, elements, options)?.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Keep the members of `elements` that match `query`, in their original
/// order.
///
/// # Errors
///
/// Returns a [`SelectError`] if the selector text doesn't parse or compile.
pub fn filter<'q, A>(
    adapter: &A,
    query: impl Into<Query<'q, A::Node>>,
    elements: &[A::Node],
    options: &Options<'_, A>,
) -> Result<Vec<A::Node>, SelectError>
where
    A: Adapter + ?Sized,
    A::Node: 'q,
{
    match query.into() {
        Query::Predicate(test) => Ok(elements
            .iter()
            .copied()
            .filter(|&element| adapter.is_tag(element) && test(element))
            .collect()),
        Query::Css(text) => filter_parsed(adapter, &parse(text)?, elements, options),
    }
}

/// Every element below `root` that matches `query`.
///
/// Results are unique and in document order. `limit` caps each selector
/// alternative separately; `None` is unbounded.
///
/// # Errors
///
/// Returns a [`SelectError`] if the selector text doesn't parse or compile.
pub fn select<'q, A>(
    adapter: &A,
    query: impl Into<Query<'q, A::Node>>,
    root: &Root<A::Node>,
    options: &Options<'_, A>,
    limit: Limit,
) -> Result<Vec<A::Node>, SelectError>
where
    A: Adapter + ?Sized,
    A::Node: 'q,
{
    let text = match query.into() {
        Query::Predicate(test) => {
            let nodes = prepare_context(adapter, root, false);
            return Ok(find(
                adapter,
                |node| adapter.is_tag(node) && test(node),
                &nodes,
                true,
                limit,
            ));
        }
        Query::Css(text) => text,
    };

    let (plain, filtered) = group_selectors(parse(text)?);
    trace!(
        plain = plain.len(),
        filtered = filtered.len(),
        "select: classified selector list"
    );

    let mut results = filtered
        .into_iter()
        .map(|chain| find_filter_elements(adapter, root, chain, options, true, limit))
        .collect::<Result<Vec<_>, _>>()?;

    // Plain selectors can be queried in a single go.
    if !plain.is_empty() {
        results.push(find_elements(adapter, root, &plain, options, limit)?);
    }

    Ok(match results.len() {
        0 => Vec::new(),
        1 => results.pop().unwrap_or_default(),
        _ => unique_sort(adapter, results.concat()),
    })
}

/// Filter `elements` by a parsed selector list, keeping their order.
fn filter_parsed<A: Adapter + ?Sized>(
    adapter: &A,
    group: &SelectorGroup,
    elements: &[A::Node],
    options: &Options<'_, A>,
) -> Result<Vec<A::Node>, SelectError> {
    if elements.is_empty() {
        return Ok(Vec::new());
    }

    let (plain, filtered) = group_selectors(group.clone());
    let mut found: Option<HashSet<A::Node>> = None;

    if !plain.is_empty() {
        let matched = filter_elements(adapter, elements, &plain, options)?;
        if filtered.is_empty() {
            return Ok(matched);
        }
        if !matched.is_empty() {
            found = Some(matched.into_iter().collect());
        }
    }

    let last = filtered.len().saturating_sub(1);
    for (index, chain) in filtered.into_iter().enumerate() {
        if let Some(found) = &found {
            let missing = elements
                .iter()
                .any(|&element| adapter.is_tag(element) && !found.contains(&element));
            if found.len() == elements.len() || !missing {
                break;
            }
        }

        let matched = filter_by_selector(adapter, chain, elements, options)?;
        if matched.is_empty() {
            continue;
        }
        match &mut found {
            Some(found) => found.extend(matched),
            // Nothing found before the last alternative: its result is final.
            None if index == last => return Ok(matched),
            None => found = Some(matched.into_iter().collect()),
        }
    }

    Ok(match found {
        None => Vec::new(),
        Some(found) if found.len() == elements.len() => elements.to_vec(),
        Some(found) => elements
            .iter()
            .copied()
            .filter(|element| found.contains(element))
            .collect(),
    })
}

/// Evaluate one positional chain against an element list.
///
/// A chain without combinators only looks at the elements themselves. One
/// with combinators has to see the surrounding tree, so it is run from the
/// document root with `:scope` appended and the elements as context.
fn filter_by_selector<A: Adapter + ?Sized>(
    adapter: &A,
    mut chain: SelectorChain,
    elements: &[A::Node],
    options: &Options<'_, A>,
) -> Result<Vec<A::Node>, SelectError> {
    let limit = Some(elements.len());

    if chain.iter().any(Token::is_traversal) {
        let Some(root) = get_document_root(adapter, options.root, elements) else {
            return Ok(Vec::new());
        };
        let mut options = options.clone();
        options.context = Some(Context::List(elements.to_vec()));
        options.relative_selector = false;
        chain.push(Token::scope());
        debug!(
            elements = elements.len(),
            "filter: re-rooting positional chain at document root"
        );
        return find_filter_elements(adapter, &Context::Node(root), chain, &options, true, limit);
    }

    find_filter_elements(
        adapter,
        &Context::List(elements.to_vec()),
        chain,
        options,
        false,
        limit,
    )
}

/// Resolve a chain that contains at least one positional filter. A chain
/// without one matches nothing here; callers route those to the structural
/// matcher.
///
/// `query_deeply` searches below `root` for the tokens before the first
/// filter even when they contain no combinator; otherwise `root` is
/// filtered in place. `total_limit` caps the final result.
fn find_filter_elements<A: Adapter + ?Sized>(
    adapter: &A,
    root: &Root<A::Node>,
    chain: SelectorChain,
    options: &Options<'_, A>,
    query_deeply: bool,
    total_limit: Limit,
) -> Result<Vec<A::Node>, SelectError> {
    let Some((filter_index, filter, data)) = chain
        .iter()
        .enumerate()
        .find_map(|(index, token)| as_filter(token).map(|(filter, data)| (index, filter, data)))
    else {
        return Ok(Vec::new());
    };

    let sub = &chain[..filter_index];
    let remaining = &chain[filter_index + 1..];

    // Later tokens may need more candidates than the outer limit implies.
    let part_limit = if remaining.is_empty() { total_limit } else { None };
    let limit = get_limit(filter, data.argument(), part_limit);
    if limit == Some(0) {
        return Ok(Vec::new());
    }

    let mut elements = if sub.is_empty() {
        match root {
            Context::Node(node) => adapter.element_children(*node),
            Context::List(nodes) => nodes
                .iter()
                .copied()
                .filter(|&node| adapter.is_tag(node))
                .collect(),
        }
    } else if query_deeply || sub.iter().any(Token::is_traversal) {
        find_elements(adapter, root, &[sub.to_vec()], options, limit)?
    } else {
        filter_elements(adapter, root.as_slice(), &[sub.to_vec()], options)?
    };
    if let Some(limit) = limit {
        elements.truncate(limit);
    }

    debug!(
        %filter,
        ?limit,
        candidates = elements.len(),
        "resolved candidates for positional filter"
    );

    let mut result = filter_by_position(filter, elements, data, |group, candidates| {
        filter_parsed(adapter, group, candidates, options)
    })?;

    if result.is_empty() || remaining.is_empty() {
        return Ok(result);
    }

    let mut remaining = remaining.to_vec();
    let remaining_has_traversal = remaining.iter().any(Token::is_traversal);
    let mut options = options.clone();

    if remaining_has_traversal {
        if let Some(kind) = remaining.first().and_then(Token::traversal) {
            // Sibling combinators must see the siblings of the narrowed set.
            // The expanded list is the narrowed set followed by their later
            // siblings, not document order, and a later positional filter
            // indexes it in that order.
            if matches!(kind, Traversal::Sibling | Traversal::Adjacent) {
                result = prepare_context(adapter, &Context::List(result), true);
            }
            // A chain can't start with a combinator once rewriting is off.
            remaining.insert(0, Token::Universal);
        }
        options.relative_selector = false;
        options.anchor = Some(Rc::new(result.iter().copied().collect()));
        trace!(anchor = result.len(), "re-scoped remaining chain to narrowed set");
    } else {
        options.anchor = None;
    }

    let narrowed = Context::List(result);
    if remaining.iter().any(is_filter) {
        find_filter_elements(adapter, &narrowed, remaining, &options, false, total_limit)
    } else if remaining_has_traversal {
        find_elements(adapter, &narrowed, &[remaining], &options, total_limit)
    } else {
        filter_elements(adapter, narrowed.as_slice(), &[remaining], &options)
    }
}

/// Structural query below `root`.
fn find_elements<A: Adapter + ?Sized>(
    adapter: &A,
    root: &Root<A::Node>,
    group: &[SelectorChain],
    options: &Options<'_, A>,
    limit: Limit,
) -> Result<Vec<A::Node>, SelectError> {
    let query = compile(adapter, group, &options.match_options(), Some(root))?;
    Ok(query.query_all(root, limit))
}

/// Structural filter over `nodes`, without descending.
fn filter_elements<A: Adapter + ?Sized>(
    adapter: &A,
    nodes: &[A::Node],
    group: &[SelectorChain],
    options: &Options<'_, A>,
) -> Result<Vec<A::Node>, SelectError> {
    let elements: Vec<A::Node> = nodes
        .iter()
        .copied()
        .filter(|&node| adapter.is_tag(node))
        .collect();
    if elements.is_empty() {
        return Ok(elements);
    }
    let query = compile(adapter, group, &options.match_options(), None)?;
    Ok(query.filter(&elements))
}
