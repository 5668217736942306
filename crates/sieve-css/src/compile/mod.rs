//! Structural selector compilation and matching.
//!
//! [§ 4.1 Selector Matching](https://www.w3.org/TR/selectors-4/#match-a-selector-against-an-element)
//!
//! [`compile`] turns token chains into a [`CompiledQuery`]: each chain is cut
//! at its combinators into compound selectors, stored right-to-left so that
//! matching starts at the subject and walks outward through the tree.
//!
//! This matcher knows nothing about positional filters (`:first`, `:eq(n)`,
//! ...). Those depend on the ordered candidate set rather than on a single
//! element and are resolved by the caller before chains reach this module.

mod pseudo;

use std::collections::HashSet;
use std::iter;
use std::rc::Rc;

use sieve_common::warning::warn_once;
use sieve_dom::{Adapter, append_next_siblings, find, remove_subsets};
use thiserror::Error;

use crate::selector::{
    AttributeAction, AttributeSelector, ParseError, SelectorChain, Token, Traversal,
};

use pseudo::Pseudo;
pub use pseudo::{Nth, PseudoHandler, PseudoPredicate, PseudoRegistry};

/// A selector that parsed but cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// A pseudo-class that is neither built in nor registered.
    #[error("unknown pseudo-class :{0}")]
    UnknownPseudoClass(String),

    /// A functional pseudo-class written without its argument.
    #[error("pseudo-class :{0} requires an argument")]
    MissingArgument(String),

    /// A plain pseudo-class written with an argument.
    #[error("pseudo-class :{0} doesn't take an argument")]
    UnexpectedArgument(String),

    /// An `:nth-*` argument that is not an `An+B` formula.
    #[error("invalid An+B formula '{0}'")]
    InvalidNth(String),

    /// A selector starting with a combinator while relative selectors are
    /// disabled.
    #[error("relative selectors are not allowed when relative selector rewriting is disabled")]
    RelativeSelectorNotAllowed,

    /// A registered selector pseudo-class whose selector text is malformed.
    #[error("selector registered for :{name} is invalid")]
    InvalidCustomPseudo {
        /// Name of the registered pseudo-class.
        name: String,
        /// Why its selector failed to parse.
        #[source]
        source: ParseError,
    },
}

/// One node or an ordered list of nodes.
///
/// Used both for the `:scope` context of a query and for the place a query
/// starts from. A single node is searched below; a list is searched
/// including the listed nodes themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context<N> {
    /// A single node.
    Node(N),
    /// A list of nodes.
    List(Vec<N>),
}

impl<N> Context<N> {
    /// The nodes as a slice (one element for [`Context::Node`]).
    #[must_use]
    pub fn as_slice(&self) -> &[N] {
        match self {
            Self::Node(node) => std::slice::from_ref(node),
            Self::List(nodes) => nodes,
        }
    }

    /// Whether this is a [`Context::List`].
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }
}

/// Options understood by the structural matcher.
pub struct MatchOptions<'a, A: Adapter + ?Sized> {
    /// Elements `:scope` refers to. Without it, `:scope` means `:root`.
    pub context: Option<Context<A::Node>>,
    /// Compare tag and attribute names exactly instead of ASCII
    /// case-insensitively.
    pub xml_mode: bool,
    /// Rewrite chains relative to the context (`> p` becomes `:scope > p`).
    pub relative_selector: bool,
    /// Caller-owned custom pseudo-classes.
    pub pseudos: Option<&'a PseudoRegistry<A>>,
    /// Scope anchor: when set, the element matched by the leftmost compound
    /// of every top-level chain must be a member.
    pub anchor: Option<Rc<HashSet<A::Node>>>,
}

impl<A: Adapter + ?Sized> Default for MatchOptions<'_, A> {
    fn default() -> Self {
        Self {
            context: None,
            xml_mode: false,
            relative_selector: true,
            pseudos: None,
            anchor: None,
        }
    }
}

impl<A: Adapter + ?Sized> Clone for MatchOptions<'_, A> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            xml_mode: self.xml_mode,
            relative_selector: self.relative_selector,
            pseudos: self.pseudos,
            anchor: self.anchor.clone(),
        }
    }
}

/// [§ 16 Combinators](https://www.w3.org/TR/selectors-4/#combinators)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    /// Descendant-or-self; only produced for `:scope` followed by a
    /// descendant combinator when the context is a list.
    FlexibleDescendant,
    Child,
    Adjacent,
    Sibling,
}

impl From<Traversal> for Combinator {
    fn from(kind: Traversal) -> Self {
        match kind {
            Traversal::Descendant => Self::Descendant,
            Traversal::Child => Self::Child,
            Traversal::Adjacent => Self::Adjacent,
            Traversal::Sibling => Self::Sibling,
        }
    }
}

/// A single compiled condition on an element.
#[derive(Debug, Clone)]
enum Simple {
    Tag(String),
    Id(String),
    Class(String),
    Attribute(AttributeSelector),
    Pseudo(Pseudo),
    /// Pseudo-elements and interactive states: accepted, never true.
    Never,
}

/// [§ 4.2 Compound selectors](https://www.w3.org/TR/selectors-4/#compound)
///
/// An empty compound matches any element.
type Compound = Vec<Simple>;

/// [§ 4.3 Complex selectors](https://www.w3.org/TR/selectors-4/#complex)
///
/// For `A > B C`: subject `C`, combinators `[(Descendant, B), (Child, A)]`.
#[derive(Debug, Clone)]
struct ComplexSelector {
    subject: Compound,
    combinators: Vec<(Combinator, Compound)>,
}

/// A compiled selector list, ready to test elements.
pub struct CompiledQuery<'a, A: Adapter + ?Sized> {
    adapter: &'a A,
    selectors: Vec<ComplexSelector>,
    context: Vec<A::Node>,
    anchor: Option<Rc<HashSet<A::Node>>>,
    pseudos: Option<&'a PseudoRegistry<A>>,
    xml_mode: bool,
    should_test_next_siblings: bool,
}

/// Compile a selector group into a predicate over elements.
///
/// `context` is the query's starting point and doubles as the `:scope`
/// context when `options.context` is unset. With relative selectors
/// enabled, chains are anchored to that context the way a scoped
/// `querySelectorAll` is:
/// - a chain starting with `>`, `+` or `~` gets a leading `:scope`;
/// - when every context element sits below another element, a chain that
///   does not mention `:scope` becomes `:scope <chain>`.
///
/// # Errors
///
/// Returns a [`CompileError`] for unknown pseudo-classes, malformed
/// pseudo-class arguments, or a leading combinator while
/// `options.relative_selector` is off.
pub fn compile<'a, A: Adapter + ?Sized>(
    adapter: &'a A,
    group: &[SelectorChain],
    options: &MatchOptions<'a, A>,
    context: Option<&Context<A::Node>>,
) -> Result<CompiledQuery<'a, A>, CompileError> {
    let context = options.context.as_ref().or(context);
    let is_list_context = context.is_some_and(Context::is_list);

    let mut chains = group.to_vec();
    if options.relative_selector {
        absolutize(adapter, &mut chains, context.map(Context::as_slice));
    } else if chains
        .iter()
        .any(|chain| chain.first().is_some_and(Token::is_traversal))
    {
        return Err(CompileError::RelativeSelectorNotAllowed);
    }

    let compiler = Compiler {
        pseudos: options.pseudos,
        xml_mode: options.xml_mode,
    };

    let mut should_test_next_siblings = false;
    let mut selectors = Vec::with_capacity(chains.len());
    for chain in &chains {
        let mut flexible = false;
        if let [first, second, ..] = chain.as_slice() {
            if first.is_pseudo("scope") {
                match second.traversal() {
                    Some(Traversal::Descendant) => flexible = is_list_context,
                    Some(Traversal::Adjacent | Traversal::Sibling) => {
                        should_test_next_siblings = true;
                    }
                    _ => {}
                }
            }
        }
        selectors.push(compiler.compile_chain(chain, flexible)?);
    }

    Ok(CompiledQuery {
        adapter,
        selectors,
        context: context.map(|c| c.as_slice().to_vec()).unwrap_or_default(),
        anchor: options.anchor.clone(),
        pseudos: options.pseudos,
        xml_mode: options.xml_mode,
        should_test_next_siblings,
    })
}

/// Whether `token` is `:scope` or a selector pseudo-class mentioning it.
fn includes_scope_pseudo(token: &Token) -> bool {
    match token {
        Token::Pseudo(pseudo) => {
            pseudo.name == "scope"
                || pseudo.data.selectors().is_some_and(|group| {
                    group.iter().any(|chain| chain.iter().any(includes_scope_pseudo))
                })
        }
        _ => false,
    }
}

/// Prefix relative chains with `:scope` (see [`compile`]).
fn absolutize<A: Adapter + ?Sized>(
    adapter: &A,
    chains: &mut [SelectorChain],
    context: Option<&[A::Node]>,
) {
    let has_context = context.is_some_and(|nodes| {
        nodes.iter().all(|&node| {
            adapter.is_tag(node) && adapter.parent(node).is_some_and(|p| adapter.is_tag(p))
        })
    });

    for chain in chains {
        let leading = chain.first().and_then(Token::traversal);
        if leading.is_some_and(|kind| kind != Traversal::Descendant) {
            chain.insert(0, Token::scope());
        } else if has_context && !chain.iter().any(includes_scope_pseudo) {
            chain.insert(0, Token::Traversal(Traversal::Descendant));
            chain.insert(0, Token::scope());
        }
    }
}

/// Where a search rooted at `root` has to look.
///
/// A single node is searched through its children; a list is searched
/// through its members, minus any that sit inside another member. When the
/// query starts with `:scope +` or `:scope ~`, the following siblings of the
/// root nodes are candidates too.
pub fn prepare_context<A: Adapter + ?Sized>(
    adapter: &A,
    root: &Context<A::Node>,
    should_test_next_siblings: bool,
) -> Vec<A::Node> {
    if should_test_next_siblings {
        let expanded = append_next_siblings(adapter, root.as_slice());
        return remove_subsets(adapter, &expanded);
    }
    match root {
        Context::Node(node) => adapter.children(*node).to_vec(),
        Context::List(nodes) => remove_subsets(adapter, nodes),
    }
}

/// Compile-time state shared by nested selector lists.
struct Compiler<'a, A: Adapter + ?Sized> {
    pseudos: Option<&'a PseudoRegistry<A>>,
    xml_mode: bool,
}

impl<A: Adapter + ?Sized> Compiler<'_, A> {
    fn compile_group(&self, group: &[SelectorChain]) -> Result<Vec<ComplexSelector>, CompileError> {
        group
            .iter()
            .map(|chain| self.compile_chain(chain, false))
            .collect()
    }

    /// Cut a chain at its combinators. A leading or trailing combinator
    /// leaves an empty compound, which matches any element.
    fn compile_chain(
        &self,
        chain: &[Token],
        flexible_first: bool,
    ) -> Result<ComplexSelector, CompileError> {
        let mut compounds: Vec<Compound> = vec![Vec::new()];
        let mut combinators = Vec::new();

        for token in chain {
            if let Token::Traversal(kind) = token {
                combinators.push(Combinator::from(*kind));
                compounds.push(Vec::new());
            } else if let Some(simple) = self.compile_simple(token)? {
                if let Some(current) = compounds.last_mut() {
                    current.push(simple);
                }
            }
        }

        if flexible_first && combinators.first() == Some(&Combinator::Descendant) {
            combinators[0] = Combinator::FlexibleDescendant;
        }

        let subject = compounds.pop().unwrap_or_default();
        Ok(ComplexSelector {
            subject,
            combinators: combinators
                .into_iter()
                .rev()
                .zip(compounds.into_iter().rev())
                .collect(),
        })
    }

    fn compile_simple(&self, token: &Token) -> Result<Option<Simple>, CompileError> {
        let simple = match token {
            Token::Universal | Token::Traversal(_) => return Ok(None),
            Token::Tag(name) => Simple::Tag(name.clone()),
            Token::Id(id) => Simple::Id(id.clone()),
            Token::Class(class) => Simple::Class(class.clone()),
            Token::Attribute(attr) => {
                let mut attr = attr.clone();
                if !self.xml_mode {
                    attr.name.make_ascii_lowercase();
                }
                Simple::Attribute(attr)
            }
            Token::Pseudo(pseudo) => self.compile_pseudo(pseudo)?,
            Token::PseudoElement(name) => {
                let _ = warn_once(
                    "Selector",
                    &format!("pseudo-element '::{name}' never matches an element"),
                );
                Simple::Never
            }
        };
        Ok(Some(simple))
    }
}

impl<'a, A: Adapter + ?Sized> CompiledQuery<'a, A> {
    /// Whether `node` is an element matched by any chain of the query.
    #[must_use]
    pub fn matches(&self, node: A::Node) -> bool {
        self.adapter.is_tag(node)
            && self
                .selectors
                .iter()
                .any(|selector| self.matches_complex(selector, node, &self.context, true))
    }

    /// Whether a search must also visit the following siblings of its
    /// starting nodes (the query begins with `:scope +` or `:scope ~`).
    #[must_use]
    pub const fn should_test_next_siblings(&self) -> bool {
        self.should_test_next_siblings
    }

    /// The adapter this query reads the tree through.
    #[must_use]
    pub const fn adapter(&self) -> &'a A {
        self.adapter
    }

    /// Collect matching elements below `root`, in tree order, stopping after
    /// `limit` results (`None` = all).
    #[must_use]
    pub fn query_all(&self, root: &Context<A::Node>, limit: Option<usize>) -> Vec<A::Node> {
        let candidates = prepare_context(self.adapter, root, self.should_test_next_siblings);
        find(self.adapter, |node| self.matches(node), &candidates, true, limit)
    }

    /// Keep the elements of `nodes` the query matches, without descending.
    #[must_use]
    pub fn filter(&self, nodes: &[A::Node]) -> Vec<A::Node> {
        nodes.iter().copied().filter(|&node| self.matches(node)).collect()
    }

    fn names_equal(&self, actual: &str, expected: &str) -> bool {
        if self.xml_mode {
            actual == expected
        } else {
            actual.eq_ignore_ascii_case(expected)
        }
    }

    fn matches_complex(
        &self,
        selector: &ComplexSelector,
        node: A::Node,
        scope: &[A::Node],
        top_level: bool,
    ) -> bool {
        self.matches_from(selector, 0, node, scope, top_level)
    }

    /// Match the compound at `index` (0 = subject) against `node`, then try
    /// every tree position its combinator allows for the rest of the chain.
    fn matches_from(
        &self,
        selector: &ComplexSelector,
        index: usize,
        node: A::Node,
        scope: &[A::Node],
        top_level: bool,
    ) -> bool {
        let compound = if index == 0 {
            &selector.subject
        } else {
            &selector.combinators[index - 1].1
        };
        if !self.compound_matches(compound, node, scope) {
            return false;
        }

        let Some(&(combinator, _)) = selector.combinators.get(index) else {
            // Leftmost compound: this is where the scope anchor applies.
            return !top_level
                || self
                    .anchor
                    .as_ref()
                    .is_none_or(|anchor| anchor.contains(&node));
        };

        let next = index + 1;
        let adapter = self.adapter;
        let rest =
            |candidate: A::Node| self.matches_from(selector, next, candidate, scope, top_level);

        match combinator {
            // [§ 16.1](https://www.w3.org/TR/selectors-4/#descendant-combinators)
            Combinator::Descendant => self.element_ancestors(node).any(rest),
            Combinator::FlexibleDescendant => {
                iter::once(node).chain(self.element_ancestors(node)).any(rest)
            }
            // [§ 16.2](https://www.w3.org/TR/selectors-4/#child-combinators)
            Combinator::Child => adapter
                .parent(node)
                .filter(|&parent| adapter.is_tag(parent))
                .is_some_and(rest),
            // [§ 16.3](https://www.w3.org/TR/selectors-4/#adjacent-sibling-combinators)
            // Only element siblings count; text and comments in between are skipped.
            Combinator::Adjacent => self.preceding_elements(node).next().is_some_and(rest),
            // [§ 16.4](https://www.w3.org/TR/selectors-4/#general-sibling-combinators)
            Combinator::Sibling => self.preceding_elements(node).any(rest),
        }
    }

    fn compound_matches(&self, compound: &[Simple], node: A::Node, scope: &[A::Node]) -> bool {
        self.adapter.is_tag(node)
            && compound
                .iter()
                .all(|simple| self.simple_matches(simple, node, scope))
    }

    fn simple_matches(&self, simple: &Simple, node: A::Node, scope: &[A::Node]) -> bool {
        let adapter = self.adapter;
        match simple {
            // [§ 5.1](https://www.w3.org/TR/selectors-4/#type-selectors)
            Simple::Tag(name) => adapter
                .name(node)
                .is_some_and(|actual| self.names_equal(actual, name)),
            // [§ 6.7](https://www.w3.org/TR/selectors-4/#id-selectors)
            Simple::Id(id) => adapter.attribute(node, "id") == Some(id.as_str()),
            // [§ 6.6](https://www.w3.org/TR/selectors-4/#class-html)
            Simple::Class(class) => adapter
                .attribute(node, "class")
                .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class)),
            Simple::Attribute(attr) => self.attribute_matches(attr, node),
            Simple::Pseudo(pseudo) => self.pseudo_matches(pseudo, node, scope),
            Simple::Never => false,
        }
    }

    /// [§ 6.1 Attribute presence and value selectors](https://www.w3.org/TR/selectors-4/#attribute-representation)
    /// [§ 6.2 Substring matching attribute selectors](https://www.w3.org/TR/selectors-4/#attribute-substrings)
    fn attribute_matches(&self, attr: &AttributeSelector, node: A::Node) -> bool {
        let actual = self.adapter.attribute(node, &attr.name);
        let fold = |s: &str| {
            if attr.ignore_case == Some(true) {
                s.to_lowercase()
            } else {
                s.to_string()
            }
        };
        let expected = fold(&attr.value);

        match attr.action {
            AttributeAction::Exists => actual.is_some(),
            // `[attr!='']` asks for a non-empty value; otherwise a missing
            // attribute counts as different.
            AttributeAction::NotEqual => match actual {
                None => !expected.is_empty(),
                Some(value) => {
                    if expected.is_empty() {
                        !value.is_empty()
                    } else {
                        fold(value) != expected
                    }
                }
            },
            action => actual.is_some_and(|value| {
                let value = fold(value);
                match action {
                    AttributeAction::Equals => value == expected,
                    AttributeAction::Includes => {
                        !expected.is_empty()
                            && !expected.contains(char::is_whitespace)
                            && value.split_ascii_whitespace().any(|word| word == expected)
                    }
                    AttributeAction::DashMatch => {
                        value == expected
                            || value
                                .strip_prefix(expected.as_str())
                                .is_some_and(|rest| rest.starts_with('-'))
                    }
                    AttributeAction::PrefixMatch => {
                        !expected.is_empty() && value.starts_with(expected.as_str())
                    }
                    AttributeAction::SuffixMatch => {
                        !expected.is_empty() && value.ends_with(expected.as_str())
                    }
                    AttributeAction::SubstringMatch => {
                        !expected.is_empty() && value.contains(expected.as_str())
                    }
                    AttributeAction::Exists | AttributeAction::NotEqual => false,
                }
            }),
        }
    }

    /// Ancestors of `node` that are elements, nearest first.
    fn element_ancestors(&self, node: A::Node) -> impl Iterator<Item = A::Node> {
        let adapter = self.adapter;
        iter::successors(adapter.parent(node), move |&n| adapter.parent(n))
            .filter(move |&n| adapter.is_tag(n))
    }

    /// Element siblings before `node`, nearest first.
    fn preceding_elements(&self, node: A::Node) -> impl Iterator<Item = A::Node> {
        let adapter = self.adapter;
        iter::successors(adapter.prev_sibling(node), move |&n| adapter.prev_sibling(n))
            .filter(move |&n| adapter.is_tag(n))
    }

    /// Element siblings after `node`, nearest first.
    fn following_elements(&self, node: A::Node) -> impl Iterator<Item = A::Node> {
        let adapter = self.adapter;
        iter::successors(adapter.next_sibling(node), move |&n| adapter.next_sibling(n))
            .filter(move |&n| adapter.is_tag(n))
    }
}
