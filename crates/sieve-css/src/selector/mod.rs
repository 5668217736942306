//! Selector token model.
//!
//! A selector is kept as flat token chains rather than a nested AST so that
//! callers can cut a chain at any token, splice new tokens in, and hand the
//! pieces back to the matcher. This is what lets positional filters be
//! evaluated outside of the structural matcher.
//!
//! `div > p:first, span` becomes
//! ```text
//! [
//!   [Tag(div), Traversal(Child), Tag(p), Pseudo(first)],
//!   [Tag(span)],
//! ]
//! ```

mod parser;

use serde::Serialize;

pub use parser::{ParseError, parse};

/// [§ 4.3 Complex selectors](https://www.w3.org/TR/selectors-4/#complex)
///
/// One alternative of a selector list: tokens in source order, left to right.
pub type SelectorChain = Vec<Token>;

/// [§ 4.1 Selector lists](https://www.w3.org/TR/selectors-4/#grouping)
///
/// "A selector list is a comma-separated list of selectors. [...] it matches
/// any element that is matched by any of the selectors in the list."
pub type SelectorGroup = Vec<SelectorChain>;

/// A single selector token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Token {
    /// [§ 5.2 Universal selector](https://www.w3.org/TR/selectors-4/#universal-selector)
    ///
    /// Example: `*`
    Universal,

    /// [§ 5.1 Type selector](https://www.w3.org/TR/selectors-4/#type-selectors)
    ///
    /// Examples: `div`, `p`, `span`. The name is kept as written.
    Tag(String),

    /// [§ 6.7 ID selector](https://www.w3.org/TR/selectors-4/#id-selectors)
    ///
    /// Example: `#main`
    Id(String),

    /// [§ 6.6 Class selector](https://www.w3.org/TR/selectors-4/#class-html)
    ///
    /// Example: `.highlight`
    Class(String),

    /// [§ 6 Attribute selectors](https://www.w3.org/TR/selectors-4/#attribute-selectors)
    ///
    /// Examples: `[href]`, `[type=text]`, `[lang|=en i]`
    Attribute(AttributeSelector),

    /// [§ 3.5 Pseudo-classes](https://www.w3.org/TR/selectors-4/#pseudo-classes)
    ///
    /// Examples: `:first-child`, `:not(.a)`, `:eq(2)`. Names are lower-cased.
    Pseudo(PseudoSelector),

    /// [§ 3.6 Pseudo-elements](https://www.w3.org/TR/selectors-4/#pseudo-elements)
    ///
    /// Examples: `::before`, and the legacy single-colon `:after`.
    PseudoElement(String),

    /// [§ 16 Combinators](https://www.w3.org/TR/selectors-4/#combinators)
    Traversal(Traversal),
}

impl Token {
    /// A pseudo-class token without an argument.
    #[must_use]
    pub fn pseudo(name: &str) -> Self {
        Self::Pseudo(PseudoSelector {
            name: name.to_string(),
            data: PseudoData::None,
        })
    }

    /// The `:scope` pseudo-class.
    #[must_use]
    pub fn scope() -> Self {
        Self::pseudo("scope")
    }

    /// Whether this token is a combinator.
    #[must_use]
    pub const fn is_traversal(&self) -> bool {
        matches!(self, Self::Traversal(_))
    }

    /// The combinator kind, if this token is one.
    #[must_use]
    pub const fn traversal(&self) -> Option<Traversal> {
        match self {
            Self::Traversal(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Whether this token is a pseudo-class named `name`.
    #[must_use]
    pub fn is_pseudo(&self, name: &str) -> bool {
        matches!(self, Self::Pseudo(p) if p.name == name)
    }
}

/// [§ 16 Combinators](https://www.w3.org/TR/selectors-4/#combinators)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Traversal {
    /// [§ 16.1 Descendant combinator](https://www.w3.org/TR/selectors-4/#descendant-combinators)
    /// "A selector of the form 'A B' represents an element B that is an
    /// arbitrary descendant of some ancestor element A."
    Descendant,

    /// [§ 16.2 Child combinator](https://www.w3.org/TR/selectors-4/#child-combinators)
    /// "A selector of the form 'A > B' represents an element B that is a
    /// direct child of element A."
    Child,

    /// [§ 16.4 Subsequent-sibling combinator](https://www.w3.org/TR/selectors-4/#general-sibling-combinators)
    /// "A selector of the form 'A ~ B' represents an element B that follows
    /// element A (not necessarily immediately), where A and B share the same parent."
    Sibling,

    /// [§ 16.3 Next-sibling combinator](https://www.w3.org/TR/selectors-4/#adjacent-sibling-combinators)
    /// "A selector of the form 'A + B' represents an element B that
    /// immediately follows element A, where A and B share the same parent."
    Adjacent,
}

/// Attribute selectors per [§ 6](https://www.w3.org/TR/selectors-4/#attribute-selectors)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeSelector {
    /// Attribute name as written.
    pub name: String,
    /// Comparison operator.
    pub action: AttributeAction,
    /// Value to compare against (empty for [`AttributeAction::Exists`]).
    pub value: String,
    /// `Some(true)` for an ` i` flag, `Some(false)` for ` s`, `None` when absent.
    pub ignore_case: Option<bool>,
}

/// Attribute comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AttributeAction {
    /// `[attr]` "Represents an element with the att attribute"
    Exists,
    /// `[attr=val]` "whose value is exactly 'val'"
    Equals,
    /// `[attr~=val]` "a whitespace-separated list of words, one of which is exactly 'val'"
    Includes,
    /// `[attr|=val]` "either being exactly 'val' or beginning with 'val' immediately followed by '-'"
    DashMatch,
    /// `[attr^=val]` "begins with the prefix 'val'"
    PrefixMatch,
    /// `[attr$=val]` "ends with the suffix 'val'"
    SuffixMatch,
    /// `[attr*=val]` "contains at least one instance of the substring 'val'"
    SubstringMatch,
    /// `[attr!=val]`, the jQuery extension: attribute missing or different.
    NotEqual,
}

/// A pseudo-class with its optional argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PseudoSelector {
    /// Lower-cased name without the leading colon.
    pub name: String,
    /// Parenthesized argument, if any.
    pub data: PseudoData,
}

/// Argument of a functional pseudo-class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PseudoData {
    /// No parentheses.
    None,
    /// Raw text argument, e.g. `2n+1` or `3`. Quotes are stripped.
    Argument(String),
    /// Nested selector list for `:not`, `:is`, `:matches`, `:where` and `:has`.
    Selectors(SelectorGroup),
}

impl PseudoData {
    /// The text argument, if this is one.
    #[must_use]
    pub fn argument(&self) -> Option<&str> {
        match self {
            Self::Argument(text) => Some(text),
            _ => None,
        }
    }

    /// The nested selector list, if this is one.
    #[must_use]
    pub const fn selectors(&self) -> Option<&SelectorGroup> {
        match self {
            Self::Selectors(group) => Some(group),
            _ => None,
        }
    }
}

/// Pseudo-classes whose argument is itself a selector list.
pub const SELECTOR_PSEUDOS: &[&str] = &["not", "is", "matches", "where", "has"];

/// Legacy pseudo-elements that may be written with a single colon.
pub const LEGACY_PSEUDO_ELEMENTS: &[&str] = &["before", "after", "first-line", "first-letter"];
