//! Pseudo-classes understood by the structural matcher.
//!
//! [§ 3.5 Pseudo-classes](https://www.w3.org/TR/selectors-4/#pseudo-classes)
//!
//! Three families:
//! - structural and logical pseudo-classes, evaluated directly;
//! - shorthand pseudo-classes (`:checked`, `:header`, ...), expanded into
//!   a selector and compiled like `:is(...)`;
//! - caller-registered pseudo-classes from a [`PseudoRegistry`].
//!
//! Interactive states (`:hover`, `:focus`, ...) have no meaning for a static
//! tree; they compile but never match.

use std::collections::HashMap;
use std::fmt;

use sieve_common::warning::warn_once;
use sieve_dom::{Adapter, find};

use super::{CompileError, CompiledQuery, Compiler, ComplexSelector, Simple};
use crate::selector::{PseudoData, PseudoSelector, Token, Traversal, parse};

/// Predicate behind a registered pseudo-class: adapter, candidate element
/// and the argument between the parentheses, if any.
pub type PseudoPredicate<A> =
    Box<dyn Fn(&A, <A as Adapter>::Node, Option<&str>) -> bool>;

/// How a registered pseudo-class is evaluated.
pub enum PseudoHandler<A: Adapter + ?Sized> {
    /// Selector text the pseudo-class stands for, e.g. `"input[type=radio]"`.
    Selector(String),
    /// Arbitrary predicate.
    Predicate(PseudoPredicate<A>),
}

/// Caller-owned table of extra pseudo-classes.
///
/// Entries take precedence over built-in pseudo-classes of the same name.
///
/// ```
/// use sieve_css::compile::PseudoRegistry;
/// use sieve_dom::{Adapter, DomTree};
///
/// let pseudos = PseudoRegistry::<DomTree>::new()
///     .with_selector("radio-group", "input[type=radio]")
///     .with_predicate("lang", |tree, node, lang| tree.attribute(node, "lang") == lang);
/// assert!(pseudos.get("lang").is_some());
/// ```
pub struct PseudoRegistry<A: Adapter + ?Sized> {
    handlers: HashMap<String, PseudoHandler<A>>,
}

impl<A: Adapter + ?Sized> PseudoRegistry<A> {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `:name` as shorthand for `selector`.
    #[must_use]
    pub fn with_selector(mut self, name: &str, selector: &str) -> Self {
        let _ = self.handlers.insert(
            name.to_ascii_lowercase(),
            PseudoHandler::Selector(selector.to_string()),
        );
        self
    }

    /// Register `:name` / `:name(arg)` as a predicate.
    #[must_use]
    pub fn with_predicate<F>(mut self, name: &str, predicate: F) -> Self
    where
        F: Fn(&A, A::Node, Option<&str>) -> bool + 'static,
    {
        let _ = self.handlers.insert(
            name.to_ascii_lowercase(),
            PseudoHandler::Predicate(Box::new(predicate)),
        );
        self
    }

    /// Handler registered under `name` (lower-case).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PseudoHandler<A>> {
        self.handlers.get(name)
    }
}

impl<A: Adapter + ?Sized> Default for PseudoRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Adapter + ?Sized> fmt::Debug for PseudoRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("PseudoRegistry").field("names", &names).finish()
    }
}

/// [§ 14.1 An+B microsyntax](https://www.w3.org/TR/css-syntax-3/#anb-microsyntax)
///
/// Matches the 1-based positions `a*n + b` for some `n >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nth {
    /// Step.
    pub a: i64,
    /// Offset.
    pub b: i64,
}

impl Nth {
    /// Parse `odd`, `even`, `3`, `2n+1`, `-n + 3`, ...
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim().to_ascii_lowercase();
        match text.as_str() {
            "odd" => return Some(Self { a: 2, b: 1 }),
            "even" => return Some(Self { a: 2, b: 0 }),
            _ => {}
        }

        let Some(n_at) = text.find('n') else {
            return text.parse().ok().map(|b| Self { a: 0, b });
        };

        let a = match text[..n_at].trim() {
            "" | "+" => 1,
            "-" => -1,
            step => step.parse().ok()?,
        };
        let rest: String = text[n_at + 1..]
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let b = if rest.is_empty() {
            0
        } else if rest.starts_with(['+', '-']) {
            rest.parse().ok()?
        } else {
            return None;
        };
        Some(Self { a, b })
    }

    /// Whether the 1-based `position` is selected.
    #[must_use]
    pub fn matches(self, position: i64) -> bool {
        if self.a == 0 {
            return position == self.b;
        }
        // Widened so extreme offsets cannot overflow.
        let a = i128::from(self.a);
        let diff = i128::from(position) - i128::from(self.b);
        diff % a == 0 && diff / a >= 0
    }
}

/// Which siblings an `:nth-*` pseudo-class counts, and from which end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum NthKind {
    Child,
    LastChild,
    OfType,
    LastOfType,
}

/// A compiled pseudo-class.
#[derive(Debug, Clone)]
pub(super) enum Pseudo {
    /// [§ 3.5.3 :scope](https://www.w3.org/TR/selectors-4/#the-scope-pseudo)
    Scope,
    /// [§ 14.1 :root](https://www.w3.org/TR/selectors-4/#the-root-pseudo)
    Root,
    /// [§ 14.2 :empty](https://www.w3.org/TR/selectors-4/#the-empty-pseudo)
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    Nth(NthKind, Nth),
    /// [§ 4.3 :not](https://www.w3.org/TR/selectors-4/#negation)
    Not(Vec<ComplexSelector>),
    /// [§ 4.2 :is](https://www.w3.org/TR/selectors-4/#matches), also `:where`
    /// and `:matches`.
    Is(Vec<ComplexSelector>),
    /// [§ 4.5 :has](https://www.w3.org/TR/selectors-4/#relational). The flag
    /// is set when a chain starts with `+` or `~`, so following siblings of
    /// the element are searched too.
    Has(Vec<ComplexSelector>, bool),
    /// jQuery's `:contains(text)` over the element's text content.
    Contains { text: String, ignore_case: bool },
    /// Registered predicate.
    Custom {
        name: String,
        argument: Option<String>,
    },
}

/// Shorthand pseudo-classes and the selector each one stands for.
fn alias(name: &str) -> Option<&'static str> {
    Some(match name {
        "any-link" | "link" => ":is(a, area, link)[href]",
        "checked" => {
            ":is(:is(input[type=radio], input[type=checkbox])[checked], option:selected)"
        }
        "selected" => {
            "option:is([selected], select:not([multiple]):not(:has(> option[selected])) > :first-of-type)"
        }
        "disabled" => {
            ":is(:is(button, input, select, textarea, optgroup, option)[disabled], optgroup[disabled] > option, fieldset[disabled] *)"
        }
        "enabled" => ":not(:disabled)",
        "required" => ":is(input, select, textarea)[required]",
        "optional" => ":is(input, select, textarea):not([required])",
        "parent" => ":not(:empty)",
        "header" => ":is(h1, h2, h3, h4, h5, h6)",
        "button" => ":is(button, input[type=button])",
        "input" => ":is(input, textarea, select, button)",
        "text" => "input:is(:not([type!='']), [type=text])",
        "checkbox" => "[type=checkbox]",
        "file" => "[type=file]",
        "password" => "[type=password]",
        "radio" => "[type=radio]",
        "reset" => "[type=reset]",
        "image" => "[type=image]",
        "submit" => "[type=submit]",
        _ => return None,
    })
}

/// User-action and time-dimensional states.
const INTERACTIVE: &[&str] = &[
    "hover",
    "active",
    "focus",
    "focus-within",
    "focus-visible",
    "visited",
    "target",
    "target-within",
];

fn plain(name: &str) -> Option<Pseudo> {
    Some(match name {
        "scope" => Pseudo::Scope,
        "root" => Pseudo::Root,
        "empty" => Pseudo::Empty,
        "first-child" => Pseudo::FirstChild,
        "last-child" => Pseudo::LastChild,
        "only-child" => Pseudo::OnlyChild,
        "first-of-type" => Pseudo::FirstOfType,
        "last-of-type" => Pseudo::LastOfType,
        "only-of-type" => Pseudo::OnlyOfType,
        _ => return None,
    })
}

fn nth_kind(name: &str) -> Option<NthKind> {
    Some(match name {
        "nth-child" => NthKind::Child,
        "nth-last-child" => NthKind::LastChild,
        "nth-of-type" => NthKind::OfType,
        "nth-last-of-type" => NthKind::LastOfType,
        _ => return None,
    })
}

impl<A: Adapter + ?Sized> Compiler<'_, A> {
    pub(super) fn compile_pseudo(&self, pseudo: &PseudoSelector) -> Result<Simple, CompileError> {
        let name = pseudo.name.as_str();

        if let Some(handler) = self.pseudos.and_then(|registry| registry.get(name)) {
            return match handler {
                PseudoHandler::Selector(text) => {
                    if !matches!(pseudo.data, PseudoData::None) {
                        return Err(CompileError::UnexpectedArgument(name.to_string()));
                    }
                    let group = parse(text).map_err(|source| CompileError::InvalidCustomPseudo {
                        name: name.to_string(),
                        source,
                    })?;
                    Ok(Simple::Pseudo(Pseudo::Is(self.compile_group(&group)?)))
                }
                PseudoHandler::Predicate(_) => Ok(Simple::Pseudo(Pseudo::Custom {
                    name: name.to_string(),
                    argument: pseudo.data.argument().map(str::to_string),
                })),
            };
        }

        match name {
            "not" | "is" | "matches" | "where" | "has" => {
                let group = pseudo
                    .data
                    .selectors()
                    .ok_or_else(|| CompileError::MissingArgument(name.to_string()))?;
                let compiled = match name {
                    "not" => Pseudo::Not(self.compile_group(group)?),
                    "has" => self.compile_has(group)?,
                    _ => Pseudo::Is(self.compile_group(group)?),
                };
                Ok(Simple::Pseudo(compiled))
            }
            "contains" | "icontains" => {
                let text = required_argument(pseudo)?;
                Ok(Simple::Pseudo(Pseudo::Contains {
                    text: text.to_string(),
                    ignore_case: name == "icontains",
                }))
            }
            _ => {
                if let Some(kind) = nth_kind(name) {
                    let text = required_argument(pseudo)?;
                    let formula =
                        Nth::parse(text).ok_or_else(|| CompileError::InvalidNth(text.to_string()))?;
                    return Ok(Simple::Pseudo(Pseudo::Nth(kind, formula)));
                }

                let known = plain(name).is_some()
                    || alias(name).is_some()
                    || INTERACTIVE.contains(&name);
                if !known {
                    return Err(CompileError::UnknownPseudoClass(name.to_string()));
                }
                if !matches!(pseudo.data, PseudoData::None) {
                    return Err(CompileError::UnexpectedArgument(name.to_string()));
                }

                if let Some(compiled) = plain(name) {
                    Ok(Simple::Pseudo(compiled))
                } else if let Some(selector) = alias(name) {
                    let group = parse(selector).map_err(|source| {
                        CompileError::InvalidCustomPseudo {
                            name: name.to_string(),
                            source,
                        }
                    })?;
                    Ok(Simple::Pseudo(Pseudo::Is(self.compile_group(&group)?)))
                } else {
                    let _ = warn_once(
                        "Selector",
                        &format!("pseudo-class ':{name}' never matches in a static tree"),
                    );
                    Ok(Simple::Never)
                }
            }
        }
    }

    /// Every `:has` chain is relative to the element being tested: `:has(p)`
    /// means `:scope p`, `:has(> p)` means `:scope > p`.
    fn compile_has(&self, group: &[Vec<Token>]) -> Result<Pseudo, CompileError> {
        let mut siblings = false;
        let mut selectors = Vec::with_capacity(group.len());
        for chain in group {
            let mut scoped = vec![Token::scope()];
            match chain.first().and_then(Token::traversal) {
                Some(kind) => {
                    siblings |= matches!(kind, Traversal::Adjacent | Traversal::Sibling);
                }
                None => scoped.push(Token::Traversal(Traversal::Descendant)),
            }
            scoped.extend(chain.iter().cloned());
            selectors.push(self.compile_chain(&scoped, false)?);
        }
        Ok(Pseudo::Has(selectors, siblings))
    }
}

fn required_argument(pseudo: &PseudoSelector) -> Result<&str, CompileError> {
    match &pseudo.data {
        PseudoData::Argument(text) => Ok(text),
        PseudoData::Selectors(_) => Err(CompileError::UnexpectedArgument(pseudo.name.clone())),
        PseudoData::None => Err(CompileError::MissingArgument(pseudo.name.clone())),
    }
}

/// Count into an `i64` position, saturating on absurd sibling counts.
fn position(count: usize) -> i64 {
    i64::try_from(count).map_or(i64::MAX, |n| n.saturating_add(1))
}

impl<A: Adapter + ?Sized> CompiledQuery<'_, A> {
    pub(super) fn pseudo_matches(&self, pseudo: &Pseudo, node: A::Node, scope: &[A::Node]) -> bool {
        let adapter = self.adapter;
        let same_type = |other: A::Node| match (adapter.name(other), adapter.name(node)) {
            (Some(a), Some(b)) => self.names_equal(a, b),
            _ => false,
        };

        match pseudo {
            Pseudo::Scope => {
                if scope.is_empty() {
                    self.is_root(node)
                } else {
                    scope.contains(&node)
                }
            }
            Pseudo::Root => self.is_root(node),
            // Comments and empty text nodes don't count as content.
            Pseudo::Empty => adapter.children(node).iter().all(|&child| {
                !adapter.is_tag(child) && adapter.text(child).is_none_or(str::is_empty)
            }),
            Pseudo::FirstChild => self.preceding_elements(node).next().is_none(),
            Pseudo::LastChild => self.following_elements(node).next().is_none(),
            Pseudo::OnlyChild => {
                self.preceding_elements(node).next().is_none()
                    && self.following_elements(node).next().is_none()
            }
            Pseudo::FirstOfType => !self.preceding_elements(node).any(same_type),
            Pseudo::LastOfType => !self.following_elements(node).any(same_type),
            Pseudo::OnlyOfType => {
                !self.preceding_elements(node).any(same_type)
                    && !self.following_elements(node).any(same_type)
            }
            Pseudo::Nth(kind, formula) => {
                let count = match kind {
                    NthKind::Child => self.preceding_elements(node).count(),
                    NthKind::LastChild => self.following_elements(node).count(),
                    NthKind::OfType => self.preceding_elements(node).filter(|&n| same_type(n)).count(),
                    NthKind::LastOfType => {
                        self.following_elements(node).filter(|&n| same_type(n)).count()
                    }
                };
                formula.matches(position(count))
            }
            Pseudo::Not(selectors) => !selectors
                .iter()
                .any(|s| self.matches_complex(s, node, scope, false)),
            Pseudo::Is(selectors) => selectors
                .iter()
                .any(|s| self.matches_complex(s, node, scope, false)),
            Pseudo::Has(selectors, siblings) => {
                let inner_scope = [node];
                let mut roots = adapter.children(node).to_vec();
                if *siblings {
                    roots.extend(self.following_elements(node));
                }
                let test = |candidate: A::Node| {
                    adapter.is_tag(candidate)
                        && selectors
                            .iter()
                            .any(|s| self.matches_complex(s, candidate, &inner_scope, false))
                };
                !find(adapter, test, &roots, true, Some(1)).is_empty()
            }
            Pseudo::Contains { text, ignore_case } => {
                let content = adapter.text_content(node);
                if *ignore_case {
                    content.to_lowercase().contains(&text.to_lowercase())
                } else {
                    content.contains(text.as_str())
                }
            }
            Pseudo::Custom { name, argument } => {
                match self.pseudos.and_then(|registry| registry.get(name)) {
                    Some(PseudoHandler::Predicate(predicate)) => {
                        predicate(adapter, node, argument.as_deref())
                    }
                    _ => false,
                }
            }
        }
    }

    /// An element whose parent is missing or is not an element.
    fn is_root(&self, node: A::Node) -> bool {
        self.adapter
            .parent(node)
            .is_none_or(|parent| !self.adapter.is_tag(parent))
    }
}
