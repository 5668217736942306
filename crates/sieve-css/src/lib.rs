//! CSS selector parsing and structural matching for the sieve selector engine.
//!
//! # Scope
//!
//! This crate implements:
//! - **Selector Parsing** ([Selectors Level 4](https://www.w3.org/TR/selectors-4/))
//!   - Type, universal, class, ID and attribute selectors
//!   - All four combinators and comma-separated selector lists
//!   - Pseudo-classes with raw or nested-selector arguments
//!   - Escapes and quoted strings
//!
//! - **Structural Matching** ([§ 4.1](https://www.w3.org/TR/selectors-4/#match-a-selector-against-an-element))
//!   - Right-to-left matching over any [`sieve_dom::Adapter`]
//!   - `:scope` contexts and relative selectors (`> p`, `+ p`)
//!   - Structural, logical and shorthand pseudo-classes
//!   - Caller-registered pseudo-classes
//!
//! # Not Implemented
//!
//! - Positional filters such as `:first` or `:eq(n)`. The parser accepts them
//!   as ordinary pseudo-classes; the matcher rejects them as unknown.
//! - Interactive states (`:hover`, `:focus`, ...) and pseudo-elements, which
//!   compile but never match.

pub mod compile;
pub mod selector;

pub use compile::{CompileError, CompiledQuery, Context, MatchOptions, PseudoRegistry, compile};
pub use selector::{ParseError, SelectorChain, SelectorGroup, Token, Traversal, parse};
