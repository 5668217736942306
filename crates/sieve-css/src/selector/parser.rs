//! Selector text to token chains.
//!
//! [§ 18 Grammar](https://www.w3.org/TR/selectors-4/#grammar)
//!
//! The parser is a single left-to-right pass over the input. It accepts the
//! jQuery extensions the positional engine needs (`[attr!=value]`, and
//! arbitrary `:name(argument)` pseudo-classes) and leaves all semantic checks
//! (unknown pseudo-classes, bad `An+B` formulas) to the compiler.

use thiserror::Error;

use super::{
    AttributeAction, AttributeSelector, LEGACY_PSEUDO_ELEMENTS, PseudoData, PseudoSelector,
    SELECTOR_PSEUDOS, SelectorChain, SelectorGroup, Token, Traversal,
};

/// Malformed selector text. Offsets are byte offsets into the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A character that cannot start or continue a selector here.
    #[error("unexpected character '{ch}' at offset {position}")]
    UnexpectedCharacter {
        /// The offending character.
        ch: char,
        /// Where it was found.
        position: usize,
    },

    /// The input stopped in the middle of an escape sequence.
    #[error("unexpected end of selector at offset {position}")]
    UnexpectedEnd {
        /// End of input.
        position: usize,
    },

    /// A quoted string was never closed.
    #[error("unterminated string starting at offset {position}")]
    UnterminatedString {
        /// Offset of the opening quote.
        position: usize,
    },

    /// An attribute selector was never closed with `]`.
    #[error("unterminated attribute selector starting at offset {position}")]
    UnterminatedAttribute {
        /// Offset of the opening bracket.
        position: usize,
    },

    /// A pseudo-class argument was never closed with `)`.
    #[error("unbalanced parenthesis at offset {position}")]
    UnbalancedParenthesis {
        /// Offset of the opening parenthesis.
        position: usize,
    },

    /// An alternative of a selector list contains nothing, as in `a, , b`.
    #[error("empty sub-selector at offset {position}")]
    EmptySubSelector {
        /// Where the empty alternative starts.
        position: usize,
    },

    /// A combinator ends an alternative, as in `div >`.
    #[error("combinator at offset {position} is not followed by a selector")]
    DanglingCombinator {
        /// Where the selector after the combinator was expected.
        position: usize,
    },

    /// `#`, `.`, `:` or `[` without the identifier that must follow.
    #[error("expected an identifier at offset {position}")]
    MissingName {
        /// Where the identifier was expected.
        position: usize,
    },
}

/// Parse selector text into a group of token chains.
///
/// Blank input yields an empty group. Chains may start with a combinator
/// (`> p`, `~ em`), which makes them relative to whatever context the
/// selector is later evaluated in.
///
/// # Errors
///
/// Returns a [`ParseError`] for unbalanced brackets or quotes, empty
/// alternatives, dangling combinators, and characters outside the grammar.
pub fn parse(input: &str) -> Result<SelectorGroup, ParseError> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    Parser { input, pos: 0 }.parse_group(false)
}

/// [§ 4.3.9 ident code point](https://www.w3.org/TR/css-syntax-3/#ident-code-point)
///
/// Digits are accepted anywhere so that `#1st` style ids still parse.
const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            let _ = self.bump();
        }
    }

    /// Parse comma-separated chains. Inside a pseudo-class argument
    /// (`nested`), stop in front of the closing parenthesis.
    fn parse_group(&mut self, nested: bool) -> Result<SelectorGroup, ParseError> {
        let mut group = Vec::new();
        loop {
            let start = self.pos;
            let chain = self.parse_chain(nested)?;
            if chain.is_empty() {
                return Err(ParseError::EmptySubSelector { position: start });
            }
            group.push(chain);

            match self.peek() {
                Some(',') => {
                    let _ = self.bump();
                }
                Some(')') if nested => return Ok(group),
                None if nested => {
                    return Err(ParseError::UnbalancedParenthesis { position: self.pos });
                }
                None => return Ok(group),
                Some(ch) => {
                    return Err(ParseError::UnexpectedCharacter {
                        ch,
                        position: self.pos,
                    });
                }
            }
        }
    }

    fn parse_chain(&mut self, nested: bool) -> Result<SelectorChain, ParseError> {
        let mut tokens: SelectorChain = Vec::new();
        self.skip_whitespace();

        while let Some(c) = self.peek() {
            match c {
                ',' => break,
                ')' if nested => break,

                // [§ 16.1 Descendant combinator](https://www.w3.org/TR/selectors-4/#descendant-combinators)
                // Whitespace is a descendant combinator unless an explicit
                // combinator, a comma, or the end of the chain follows.
                _ if c.is_whitespace() => {
                    self.skip_whitespace();
                    let explicit_follows = match self.peek() {
                        None | Some(',' | '>' | '+' | '~') => true,
                        Some(')') => nested,
                        Some(_) => false,
                    };
                    if !explicit_follows && tokens.last().is_some_and(|t| !t.is_traversal()) {
                        tokens.push(Token::Traversal(Traversal::Descendant));
                    }
                }

                '>' | '+' | '~' => {
                    let position = self.pos;
                    let _ = self.bump();
                    if tokens.last().is_some_and(Token::is_traversal) {
                        return Err(ParseError::UnexpectedCharacter { ch: c, position });
                    }
                    let kind = match c {
                        '>' => Traversal::Child,
                        '+' => Traversal::Adjacent,
                        _ => Traversal::Sibling,
                    };
                    tokens.push(Token::Traversal(kind));
                    self.skip_whitespace();
                }

                '*' => {
                    let _ = self.bump();
                    tokens.push(Token::Universal);
                }

                '#' => {
                    let _ = self.bump();
                    tokens.push(Token::Id(self.parse_name()?));
                }

                '.' => {
                    let _ = self.bump();
                    tokens.push(Token::Class(self.parse_name()?));
                }

                '[' => tokens.push(self.parse_attribute()?),

                ':' => tokens.push(self.parse_pseudo()?),

                _ if is_ident_char(c) || c == '\\' => tokens.push(Token::Tag(self.parse_name()?)),

                _ => {
                    return Err(ParseError::UnexpectedCharacter {
                        ch: c,
                        position: self.pos,
                    });
                }
            }
        }

        if tokens.last().is_some_and(Token::is_traversal) {
            return Err(ParseError::DanglingCombinator { position: self.pos });
        }
        Ok(tokens)
    }

    /// [§ 4.3.11 consume an ident sequence](https://www.w3.org/TR/css-syntax-3/#consume-name)
    fn parse_name(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_ident_char(c) {
                let _ = self.bump();
                name.push(c);
            } else if c == '\\' {
                let _ = self.bump();
                name.push(self.parse_escape()?);
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(ParseError::MissingName { position: start });
        }
        Ok(name)
    }

    /// [§ 4.3.7 consume an escaped code point](https://www.w3.org/TR/css-syntax-3/#consume-escaped-code-point)
    ///
    /// Called just after the backslash.
    fn parse_escape(&mut self) -> Result<char, ParseError> {
        let start = self.pos;
        let mut hex = String::new();
        while hex.len() < 6 && self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            if let Some(c) = self.bump() {
                hex.push(c);
            }
        }

        if hex.is_empty() {
            return self.bump().ok_or(ParseError::UnexpectedEnd { position: start });
        }

        // "If the next input code point is whitespace, consume it as well."
        if self.peek().is_some_and(char::is_whitespace) {
            let _ = self.bump();
        }
        Ok(u32::from_str_radix(&hex, 16)
            .ok()
            .filter(|&code| code != 0)
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    /// [§ 4.3.5 consume a string token](https://www.w3.org/TR/css-syntax-3/#consume-string-token)
    ///
    /// Called with the opening quote as the next character.
    fn parse_string(&mut self, quote: char) -> Result<String, ParseError> {
        let start = self.pos;
        let _ = self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(ParseError::UnterminatedString { position: start }),
                Some(c) if c == quote => return Ok(value),
                Some('\\') => {
                    // An escaped newline is a line continuation.
                    if self.eat('\n') {
                        continue;
                    }
                    value.push(self.parse_escape()?);
                }
                Some(c) => value.push(c),
            }
        }
    }

    /// [§ 6 Attribute selectors](https://www.w3.org/TR/selectors-4/#attribute-selectors)
    fn parse_attribute(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;
        let _ = self.bump();
        self.skip_whitespace();
        let name = self.parse_name()?;
        self.skip_whitespace();

        let action_at = self.pos;
        let action = match self.bump() {
            Some(']') => {
                return Ok(Token::Attribute(AttributeSelector {
                    name,
                    action: AttributeAction::Exists,
                    value: String::new(),
                    ignore_case: None,
                }));
            }
            Some('=') => AttributeAction::Equals,
            Some(op @ ('~' | '|' | '^' | '$' | '*' | '!')) => {
                if !self.eat('=') {
                    return Err(ParseError::UnexpectedCharacter {
                        ch: op,
                        position: action_at,
                    });
                }
                match op {
                    '~' => AttributeAction::Includes,
                    '|' => AttributeAction::DashMatch,
                    '^' => AttributeAction::PrefixMatch,
                    '$' => AttributeAction::SuffixMatch,
                    '*' => AttributeAction::SubstringMatch,
                    _ => AttributeAction::NotEqual,
                }
            }
            Some(ch) => {
                return Err(ParseError::UnexpectedCharacter {
                    ch,
                    position: action_at,
                });
            }
            None => return Err(ParseError::UnterminatedAttribute { position: start }),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => self.parse_string(quote)?,
            Some(_) => self.parse_name()?,
            None => return Err(ParseError::UnterminatedAttribute { position: start }),
        };
        self.skip_whitespace();

        // [§ 6.3 Case-sensitivity](https://www.w3.org/TR/selectors-4/#attribute-case)
        let ignore_case = match self.peek() {
            Some('i' | 'I') => Some(true),
            Some('s' | 'S') => Some(false),
            _ => None,
        };
        if ignore_case.is_some() {
            let _ = self.bump();
            self.skip_whitespace();
        }

        match self.bump() {
            Some(']') => Ok(Token::Attribute(AttributeSelector {
                name,
                action,
                value,
                ignore_case,
            })),
            Some(ch) => Err(ParseError::UnexpectedCharacter {
                ch,
                position: self.pos - ch.len_utf8(),
            }),
            None => Err(ParseError::UnterminatedAttribute { position: start }),
        }
    }

    /// [§ 3.5 Pseudo-classes](https://www.w3.org/TR/selectors-4/#pseudo-classes)
    /// [§ 3.6 Pseudo-elements](https://www.w3.org/TR/selectors-4/#pseudo-elements)
    fn parse_pseudo(&mut self) -> Result<Token, ParseError> {
        let _ = self.bump();

        if self.eat(':') {
            let name = self.parse_name()?.to_ascii_lowercase();
            if self.peek() == Some('(') {
                let open = self.pos;
                let _ = self.bump();
                let _ = self.parse_raw_argument(open)?;
            }
            return Ok(Token::PseudoElement(name));
        }

        let name = self.parse_name()?.to_ascii_lowercase();
        if LEGACY_PSEUDO_ELEMENTS.contains(&name.as_str()) {
            return Ok(Token::PseudoElement(name));
        }

        if self.peek() != Some('(') {
            return Ok(Token::Pseudo(PseudoSelector {
                name,
                data: PseudoData::None,
            }));
        }

        let open = self.pos;
        let _ = self.bump();
        let data = if SELECTOR_PSEUDOS.contains(&name.as_str()) {
            let group = self.parse_group(true)?;
            if !self.eat(')') {
                return Err(ParseError::UnbalancedParenthesis { position: open });
            }
            PseudoData::Selectors(group)
        } else {
            PseudoData::Argument(self.parse_raw_argument(open)?)
        };

        Ok(Token::Pseudo(PseudoSelector { name, data }))
    }

    /// Read a pseudo-class argument up to its closing parenthesis, which is
    /// consumed. A fully quoted argument is unquoted; anything else is kept
    /// verbatim (trimmed), nested parentheses and quotes included.
    fn parse_raw_argument(&mut self, open: usize) -> Result<String, ParseError> {
        self.skip_whitespace();

        if let Some(quote @ ('"' | '\'')) = self.peek() {
            let value = self.parse_string(quote)?;
            self.skip_whitespace();
            return match self.bump() {
                Some(')') => Ok(value),
                Some(ch) => Err(ParseError::UnexpectedCharacter {
                    ch,
                    position: self.pos - ch.len_utf8(),
                }),
                None => Err(ParseError::UnbalancedParenthesis { position: open }),
            };
        }

        let start = self.pos;
        let mut depth = 1u32;
        loop {
            match self.peek() {
                None => return Err(ParseError::UnbalancedParenthesis { position: open }),
                Some(quote @ ('"' | '\'')) => {
                    let _ = self.parse_string(quote)?;
                }
                Some(c) => {
                    let _ = self.bump();
                    match c {
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        '\\' => {
                            let _ = self.bump();
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(self.input[start..self.pos - 1].trim().to_string())
    }
}
