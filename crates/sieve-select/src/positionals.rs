//! Positional filters: `:first`, `:last`, `:eq(n)`, `:nth(n)`, `:gt(n)`,
//! `:lt(n)`, `:even`, `:odd`, and `:not(...)` wrapping any of them.
//!
//! These are jQuery extensions, not CSS. Their result depends on the ordered
//! candidate list they are applied to, so they can't be evaluated one
//! element at a time like the rest of a selector.

use sieve_css::selector::{PseudoData, SelectorGroup, Token};
use strum_macros::{Display, EnumString};

/// Upper bound on how many candidates a step needs. `None` is unbounded.
pub type Limit = Option<usize>;

/// A positional pseudo-class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Positional {
    /// First candidate.
    First,
    /// Last candidate.
    Last,
    /// Candidate at index `n`; negative indices count from the end.
    Eq,
    /// Same as [`Positional::Eq`]. Not CSS's `:nth-child`.
    Nth,
    /// Candidates after index `n`.
    Gt,
    /// Candidates before index `n`.
    Lt,
    /// Candidates at even zero-based indices.
    Even,
    /// Candidates at odd zero-based indices.
    Odd,
    /// Candidates not matched by the nested selector list.
    Not,
}

/// The positional filter a token stands for, with its argument.
///
/// `:not(...)` only counts when its selector list contains a positional
/// filter somewhere; a structural `:not` is left to the matcher.
#[must_use]
pub fn as_filter(token: &Token) -> Option<(Positional, &PseudoData)> {
    let Token::Pseudo(pseudo) = token else {
        return None;
    };
    let positional: Positional = pseudo.name.parse().ok()?;
    if positional == Positional::Not
        && !pseudo
            .data
            .selectors()
            .is_some_and(|group| group.iter().any(|chain| chain.iter().any(is_filter)))
    {
        return None;
    }
    Some((positional, &pseudo.data))
}

/// Whether `token` is a positional filter (see [`as_filter`]).
#[must_use]
pub fn is_filter(token: &Token) -> bool {
    as_filter(token).is_some()
}

/// Integer prefix of a positional argument, the way `parseInt` reads it:
/// leading whitespace and a sign are allowed, trailing junk is ignored.
/// `None` when no digit follows.
#[must_use]
pub fn parse_index(data: Option<&str>) -> Option<i64> {
    let text = data?.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Out-of-range values saturate; any index that large is past the end anyway.
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

fn to_limit(n: i64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

/// How many ordered candidates must be fetched before `filter` can be
/// applied.
///
/// `part_limit` caps the final result; it only applies when the filter is
/// the last token of its chain. `Some(0)` means the filter can never match.
#[must_use]
pub fn get_limit(filter: Positional, data: Option<&str>, part_limit: Limit) -> Limit {
    let index = parse_index(data);
    match filter {
        Positional::First => Some(1),
        Positional::Eq | Positional::Nth => match index {
            None => Some(0),
            Some(n) if n >= 0 => Some(to_limit(n).saturating_add(1)),
            Some(_) => None,
        },
        Positional::Lt => match index {
            None => Some(0),
            Some(n) if n >= 0 => {
                let n = to_limit(n);
                Some(part_limit.map_or(n, |part| part.min(n)))
            }
            Some(_) => None,
        },
        Positional::Gt => match index {
            None => Some(0),
            Some(_) => None,
        },
        Positional::Odd => part_limit.map(|part| part.saturating_mul(2)),
        Positional::Even => part_limit.map(|part| part.saturating_mul(2).saturating_sub(1)),
        Positional::Last | Positional::Not => None,
    }
}

/// Narrow an ordered candidate list with `filter`.
///
/// `elements` has already been cut to [`get_limit`], which is all `:first`
/// and `:lt(n)` need. `exclude` evaluates the selector list of a `:not`
/// against the candidates and returns the ones it matches.
///
/// # Errors
///
/// Only what `exclude` returns.
pub fn filter_by_position<N, E, F>(
    filter: Positional,
    elements: Vec<N>,
    data: &PseudoData,
    exclude: F,
) -> Result<Vec<N>, E>
where
    N: Copy + PartialEq,
    F: FnOnce(&SelectorGroup, &[N]) -> Result<Vec<N>, E>,
{
    let index = parse_index(data.argument());
    let mut elements = elements;
    Ok(match filter {
        Positional::First | Positional::Lt => elements,
        Positional::Last => elements.pop().into_iter().collect(),
        Positional::Eq | Positional::Nth => {
            let len = elements.len();
            let picked = index.and_then(|n| {
                let at = if n < 0 {
                    len.checked_sub(usize::try_from(n.unsigned_abs()).ok()?)?
                } else {
                    usize::try_from(n).ok()?
                };
                elements.get(at).copied()
            });
            picked.into_iter().collect()
        }
        Positional::Gt => match index {
            None => Vec::new(),
            // A negative start counts from the end, like `slice`.
            Some(n) => {
                let start = n.saturating_add(1);
                let skip = if start < 0 {
                    elements.len().saturating_sub(to_limit(start.saturating_neg()))
                } else {
                    to_limit(start)
                };
                elements.into_iter().skip(skip).collect()
            }
        },
        Positional::Even => elements.into_iter().step_by(2).collect(),
        Positional::Odd => elements.into_iter().skip(1).step_by(2).collect(),
        Positional::Not => match data.selectors() {
            Some(group) => {
                let matched = exclude(group, &elements)?;
                elements.retain(|element| !matched.contains(element));
                elements
            }
            None => elements,
        },
    })
}
