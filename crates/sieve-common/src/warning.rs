//! Selector warnings with colored terminal output.
//!
//! Provides deduplication so a selector evaluated against thousands of nodes
//! reports the same degradation once. Used by the structural matcher to flag
//! syntax that is accepted but can never match (pseudo-elements and the like).

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use owo_colors::OwoColorize;

/// Global set of warnings we've already printed (to deduplicate)
static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

/// Warn about a selector feature that degrades (prints once per unique message)
///
/// Returns `true` if this call printed the warning, `false` if an identical
/// warning was already reported.
///
/// # Example
/// ```
/// use sieve_common::warning::warn_once;
///
/// let first = warn_once("Selector", "pseudo-element '::before' never matches");
/// let again = warn_once("Selector", "pseudo-element '::before' never matches");
/// assert!(first && !again);
/// ```
pub fn warn_once(component: &str, message: &str) -> bool {
    let key = format!("[{component}] {message}");
    let should_print = WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert_with(HashSet::new)
        .insert(key);

    if should_print {
        eprintln!("{}", format!("[Sieve {component}] ⚠ {message}").yellow());
    }
    should_print
}

/// Forget every recorded warning (call between independent documents)
pub fn clear_warnings() {
    let mut guard = WARNED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(set) = guard.as_mut() {
        set.clear();
    }
}
