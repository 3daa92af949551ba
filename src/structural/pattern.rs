//! Thread-local compilation cache for the patcher's key patterns.
//!
//! Every lookup builds a pattern from a key name; a scan over a few hundred
//! saves asks for the same dozen patterns thousands of times.
//! Cache is capped at 256 entries; it is cleared when full.

use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    static PATTERN_CACHE: RefCell<HashMap<String, Regex>> = RefCell::new(HashMap::new());
}

/// Get a compiled pattern from cache, or compile and cache it.
///
/// Patterns are built internally from escaped key names, so compilation
/// cannot fail for any key.
pub fn get_or_compile(pattern: &str) -> Regex {
    PATTERN_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(re) = cache.get(pattern) {
            return re.clone();
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = Regex::new(pattern).expect("key patterns are built from escaped keys");
        cache.insert(pattern.to_string(), compiled.clone());
        compiled
    })
}

/// Clear the pattern cache (mainly for testing).
pub fn clear_cache() {
    PATTERN_CACHE.with(|cache| cache.borrow_mut().clear());
}

pub fn cache_size() -> usize {
    PATTERN_CACHE.with(|cache| cache.borrow().len())
}
