//! Process-wide cache of compiled name patterns.
//!
//! Rule sets repeat the same wildcard sources many times; compiling each
//! source once and sharing the `Arc` keeps repeated rule construction
//! cheap. The cache is read-mostly: populate it under the write lock, then
//! fan read-only matching out across threads.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::errors::PatternSyntaxError;
use crate::pattern::NamePattern;

static PATTERN_CACHE: OnceLock<RwLock<HashMap<String, Arc<NamePattern>>>> = OnceLock::new();

fn cache() -> &'static RwLock<HashMap<String, Arc<NamePattern>>> {
    PATTERN_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Compile a wildcard source, reusing a previously compiled instance when
/// the same source text was seen before. Compilation failures are not
/// cached; a bad source fails every time it is offered.
pub fn compiled(source: &str) -> Result<Arc<NamePattern>, PatternSyntaxError> {
    if let Some(hit) = cache()
        .read()
        .expect("pattern cache lock poisoned")
        .get(source)
    {
        return Ok(Arc::clone(hit));
    }
    let fresh = Arc::new(NamePattern::compile(source)?);
    let mut write = cache().write().expect("pattern cache lock poisoned");
    // Another thread may have raced us here; keep the first insertion.
    let entry = write
        .entry(source.to_string())
        .or_insert_with(|| Arc::clone(&fresh));
    Ok(Arc::clone(entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_source_reuses_compiled_pattern() {
        let a = compiled("cache.test.**").expect("valid pattern");
        let b = compiled("cache.test.**").expect("valid pattern");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn failures_are_not_cached() {
        assert!(compiled("^broken[").is_err());
        assert!(compiled("^broken[").is_err());
    }
}
