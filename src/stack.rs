//! Stack growth for the recursive tree walks.
//!
//! Parsing, resolution, printing and evaluation all recurse once per nesting
//! level.  Each walk wraps its recursive entry point in
//! [`ensure_sufficient_stack`], so deep (but bounded) programs run the same
//! on a 2 MB spawned thread as on an 8 MB main thread.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first moving to a fresh stack segment if the current one is
/// close to exhausted.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
