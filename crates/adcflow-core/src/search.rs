// ── Ordered lookup ──
//
// Binary search over a pre-sorted slice where the caller closes over the
// target. The same slice can then be searched by different keys (node
// address, FQDN hostname) without re-sorting.

use std::cmp::Ordering;

/// Finds an index whose element compares equal to the caller's target.
///
/// `compare` returns the ordering of the *target* relative to the element
/// it is given: `Less` means the target sorts before that element. The
/// slice must be sorted ascending by the same ordering.
///
/// When several elements compare equal, which of them is returned is
/// unspecified.
pub fn binary_search<T>(sorted: &[T], mut compare: impl FnMut(&T) -> Ordering) -> Option<usize> {
    sorted
        .binary_search_by(|element| compare(element).reverse())
        .ok()
}
