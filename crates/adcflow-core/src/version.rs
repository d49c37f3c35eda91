// ── Dotted version comparison ──
//
// Device versions are dotted numeric strings ("13.1.0.8", "14.1", "17").
// Components compare numerically left to right and a missing trailing
// component counts as zero, so "14" and "14.0.0" are equal.

use std::cmp::Ordering;

/// Returns `Some(true)` when `v1` is strictly older than `v2`.
///
/// `None` means the comparison is unavailable: an argument has no digit or
/// period at all, or one of its components carries no leading digits.
/// Callers must decide what `None` means for them; it is not "not less".
pub fn is_less(v1: &str, v2: &str) -> Option<bool> {
    compare(v1, v2).map(Ordering::is_lt)
}

/// Three-way comparison behind [`is_less`].
pub fn compare(v1: &str, v2: &str) -> Option<Ordering> {
    if !looks_like_version(v1) || !looks_like_version(v2) {
        tracing::error!(v1, v2, "version comparison needs dotted numeric strings");
        return None;
    }

    let (Some(left), Some(right)) = (components(v1), components(v2)) else {
        tracing::error!(v1, v2, "version component is not numeric");
        return None;
    };

    let len = left.len().max(right.len());
    for idx in 0..len {
        let a = left.get(idx).copied().unwrap_or(0);
        let b = right.get(idx).copied().unwrap_or(0);
        match a.cmp(&b) {
            Ordering::Equal => {}
            decided => return Some(decided),
        }
    }
    Some(Ordering::Equal)
}

fn looks_like_version(raw: &str) -> bool {
    raw.chars().any(|c| c.is_ascii_digit() || c == '.')
}

fn components(raw: &str) -> Option<Vec<i64>> {
    raw.split('.').map(leading_integer).collect()
}

/// Reads the leading base-10 integer of a component: optional surrounding
/// whitespace and sign, then the longest run of digits. Trailing text after
/// the digits is ignored ("0-beta" reads as 0); no digits at all is `None`.
fn leading_integer(component: &str) -> Option<i64> {
    let trimmed = component.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let value: i64 = rest[..digits_end].parse().ok()?;
    Some(if negative { -value } else { value })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn older_major_is_less() {
        assert_eq!(is_less("13.1", "14.1"), Some(true));
        assert_eq!(is_less("14.1", "13.1"), Some(false));
    }

    #[test]
    fn components_compare_numerically_not_lexically() {
        assert_eq!(is_less("9.0", "10.0"), Some(true));
        assert_eq!(is_less("14.1.10", "14.1.9"), Some(false));
    }

    #[test]
    fn missing_components_pad_with_zero() {
        assert_eq!(is_less("14", "14.0.0"), Some(false));
        assert_eq!(is_less("14.0.0", "14"), Some(false));
        assert_eq!(compare("14", "14.0.0"), Some(Ordering::Equal));
        assert_eq!(is_less("14", "14.0.1"), Some(true));
    }

    #[test]
    fn equal_versions_are_not_less() {
        assert_eq!(is_less("15.1.0", "15.1.0"), Some(false));
    }

    #[test]
    fn non_numeric_input_is_unavailable() {
        assert_eq!(is_less("abc", "1.0"), None);
        assert_eq!(is_less("1.0", ""), None);
        assert_eq!(is_less("14.x", "14.1"), None);
        assert_eq!(is_less("14..1", "14.1"), None);
    }

    #[test]
    fn trailing_text_in_a_component_is_ignored() {
        assert_eq!(is_less("14.1.0-beta", "14.1"), Some(false));
        assert_eq!(is_less("13.1.0-rc2", "14.1"), Some(true));
    }

    #[test]
    fn trichotomy_and_transitivity_over_a_sample() {
        let sample = ["11.6", "12.1.5", "13", "13.0.1", "13.1", "14.1", "14.1.0.3", "17.1"];
        for a in sample {
            for b in sample {
                let ab = is_less(a, b).unwrap();
                let ba = is_less(b, a).unwrap();
                let eq = !ab && !ba;
                assert_eq!([ab, ba, eq].iter().filter(|x| **x).count(), 1, "{a} vs {b}");
                for c in sample {
                    if ab && is_less(b, c).unwrap() {
                        assert_eq!(is_less(a, c), Some(true), "{a} < {b} < {c}");
                    }
                }
            }
        }
    }
}
