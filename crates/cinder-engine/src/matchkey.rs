//! Canonical match keys.
//!
//! Both members of a pair compute the identical key no matter who swiped
//! last, so the conditional create in the registry collapses the two racing
//! requests onto a single row.

use uuid::Uuid;

pub const SEPARATOR: char = ':';

/// The two ids sorted ascending. `pair.0 < pair.1` always holds for
/// distinct ids.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

pub fn canonical_key(a: Uuid, b: Uuid) -> String {
    let (lo, hi) = canonical_pair(a, b);
    format!("{lo}{SEPARATOR}{hi}")
}
