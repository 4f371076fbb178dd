//! Deterministic identifier shortening.
//!
//! Generated table, column, constraint and index names can exceed a
//! vendor's identifier limit. Over-long names keep a prefix and end in the
//! decimal magnitude of the 31-polynomial string hash, computed over UTF-16
//! code units with 32-bit wrapping so names match schemas deployed earlier
//! by other engines using the same scheme.

use tracing::trace;

/// 32-bit polynomial hash: `sum(unit[i] * 31^(n-1-i))` over UTF-16 code
/// units, wrapping on overflow.
pub fn hash_identifier(name: &str) -> i32 {
    name.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

/// Shorten `name` to at most `max` UTF-16 code units.
///
/// Names that fit are returned unchanged. Otherwise the result is
/// `name[0 .. max - len(h)] + h` where `h` is the decimal magnitude of
/// `hash_identifier(name)`. `i32::MIN` has no positive counterpart; its
/// magnitude is rendered as `2147483648`. When `max` is smaller than the
/// hash string only the leading `max` hash digits are kept.
pub fn shorten_identifier(name: &str, max: usize) -> String {
    let units: Vec<u16> = name.encode_utf16().collect();
    if units.len() <= max {
        return name.to_string();
    }

    let mut hash = hash_identifier(name).unsigned_abs().to_string();
    hash.truncate(max);
    let keep = max - hash.len();
    let mut shortened = String::from_utf16_lossy(&units[..keep]);
    shortened.push_str(&hash);
    trace!(name, %shortened, max, "identifier shortened");
    shortened
}
