//! Content hash used to detect stale cached assets.

/// Compute the djb2 content hash of a response body, rendered in base 36.
///
/// Arithmetic wraps at 32 bits (signed) on every step, and the final value is
/// reinterpreted as unsigned before formatting. Not cryptographic; only used
/// to compare two fetches of the same asset.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hash: i32 = 5381;
    for &b in bytes {
        hash = (hash << 5).wrapping_add(hash).wrapping_add(i32::from(b));
    }
    to_base36(hash as u32)
}

fn to_base36(mut n: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::with_capacity(7);
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}
