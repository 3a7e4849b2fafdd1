//! Duration string parsing.
//!
//! Annotations carry durations in the compact `1h30m`, `5m0s`, `500ms`
//! form. The parser accepts a sequence of `<integer><unit>` segments
//! with units `h`, `m`, `s`, `ms` and sums them; any unknown unit or
//! stray character rejects the whole string, since a half-parsed
//! cooldown is worse than none.
//!
//! The grammar is intentionally narrower than Go's `time.ParseDuration`:
//! fractional segments (`1.5h`) and sub-millisecond units (`us`, `ns`)
//! are rejected. Cooldowns are measured in seconds downstream, so the
//! extra precision would only be silently discarded; write `1h30m`
//! instead of `1.5h`.

use std::time::Duration;

/// Parse a compact duration string (`30s`, `5m`, `1h30m`, `500ms`).
///
/// A bare `"0"` is accepted as zero. Returns `None` for anything that
/// is not a well-formed integer segment sequence — including
/// fractional values and `us`/`ns` units (see the module docs).
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s == "0" {
        return Some(Duration::ZERO);
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let value: u64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let (span, parsed) = if let Some(r) = rest.strip_prefix("ms") {
            (r, Duration::from_millis(value))
        } else if let Some(r) = rest.strip_prefix('h') {
            (r, Duration::from_secs(value.checked_mul(3600)?))
        } else if let Some(r) = rest.strip_prefix('m') {
            (r, Duration::from_secs(value.checked_mul(60)?))
        } else if let Some(r) = rest.strip_prefix('s') {
            (r, Duration::from_secs(value))
        } else {
            return None;
        };
        total = total.checked_add(parsed)?;
        rest = span;
    }

    Some(total)
}
