//! Human-readable sizes and durations.
//!
//! Sizes are an integer followed by an optional unit (`B`, `K`/`KB`,
//! `M`/`MB`, `G`/`GB`), 1024-based and case-insensitive: `"128 MB"`,
//! `"64k"`, `"4096"`. Durations are sequences of decimal numbers with a unit
//! (`ns`, `us`, `ms`, `s`, `m`, `h`): `"168h"`, `"1h30m"`, `"1.5s"`.

use crate::error::{CliError, CliResult};
use std::time::Duration;

/// Fractional digits beyond this are ignored.
const MAX_FRACTION_DIGITS: usize = 18;

/// Parses a size string into bytes. Zero is rejected.
///
/// # Errors
///
/// Returns [`CliError::InvalidSize`] for malformed, overflowing or zero
/// sizes.
pub fn parse_size(input: &str) -> CliResult<u64> {
    let invalid = || CliError::InvalidSize(input.to_string());
    let trimmed = input.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(digits_end);
    if digits.is_empty() {
        return Err(invalid());
    }

    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1 << 10,
        "m" | "mb" => 1 << 20,
        "g" | "gb" => 1 << 30,
        _ => return Err(invalid()),
    };
    let bytes = digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(invalid)?;
    if bytes == 0 {
        return Err(invalid());
    }
    Ok(bytes)
}

/// Parses a duration string. `"0"` is accepted without a unit.
///
/// # Errors
///
/// Returns [`CliError::InvalidDuration`] for malformed or overflowing
/// durations.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let invalid = || CliError::InvalidDuration(input.to_string());
    let trimmed = input.trim();
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let mut rest = trimmed;
    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_end);
        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_end);

        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            _ => return Err(invalid()),
        };
        let nanos = scaled_nanos(number, scale).ok_or_else(invalid)?;
        total = total.checked_add(nanos).ok_or_else(invalid)?;
        rest = next;
    }

    u64::try_from(total)
        .map(Duration::from_nanos)
        .map_err(|_| invalid())
}

/// `number * scale` for a decimal `number` such as `"1.5"` or `".25"`.
fn scaled_nanos(number: &str, scale: u128) -> Option<u128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
        return None;
    }

    let whole = if whole.is_empty() {
        0
    } else {
        whole.parse::<u128>().ok()?
    };
    let mut nanos = whole.checked_mul(scale)?;

    let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
    if !fraction.is_empty() {
        let numerator = fraction.parse::<u128>().ok()?;
        let denominator = 10u128.pow(u32::try_from(fraction.len()).ok()?);
        nanos = nanos.checked_add(numerator * scale / denominator)?;
    }
    Some(nanos)
}
