//! Exercise line metadata: `Name (5x|@100kg|80%|PSE 8)`

use memchr::{memchr, memchr_iter};
use wodtimer_types::{Exercise, WeightUnit};

use crate::time::parse_digits;

/// Parse the text of an exercise line (bullet already removed).
///
/// The name is everything before the first `(`. The first non-empty
/// parenthesized group is split on `|` and each part is classified on its
/// own, so part order does not matter. Unrecognized parts are dropped.
pub fn parse_exercise(text: &str) -> Exercise {
    let bytes = text.as_bytes();
    let name = match memchr(b'(', bytes) {
        Some(0) | None => text.trim(),
        Some(open) => text[..open].trim(),
    };
    let mut exercise = Exercise::named(name);

    let Some(meta) = metadata_group(text) else {
        return exercise;
    };

    for part in meta.split('|').map(str::trim) {
        if let Some(reps) = parse_reps(part) {
            exercise.reps = Some(reps);
        } else if let Some((weight, unit)) = parse_weight(part) {
            exercise.weight = Some(weight);
            exercise.weight_unit = Some(unit);
        } else if part.contains('%') {
            exercise.percentage = Some(part.to_string());
        } else if let Some(pse) = parse_pse(part) {
            exercise.pse = Some(pse);
        }
    }

    exercise
}

/// Content of the first `(...)` group with at least one character inside
fn metadata_group(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    memchr_iter(b'(', bytes).find_map(|open| {
        let close = open + 1 + memchr(b')', &bytes[open + 1..])?;
        (close > open + 1).then(|| &text[open + 1..close])
    })
}

fn leading_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

/// `5x`
fn parse_reps(part: &str) -> Option<u32> {
    let bytes = part.as_bytes();
    let digits = leading_digits(bytes);
    (digits > 0 && digits + 1 == bytes.len() && bytes[digits].eq_ignore_ascii_case(&b'x'))
        .then(|| parse_digits(&bytes[..digits]))
}

/// `@100`, `@100kg`, `@225lbs`
fn parse_weight(part: &str) -> Option<(u32, WeightUnit)> {
    let rest = part.strip_prefix('@')?.as_bytes();
    let digits = leading_digits(rest);
    if digits == 0 {
        return None;
    }
    let unit = &rest[digits..];
    let unit = if unit.len() >= 3 && unit[..3].eq_ignore_ascii_case(b"lbs") {
        WeightUnit::Lbs
    } else {
        WeightUnit::Kg
    };
    Some((parse_digits(&rest[..digits]), unit))
}

/// `PSE 8`, `pse8`
fn parse_pse(part: &str) -> Option<u32> {
    let bytes = part.as_bytes();
    if bytes.len() < 3 || !bytes[..3].eq_ignore_ascii_case(b"pse") {
        return None;
    }
    let rest = part[3..].trim_start().as_bytes();
    let digits = leading_digits(rest);
    (digits > 0).then(|| parse_digits(&rest[..digits]))
}
