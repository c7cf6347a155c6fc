//! Inline `[N bpm mode]` and `ms=on|off` annotations
//!
//! Annotations are cut out of a line before it is classified so they never
//! interfere with the keyword matchers.

use memchr::memchr_iter;
use wodtimer_types::MetronomeMode;

use crate::time::parse_digits;

/// A line with its annotations removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AnnotatedLine {
    pub line: String,
    pub metronome: Option<(u32, MetronomeMode)>,
    pub millis: Option<bool>,
}

pub(crate) fn extract(raw: &str) -> AnnotatedLine {
    let (metronome, line) = match find_metronome(raw) {
        Some((bpm, mode, range)) => (Some((bpm, mode)), cut(raw, range)),
        None => (None, raw.to_string()),
    };

    let (millis, line) = match find_millis(&line) {
        Some((on, range)) => (Some(on), cut(&line, range)),
        None => (None, line),
    };

    AnnotatedLine {
        line,
        metronome,
        millis,
    }
}

/// Line text with annotations removed, used by the explicit-close pre-pass
pub(crate) fn strip(raw: &str) -> String {
    extract(raw).line
}

fn cut(s: &str, range: std::ops::Range<usize>) -> String {
    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..range.start]);
    out.push_str(&s[range.end..]);
    out.trim().to_string()
}

fn skip_ws(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

fn starts_with_ci(bytes: &[u8], pos: usize, word: &str) -> bool {
    bytes
        .get(pos..pos + word.len())
        .is_some_and(|s| s.eq_ignore_ascii_case(word.as_bytes()))
}

/// `[<digits> bpm]` or `[<digits> bpm work|rest|always]`, case-insensitive.
/// Returns the BPM, mode (default work) and the byte range to remove.
fn find_metronome(line: &str) -> Option<(u32, MetronomeMode, std::ops::Range<usize>)> {
    let bytes = line.as_bytes();

    for open in memchr_iter(b'[', bytes) {
        let digits_start = open + 1;
        let mut pos = digits_start;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == digits_start {
            continue;
        }
        let bpm = parse_digits(&bytes[digits_start..pos]);

        pos = skip_ws(bytes, pos);
        if !starts_with_ci(bytes, pos, "bpm") {
            continue;
        }
        pos += 3;

        if bytes.get(pos) == Some(&b']') {
            return Some((bpm, MetronomeMode::Work, open..pos + 1));
        }

        let mode_start = skip_ws(bytes, pos);
        if mode_start == pos {
            continue;
        }
        let mode = [
            ("work", MetronomeMode::Work),
            ("rest", MetronomeMode::Rest),
            ("always", MetronomeMode::Always),
        ]
        .into_iter()
        .find(|(word, _)| {
            starts_with_ci(bytes, mode_start, word)
                && bytes.get(mode_start + word.len()) == Some(&b']')
        });

        if let Some((word, mode)) = mode {
            return Some((bpm, mode, open..mode_start + word.len() + 1));
        }
    }
    None
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// `ms=on` / `ms=off` as a whole word, case-insensitive.
fn find_millis(line: &str) -> Option<(bool, std::ops::Range<usize>)> {
    let bytes = line.as_bytes();

    for eq in memchr_iter(b'=', bytes) {
        let Some(start) = eq.checked_sub(2) else {
            continue;
        };
        if !starts_with_ci(bytes, start, "ms") {
            continue;
        }
        if start > 0 && is_word_byte(bytes[start - 1]) {
            continue;
        }

        for (word, on) in [("on", true), ("off", false)] {
            let end = eq + 1 + word.len();
            if starts_with_ci(bytes, eq + 1, word)
                && bytes.get(end).is_none_or(|b| !is_word_byte(*b))
            {
                return Some((on, start..end));
            }
        }
    }
    None
}
