//! Line classification
//!
//! Every annotated line is classified into exactly one [`Line`] before it
//! touches parser state. Matchers run in a fixed priority order and the first
//! one that accepts the line wins; several forms overlap textually
//! (`30s rest` is both a typed phase and a standalone rest), so the order
//! below is part of the grammar.

use wodtimer_types::{Exercise, PhaseType};

use super::exercise::parse_exercise;
use crate::time::{digit_runs, first_number, parse_digits, parse_time_duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitKind {
    /// `wait work`
    Work,
    /// `wait rest`
    Rest,
    /// `wait`, type inferred from the enclosing section
    Bare,
    /// `wait <anything else>`
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockKeyword {
    Warmup,
    Cooldown,
    Work,
    Rest,
}

/// Explicit phase type written on a bare time line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimeHint {
    Rest,
    Work,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Line {
    Wait(WaitKind),
    Exercise(Exercise),
    Stopwatch,
    Countdown(u32),
    Emom,
    /// Seconds, 0 when the cap did not parse
    ForTime(u32),
    Amrap(u32),
    Typed { phase_type: PhaseType, secs: u32 },
    StandaloneRest(u32),
    Keyword(BlockKeyword),
    RepeatOpen { count: u32, tabata: bool },
    RepeatClose,
    Time { secs: u32, hint: TimeHint },
    Unrecognized,
}

pub(crate) fn is_separator(line: &str) -> bool {
    line.len() >= 3 && line.bytes().all(|b| b == b'-')
}

pub(crate) fn is_section_break(lower: &str) -> bool {
    matches!(
        lower,
        "warmup" | "warm up" | "warm-up" | "cooldown" | "cool down" | "cool-down"
    )
}

pub(crate) fn is_repeat_closer(lower: &str) -> bool {
    matches!(lower, "end" | "endrepeat") || is_separator(lower)
}

pub(crate) fn is_repeat_start(lower: &str) -> bool {
    repeat_open(lower).is_some()
}

/// Classify an annotation-free, trimmed line.
pub(crate) fn classify(line: &str) -> Line {
    let lower = line.to_lowercase();
    let lower = lower.as_str();

    if let Some(kind) = wait(lower) {
        return Line::Wait(kind);
    }
    if let Some(text) = line.strip_prefix('-').or_else(|| line.strip_prefix('•')) {
        return Line::Exercise(parse_exercise(text.trim()));
    }
    if lower == "stopwatch" {
        return Line::Stopwatch;
    }
    if lower.starts_with("countdown ") {
        let secs = parse_time_duration(lower);
        if secs > 0 {
            return Line::Countdown(secs);
        }
    }
    if is_emom(lower) {
        return Line::Emom;
    }
    if is_for_time(lower) {
        return Line::ForTime(parse_time_duration(lower));
    }
    if is_amrap(lower) {
        return Line::Amrap(parse_time_duration(lower));
    }
    if let Some((phase_type, secs)) = typed(lower) {
        return Line::Typed { phase_type, secs };
    }
    if lower.contains("rest") && lower.bytes().any(|b| b.is_ascii_digit()) && !is_time_token(lower) {
        let secs = parse_time_duration(lower);
        if secs > 0 {
            return Line::StandaloneRest(secs);
        }
    }
    if let Some(keyword) = keyword(lower) {
        return Line::Keyword(keyword);
    }
    if let Some((count, tabata)) = repeat_open(lower) {
        return Line::RepeatOpen { count, tabata };
    }
    if matches!(lower, "end" | "endrepeat") {
        return Line::RepeatClose;
    }
    if is_time_line(lower) {
        let hint = if lower.contains("rest") {
            TimeHint::Rest
        } else if lower.contains("work") {
            TimeHint::Work
        } else {
            TimeHint::None
        };
        return Line::Time {
            secs: time_from_line(lower),
            hint,
        };
    }

    Line::Unrecognized
}

// ─────────────────────────────────────────────────────────────────────────────
// Matchers
// ─────────────────────────────────────────────────────────────────────────────

fn wait(lower: &str) -> Option<WaitKind> {
    match lower {
        "wait" => Some(WaitKind::Bare),
        "wait work" => Some(WaitKind::Work),
        "wait rest" => Some(WaitKind::Rest),
        _ if lower.starts_with("wait ") => Some(WaitKind::Other),
        _ => None,
    }
}

/// Length of the leading ASCII digit run
fn leading_digits(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `emom` or `emom <N>`
fn is_emom(lower: &str) -> bool {
    let Some(rest) = lower.strip_prefix("emom") else {
        return false;
    };
    rest.is_empty() || (rest.starts_with(char::is_whitespace) && is_all_digits(rest.trim_start()))
}

/// `<prefix><whitespace+><digit>...`
fn keyword_then_number(rest: &str) -> bool {
    rest.starts_with(char::is_whitespace) && rest.trim_start().starts_with(|c: char| c.is_ascii_digit())
}

/// `for time <N>...` / `fortime <N>...`
fn is_for_time(lower: &str) -> bool {
    lower
        .strip_prefix("for")
        .and_then(|rest| rest.trim_start().strip_prefix("time"))
        .is_some_and(keyword_then_number)
}

/// `amrap <N>...`
fn is_amrap(lower: &str) -> bool {
    lower.strip_prefix("amrap").is_some_and(keyword_then_number)
}

/// `<N>[s|sec|m|min] work|rest`
fn typed(lower: &str) -> Option<(PhaseType, u32)> {
    let digits = leading_digits(lower);
    if digits == 0 {
        return None;
    }
    let num = parse_digits(&lower.as_bytes()[..digits]);
    let rest = &lower[digits..];

    let (head, phase_type) = if let Some(head) = rest.strip_suffix("work") {
        (head, PhaseType::Work)
    } else if let Some(head) = rest.strip_suffix("rest") {
        (head, PhaseType::Rest)
    } else {
        return None;
    };

    let secs = match head.trim() {
        "" | "s" | "sec" => num,
        "m" | "min" => num.saturating_mul(60),
        _ => return None,
    };
    Some((phase_type, secs))
}

fn keyword(lower: &str) -> Option<BlockKeyword> {
    match lower {
        "warmup" | "warm up" | "warm-up" => Some(BlockKeyword::Warmup),
        "cooldown" | "cool down" | "cool-down" => Some(BlockKeyword::Cooldown),
        "work" => Some(BlockKeyword::Work),
        "rest" => Some(BlockKeyword::Rest),
        _ => None,
    }
}

/// Maximum rounds a single repeat block expands to
pub(crate) const MAX_REPEAT_COUNT: u32 = 999;

/// `tabata|hiit|interval|intervals [N][x]` or `<N>x`. Returns the round count
/// and whether the repeat is a named (tabata-style) one.
fn repeat_open(lower: &str) -> Option<(u32, bool)> {
    let named = ["intervals", "interval", "tabata", "hiit"]
        .into_iter()
        .find_map(|name| lower.strip_prefix(name));

    let (count, tabata) = match named {
        Some(rest) => {
            let rest = rest.trim_start();
            let digits = leading_digits(rest);
            match &rest[digits..] {
                "" | "x" => {}
                _ => return None,
            }
            let count = (digits > 0).then(|| parse_digits(&rest.as_bytes()[..digits]));
            (count, true)
        }
        None => {
            let digits = leading_digits(lower);
            if digits == 0 || lower[digits..].trim_start() != "x" {
                return None;
            }
            (Some(parse_digits(&lower.as_bytes()[..digits])), false)
        }
    };

    let count = match count {
        Some(0) | None => 1,
        Some(n) => n.min(MAX_REPEAT_COUNT),
    };
    Some((count, tabata))
}

/// `M:SS` covering the whole line
fn colon_time(lower: &str) -> Option<u32> {
    let (mins, secs) = lower.split_once(':')?;
    (is_all_digits(mins) && is_all_digits(secs)).then(|| {
        parse_digits(mins.as_bytes())
            .saturating_mul(60)
            .saturating_add(parse_digits(secs.as_bytes()))
    })
}

/// A complete time token: `1:30`, `45`, `45s`, `45 seconds`, `2 min`
fn is_time_token(lower: &str) -> bool {
    if colon_time(lower).is_some() {
        return true;
    }
    let digits = leading_digits(lower);
    if digits == 0 {
        return false;
    }
    matches!(
        lower[digits..].trim_start(),
        "" | "s" | "sec" | "second" | "seconds" | "m" | "min" | "minute" | "minutes"
    )
}

/// A time token, or a number directly followed by a seconds/minutes unit
fn is_time_line(lower: &str) -> bool {
    if is_time_token(lower) {
        return true;
    }
    let digits = leading_digits(lower);
    digits > 0 && lower[digits..].trim_start().starts_with(['s', 'm'])
}

/// Duration of a bare time line. Any `<N> m` anywhere makes the first number
/// minutes.
fn time_from_line(lower: &str) -> u32 {
    if let Some(secs) = colon_time(lower) {
        return secs;
    }
    let bytes = lower.as_bytes();
    let has_minutes = digit_runs(bytes).any(|(_, end)| {
        let unit = bytes[end..]
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .map(|offset| bytes[end + offset]);
        unit == Some(b'm')
    });
    let num = first_number(lower).unwrap_or(0);
    if has_minutes {
        num.saturating_mul(60)
    } else {
        num
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_need_three_dashes() {
        assert!(is_separator("---"));
        assert!(is_separator("-------"));
        assert!(!is_separator("--"));
        assert!(!is_separator("--- x"));
    }

    #[test]
    fn wait_variants() {
        assert_eq!(classify("wait"), Line::Wait(WaitKind::Bare));
        assert_eq!(classify("Wait Work"), Line::Wait(WaitKind::Work));
        assert_eq!(classify("wait rest"), Line::Wait(WaitKind::Rest));
        assert_eq!(classify("wait for partner"), Line::Wait(WaitKind::Other));
        assert_eq!(classify("waiting"), Line::Unrecognized);
    }

    #[test]
    fn exercise_bullets() {
        assert!(matches!(classify("- burpees"), Line::Exercise(e) if e.name == "burpees"));
        assert!(matches!(classify("• row (500m)"), Line::Exercise(e) if e.name == "row"));
    }

    #[test]
    fn countdown_needs_positive_duration() {
        assert_eq!(classify("countdown 2min"), Line::Countdown(120));
        assert_eq!(classify("countdown 1:30"), Line::Countdown(90));
        assert_eq!(classify("countdown soon"), Line::Unrecognized);
    }

    #[test]
    fn emom_labels() {
        assert_eq!(classify("EMOM"), Line::Emom);
        assert_eq!(classify("emom 2"), Line::Emom);
        assert_eq!(classify("emom two"), Line::Unrecognized);
    }

    #[test]
    fn capped_segments() {
        assert_eq!(classify("fortime 10min"), Line::ForTime(600));
        assert_eq!(classify("for time 8:00"), Line::ForTime(480));
        assert_eq!(classify("for time 0min"), Line::ForTime(0));
        assert_eq!(classify("amrap 12min"), Line::Amrap(720));
        assert_eq!(classify("amrap12"), Line::Unrecognized);
    }

    #[test]
    fn typed_phases() {
        assert_eq!(
            classify("30s work"),
            Line::Typed { phase_type: PhaseType::Work, secs: 30 }
        );
        assert_eq!(
            classify("2 min rest"),
            Line::Typed { phase_type: PhaseType::Rest, secs: 120 }
        );
        assert_eq!(
            classify("45rest"),
            Line::Typed { phase_type: PhaseType::Rest, secs: 45 }
        );
    }

    #[test]
    fn standalone_rest() {
        assert_eq!(classify("rest 1:30"), Line::StandaloneRest(90));
        assert_eq!(classify("Rest 2 min"), Line::StandaloneRest(120));
        assert_eq!(classify("rest"), Line::Keyword(BlockKeyword::Rest));
    }

    #[test]
    fn repeat_openers() {
        assert_eq!(classify("8x"), Line::RepeatOpen { count: 8, tabata: false });
        assert_eq!(classify("tabata 8x"), Line::RepeatOpen { count: 8, tabata: true });
        assert_eq!(classify("intervals 5"), Line::RepeatOpen { count: 5, tabata: true });
        assert_eq!(classify("hiit"), Line::RepeatOpen { count: 1, tabata: true });
        assert_eq!(classify("0x"), Line::RepeatOpen { count: 1, tabata: false });
        assert_eq!(classify("end"), Line::RepeatClose);
        assert_eq!(classify("endrepeat"), Line::RepeatClose);
    }

    #[test]
    fn bare_time_lines() {
        assert_eq!(classify("30s"), Line::Time { secs: 30, hint: TimeHint::None });
        assert_eq!(classify("1:30"), Line::Time { secs: 90, hint: TimeHint::None });
        assert_eq!(classify("2min"), Line::Time { secs: 120, hint: TimeHint::None });
        assert_eq!(classify("45"), Line::Time { secs: 45, hint: TimeHint::None });
        assert_eq!(
            classify("5 min easy work"),
            Line::Time { secs: 300, hint: TimeHint::Work }
        );
    }

    #[test]
    fn unmatched_text() {
        assert_eq!(classify("hello there"), Line::Unrecognized);
    }
}
