//! Phase lists from structured timer configurations
//!
//! The builder gives every timer type the same phase shape the text parser
//! produces, so the engine never needs to know where a phase list came from.

use wodtimer_types::{
    CappedConfig, EmomConfig, IntervalsConfig, Phase, PhaseDuration, PhaseType, TimerConfig,
};

/// Seconds per EMOM round
pub const EMOM_ROUND_SECS: u32 = 60;

/// Build the phase list for a configuration. Invalid configurations yield an
/// empty or degenerate list, never a panic.
pub fn build_phases(config: &TimerConfig) -> Vec<Phase> {
    match config {
        TimerConfig::Stopwatch(_) => vec![Phase::open(PhaseType::Stopwatch)],
        TimerConfig::Countdown(c) => vec![Phase::timed(PhaseType::Countdown, c.duration)],
        TimerConfig::Intervals(c) => intervals(c),
        TimerConfig::Emom(c) => emom(c),
        TimerConfig::Amrap(c) => capped(c, PhaseDuration::Fixed(c.time_cap)),
        TimerConfig::ForTime(c) => {
            let duration = match c.time_cap {
                0 => PhaseDuration::Open,
                secs => PhaseDuration::Fixed(secs),
            };
            capped(c, duration)
        }
        TimerConfig::Custom(c) => c.parsed.phases.clone(),
    }
}

/// Wrap `body` in optional warmup and cooldown phases. Zero-length ones are
/// left out.
fn bracketed(warmup: u32, cooldown: u32, body: impl IntoIterator<Item = Phase>) -> Vec<Phase> {
    let mut phases = Vec::new();
    if warmup > 0 {
        phases.push(Phase::timed(PhaseType::Warmup, warmup));
    }
    phases.extend(body);
    if cooldown > 0 {
        phases.push(Phase::timed(PhaseType::Cooldown, cooldown));
    }
    phases
}

fn intervals(c: &IntervalsConfig) -> Vec<Phase> {
    let rounds = (1..=c.rounds).flat_map(|round| {
        let work = Phase::timed(PhaseType::Work, c.work).with_round(round);
        let rest = (c.rest > 0).then(|| Phase::timed(PhaseType::Rest, c.rest).with_round(round));
        std::iter::once(work).chain(rest)
    });
    bracketed(c.warmup, c.cooldown, rounds)
}

fn emom(c: &EmomConfig) -> Vec<Phase> {
    let rounds =
        (1..=c.rounds).map(|round| Phase::timed(PhaseType::Work, EMOM_ROUND_SECS).with_round(round));
    bracketed(c.warmup, c.cooldown, rounds)
}

fn capped(c: &CappedConfig, duration: PhaseDuration) -> Vec<Phase> {
    bracketed(c.warmup, c.cooldown, [Phase::new(PhaseType::Work, duration)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use wodtimer_types::{CountdownConfig, CustomConfig, StopwatchConfig};

    fn types_and_rounds(phases: &[Phase]) -> Vec<(PhaseType, Option<u32>)> {
        phases.iter().map(|p| (p.phase_type, p.round)).collect()
    }

    #[test]
    fn stopwatch_is_one_open_phase() {
        let phases = build_phases(&TimerConfig::Stopwatch(StopwatchConfig::default()));
        assert_eq!(phases, vec![Phase::open(PhaseType::Stopwatch)]);
    }

    #[test]
    fn countdown_is_one_fixed_phase() {
        let phases = build_phases(&TimerConfig::Countdown(CountdownConfig {
            duration: 90,
            metronome: None,
        }));
        assert_eq!(phases, vec![Phase::timed(PhaseType::Countdown, 90)]);
    }

    #[test]
    fn intervals_with_warmup_and_cooldown() {
        let phases = build_phases(&TimerConfig::Intervals(IntervalsConfig {
            work: 40,
            rest: 20,
            rounds: 2,
            warmup: 60,
            cooldown: 30,
            metronome: None,
        }));
        assert_eq!(
            types_and_rounds(&phases),
            vec![
                (PhaseType::Warmup, None),
                (PhaseType::Work, Some(1)),
                (PhaseType::Rest, Some(1)),
                (PhaseType::Work, Some(2)),
                (PhaseType::Rest, Some(2)),
                (PhaseType::Cooldown, None),
            ]
        );
        assert_eq!(phases[1].duration, PhaseDuration::Fixed(40));
        assert_eq!(phases[2].duration, PhaseDuration::Fixed(20));
    }

    #[test]
    fn intervals_without_rest_or_brackets() {
        let phases = build_phases(&TimerConfig::Intervals(IntervalsConfig {
            work: 30,
            rounds: 3,
            ..Default::default()
        }));
        assert_eq!(
            types_and_rounds(&phases),
            vec![
                (PhaseType::Work, Some(1)),
                (PhaseType::Work, Some(2)),
                (PhaseType::Work, Some(3)),
            ]
        );
    }

    #[test]
    fn emom_rounds_are_one_minute() {
        let phases = build_phases(&TimerConfig::Emom(EmomConfig {
            rounds: 5,
            ..Default::default()
        }));
        assert_eq!(phases.len(), 5);
        assert!(phases.iter().all(|p| p.duration == PhaseDuration::Fixed(60)));
        assert_eq!(phases[4].round, Some(5));
    }

    #[test]
    fn amrap_and_for_time() {
        let amrap = build_phases(&TimerConfig::Amrap(CappedConfig {
            time_cap: 720,
            warmup: 120,
            ..Default::default()
        }));
        assert_eq!(amrap.len(), 2);
        assert_eq!(amrap[1].duration, PhaseDuration::Fixed(720));

        let uncapped = build_phases(&TimerConfig::ForTime(CappedConfig::default()));
        assert_eq!(uncapped, vec![Phase::open(PhaseType::Work)]);

        let capped = build_phases(&TimerConfig::ForTime(CappedConfig {
            time_cap: 600,
            ..Default::default()
        }));
        assert_eq!(capped[0].duration, PhaseDuration::Fixed(600));
    }

    #[test]
    fn custom_returns_parsed_phases() {
        let text = "8x\n20s work\n10s rest";
        let parsed = parser::parse(text);
        let phases = build_phases(&TimerConfig::Custom(CustomConfig {
            text: text.to_string(),
            parsed: parsed.clone(),
            metronome: None,
        }));
        assert_eq!(phases, parsed.phases);
    }

    #[test]
    fn invalid_configs_do_not_panic() {
        let phases = build_phases(&TimerConfig::Intervals(IntervalsConfig::default()));
        assert!(phases.is_empty());
        let phases = build_phases(&TimerConfig::Custom(CustomConfig::default()));
        assert!(phases.is_empty());
    }
}
