//! Tests for the timer engine
//!
//! Every run is driven by a synthetic clock: a fixed start `Instant` advanced
//! by exact durations, so no test waits on real time.

use std::time::{Duration, Instant};

use wodtimer_types::{
    CappedConfig, CountdownConfig, CustomConfig, ExerciseStep, IntervalsConfig, Phase,
    PhaseDuration, PhaseType, SegmentLabel, StopwatchConfig, TimerConfig, TimerType,
};

use super::{EngineEffect, EngineError, RunStatus, TimerEngine};
use crate::collaborators::{AutoConfirm, CueKind};
use crate::parser;

fn at(t0: Instant, secs: f64) -> Instant {
    t0 + Duration::from_secs_f64(secs)
}

fn intervals(work: u32, rest: u32, rounds: u32) -> TimerConfig {
    TimerConfig::Intervals(IntervalsConfig {
        work,
        rest,
        rounds,
        ..Default::default()
    })
}

fn stopwatch() -> TimerConfig {
    TimerConfig::Stopwatch(StopwatchConfig::default())
}

/// One open exercise-stepping phase of a checklist
fn make_step(index: u32, count: u32, label: SegmentLabel, time_cap: Option<u32>) -> Phase {
    Phase {
        label: Some(label),
        is_wait: true,
        step: Some(ExerciseStep {
            index,
            count,
            loop_start: label == SegmentLabel::Amrap && index == 1,
            loop_end: label == SegmentLabel::Amrap && index == count,
            time_cap,
        }),
        ..Phase::open(PhaseType::Work)
    }
}

fn amrap_checklist(count: u32, cap: u32) -> Vec<Phase> {
    (1..=count)
        .map(|i| make_step(i, count, SegmentLabel::Amrap, Some(cap)))
        .collect()
}

fn countdown_cues(effects: &[EngineEffect]) -> Vec<u8> {
    effects
        .iter()
        .filter_map(|e| match e {
            EngineEffect::Cue(CueKind::Countdown(n)) => Some(*n),
            _ => None,
        })
        .collect()
}

// ─── Starting ───────────────────────────────────────────────────────────────

#[test]
fn test_start_rejects_invalid_configs() {
    let t0 = Instant::now();

    let err = TimerEngine::start(TimerConfig::Countdown(CountdownConfig::default()), t0)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidConfig {
            timer_type: "countdown",
            reason: "duration must be greater than zero",
        }
    );

    let err = TimerEngine::start(intervals(0, 10, 8), t0).unwrap_err();
    assert!(matches!(err, EngineError::InvalidConfig { timer_type: "intervals", .. }));

    let err = TimerEngine::start(TimerConfig::Amrap(CappedConfig::default()), t0).unwrap_err();
    assert!(matches!(err, EngineError::InvalidConfig { timer_type: "amrap", .. }));
}

#[test]
fn test_start_reports_parse_error_for_custom() {
    let t0 = Instant::now();
    let text = "# only a comment";
    let config = TimerConfig::Custom(CustomConfig {
        text: text.to_string(),
        parsed: parser::parse(text),
        metronome: None,
    });
    let err = TimerEngine::start(config, t0).unwrap_err();
    assert_eq!(
        err,
        EngineError::Parse {
            message: "No valid phases found".to_string()
        }
    );

    assert_eq!(
        TimerEngine::from_phases(Vec::new(), t0).unwrap_err(),
        EngineError::NoPhases
    );
}

#[test]
fn test_start_announces_first_phase() {
    let t0 = Instant::now();
    let mut engine = TimerEngine::start(intervals(20, 10, 2), t0).unwrap();

    assert_eq!(engine.status(), RunStatus::Running);
    assert_eq!(engine.state().timer_type, TimerType::Intervals);
    assert_eq!(engine.state().amrap_round, 1);
    assert_eq!(
        engine.take_effects(),
        vec![
            EngineEffect::AcquireWakeLock,
            EngineEffect::Speak("Work!".to_string()),
            EngineEffect::Speak("Round 1".to_string()),
            EngineEffect::Cue(CueKind::WorkStart),
            EngineEffect::StartMetronome {
                phase_type: PhaseType::Work,
                settings: None,
            },
            EngineEffect::Redraw,
        ]
    );
    assert!(engine.take_effects().is_empty());
}

#[test]
fn test_first_phase_other_than_work_or_rest_has_no_tone() {
    let t0 = Instant::now();
    let config = TimerConfig::Intervals(IntervalsConfig {
        work: 20,
        rounds: 1,
        warmup: 30,
        ..Default::default()
    });
    let mut engine = TimerEngine::start(config, t0).unwrap();
    let effects = engine.take_effects();
    assert!(effects.contains(&EngineEffect::Speak("Warm up".to_string())));
    assert!(!effects.iter().any(|e| matches!(e, EngineEffect::Cue(_))));
}

// ─── Ticking ────────────────────────────────────────────────────────────────

#[test]
fn test_tick_credits_wall_clock_delta() {
    let t0 = Instant::now();
    let mut engine = TimerEngine::start(intervals(2, 1, 1), t0).unwrap();

    engine.tick(at(t0, 1.0));
    assert_eq!(engine.state().current_phase_time, 1.0);
    assert_eq!(engine.state().total_elapsed, 1.0);
    assert_eq!(engine.state().current_phase_index, 0);

    // a late tick still credits the whole gap
    engine.tick(at(t0, 2.0));
    assert_eq!(engine.state().current_phase_index, 1);
    assert_eq!(engine.state().current_phase_time, 0.0);
    assert_eq!(engine.state().total_elapsed, 2.0);
    assert_eq!(engine.state().phases[0].actual_duration, Some(2.0));
}

#[test]
fn test_countdown_cues_once_per_second() {
    let t0 = Instant::now();
    let config = TimerConfig::Countdown(CountdownConfig {
        duration: 5,
        metronome: None,
    });
    let mut engine = TimerEngine::start(config, t0).unwrap();
    engine.take_effects();

    let mut effects = Vec::new();
    for i in 1..=110 {
        engine.tick(t0 + Duration::from_millis(50 * i));
        effects.extend(engine.take_effects());
    }

    assert_eq!(countdown_cues(&effects), vec![3, 2, 1]);
    assert!(effects.contains(&EngineEffect::Speak("2".to_string())));
    assert_eq!(engine.status(), RunStatus::Completed);
}

#[test]
fn test_wait_phase_never_auto_advances() {
    let t0 = Instant::now();
    let mut wait = Phase::open(PhaseType::Work);
    wait.is_wait = true;
    let mut engine =
        TimerEngine::from_phases(vec![wait, Phase::timed(PhaseType::Rest, 10)], t0).unwrap();

    engine.tick(at(t0, 1000.0));
    assert_eq!(engine.state().current_phase_index, 0);
    assert_eq!(engine.status(), RunStatus::Running);

    engine.advance_from_wait(at(t0, 1001.0));
    assert_eq!(engine.state().current_phase_index, 1);
    assert_eq!(engine.state().phases[0].actual_duration, Some(1001.0));
}

#[test]
fn test_ticks_after_completion_are_ignored() {
    let t0 = Instant::now();
    let mut engine = TimerEngine::start(intervals(1, 0, 1), t0).unwrap();
    engine.tick(at(t0, 1.0));
    assert_eq!(engine.status(), RunStatus::Completed);
    engine.take_effects();

    engine.tick(at(t0, 5.0));
    engine.skip_phase(at(t0, 6.0));
    assert_eq!(engine.state().total_elapsed, 1.0);
    assert!(engine.take_effects().is_empty());
}

// ─── Pause ──────────────────────────────────────────────────────────────────

#[test]
fn test_pause_discards_time() {
    let t0 = Instant::now();
    let mut engine = TimerEngine::start(stopwatch(), t0).unwrap();

    engine.tick(at(t0, 1.0));
    engine.toggle_pause(at(t0, 1.0));
    assert!(engine.is_paused());

    engine.tick(at(t0, 5.0));
    assert_eq!(engine.state().current_phase_time, 1.0);
    assert_eq!(engine.state().total_elapsed, 1.0);
    assert_eq!(engine.state().paused_time, Duration::from_secs(4));

    engine.toggle_pause(at(t0, 6.0));
    assert_eq!(engine.state().paused_time, Duration::from_secs(5));

    engine.tick(at(t0, 7.0));
    assert_eq!(engine.state().current_phase_time, 2.0);
    assert_eq!(engine.state().total_elapsed, 2.0);
}

#[test]
fn test_pause_informs_metronome() {
    let t0 = Instant::now();
    let mut engine = TimerEngine::start(stopwatch(), t0).unwrap();
    engine.take_effects();

    engine.toggle_pause(at(t0, 1.0));
    assert!(engine.take_effects().contains(&EngineEffect::PauseMetronome(true)));
    engine.toggle_pause(at(t0, 2.0));
    assert!(engine.take_effects().contains(&EngineEffect::PauseMetronome(false)));
}

// ─── Laps and rounds ────────────────────────────────────────────────────────

#[test]
fn test_lap_splits_are_relative_to_previous_lap() {
    let t0 = Instant::now();
    let mut engine = TimerEngine::start(stopwatch(), t0).unwrap();

    engine.tick(at(t0, 1.0));
    engine.add_lap(at(t0, 1.5));
    engine.tick(at(t0, 3.0));
    engine.add_lap(at(t0, 4.0));
    engine.add_lap(at(t0, 4.5));

    let laps = &engine.state().laps;
    assert_eq!(laps.len(), 3);
    assert_eq!(
        laps.iter().map(|l| (l.lap, l.split, l.total)).collect::<Vec<_>>(),
        vec![(1, 1.5, 1.5), (2, 2.5, 4.0), (3, 0.5, 4.5)]
    );
}

#[test]
fn test_laps_are_accepted_outside_stopwatch_runs() {
    let t0 = Instant::now();
    let mut engine = TimerEngine::start(intervals(20, 10, 2), t0).unwrap();

    engine.add_lap(at(t0, 5.0));

    let laps = &engine.state().laps;
    assert_eq!(laps.len(), 1);
    assert_eq!((laps[0].split, laps[0].total), (5.0, 5.0));
}

#[test]
fn test_add_round_does_not_move_phase() {
    let t0 = Instant::now();
    let config = TimerConfig::Amrap(CappedConfig {
        time_cap: 600,
        ..Default::default()
    });
    let mut engine = TimerEngine::start(config, t0).unwrap();
    engine.take_effects();

    engine.add_round();
    engine.add_round();
    assert_eq!(engine.state().rounds, 2);
    assert_eq!(engine.state().current_phase_index, 0);
    assert!(engine.take_effects().contains(&EngineEffect::Cue(CueKind::RoundComplete)));
}

// ─── Phase transitions ──────────────────────────────────────────────────────

#[test]
fn test_skip_records_actual_duration() {
    let t0 = Instant::now();
    let mut engine = TimerEngine::start(intervals(20, 10, 1), t0).unwrap();
    engine.take_effects();

    engine.skip_phase(at(t0, 0.5));
    assert_eq!(engine.state().phases[0].actual_duration, Some(0.5));
    assert_eq!(engine.state().current_phase_index, 1);
    let effects = engine.take_effects();
    assert!(effects.contains(&EngineEffect::Cue(CueKind::RestStart)));
    assert!(effects.contains(&EngineEffect::Speak("Rest".to_string())));
}

#[test]
fn test_other_phase_types_play_round_complete() {
    let t0 = Instant::now();
    let phases = vec![
        Phase::timed(PhaseType::Rest, 1),
        Phase::timed(PhaseType::Cooldown, 60),
    ];
    let mut engine = TimerEngine::from_phases(phases, t0).unwrap();
    engine.take_effects();

    engine.skip_phase(at(t0, 0.2));
    let effects = engine.take_effects();
    assert!(effects.contains(&EngineEffect::Cue(CueKind::RoundComplete)));
    assert!(effects.contains(&EngineEffect::Speak("Cool down".to_string())));
}

#[test]
fn test_phase_bpm_starts_metronome() {
    let t0 = Instant::now();
    let phase = Phase {
        metronome: Some(90),
        ..Phase::timed(PhaseType::Work, 30)
    };
    let mut engine = TimerEngine::from_phases(vec![phase], t0).unwrap();
    let started = engine.take_effects().into_iter().find_map(|e| match e {
        EngineEffect::StartMetronome { settings, .. } => settings,
        _ => None,
    });
    let settings = started.expect("phase bpm yields settings");
    assert!(settings.enabled);
    assert_eq!(settings.bpm, 90);
}

// ─── Exercise stepping ──────────────────────────────────────────────────────

#[test]
fn test_amrap_checklist_loops_until_cap() {
    let t0 = Instant::now();
    let mut engine = TimerEngine::from_phases(amrap_checklist(3, 120), t0).unwrap();
    assert_eq!(engine.state().global_time_cap, Some(120));
    assert_eq!(engine.state().global_cap_start_time, Some(t0));

    engine.advance_from_wait(at(t0, 10.0));
    engine.advance_from_wait(at(t0, 20.0));
    assert_eq!(engine.state().current_phase_index, 2);
    engine.take_effects();

    engine.advance_from_wait(at(t0, 30.0));
    assert_eq!(engine.state().current_phase_index, 0);
    assert_eq!(engine.state().amrap_round, 2);
    assert_eq!(engine.state().rounds, 1);
    let effects = engine.take_effects();
    assert_eq!(effects[0], EngineEffect::Cue(CueKind::RoundComplete));
    assert!(effects.contains(&EngineEffect::Speak("Round 2".to_string())));

    // the cap keeps running from the first entry, not the loop
    assert_eq!(engine.state().global_cap_start_time, Some(t0));

    engine.advance_from_wait(at(t0, 50.0));
    engine.advance_from_wait(at(t0, 70.0));
    engine.advance_from_wait(at(t0, 90.0));
    assert_eq!(engine.state().amrap_round, 3);

    engine.advance_from_wait(at(t0, 100.0));
    engine.advance_from_wait(at(t0, 110.0));
    assert_eq!(engine.state().current_phase_index, 2);

    // cap reached: the end of the checklist completes instead of looping
    engine.advance_from_wait(at(t0, 125.0));
    assert_eq!(engine.status(), RunStatus::Completed);
    assert_eq!(engine.state().amrap_round, 3);
}

#[test]
fn test_amrap_actual_duration_accumulates_across_loops() {
    let t0 = Instant::now();
    let mut engine = TimerEngine::from_phases(amrap_checklist(2, 300), t0).unwrap();

    engine.advance_from_wait(at(t0, 10.0));
    engine.advance_from_wait(at(t0, 15.0));
    engine.advance_from_wait(at(t0, 27.0));
    assert_eq!(engine.state().current_phase_index, 1);

    assert_eq!(engine.state().phases[0].actual_duration, Some(22.0));
    assert_eq!(engine.state().phases[1].actual_duration, Some(5.0));
}

#[test]
fn test_tick_completes_at_cap_mid_exercise() {
    let t0 = Instant::now();
    let mut engine = TimerEngine::from_phases(amrap_checklist(3, 60), t0).unwrap();

    engine.advance_from_wait(at(t0, 20.0));
    engine.tick(at(t0, 59.0));
    assert_eq!(engine.status(), RunStatus::Running);

    engine.tick(at(t0, 60.0));
    assert_eq!(engine.status(), RunStatus::Completed);
    assert_eq!(engine.state().current_phase_index, 1);
}

#[test]
fn test_cap_excludes_paused_time() {
    let t0 = Instant::now();
    let mut engine = TimerEngine::from_phases(amrap_checklist(3, 60), t0).unwrap();

    engine.tick(at(t0, 10.0));
    engine.toggle_pause(at(t0, 10.0));
    engine.tick(at(t0, 50.0));
    engine.tick(at(t0, 100.0));
    assert_eq!(engine.cap_elapsed(at(t0, 100.0)), Some(10.0));

    engine.toggle_pause(at(t0, 100.0));
    engine.tick(at(t0, 105.0));
    assert_eq!(engine.status(), RunStatus::Running);
    assert_eq!(engine.cap_elapsed(at(t0, 105.0)), Some(15.0));

    engine.tick(at(t0, 150.0));
    assert_eq!(engine.status(), RunStatus::Completed);
}

#[test]
fn test_for_time_checklist_completes_on_last_exercise() {
    let t0 = Instant::now();
    let phases = vec![
        make_step(1, 2, SegmentLabel::ForTime, None),
        make_step(2, 2, SegmentLabel::ForTime, None),
        Phase::timed(PhaseType::Rest, 60),
    ];
    let mut engine = TimerEngine::from_phases(phases, t0).unwrap();

    engine.advance_from_wait(at(t0, 5.0));
    assert_eq!(engine.state().current_phase_index, 1);
    assert_eq!(engine.status(), RunStatus::Running);

    engine.advance_from_wait(at(t0, 9.0));
    assert_eq!(engine.status(), RunStatus::Completed);
    assert_eq!(engine.state().phases[1].actual_duration, Some(4.0));
}

#[test]
fn test_leaving_capped_segment_clears_cap() {
    let t0 = Instant::now();
    let mut phases = amrap_checklist(2, 30);
    phases.push(Phase::timed(PhaseType::Rest, 60));
    let mut engine = TimerEngine::from_phases(phases, t0).unwrap();

    engine.advance_from_wait(at(t0, 10.0));
    // loop_end without an expired cap loops, so step past the segment by skipping
    engine.skip_phase(at(t0, 20.0));
    assert_eq!(engine.state().current_phase_index, 2);
    assert_eq!(engine.state().global_time_cap, None);

    engine.tick(at(t0, 45.0));
    assert_eq!(engine.status(), RunStatus::Running);
}

// ─── Ending a run ───────────────────────────────────────────────────────────

#[test]
fn test_completion_records_history() {
    let t0 = Instant::now();
    let config = intervals(2, 1, 2);
    let mut engine = TimerEngine::start(config.clone(), t0).unwrap();

    for secs in 1..=6 {
        engine.tick(at(t0, f64::from(secs)));
    }
    assert_eq!(engine.status(), RunStatus::Completed);

    let effects = engine.take_effects();
    let record = effects
        .iter()
        .find_map(|e| match e {
            EngineEffect::RecordHistory(record) => Some(record.clone()),
            _ => None,
        })
        .expect("history recorded");
    assert_eq!(record.timer_type, TimerType::Intervals);
    assert_eq!(record.duration, 6);
    assert_eq!(record.work_time, 4.0);
    assert_eq!(record.rounds, 2);
    assert_eq!(record.config, config);

    let tail: Vec<_> = effects.iter().rev().take(2).collect();
    assert_eq!(tail, vec![&EngineEffect::Redraw, &EngineEffect::Completed]);
    assert!(effects.contains(&EngineEffect::Speak("Workout complete!".to_string())));
    assert!(effects.contains(&EngineEffect::ReleaseWakeLock));
}

#[test]
fn test_manual_rounds_override_work_count() {
    let t0 = Instant::now();
    let config = TimerConfig::ForTime(CappedConfig::default());
    let mut engine = TimerEngine::start(config, t0).unwrap();
    assert_eq!(engine.state().phases[0].duration, PhaseDuration::Open);

    engine.add_round();
    engine.add_round();
    engine.add_round();
    engine.finish_for_time(at(t0, 95.5));

    let record = engine
        .take_effects()
        .into_iter()
        .find_map(|e| match e {
            EngineEffect::RecordHistory(record) => Some(record),
            _ => None,
        })
        .expect("history recorded");
    assert_eq!(record.duration, 95);
    assert_eq!(record.rounds, 3);
    assert_eq!(record.work_time, 95.5);
}

#[test]
fn test_runs_without_config_skip_history() {
    let t0 = Instant::now();
    let mut engine =
        TimerEngine::from_phases(vec![Phase::timed(PhaseType::Work, 1)], t0).unwrap();
    engine.tick(at(t0, 1.0));
    assert_eq!(engine.status(), RunStatus::Completed);
    assert!(!engine
        .take_effects()
        .iter()
        .any(|e| matches!(e, EngineEffect::RecordHistory(_))));
}

#[test]
fn test_stop_requires_confirmation() {
    let t0 = Instant::now();
    let mut engine = TimerEngine::start(stopwatch(), t0).unwrap();
    engine.take_effects();

    assert!(!engine.stop(&mut AutoConfirm(false)));
    assert_eq!(engine.status(), RunStatus::Running);
    assert!(engine.take_effects().is_empty());

    let mut prompt = String::new();
    let confirmed = engine.stop(&mut |message: &str| {
        prompt = message.to_string();
        true
    });
    assert!(confirmed);
    assert_eq!(prompt, "Stop this workout?");
    assert_eq!(engine.status(), RunStatus::Stopped);

    let effects = engine.take_effects();
    assert_eq!(
        effects,
        vec![EngineEffect::StopMetronome, EngineEffect::ReleaseWakeLock]
    );

    // already over: no second prompt
    assert!(engine.back_to_config(&mut AutoConfirm(false)));
}

#[test]
fn test_back_to_config_prompt() {
    let t0 = Instant::now();
    let mut engine = TimerEngine::start(stopwatch(), t0).unwrap();
    let mut prompt = String::new();
    engine.back_to_config(&mut |message: &str| {
        prompt = message.to_string();
        false
    });
    assert_eq!(prompt, "Go back to configuration? Timer will be stopped.");
    assert!(engine.is_active());
}

#[test]
fn test_replay_is_deterministic() {
    let t0 = Instant::now();
    let run = || {
        let mut engine = TimerEngine::start(intervals(3, 2, 3), t0).unwrap();
        for i in 1..=40 {
            let now = t0 + Duration::from_millis(250 * i);
            match i {
                7 => engine.toggle_pause(now),
                12 => engine.toggle_pause(now),
                20 => engine.skip_phase(now),
                _ => engine.tick(now),
            }
        }
        (engine.state().clone(), engine.take_effects())
    };
    assert_eq!(run(), run());
}
