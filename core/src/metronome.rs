//! Lookahead metronome scheduler
//!
//! A coarse timer calls [`Metronome::schedule`] every [`LOOKAHEAD`]; each call
//! places every click that falls within the next [`SCHEDULE_AHEAD`] seconds
//! onto the sink's precise clock. While paused the beat grid keeps moving but
//! no clicks are placed, so resuming continues on the same grid.

use std::time::Duration;

use wodtimer_types::{MetronomeMode, MetronomeSettings, Phase, PhaseType};

use crate::collaborators::MetronomeSink;

/// Period of the coarse scheduling timer
pub const LOOKAHEAD: Duration = Duration::from_millis(25);

/// How far ahead of the sink clock clicks are placed, in seconds
pub const SCHEDULE_AHEAD: f64 = 0.1;

/// Settings in effect for `phase`.
///
/// A phase-local BPM annotation switches the metronome on with `always` set,
/// so the phase clicks whatever its type and whatever the run's base settings
/// say. The annotation's mode is recorded in the during-work / during-rest
/// flags but does not gate playback.
pub fn effective_settings(
    phase: &Phase,
    base: Option<&MetronomeSettings>,
) -> Option<MetronomeSettings> {
    match phase.metronome {
        Some(bpm) => {
            let mode = phase.metronome_mode.unwrap_or_default();
            Some(
                MetronomeSettings {
                    enabled: true,
                    bpm,
                    during_work: mode == MetronomeMode::Work,
                    during_rest: mode == MetronomeMode::Rest,
                    always: true,
                }
                .with_bpm(bpm),
            )
        }
        None => base.copied(),
    }
}

/// Whether clicks should be audible during a phase of `phase_type`
pub fn should_play(phase_type: PhaseType, settings: &MetronomeSettings) -> bool {
    if !settings.enabled || settings.bpm == 0 {
        return false;
    }
    matches!(phase_type, PhaseType::Stopwatch | PhaseType::Countdown)
        || settings.always
        || (settings.during_work && phase_type == PhaseType::Work)
        || (settings.during_rest && phase_type == PhaseType::Rest)
}

#[derive(Debug, Clone, Copy)]
struct BeatGrid {
    /// Seconds between clicks
    interval: f64,
    /// Sink time of the next click
    next_click: f64,
}

pub struct Metronome<S> {
    sink: S,
    grid: Option<BeatGrid>,
    paused: bool,
}

impl<S: MetronomeSink> Metronome<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            grid: None,
            paused: false,
        }
    }

    /// Restart the click schedule for a phase. Returns whether the metronome
    /// is now audible.
    pub fn start(
        &mut self,
        phase_type: PhaseType,
        settings: Option<&MetronomeSettings>,
        paused: bool,
    ) -> bool {
        self.stop();
        self.paused = paused;

        let Some(settings) = settings.filter(|s| should_play(phase_type, s)) else {
            return false;
        };

        self.sink.resume();
        self.grid = Some(BeatGrid {
            interval: 60.0 / f64::from(settings.bpm),
            next_click: self.sink.current_time(),
        });
        tracing::debug!(bpm = settings.bpm, ?phase_type, "Metronome started");

        self.schedule();
        true
    }

    /// Place every click due within the lookahead window
    pub fn schedule(&mut self) {
        let Self { sink, grid, paused } = self;
        let Some(grid) = grid else {
            return;
        };

        let now = sink.current_time();
        while grid.next_click < now + SCHEDULE_AHEAD {
            if !*paused {
                sink.schedule_click(grid.next_click);
                sink.beat_pulse(Duration::from_secs_f64((grid.next_click - now).max(0.0)));
            }
            grid.next_click += grid.interval;
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn stop(&mut self) {
        self.grid = None;
    }

    pub fn is_running(&self) -> bool {
        self.grid.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink with a manually advanced clock
    #[derive(Default)]
    struct FakeSink {
        now: f64,
        clicks: Vec<f64>,
        pulses: usize,
        resumed: usize,
    }

    impl MetronomeSink for FakeSink {
        fn schedule_click(&mut self, at: f64) {
            self.clicks.push(at);
        }

        fn current_time(&self) -> f64 {
            self.now
        }

        fn resume(&mut self) {
            self.resumed += 1;
        }

        fn beat_pulse(&mut self, _delay: Duration) {
            self.pulses += 1;
        }
    }

    fn settings(bpm: u32) -> MetronomeSettings {
        MetronomeSettings {
            enabled: true,
            ..MetronomeSettings::default()
        }
        .with_bpm(bpm)
    }

    #[test]
    fn should_play_rules() {
        let base = settings(120);
        assert!(should_play(PhaseType::Work, &base));
        assert!(!should_play(PhaseType::Rest, &base));
        assert!(should_play(PhaseType::Stopwatch, &base));
        assert!(should_play(PhaseType::Countdown, &base));
        assert!(!should_play(PhaseType::Warmup, &base));

        let always = MetronomeSettings { always: true, ..base };
        assert!(should_play(PhaseType::Warmup, &always));

        let disabled = MetronomeSettings { enabled: false, ..always };
        assert!(!should_play(PhaseType::Work, &disabled));
    }

    #[test]
    fn phase_bpm_forces_metronome_on() {
        let phase = Phase {
            metronome: Some(90),
            metronome_mode: Some(MetronomeMode::Rest),
            ..Phase::timed(PhaseType::Rest, 30)
        };
        let base = MetronomeSettings::default();
        let effective = effective_settings(&phase, Some(&base)).unwrap();
        assert!(effective.enabled);
        assert!(effective.always);
        assert!(effective.during_rest);
        assert!(!effective.during_work);
        assert_eq!(effective.bpm, 90);

        // no base settings at all still clicks
        assert!(effective_settings(&phase, None).is_some());
    }

    #[test]
    fn phase_bpm_clicks_regardless_of_mode() {
        let phase = Phase {
            metronome: Some(120),
            metronome_mode: Some(MetronomeMode::Rest),
            ..Phase::timed(PhaseType::Work, 30)
        };
        let effective = effective_settings(&phase, None).unwrap();
        assert!(should_play(PhaseType::Work, &effective));
        assert!(should_play(PhaseType::Warmup, &effective));
    }

    #[test]
    fn phase_without_bpm_uses_base() {
        let phase = Phase::timed(PhaseType::Work, 30);
        assert_eq!(effective_settings(&phase, None), None);
        let base = settings(100);
        assert_eq!(effective_settings(&phase, Some(&base)), Some(base));
    }

    #[test]
    fn schedules_within_lookahead_window() {
        let mut metronome = Metronome::new(FakeSink::default());
        // 600 bpm is clamped to 200: one click every 0.3s
        assert!(metronome.start(PhaseType::Work, Some(&settings(600)), false));
        assert_eq!(metronome.sink().clicks, vec![0.0]);
        assert_eq!(metronome.sink().resumed, 1);

        metronome.sink_mut().now = 0.25;
        metronome.schedule();
        assert_eq!(metronome.sink().clicks, vec![0.0, 0.3]);

        metronome.sink_mut().now = 0.26;
        metronome.schedule();
        assert_eq!(metronome.sink().clicks.len(), 2);
        assert_eq!(metronome.sink().pulses, 2);
    }

    #[test]
    fn paused_metronome_keeps_grid_without_clicking() {
        let mut metronome = Metronome::new(FakeSink::default());
        metronome.start(PhaseType::Work, Some(&settings(120)), false);
        assert_eq!(metronome.sink().clicks.len(), 1);

        metronome.set_paused(true);
        metronome.sink_mut().now = 2.0;
        metronome.schedule();
        assert_eq!(metronome.sink().clicks.len(), 1);

        metronome.set_paused(false);
        metronome.sink_mut().now = 2.45;
        metronome.schedule();
        // grid points are multiples of 0.5s
        assert_eq!(metronome.sink().clicks, vec![0.0, 2.5]);
    }

    #[test]
    fn silent_phase_does_not_start() {
        let mut metronome = Metronome::new(FakeSink::default());
        assert!(!metronome.start(PhaseType::Rest, Some(&settings(120)), false));
        assert!(!metronome.is_running());
        assert!(!metronome.start(PhaseType::Work, None, false));
        assert!(metronome.sink().clicks.is_empty());
    }

    #[test]
    fn stop_clears_schedule() {
        let mut metronome = Metronome::new(FakeSink::default());
        metronome.start(PhaseType::Stopwatch, Some(&settings(120)), false);
        metronome.stop();
        metronome.sink_mut().now = 5.0;
        metronome.schedule();
        assert_eq!(metronome.sink().clicks.len(), 1);
    }
}
