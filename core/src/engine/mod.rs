//! Timer execution engine
//!
//! A run is a state machine over a phase list. It is driven from outside:
//! - **tick**: credit wall-clock time since the previous tick, fire countdown
//!   cues and auto-advance timed phases
//! - **user actions**: pause, skip, lap, round, advance from a wait, finish,
//!   stop
//!
//! Every operation takes the current `Instant` so runs can be replayed with a
//! synthetic clock. Side effects are queued as [`EngineEffect`]s.

mod effects;
mod error;
mod state;

#[cfg(test)]
mod engine_tests;

use std::time::{Duration, Instant};

pub use effects::EngineEffect;
pub use error::EngineError;
pub use state::{RunStatus, TimerState};

use wodtimer_types::{
    HistoryRecord, Lap, MetronomeSettings, NO_VALID_PHASES, Phase, PhaseKind, PhaseType, SegmentLabel,
    TimerConfig, TimerType,
};

use crate::builder::build_phases;
use crate::collaborators::{ConfirmationGate, CueKind};
use crate::metronome::effective_settings;

pub const STOP_PROMPT: &str = "Stop this workout?";
pub const BACK_PROMPT: &str = "Go back to configuration? Timer will be stopped.";
pub const COMPLETE_PHRASE: &str = "Workout complete!";

/// Suggested period of the driving tick
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct TimerEngine {
    state: TimerState,
    status: RunStatus,
    /// Present for runs started from a configuration; required for history
    config: Option<TimerConfig>,
    metronome: Option<MetronomeSettings>,
    last_tick: Instant,
    /// `paused_time` when the running cap was latched
    cap_pause_baseline: Duration,
    /// Countdown second already cued in the current phase
    last_announced: Option<u32>,
    effects: Vec<EngineEffect>,
}

impl TimerEngine {
    /// Validate `config`, build its phases and enter the first one.
    pub fn start(config: TimerConfig, now: Instant) -> Result<Self, EngineError> {
        validate(&config)?;

        let phases = build_phases(&config);
        if phases.is_empty() {
            return Err(EngineError::NoPhases);
        }

        let metronome = config.metronome().copied();
        Ok(Self::init(
            config.timer_type(),
            phases,
            Some(config),
            metronome,
            now,
        ))
    }

    /// Run an already built phase list. Such runs have no configuration and
    /// are never written to history.
    pub fn from_phases(phases: Vec<Phase>, now: Instant) -> Result<Self, EngineError> {
        if phases.is_empty() {
            return Err(EngineError::NoPhases);
        }
        Ok(Self::init(TimerType::Custom, phases, None, None, now))
    }

    fn init(
        timer_type: TimerType,
        phases: Vec<Phase>,
        config: Option<TimerConfig>,
        metronome: Option<MetronomeSettings>,
        now: Instant,
    ) -> Self {
        tracing::info!(
            timer_type = timer_type.as_str(),
            phases = phases.len(),
            "Timer started"
        );

        let mut engine = Self {
            state: TimerState::new(timer_type, phases, now),
            status: RunStatus::Running,
            config,
            metronome,
            last_tick: now,
            cap_pause_baseline: Duration::ZERO,
            last_announced: None,
            effects: vec![EngineEffect::AcquireWakeLock],
        };
        engine.enter_phase(now, true);
        engine
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn config(&self) -> Option<&TimerConfig> {
        self.config.as_ref()
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn is_paused(&self) -> bool {
        self.status == RunStatus::Paused
    }

    /// Drain queued side effects in emission order
    pub fn take_effects(&mut self) -> Vec<EngineEffect> {
        std::mem::take(&mut self.effects)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tick
    // ─────────────────────────────────────────────────────────────────────────

    pub fn tick(&mut self, now: Instant) {
        match self.status {
            RunStatus::Completed | RunStatus::Stopped => return,
            RunStatus::Paused => {
                self.absorb_pause(now);
                return;
            }
            RunStatus::Running => self.credit(now),
        }

        let Some(phase) = self.state.current_phase() else {
            self.complete();
            return;
        };
        let kind_secs = match phase.kind() {
            PhaseKind::Timed(secs) => Some(secs),
            _ => None,
        };

        self.latch_cap(now);
        if self.cap_expired(now) {
            tracing::debug!(cap = ?self.state.global_time_cap, "Time cap reached");
            self.complete();
            return;
        }

        if let Some(secs) = kind_secs {
            let remaining = f64::from(secs) - self.state.current_phase_time;
            let second = remaining.ceil();
            if (1.0..=3.0).contains(&second) {
                let n = second as u32;
                if self.last_announced != Some(n) {
                    self.last_announced = Some(n);
                    self.effects.push(EngineEffect::Cue(CueKind::Countdown(n as u8)));
                    self.effects.push(EngineEffect::Speak(n.to_string()));
                }
            }
            if remaining <= 0.0 {
                self.next_phase(now);
                return;
            }
        }

        self.effects.push(EngineEffect::Redraw);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // User actions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn toggle_pause(&mut self, now: Instant) {
        match self.status {
            RunStatus::Running => {
                self.credit(now);
                self.status = RunStatus::Paused;
            }
            RunStatus::Paused => {
                self.absorb_pause(now);
                self.status = RunStatus::Running;
            }
            RunStatus::Completed | RunStatus::Stopped => return,
        }
        let paused = self.is_paused();
        tracing::debug!(paused, "Pause toggled");
        self.effects.push(EngineEffect::PauseMetronome(paused));
        self.effects.push(EngineEffect::Redraw);
    }

    /// Leave the current phase regardless of its elapsed time
    pub fn skip_phase(&mut self, now: Instant) {
        if !self.catch_up(now) {
            return;
        }
        self.next_phase(now);
    }

    /// Record a split at the current phase time. Laps are accepted in every
    /// run type, not only stopwatch runs.
    pub fn add_lap(&mut self, now: Instant) {
        if !self.catch_up(now) {
            return;
        }
        let total = self.state.current_phase_time;
        let previous = self.state.laps.last().map_or(0.0, |lap| lap.total);
        let lap = Lap {
            lap: self.state.laps.len() as u32 + 1,
            split: total - previous,
            total,
        };
        tracing::debug!(lap = lap.lap, split = lap.split, "Lap");
        self.state.laps.push(lap);
        self.effects.push(EngineEffect::Cue(CueKind::RoundComplete));
        self.effects.push(EngineEffect::Redraw);
    }

    pub fn add_round(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.state.rounds += 1;
        self.effects.push(EngineEffect::Cue(CueKind::RoundComplete));
        self.effects.push(EngineEffect::Redraw);
    }

    /// The user confirms the current open-ended phase is done
    pub fn advance_from_wait(&mut self, now: Instant) {
        if !self.catch_up(now) {
            return;
        }
        self.effects.push(EngineEffect::Cue(CueKind::RoundComplete));

        let Some(phase) = self.state.current_phase() else {
            self.complete();
            return;
        };

        let step = match phase.kind() {
            PhaseKind::ExerciseStep(step) => Some(*step),
            _ => None,
        };
        let for_time = phase.label == Some(SegmentLabel::ForTime);

        match step {
            Some(step) if step.loop_end && self.cap_active() => {
                if self.cap_expired(now) {
                    self.complete();
                } else {
                    self.loop_to_start(now);
                }
            }
            Some(step) if for_time && step.index == step.count => self.complete(),
            _ => self.next_phase(now),
        }
    }

    /// Complete a For Time run at whatever time the user is done
    pub fn finish_for_time(&mut self, now: Instant) {
        if !self.catch_up(now) {
            return;
        }
        self.complete();
    }

    /// Tear the run down without recording history. Returns whether the run
    /// is now over; a declined prompt leaves it untouched.
    pub fn stop(&mut self, gate: &mut dyn ConfirmationGate) -> bool {
        self.teardown(gate, STOP_PROMPT)
    }

    /// Like [`stop`](Self::stop), with the prompt shown when leaving for the
    /// configuration screen.
    pub fn back_to_config(&mut self, gate: &mut dyn ConfirmationGate) -> bool {
        self.teardown(gate, BACK_PROMPT)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    fn teardown(&mut self, gate: &mut dyn ConfirmationGate, prompt: &str) -> bool {
        if self.status.is_terminal() {
            return true;
        }
        if !gate.confirm(prompt) {
            return false;
        }
        self.status = RunStatus::Stopped;
        self.effects.push(EngineEffect::StopMetronome);
        self.effects.push(EngineEffect::ReleaseWakeLock);
        tracing::info!(
            elapsed = self.state.total_elapsed,
            phase = self.state.current_phase_index,
            "Timer stopped"
        );
        true
    }

    fn next_phase(&mut self, now: Instant) {
        self.record_actual();
        self.state.current_phase_index += 1;
        self.state.current_phase_time = 0.0;
        self.last_announced = None;

        if self.state.current_phase().is_none() {
            self.complete();
            return;
        }
        self.enter_phase(now, false);
    }

    fn enter_phase(&mut self, now: Instant, first: bool) {
        let Some(phase) = self.state.current_phase() else {
            return;
        };
        let phase_type = phase.phase_type;
        let round = phase.round;
        let settings = effective_settings(phase, self.metronome.as_ref());

        tracing::debug!(
            index = self.state.current_phase_index,
            phase_type = phase_type.as_str(),
            duration = ?phase.duration,
            "Entering phase"
        );

        self.effects.push(EngineEffect::Speak(phase_type.phrase().to_string()));
        if let Some(round) = round {
            self.effects.push(EngineEffect::Speak(format!("Round {round}")));
        }
        match phase_type {
            PhaseType::Work => self.effects.push(EngineEffect::Cue(CueKind::WorkStart)),
            PhaseType::Rest => self.effects.push(EngineEffect::Cue(CueKind::RestStart)),
            _ if !first => self.effects.push(EngineEffect::Cue(CueKind::RoundComplete)),
            _ => {}
        }
        self.effects.push(EngineEffect::StartMetronome {
            phase_type,
            settings,
        });

        self.latch_cap(now);
        self.effects.push(EngineEffect::Redraw);
    }

    /// Jump back to the first exercise of the AMRAP checklist
    fn loop_to_start(&mut self, now: Instant) {
        self.record_actual();

        let current = self.state.current_phase_index;
        let start = self.state.phases[..=current]
            .iter()
            .rposition(|p| p.step.is_some_and(|s| s.loop_start))
            .unwrap_or(current);

        self.state.current_phase_index = start;
        self.state.current_phase_time = 0.0;
        self.last_announced = None;
        self.state.amrap_round += 1;
        self.state.rounds += 1;

        tracing::debug!(round = self.state.amrap_round, "AMRAP loop");

        let phase = &self.state.phases[start];
        let phase_type = phase.phase_type;
        let settings = effective_settings(phase, self.metronome.as_ref());
        self.effects
            .push(EngineEffect::Speak(format!("Round {}", self.state.amrap_round)));
        self.effects.push(EngineEffect::StartMetronome {
            phase_type,
            settings,
        });
        self.latch_cap(now);
        self.effects.push(EngineEffect::Redraw);
    }

    fn complete(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.record_actual();
        self.status = RunStatus::Completed;

        self.effects.push(EngineEffect::StopMetronome);
        self.effects.push(EngineEffect::ReleaseWakeLock);
        self.effects.push(EngineEffect::Cue(CueKind::WorkoutFinish));
        self.effects.push(EngineEffect::Speak(COMPLETE_PHRASE.to_string()));

        if let Some(record) = self.history_record() {
            self.effects.push(EngineEffect::RecordHistory(record));
        }
        self.effects.push(EngineEffect::Completed);
        self.effects.push(EngineEffect::Redraw);

        tracing::info!(
            timer_type = self.state.timer_type.as_str(),
            elapsed = self.state.total_elapsed,
            rounds = self.state.rounds,
            "Workout complete"
        );
    }

    fn history_record(&self) -> Option<HistoryRecord> {
        let config = self.config.clone()?;
        let work: Vec<&Phase> = self
            .state
            .phases
            .iter()
            .filter(|p| p.phase_type == PhaseType::Work)
            .collect();

        let work_time = work
            .iter()
            .map(|p| {
                p.actual_duration
                    .unwrap_or_else(|| f64::from(p.duration.finite_secs()))
            })
            .sum();
        let rounds = match self.state.rounds {
            0 => work.len() as u32,
            n => n,
        };

        Some(HistoryRecord {
            timer_type: self.state.timer_type,
            duration: self.state.total_elapsed.floor() as u64,
            work_time,
            rounds,
            config,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Time bookkeeping
    // ─────────────────────────────────────────────────────────────────────────

    /// Credit running time up to `now`
    fn credit(&mut self, now: Instant) {
        let delta = now.saturating_duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;
        self.state.current_phase_time += delta;
        self.state.total_elapsed += delta;
    }

    /// Count time since the last tick as paused
    fn absorb_pause(&mut self, now: Instant) {
        self.state.paused_time += now.saturating_duration_since(self.last_tick);
        self.last_tick = now;
    }

    /// Bring the clock up to `now` before a user action. Returns false when
    /// the run is already over.
    fn catch_up(&mut self, now: Instant) -> bool {
        match self.status {
            RunStatus::Running => self.credit(now),
            RunStatus::Paused => self.absorb_pause(now),
            RunStatus::Completed | RunStatus::Stopped => return false,
        }
        true
    }

    /// Add the current visit to the phase's actual duration. AMRAP loops visit
    /// the same phase repeatedly, so visits accumulate.
    fn record_actual(&mut self) {
        let spent = self.state.current_phase_time;
        if let Some(phase) = self.state.phases.get_mut(self.state.current_phase_index) {
            *phase.actual_duration.get_or_insert(0.0) += spent;
        }
        self.state.current_phase_time = 0.0;
    }

    /// Start the cap clock on the first exercise of a capped segment. Leaving
    /// the segment clears it.
    fn latch_cap(&mut self, now: Instant) {
        let step = self.state.current_phase().and_then(|p| p.step);
        match step {
            None => {
                self.state.global_time_cap = None;
                self.state.global_cap_start_time = None;
            }
            Some(step) if step.index == 1 && self.state.global_cap_start_time.is_none() => {
                if let Some(cap) = step.time_cap.filter(|&cap| cap > 0) {
                    self.state.global_time_cap = Some(cap);
                    self.state.global_cap_start_time = Some(now);
                    self.cap_pause_baseline = self.state.paused_time;
                    tracing::debug!(cap, "Time cap started");
                }
            }
            Some(_) => {}
        }
    }

    fn cap_active(&self) -> bool {
        self.state.global_time_cap.is_some() && self.state.global_cap_start_time.is_some()
    }

    /// Running seconds since the cap was latched, pauses excluded
    pub fn cap_elapsed(&self, now: Instant) -> Option<f64> {
        let start = self.state.global_cap_start_time?;
        let wall = now.saturating_duration_since(start);
        let mut paused = self.state.paused_time.saturating_sub(self.cap_pause_baseline);
        if self.is_paused() {
            paused += now.saturating_duration_since(self.last_tick);
        }
        Some(wall.saturating_sub(paused).as_secs_f64())
    }

    fn cap_expired(&self, now: Instant) -> bool {
        match (self.state.global_time_cap, self.cap_elapsed(now)) {
            (Some(cap), Some(elapsed)) => elapsed >= f64::from(cap),
            _ => false,
        }
    }
}

fn validate(config: &TimerConfig) -> Result<(), EngineError> {
    if config.is_valid() {
        return Ok(());
    }
    let reason = match config {
        TimerConfig::Custom(c) => {
            return Err(EngineError::Parse {
                message: c
                    .parsed
                    .error
                    .clone()
                    .unwrap_or_else(|| NO_VALID_PHASES.to_string()),
            });
        }
        TimerConfig::Countdown(_) => "duration must be greater than zero",
        TimerConfig::Intervals(_) => "work and rounds must be greater than zero",
        TimerConfig::Emom(_) => "rounds must be greater than zero",
        TimerConfig::Amrap(_) => "time cap must be greater than zero",
        TimerConfig::Stopwatch(_) | TimerConfig::ForTime(_) => "invalid configuration",
    };
    Err(EngineError::InvalidConfig {
        timer_type: config.timer_type().as_str(),
        reason,
    })
}
