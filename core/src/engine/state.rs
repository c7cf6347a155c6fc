use std::time::{Duration, Instant};

use wodtimer_types::{Lap, Phase, PhaseType, TimerType};

/// Lifecycle of a run. There is no idle state: an engine only exists while a
/// run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Paused,
    /// Natural end, history recorded
    Completed,
    /// Torn down by the user, nothing recorded
    Stopped,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Stopped)
    }
}

/// Mutable state of one run
#[derive(Debug, Clone, PartialEq)]
pub struct TimerState {
    pub timer_type: TimerType,
    pub phases: Vec<Phase>,
    pub current_phase_index: usize,
    /// Seconds credited to the current phase
    pub current_phase_time: f64,
    /// Seconds credited to the run, pauses excluded
    pub total_elapsed: f64,
    /// Manual round counter (AMRAP) and loop counter (exercise stepping)
    pub rounds: u32,
    pub laps: Vec<Lap>,
    pub start_time: Instant,
    /// Wall-clock time spent paused
    pub paused_time: Duration,
    /// Budget of the capped segment currently running, in seconds
    pub global_time_cap: Option<u32>,
    pub global_cap_start_time: Option<Instant>,
    /// 1-based pass through an AMRAP exercise checklist
    pub amrap_round: u32,
}

impl TimerState {
    pub(crate) fn new(timer_type: TimerType, phases: Vec<Phase>, now: Instant) -> Self {
        Self {
            timer_type,
            phases,
            current_phase_index: 0,
            current_phase_time: 0.0,
            total_elapsed: 0.0,
            rounds: 0,
            laps: Vec::new(),
            start_time: now,
            paused_time: Duration::ZERO,
            global_time_cap: None,
            global_cap_start_time: None,
            amrap_round: 1,
        }
    }

    pub fn current_phase(&self) -> Option<&Phase> {
        self.phases.get(self.current_phase_index)
    }

    pub fn next_phase(&self) -> Option<&Phase> {
        self.phases.get(self.current_phase_index + 1)
    }

    /// Seconds left in the current phase, `None` when it has no fixed length
    pub fn remaining(&self) -> Option<f64> {
        let secs = self.current_phase()?.duration.secs()?;
        Some((f64::from(secs) - self.current_phase_time).max(0.0))
    }

    pub fn work_phase_count(&self) -> usize {
        self.phases.iter().filter(|p| p.phase_type == PhaseType::Work).count()
    }
}
