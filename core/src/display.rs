//! Render-ready view of a running engine
//!
//! Front ends poll [`DisplaySnapshot::from_engine`] after every tick or
//! action instead of reading `TimerState` directly.

use serde::Serialize;
use wodtimer_types::{Exercise, Lap, Phase, PhaseType, SegmentLabel, TimerType};

use crate::engine::{RunStatus, TimerEngine, TimerState};
use crate::time::{ceil_secs, floor_secs, format_time, format_time_millis};

/// `back squat 5x @100kg 80% PSE 8`
pub fn exercise_display(exercise: &Exercise) -> String {
    let mut text = exercise.name.clone();
    if let Some(reps) = exercise.reps {
        text.push_str(&format!(" {reps}x"));
    }
    if let Some(weight) = exercise.weight {
        let unit = exercise.weight_unit.unwrap_or_default();
        text.push_str(&format!(" @{weight}{}", unit.as_str()));
    }
    if let Some(percentage) = &exercise.percentage {
        text.push(' ');
        text.push_str(percentage);
    }
    if let Some(pse) = exercise.pse {
        text.push_str(&format!(" PSE {pse}"));
    }
    text
}

/// Large label above the clock: `WORK!`, `REST`, `DONE?`, ...
pub fn phase_label(phase: &Phase) -> String {
    match phase.phase_type {
        PhaseType::Wait => "DONE?".to_string(),
        PhaseType::Work => "WORK!".to_string(),
        other => other.as_str().to_uppercase(),
    }
}

/// Segment heading: the user's `#` label, else `AMRAP` / `FORTIME`
pub fn block_label(phase: &Phase) -> Option<String> {
    phase
        .custom_label
        .clone()
        .or_else(|| phase.label.map(|l| l.as_str().to_uppercase()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySnapshot {
    pub status: &'static str,
    pub timer_type: TimerType,
    /// 0-based
    pub phase_index: usize,
    pub phase_count: usize,
    pub phase_type: PhaseType,
    pub phase_label: String,
    pub block_label: Option<String>,
    pub exercise: Option<String>,
    /// Clock text, counting up or down depending on the phase
    pub time_text: String,
    pub counting_up: bool,
    pub info: String,
    pub next: Option<String>,
    /// Fraction of the phase left, 1.0 for open-ended phases
    pub progress: f64,
    pub total_text: String,
    pub work_text: String,
    pub laps: Vec<Lap>,
    /// The phase waits for `advance`
    pub awaits_user: bool,
    pub rounds: u32,
    pub amrap_round: u32,
}

impl DisplaySnapshot {
    /// `None` only for an engine without phases, which `start` never yields.
    pub fn from_engine(engine: &TimerEngine, millis: bool) -> Option<Self> {
        let state = engine.state();
        // after completion the index runs past the end; keep showing the last phase
        let index = state.current_phase_index.min(state.phases.len().checked_sub(1)?);
        let phase = &state.phases[index];

        let counting_up = counts_up(state.timer_type, phase);
        let time_text = if counting_up {
            let show_millis = phase
                .millis
                .unwrap_or(millis && state.timer_type == TimerType::Stopwatch);
            if show_millis {
                format_time_millis(state.current_phase_time)
            } else {
                format_time(floor_secs(state.current_phase_time))
            }
        } else {
            format_time(ceil_secs(state.remaining().unwrap_or(0.0)))
        };

        let next = state
            .phases
            .get(index + 1)
            .filter(|_| !phase.duration.is_open())
            .map(|next| match next.duration.secs() {
                Some(secs) => format!(
                    "Next: {} {}",
                    next.phase_type.as_str(),
                    format_time(u64::from(secs))
                ),
                None => format!("Next: {}", next.phase_type.as_str()),
            });

        let progress = match phase.duration.secs() {
            Some(0) => 0.0,
            Some(secs) => (1.0 - state.current_phase_time / f64::from(secs)).clamp(0.0, 1.0),
            None => 1.0,
        };

        Some(Self {
            status: status_str(engine.status()),
            timer_type: state.timer_type,
            phase_index: index,
            phase_count: state.phases.len(),
            phase_type: phase.phase_type,
            phase_label: phase_label(phase),
            block_label: block_label(phase),
            exercise: phase.exercises.first().map(exercise_display),
            time_text,
            counting_up,
            info: info_line(state, phase),
            next,
            progress,
            total_text: format_time(floor_secs(state.total_elapsed)),
            work_text: format_time(floor_secs(work_so_far(state, index))),
            laps: state.laps.clone(),
            awaits_user: phase.awaits_user(),
            rounds: state.rounds,
            amrap_round: state.amrap_round,
        })
    }
}

fn status_str(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Running => "running",
        RunStatus::Paused => "paused",
        RunStatus::Completed => "completed",
        RunStatus::Stopped => "stopped",
    }
}

fn counts_up(timer_type: TimerType, phase: &Phase) -> bool {
    let work = phase.phase_type == PhaseType::Work;
    timer_type == TimerType::Stopwatch
        || (timer_type == TimerType::Amrap && work)
        || (timer_type == TimerType::ForTime && work && phase.duration.is_open())
        || phase.duration.is_open()
}

fn info_line(state: &TimerState, phase: &Phase) -> String {
    if let Some(round) = phase.round {
        return format!("Round {round}/{}", state.work_phase_count());
    }
    if let Some(step) = &phase.step {
        let exercise = format!("Exercise {}/{}", step.index, step.count);
        return match phase.label {
            Some(SegmentLabel::Amrap) => format!("Round {} | {exercise}", state.amrap_round),
            _ => exercise,
        };
    }
    if let Some(block) = phase.block.as_ref().filter(|b| b.total_rounds > 1) {
        return format!("Round {}/{}", block.round, block.total_rounds);
    }
    match state.timer_type {
        TimerType::Amrap => format!("Rounds: {}", state.rounds),
        TimerType::Stopwatch if !state.laps.is_empty() => format!("Laps: {}", state.laps.len()),
        _ => String::new(),
    }
}

/// Work seconds so far: earlier work phases at their actual length (nominal
/// when never entered), plus the current phase if it is work. The current
/// phase may already hold time from earlier AMRAP passes.
fn work_so_far(state: &TimerState, index: usize) -> f64 {
    let earlier: f64 = state.phases[..index]
        .iter()
        .filter(|p| p.phase_type == PhaseType::Work)
        .map(|p| {
            p.actual_duration
                .unwrap_or_else(|| f64::from(p.duration.finite_secs()))
        })
        .sum();
    let phase = &state.phases[index];
    let current = if phase.phase_type == PhaseType::Work {
        phase.actual_duration.unwrap_or(0.0) + state.current_phase_time
    } else {
        0.0
    };
    earlier + current
}
