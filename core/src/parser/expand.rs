//! Exercise stepping
//!
//! A work phase that lists several exercises and is either a confirm phase
//! or an AMRAP / For Time segment becomes one open-ended confirm phase per
//! exercise. AMRAP expansions are marked as a loop so the engine can cycle
//! through the checklist until the time cap.

use wodtimer_types::{ExerciseStep, Phase, PhaseDuration, PhaseType, SegmentLabel};

fn should_expand(phase: &Phase) -> bool {
    phase.phase_type == PhaseType::Work
        && phase.exercises.len() > 1
        && (phase.is_wait || phase.label.is_some())
}

pub(crate) fn expand_exercise_steps(phases: Vec<Phase>) -> Vec<Phase> {
    let mut result = Vec::with_capacity(phases.len());

    for phase in phases {
        if !should_expand(&phase) {
            result.push(phase);
            continue;
        }

        let count = phase.exercises.len() as u32;
        let is_amrap = phase.label == Some(SegmentLabel::Amrap);
        let time_cap = phase.duration.secs();

        for (idx, exercise) in phase.exercises.iter().enumerate() {
            let index = idx as u32 + 1;
            result.push(Phase {
                phase_type: PhaseType::Work,
                duration: PhaseDuration::Open,
                is_wait: true,
                exercises: vec![exercise.clone()],
                step: Some(ExerciseStep {
                    index,
                    count,
                    loop_start: is_amrap && index == 1,
                    loop_end: is_amrap && index == count,
                    time_cap,
                }),
                ..phase.clone()
            });
        }
    }

    result
}
