//! Workout text grammar
//!
//! [`parse`] turns a line-oriented workout description into a flat phase list
//! plus display blocks. It never fails: text that yields no phase comes back
//! as a [`ParsedWorkout`] carrying an error message.
//!
//! ```text
//! # Tabata
//! 8x
//! 20s work [160 bpm]
//! 10s rest
//! ---
//! amrap 12min
//! - pull ups (5x)
//! - push ups (10x)
//! ```

mod annotations;
mod exercise;
mod expand;
mod line;
pub mod presets;


use std::ops::Range;

use hashbrown::HashSet;
use wodtimer_types::{
    BlockPosition, BlockType, Exercise, MetronomeMode, NO_VALID_PHASES, ParsedWorkout, Phase,
    PhaseDuration, PhaseType, SegmentLabel, WorkoutBlock,
};

pub use exercise::parse_exercise;
pub use presets::{CUSTOM_PRESETS, INTERVAL_PRESETS, IntervalPreset};

use line::{BlockKeyword, Line, TimeHint, WaitKind};

/// Parse workout text into phases and blocks.
pub fn parse(text: &str) -> ParsedWorkout {
    let lines: Vec<&str> = text.trim().split('\n').map(str::trim).collect();

    let mut ctx = ParserContext {
        explicit_close: find_explicit_close_repeats(&lines),
        ..Default::default()
    };

    for (index, raw) in lines.iter().enumerate() {
        ctx.process_line(index, raw);
    }

    let parsed = ctx.finish();
    tracing::debug!(
        phases = parsed.phases.len(),
        blocks = parsed.blocks.len(),
        error = parsed.error.as_deref(),
        "Parsed workout"
    );
    parsed
}

/// Indices of repeat openers whose body is closed by an explicit `end`,
/// `endrepeat` or separator before the next opener or section keyword.
/// Blank lines inside such a repeat do not close it.
fn find_explicit_close_repeats(lines: &[&str]) -> HashSet<usize> {
    let lowered: Vec<String> = lines
        .iter()
        .map(|l| annotations::strip(l).to_lowercase())
        .collect();

    let mut result = HashSet::new();
    for (i, opener) in lowered.iter().enumerate() {
        if !line::is_repeat_start(opener) {
            continue;
        }
        for check in &lowered[i + 1..] {
            if line::is_repeat_start(check) || line::is_section_break(check) {
                break;
            }
            if line::is_repeat_closer(check) {
                result.insert(i);
                break;
            }
        }
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Parser state
// ─────────────────────────────────────────────────────────────────────────────

/// Open repeat accumulating one round's template
#[derive(Debug, Default)]
struct Repeat {
    count: u32,
    phases: Vec<Phase>,
    /// `tabata` for named openers, else the section type in effect
    label: Option<String>,
    metronome: Option<u32>,
    metronome_mode: Option<MetronomeMode>,
    explicit_close: bool,
}

/// Block recorded during parsing; member phases are resolved at the end so
/// later exercise attachments show up in the block's copies.
#[derive(Debug)]
struct BlockDraft {
    block_type: BlockType,
    label: Option<String>,
    range: Range<usize>,
    repetitions: Option<u32>,
    exercises: Vec<Exercise>,
    metronome: Option<u32>,
    sub_phases: Vec<Phase>,
}

impl BlockDraft {
    fn single(block_type: BlockType, index: usize) -> Self {
        Self {
            block_type,
            label: None,
            range: index..index + 1,
            repetitions: None,
            exercises: Vec::new(),
            metronome: None,
            sub_phases: Vec::new(),
        }
    }

    fn resolve(self, phases: &[Phase]) -> WorkoutBlock {
        let members = phases[self.range].to_vec();
        let total_duration = members
            .iter()
            .fold(0u32, |sum, p| sum.saturating_add(p.duration.finite_secs()));
        WorkoutBlock {
            block_type: self.block_type,
            label: self.label,
            phases: members,
            total_duration,
            repetitions: self.repetitions,
            exercises: self.exercises,
            metronome: self.metronome,
            sub_phases: self.sub_phases,
        }
    }
}

#[derive(Debug, Default)]
struct ParserContext {
    phases: Vec<Phase>,
    blocks: Vec<BlockDraft>,
    block_type: Option<BlockType>,
    custom_label: Option<String>,
    metronome: Option<u32>,
    metronome_mode: Option<MetronomeMode>,
    /// Exercises seen before any phase they could attach to
    pending: Vec<Exercise>,
    repeat: Option<Repeat>,
    explicit_close: HashSet<usize>,
    next_block_id: u32,
}

impl ParserContext {
    fn process_line(&mut self, index: usize, raw: &str) {
        if let Some(label) = raw.strip_prefix('#') {
            self.flush();
            self.custom_label = Some(label.trim().to_string());
            return;
        }

        if raw.is_empty() {
            if !self.repeat.as_ref().is_some_and(|r| r.explicit_close) {
                self.close_repeat();
            }
            return;
        }

        if line::is_separator(raw) {
            self.close_repeat();
            self.flush();
            self.block_type = None;
            self.custom_label = None;
            self.metronome = None;
            self.metronome_mode = None;
            self.pending.clear();
            return;
        }

        let annotated = annotations::extract(raw);
        if let Some((bpm, mode)) = annotated.metronome {
            self.apply_metronome(bpm, mode);
        }
        let millis = annotated.millis;

        match line::classify(&annotated.line) {
            Line::Wait(kind) => self.wait(kind),
            Line::Exercise(exercise) => self.exercise(exercise),
            Line::Stopwatch => {
                let phase = Phase {
                    is_wait: true,
                    millis,
                    ..self.scoped_phase(PhaseType::Stopwatch, PhaseDuration::Open)
                };
                self.standalone(phase);
            }
            Line::Countdown(secs) => {
                let phase = Phase {
                    millis,
                    ..self.scoped_phase(PhaseType::Countdown, PhaseDuration::Fixed(secs))
                };
                self.standalone(phase);
            }
            Line::Emom => self.block_type = Some(BlockType::Emom),
            Line::ForTime(secs) => self.capped(SegmentLabel::ForTime, secs, millis),
            Line::Amrap(secs) => self.capped(SegmentLabel::Amrap, secs, millis),
            Line::Typed { phase_type, secs } => self.typed(phase_type, secs, millis),
            Line::StandaloneRest(secs) => self.standalone_rest(secs),
            Line::Keyword(keyword) => self.keyword(keyword),
            Line::RepeatOpen { count, tabata } => self.open_repeat(index, count, tabata),
            Line::RepeatClose => self.close_repeat(),
            Line::Time { secs, hint } => self.time(secs, hint, millis),
            Line::Unrecognized => {}
        }
    }

    fn finish(mut self) -> ParsedWorkout {
        self.close_repeat();
        self.flush();

        if self.phases.is_empty() {
            return ParsedWorkout::failed(NO_VALID_PHASES);
        }

        let Self { phases, blocks, .. } = self;
        let blocks = blocks.into_iter().map(|b| b.resolve(&phases)).collect();

        ParsedWorkout {
            phases: expand::expand_exercise_steps(phases),
            blocks,
            error: None,
        }
    }

    // ─── Context helpers ────────────────────────────────────────────────────

    fn apply_metronome(&mut self, bpm: u32, mode: MetronomeMode) {
        match &mut self.repeat {
            Some(repeat) => {
                repeat.metronome = Some(bpm);
                repeat.metronome_mode = Some(mode);
            }
            None => {
                self.metronome = Some(bpm);
                self.metronome_mode = Some(mode);
            }
        }
    }

    /// Metronome annotation in scope: the repeat's inside a repeat, else the
    /// current one.
    fn scoped_metronome(&self) -> (Option<u32>, Option<MetronomeMode>) {
        match &self.repeat {
            Some(repeat) => (repeat.metronome, repeat.metronome_mode),
            None => (self.metronome, self.metronome_mode),
        }
    }

    fn scoped_phase(&self, phase_type: PhaseType, duration: PhaseDuration) -> Phase {
        let (metronome, metronome_mode) = self.scoped_metronome();
        Phase {
            custom_label: self.custom_label.clone(),
            metronome,
            metronome_mode,
            ..Phase::new(phase_type, duration)
        }
    }

    /// Hand buffered exercises to the last phase if it has none, then drop
    /// the buffer.
    fn flush(&mut self) {
        if !self.pending.is_empty()
            && let Some(last) = self.phases.last_mut()
            && last.exercises.is_empty()
        {
            last.exercises = std::mem::take(&mut self.pending);
        }
        self.pending.clear();
    }

    /// Like [`Self::flush`], but when there is no previous phase able to take
    /// the buffered exercises they are returned for the phase being created.
    fn flush_or_take(&mut self) -> Vec<Exercise> {
        match self.phases.last() {
            Some(last) if last.exercises.is_empty() => {
                self.flush();
                Vec::new()
            }
            _ => std::mem::take(&mut self.pending),
        }
    }

    fn push_block(&mut self, block_type: BlockType, exercises: Vec<Exercise>) {
        let index = self.phases.len() - 1;
        self.blocks.push(BlockDraft {
            label: self.custom_label.clone(),
            exercises,
            metronome: self.metronome,
            ..BlockDraft::single(block_type, index)
        });
    }

    fn reset_after_block(&mut self) {
        self.pending.clear();
        self.custom_label = None;
        self.metronome = None;
        self.metronome_mode = None;
    }

    fn push_to_repeat(&mut self, phase: Phase) -> Option<Phase> {
        match &mut self.repeat {
            Some(repeat) => {
                repeat.phases.push(phase);
                None
            }
            None => Some(phase),
        }
    }

    // ─── Line handlers ──────────────────────────────────────────────────────

    fn wait(&mut self, kind: WaitKind) {
        let phase_type = match kind {
            WaitKind::Work => PhaseType::Work,
            WaitKind::Rest => PhaseType::Rest,
            WaitKind::Bare if self.block_type == Some(BlockType::Warmup) => PhaseType::Warmup,
            WaitKind::Bare if self.block_type == Some(BlockType::Cooldown) => PhaseType::Cooldown,
            WaitKind::Bare | WaitKind::Other => PhaseType::Wait,
        };
        let phase = Phase {
            is_wait: true,
            ..self.scoped_phase(phase_type, PhaseDuration::Open)
        };

        let Some(mut phase) = self.push_to_repeat(phase) else {
            return;
        };
        phase.exercises = self.flush_or_take();
        let exercises = phase.exercises.clone();
        self.phases.push(phase);
        self.push_block(BlockType::Wait, exercises);
        self.pending.clear();
        self.custom_label = None;
        self.metronome = None;
    }

    fn exercise(&mut self, exercise: Exercise) {
        if let Some(repeat) = &mut self.repeat {
            match repeat.phases.last_mut() {
                Some(last) => last.exercises.push(exercise),
                None => self.pending.push(exercise),
            }
            return;
        }

        let mut attached = false;
        if let Some(last) = self.phases.last_mut() {
            last.exercises.push(exercise.clone());
            attached = true;
        }
        if let Some(block) = self.blocks.last_mut() {
            block.exercises.push(exercise.clone());
            attached = true;
        }
        if !attached {
            self.pending.push(exercise);
        }
    }

    /// Stopwatch and countdown lines: one phase in its own work block
    fn standalone(&mut self, phase: Phase) {
        let Some(mut phase) = self.push_to_repeat(phase) else {
            return;
        };
        phase.exercises = self.flush_or_take();
        let exercises = phase.exercises.clone();
        self.phases.push(phase);
        self.push_block(BlockType::Work, exercises);
        self.reset_after_block();
    }

    fn capped(&mut self, label: SegmentLabel, secs: u32, millis: Option<bool>) {
        self.close_repeat();
        if secs == 0 {
            self.flush();
            return;
        }

        let phase = Phase {
            label: Some(label),
            millis,
            custom_label: self.custom_label.clone(),
            metronome: self.metronome,
            exercises: self.flush_or_take(),
            ..Phase::timed(PhaseType::Work, secs)
        };
        let exercises = phase.exercises.clone();
        self.phases.push(phase);

        let (block_type, default_label) = match label {
            SegmentLabel::ForTime => (BlockType::ForTime, "For Time"),
            SegmentLabel::Amrap => (BlockType::Amrap, "AMRAP"),
        };
        self.push_block(block_type, exercises);
        if let Some(block) = self.blocks.last_mut() {
            block.label.get_or_insert_with(|| default_label.to_string());
        }

        self.pending.clear();
        self.custom_label = None;
        self.metronome = None;
    }

    fn typed(&mut self, phase_type: PhaseType, secs: u32, millis: Option<bool>) {
        let (metronome, metronome_mode) = self.scoped_metronome();
        let phase = Phase {
            millis,
            metronome,
            metronome_mode,
            ..Phase::timed(phase_type, secs)
        };

        let Some(mut phase) = self.push_to_repeat(phase) else {
            return;
        };
        phase.exercises = std::mem::take(&mut self.pending);
        phase.custom_label = self.custom_label.clone();
        let exercises = phase.exercises.clone();
        self.phases.push(phase);

        if self.block_type.is_none() {
            let block_type = match phase_type {
                PhaseType::Rest => BlockType::Rest,
                _ => BlockType::Work,
            };
            self.push_block(block_type, exercises);
            self.reset_after_block();
        }
    }

    fn standalone_rest(&mut self, secs: u32) {
        let phase = Phase::timed(PhaseType::Rest, secs);
        let Some(mut phase) = self.push_to_repeat(phase) else {
            return;
        };

        phase.exercises = self.flush_or_take();
        phase.custom_label = self.custom_label.clone();
        self.phases.push(phase);
        let index = self.phases.len() - 1;
        self.blocks.push(BlockDraft {
            label: self.custom_label.clone(),
            ..BlockDraft::single(BlockType::Rest, index)
        });
        self.custom_label = None;
        self.metronome = None;
    }

    fn keyword(&mut self, keyword: BlockKeyword) {
        let block_type = match keyword {
            BlockKeyword::Warmup => BlockType::Warmup,
            BlockKeyword::Cooldown => BlockType::Cooldown,
            BlockKeyword::Work => BlockType::Work,
            BlockKeyword::Rest => BlockType::Rest,
        };
        if matches!(keyword, BlockKeyword::Warmup | BlockKeyword::Cooldown) {
            self.close_repeat();
            self.flush();
        }
        self.block_type = Some(block_type);
    }

    fn open_repeat(&mut self, index: usize, count: u32, tabata: bool) {
        self.close_repeat();
        self.flush();

        let label = if tabata {
            Some("tabata".to_string())
        } else {
            self.block_type.map(|t| t.as_str().to_string())
        };
        self.repeat = Some(Repeat {
            count,
            phases: Vec::new(),
            label,
            metronome: self.metronome.take(),
            metronome_mode: self.metronome_mode.take(),
            explicit_close: self.explicit_close.contains(&index),
        });
    }

    fn time(&mut self, secs: u32, hint: TimeHint, millis: Option<bool>) {
        let phase_type = match (hint, self.block_type) {
            (TimeHint::Rest, _) => PhaseType::Rest,
            (TimeHint::Work, _) => PhaseType::Work,
            (TimeHint::None, Some(BlockType::Warmup)) => PhaseType::Warmup,
            (TimeHint::None, Some(BlockType::Cooldown)) => PhaseType::Cooldown,
            (TimeHint::None, _) => PhaseType::Work,
        };
        let (metronome, metronome_mode) = self.scoped_metronome();
        let phase = Phase {
            millis,
            metronome,
            metronome_mode,
            ..Phase::timed(phase_type, secs)
        };

        let Some(mut phase) = self.push_to_repeat(phase) else {
            return;
        };
        phase.exercises = std::mem::take(&mut self.pending);
        phase.custom_label = self.custom_label.clone();
        self.phases.push(phase);

        if let Some(section @ (BlockType::Warmup | BlockType::Cooldown)) = self.block_type {
            self.push_block(section, Vec::new());
            self.reset_after_block();
        }
        self.block_type = None;
    }

    /// Expand the open repeat into the phase list and record its block.
    /// A repeat with no sub-phases is simply discarded.
    fn close_repeat(&mut self) {
        let Some(repeat) = self.repeat.take() else {
            return;
        };
        if repeat.phases.is_empty() {
            return;
        }

        let block_id = self.next_block_id;
        self.next_block_id += 1;
        let label = self.custom_label.clone().or_else(|| repeat.label.clone());
        let per_round = repeat.phases.len() as u32;
        let start = self.phases.len();

        for round in 1..=repeat.count {
            for (sub, template) in repeat.phases.iter().enumerate() {
                let mut phase = template.clone();
                phase.block = Some(BlockPosition {
                    block_id,
                    label: label.clone(),
                    round,
                    total_rounds: repeat.count,
                    sub_phase: sub as u32 + 1,
                    sub_phase_total: per_round,
                });
                if phase.exercises.is_empty() && !self.pending.is_empty() {
                    phase.exercises = self.pending.clone();
                }
                self.phases.push(phase);
            }
        }

        let template_exercises: Vec<Exercise> = repeat
            .phases
            .iter()
            .flat_map(|p| p.exercises.iter().cloned())
            .collect();
        let exercises = if template_exercises.is_empty() {
            self.pending.clone()
        } else {
            template_exercises
        };

        let with_exercises = repeat
            .phases
            .iter()
            .filter(|p| !p.exercises.is_empty())
            .count();
        let is_complex = with_exercises > 1 || (repeat.phases.len() > 2 && with_exercises > 0);

        let block_type = if repeat.label.as_deref() == Some("tabata") {
            BlockType::Tabata
        } else {
            BlockType::Work
        };

        self.blocks.push(BlockDraft {
            block_type,
            label,
            range: start..self.phases.len(),
            repetitions: Some(repeat.count),
            exercises,
            metronome: repeat.metronome,
            sub_phases: if is_complex { repeat.phases } else { Vec::new() },
        });

        self.pending.clear();
        self.custom_label = None;
    }
}
