//! Text rendering of snapshots, parsed workouts and history

use tokio::sync::watch;
use tokio::task::JoinHandle;
use wodtimer_core::types::{HistoryEntry, ParsedWorkout, Phase, PhaseDuration, SavedWorkout};
use wodtimer_core::{DisplaySnapshot, block_label, exercise_display, format_time, phase_label};

/// One line per phase change: `[3/17] WORK! 00:20 | Round 2/8 | Next: rest 00:10`
pub fn phase_line(view: &DisplaySnapshot) -> String {
    let mut line = format!(
        "[{}/{}] ",
        view.phase_index + 1,
        view.phase_count
    );
    if let Some(block) = &view.block_label {
        line.push_str(block);
        line.push_str(" · ");
    }
    line.push_str(&view.phase_label);
    line.push(' ');
    line.push_str(&view.time_text);
    if let Some(exercise) = &view.exercise {
        line.push_str(" | ");
        line.push_str(exercise);
    }
    if !view.info.is_empty() {
        line.push_str(" | ");
        line.push_str(&view.info);
    }
    if let Some(next) = &view.next {
        line.push_str(" | ");
        line.push_str(next);
    }
    if view.awaits_user {
        line.push_str(" (type `done`)");
    }
    line
}

/// Full status for the `status` command
pub fn status_block(view: &DisplaySnapshot) -> String {
    let mut text = format!("{}  [{}]\n", phase_line(view), view.status);
    text.push_str(&format!(
        "total {}  work {}",
        view.total_text, view.work_text
    ));
    if view.rounds > 0 {
        text.push_str(&format!("  rounds {}", view.rounds));
    }
    for lap in &view.laps {
        text.push_str(&format!(
            "\n  lap {:>2}  {}  {}",
            lap.lap,
            wodtimer_core::format_time_millis(lap.split),
            wodtimer_core::format_time_millis(lap.total)
        ));
    }
    text
}

pub fn summary(view: &DisplaySnapshot) -> String {
    let mut text = format!(
        "Workout {}: total {}, work {}",
        view.status, view.total_text, view.work_text
    );
    if view.rounds > 0 {
        text.push_str(&format!(", {} rounds", view.rounds));
    }
    if !view.laps.is_empty() {
        text.push_str(&format!(", {} laps", view.laps.len()));
    }
    text
}

fn duration_text(duration: PhaseDuration) -> String {
    match duration {
        PhaseDuration::Fixed(secs) => format_time(u64::from(secs)),
        PhaseDuration::Open => "open".to_string(),
    }
}

fn describe_phase(phase: &Phase) -> String {
    let mut line = format!("{:<9} {}", phase_label(phase), duration_text(phase.duration));
    if let Some(block) = block_label(phase) {
        line.push_str(&format!("  [{block}]"));
    }
    if let Some(block) = phase.block.as_ref().filter(|b| b.total_rounds > 1) {
        line.push_str(&format!("  round {}/{}", block.round, block.total_rounds));
    }
    if let Some(step) = &phase.step {
        line.push_str(&format!("  exercise {}/{}", step.index, step.count));
    }
    if let Some(bpm) = phase.metronome {
        line.push_str(&format!("  {bpm} bpm"));
    }
    let exercises: Vec<String> = phase.exercises.iter().map(exercise_display).collect();
    if !exercises.is_empty() {
        line.push_str(&format!("  - {}", exercises.join(", ")));
    }
    line
}

/// Numbered phase list followed by the block overview
pub fn parsed_workout(parsed: &ParsedWorkout) -> String {
    if let Some(error) = &parsed.error {
        return format!("error: {error}");
    }
    let mut text = String::new();
    for (i, phase) in parsed.phases.iter().enumerate() {
        text.push_str(&format!("{:>3}. {}\n", i + 1, describe_phase(phase)));
    }
    let total: u32 = parsed.blocks.iter().map(|b| b.total_duration).sum();
    text.push_str(&format!(
        "{} phases in {} blocks, {} timed",
        parsed.phases.len(),
        parsed.blocks.len(),
        format_time(u64::from(total))
    ));
    text
}

pub fn history_line(entry: &HistoryEntry) -> String {
    let date = chrono::DateTime::parse_from_rfc3339(&entry.date)
        .map(|d| d.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| entry.date.clone());
    let mut line = format!(
        "{date}  {:<16} {}",
        entry.record.timer_type.title(),
        format_time(entry.record.duration)
    );
    if entry.record.rounds > 0 {
        line.push_str(&format!("  {} rounds", entry.record.rounds));
    }
    line
}

/// One line of the library listing, favorites starred
pub fn library_line(saved: &SavedWorkout) -> String {
    let w = &saved.workout;
    let star = if saved.is_favorite { '*' } else { ' ' };
    let mut line = format!(
        "{star} {:<14} {:<28} {}",
        saved.id,
        w.name,
        w.timer_type.title()
    );
    if !w.tags.is_empty() {
        line.push_str(&format!("  [{}]", w.tags.join(", ")));
    }
    if saved.use_count > 0 {
        line.push_str(&format!("  used {}x", saved.use_count));
    }
    line
}

pub fn library_detail(saved: &SavedWorkout) -> Result<String, String> {
    let w = &saved.workout;
    let mut text = format!("{}\n", w.name);
    if let Some(description) = &w.description {
        text.push_str(&format!("{description}\n"));
    }
    text.push_str(&format!("type: {}\n", w.timer_type.title()));
    if !w.tags.is_empty() {
        text.push_str(&format!("tags: {}\n", w.tags.join(", ")));
    }
    if saved.is_favorite {
        text.push_str("favorite\n");
    }
    match &saved.last_used_at {
        Some(date) => text.push_str(&format!("used {} times, last {date}\n", saved.use_count)),
        None => text.push_str("never used\n"),
    }
    if let Some(preview) = saved.preview() {
        text.push_str(&format!("{preview}\n"));
    }
    if let Some(definition) = &w.text_definition {
        text.push_str(&format!("\n{definition}"));
    } else if let Some(config) = &w.config {
        let json = serde_json::to_string_pretty(config).map_err(|e| e.to_string())?;
        text.push_str(&format!("\n{json}"));
    }
    Ok(text)
}

/// Print a line whenever the phase or run status changes
pub fn spawn_renderer(mut rx: watch::Receiver<Option<DisplaySnapshot>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last: Option<(usize, &'static str)> = None;
        while rx.changed().await.is_ok() {
            let Some(view) = rx.borrow_and_update().clone() else {
                last = None;
                continue;
            };
            let key = (view.phase_index, view.status);
            if last == Some(key) {
                continue;
            }
            let phase_changed = last.is_none_or(|(index, _)| index != view.phase_index);
            last = Some(key);

            match view.status {
                "completed" | "stopped" => println!("{}", summary(&view)),
                "paused" => println!("paused at {}", view.time_text),
                _ if phase_changed => println!("{}", phase_line(&view)),
                _ => println!("resumed"),
            }
        }
    })
}
