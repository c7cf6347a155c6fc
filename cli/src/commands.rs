use std::io::{Read, Write};

use chrono::Utc;
use clap::{Parser, Subcommand};
use wodtimer_core::parser::presets::{custom_preset, interval_preset};
use wodtimer_core::types::{
    CustomConfig, MetronomeSettings, NewWorkout, SavedWorkout, Settings, TimerConfig,
};
use wodtimer_core::{
    CUSTOM_PRESETS, Collaborators, HistoryStore, INTERVAL_PRESETS, LibraryStore, NoWakeLock,
    SETTING_KEYS, SessionHandle, SettingsExt, format_time, parse, spawn_session, workout_config,
};

use crate::readline;
use crate::render;
use crate::terminal::{StdinGate, TerminalClock, TerminalCues};

const HISTORY_FALLBACK: &str = "wodtimer-history.json";
const LIBRARY_FALLBACK: &str = "wodtimer-library.json";

/// Workout text from a file, or stdin for `-`
pub fn read_source(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("error reading stdin: {e}"))?;
        return Ok(text);
    }
    std::fs::read_to_string(path).map_err(|e| format!("error reading {path}: {e}"))
}

pub fn custom_config(text: &str, metronome: Option<MetronomeSettings>) -> TimerConfig {
    TimerConfig::Custom(CustomConfig {
        text: text.to_string(),
        parsed: parse(text),
        metronome,
    })
}

/// Interval presets win over custom presets of the same name
pub fn preset_config(
    name: &str,
    metronome: Option<MetronomeSettings>,
) -> Result<TimerConfig, String> {
    if let Some(preset) = interval_preset(name) {
        return Ok(TimerConfig::Intervals(preset.to_config(metronome)));
    }
    if let Some(text) = custom_preset(name) {
        return Ok(custom_config(text, metronome));
    }
    Err(format!("error: unknown preset '{name}', see `wodtimer presets`"))
}

pub fn parse_file(path: &str, json: bool) -> Result<(), String> {
    let text = read_source(path)?;
    let parsed = parse(&text);
    if json {
        let out = serde_json::to_string_pretty(&parsed).map_err(|e| e.to_string())?;
        println!("{out}");
    } else {
        println!("{}", render::parsed_workout(&parsed));
    }
    match parsed.error {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

pub fn list_presets() {
    println!("Interval presets:");
    for (name, preset) in INTERVAL_PRESETS.entries() {
        println!(
            "  {name:<10} {} work / {} rest x {}",
            format_time(u64::from(preset.work)),
            format_time(u64::from(preset.rest)),
            preset.rounds
        );
    }
    println!("Workout presets:");
    for (name, text) in CUSTOM_PRESETS.entries() {
        let title = text.lines().next().unwrap_or_default().trim_start_matches('#');
        println!("  {name:<10} {}", title.trim());
    }
}

fn history_store() -> HistoryStore {
    HistoryStore::new(HistoryStore::default_path().unwrap_or_else(|| HISTORY_FALLBACK.into()))
}

pub fn show_history(limit: usize) -> Result<(), String> {
    let store = history_store();
    let entries = store.load().map_err(|e| e.to_string())?;
    if entries.is_empty() {
        println!("No workouts recorded");
        return Ok(());
    }
    for entry in entries.iter().take(limit) {
        println!("{}", render::history_line(entry));
    }
    Ok(())
}

pub fn clear_history() -> Result<(), String> {
    history_store().clear().map_err(|e| e.to_string())?;
    println!("History cleared");
    Ok(())
}

pub fn show_settings(settings: &Settings) {
    if let Some(path) = Settings::config_path() {
        println!("# {}", path.display());
    }
    println!("voice             = {}", settings.voice);
    println!("sounds            = {}", settings.sounds);
    println!("countdown3        = {}", settings.countdown3);
    println!("alert_volume      = {}", settings.alert_volume);
    println!("metronome_volume  = {}", settings.metronome_volume);
    println!("metronome_default = {}", settings.metronome_default);
    println!("bpm               = {}", settings.bpm);
    println!("wakelock          = {}", settings.wakelock);
    println!("millis            = {}", settings.millis);
}

/// Apply `key=value` pairs and persist
pub fn update_settings(settings: &mut Settings, pairs: &[String]) -> Result<(), String> {
    for pair in pairs {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            format!(
                "error: expected KEY=VALUE, keys are {}",
                SETTING_KEYS.join(", ")
            )
        })?;
        settings
            .apply(key.trim(), value)
            .map_err(|e| format!("error: {e}"))?;
    }
    settings.save().map_err(|e| format!("error: {e}"))?;
    tracing::info!(count = pairs.len(), "Settings saved");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Workout library
// ─────────────────────────────────────────────────────────────────────────────

fn library_store() -> LibraryStore {
    LibraryStore::new(LibraryStore::default_path().unwrap_or_else(|| LIBRARY_FALLBACK.into()))
}

/// Custom workouts keep their text, other types their configuration
pub fn new_workout(
    name: String,
    description: Option<String>,
    tags: Vec<String>,
    config: TimerConfig,
) -> NewWorkout {
    let timer_type = config.timer_type();
    let tags = tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    match config {
        TimerConfig::Custom(custom) => NewWorkout {
            name,
            description,
            timer_type,
            tags,
            text_definition: Some(custom.text),
            config: None,
            metronome: custom.metronome,
        },
        config => NewWorkout {
            name,
            description,
            timer_type,
            tags,
            text_definition: None,
            config: Some(config),
            metronome: None,
        },
    }
}

pub fn library_add(workout: NewWorkout) -> Result<(), String> {
    let saved = library_store()
        .add(workout, Utc::now())
        .map_err(|e| format!("error: {e}"))?;
    println!("Saved '{}' as {}", saved.workout.name, saved.id);
    Ok(())
}

/// The built-in workouts are added the first time an empty library is listed
pub fn library_list() -> Result<(), String> {
    let store = library_store();
    if store
        .seed_defaults(Utc::now())
        .map_err(|e| format!("error: {e}"))?
    {
        tracing::info!(path = %store.path().display(), "Library seeded");
    }
    let workouts = store.list().map_err(|e| format!("error: {e}"))?;
    print_workouts(&workouts);
    Ok(())
}

pub fn library_search(query: &str) -> Result<(), String> {
    let workouts = library_store()
        .search(query)
        .map_err(|e| format!("error: {e}"))?;
    if workouts.is_empty() {
        println!("No workouts match '{query}'");
        return Ok(());
    }
    print_workouts(&workouts);
    Ok(())
}

fn print_workouts(workouts: &[SavedWorkout]) {
    if workouts.is_empty() {
        println!("Library is empty");
    }
    for saved in workouts {
        println!("{}", render::library_line(saved));
    }
}

fn find_workout(store: &LibraryStore, id: i64) -> Result<SavedWorkout, String> {
    store
        .get(id)
        .map_err(|e| format!("error: {e}"))?
        .ok_or_else(|| format!("error: no saved workout with id {id}"))
}

pub fn library_show(id: i64) -> Result<(), String> {
    let saved = find_workout(&library_store(), id)?;
    println!("{}", render::library_detail(&saved)?);
    Ok(())
}

/// Count the use, then run the workout interactively
pub async fn library_run(id: i64, settings: Settings) -> Result<(), String> {
    let store = library_store();
    let saved = find_workout(&store, id)?;
    let config = workout_config(&saved, settings.metronome_defaults())
        .ok_or_else(|| format!("error: '{}' has nothing to run", saved.workout.name))?;
    store
        .mark_used(id, Utc::now())
        .map_err(|e| format!("error: {e}"))?;
    run_workout(config, settings).await
}

pub fn library_favorite(id: i64) -> Result<(), String> {
    let store = library_store();
    let saved = find_workout(&store, id)?;
    let favorite = store
        .toggle_favorite(id)
        .map_err(|e| format!("error: {e}"))?;
    let state = if favorite { "added to" } else { "removed from" };
    println!("'{}' {state} favorites", saved.workout.name);
    Ok(())
}

pub fn library_remove(id: i64) -> Result<(), String> {
    let store = library_store();
    let saved = find_workout(&store, id)?;
    store.delete(id).map_err(|e| format!("error: {e}"))?;
    println!("Removed '{}'", saved.workout.name);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Interactive run
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(about = "workout controls", disable_version_flag = true)]
struct Controls {
    #[command(subcommand)]
    command: Option<Control>,
}

#[derive(Subcommand)]
enum Control {
    /// Pause or resume
    #[command(alias = "p")]
    Pause,
    /// Jump to the next phase
    #[command(alias = "s")]
    Skip,
    /// Record a stopwatch lap
    #[command(alias = "l")]
    Lap,
    /// Count a manual round
    #[command(alias = "r")]
    Round,
    /// Confirm the current exercise or wait phase
    #[command(alias = "d")]
    Done,
    /// Finish a For Time workout now
    Finish,
    Status,
    /// Run the same workout again
    Restart,
    Stop,
    /// Stop and print the configuration
    Back,
    Exit,
}

pub async fn run_workout(config: TimerConfig, settings: Settings) -> Result<(), String> {
    let title = config.timer_type().title();
    let collaborators = Collaborators {
        cues: Box::new(TerminalCues {
            bell: settings.sounds,
        }),
        metronome: Box::new(TerminalClock::new()),
        wake_lock: Box::new(NoWakeLock),
        history: Box::new(history_store()),
    };
    let (handle, task) = spawn_session(collaborators, settings);
    let renderer = render::spawn_renderer(handle.subscribe());

    let started = handle.start(config).await.map_err(|e| e.to_string())?;
    if let Err(e) = started {
        handle.shutdown().await.ok();
        return Err(format!("error: {e}"));
    }
    println!("{title} started, type `help` for controls");

    loop {
        let line = tokio::task::spawn_blocking(readline)
            .await
            .map_err(|e| e.to_string())??;
        let Some(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, &handle).await {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => {
                write!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    handle.shutdown().await.ok();
    task.await.map_err(|e| e.to_string())?;
    renderer.abort();
    Ok(())
}

/// Returns true when the REPL should quit
async fn respond(line: &str, handle: &SessionHandle) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting\n")?;
    args.insert(0, "wodtimer".to_string());
    let controls = Controls::try_parse_from(args).map_err(|e| e.to_string())?;
    let closed = |e: wodtimer_core::SessionError| format!("error: {e}\n");

    match controls.command {
        Some(Control::Pause) => handle.toggle_pause().await.map_err(closed)?,
        Some(Control::Skip) => handle.skip().await.map_err(closed)?,
        Some(Control::Lap) => handle.lap().await.map_err(closed)?,
        Some(Control::Round) => handle.round().await.map_err(closed)?,
        Some(Control::Done) => handle.advance().await.map_err(closed)?,
        Some(Control::Finish) => handle.finish().await.map_err(closed)?,
        Some(Control::Status) => match handle.snapshot().await.map_err(closed)? {
            Some(view) => println!("{}", render::status_block(&view)),
            None => println!("No workout running"),
        },
        Some(Control::Restart) => {
            match handle.restart().await.map_err(closed)? {
                Ok(true) => println!("Restarted"),
                Ok(false) => println!("Nothing to restart"),
                Err(e) => return Err(format!("error: {e}\n")),
            }
        }
        Some(Control::Stop) => {
            if !handle.stop(Box::new(StdinGate)).await.map_err(closed)? {
                println!("Still running");
            }
        }
        Some(Control::Back) => {
            if let Some(config) = handle
                .back_to_config(Box::new(StdinGate))
                .await
                .map_err(closed)?
            {
                let json = serde_json::to_string_pretty(&config).map_err(|e| e.to_string())?;
                println!("{json}");
                return Ok(true);
            }
        }
        Some(Control::Exit) => {
            let stopped = handle.stop(Box::new(StdinGate)).await.map_err(closed)?;
            if stopped {
                exit();
            }
            return Ok(stopped);
        }
        None => {}
    }
    Ok(false)
}

pub fn exit() {
    println!("quitting...");
}
