//! Saved workout library
//!
//! Workouts live in one JSON file, newest first. Every mutation reads the
//! file, edits the list and writes it back, like the history store.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use wodtimer_types::{
    CustomConfig, MetronomeSettings, NewWorkout, SavedWorkout, TimerConfig, TimerType,
};

use crate::parser::parse;
use crate::store::{StoreError, data_path, next_id, read_list, write_list};

const STRENGTH_TENDONS: &str = "warmup
10s

# calf raise hold
30s work
- calf raise hold

60s rest

# spanish squat hold
30s work
- spanish squat hold

60s rest

# deep push up isometric hold
20s work
- deep push up isometric hold

60s rest

# wall external rotation hold
30s work
- wall external rotation hold
10s rest
30s work
- wall external rotation hold

60s rest

# active dead hang
20s work
- active dead hang";

const FULLBODY_DB: &str = "# air squat
2x
wait work
- air squat (20x)
60s rest

# lunge
2x
wait work
- lunge (20x)
60s rest

# calf raise + pogos
2x
wait work
- calf raise (20x)
- pogo jump (20x)
- pogo jump unilateral (10x)
- pogo jump unilateral (10x)
60s rest

# push up
2x
wait work
- push up (20x)
60s rest

# goblet squat
2x
wait work
- goblet squat (20x)
60s rest

# overhead lunge
2x
wait work
- overhead lunge (20x)
60s rest

# goblet lunge
2x
wait work
- goblet lunge (20x)
60s rest

# thruster
2x
wait work
- thruster (20x)
60s rest

# press
2x
wait work
- press (20x)
60s rest

# db bench over row
2x
wait work
- bench over row (20x)
60s rest

# hammer curl
2x
wait work
- hammer curl (20x)
60s rest

# calf raise
2x
wait work
- calf raise (20x)
60s rest";

fn custom(name: &str, tags: &[&str], text: &str) -> NewWorkout {
    NewWorkout {
        name: name.to_string(),
        description: None,
        timer_type: TimerType::Custom,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        text_definition: Some(text.to_string()),
        config: None,
        metronome: None,
    }
}

/// Workouts added to an empty library, oldest first
pub fn default_workouts() -> Vec<NewWorkout> {
    vec![
        custom(
            "Strength Tendons",
            &["tendons", "isometric", "strength"],
            STRENGTH_TENDONS,
        ),
        custom(
            "Fortalecimento Fullbody DB",
            &["fullbody", "dumbbell", "strength"],
            FULLBODY_DB,
        ),
    ]
}

/// Configuration to run a saved workout with. Custom workouts are parsed
/// from their text and fall back to `defaults` for the metronome; other
/// types use their stored configuration.
pub fn workout_config(
    workout: &SavedWorkout,
    defaults: MetronomeSettings,
) -> Option<TimerConfig> {
    let w = &workout.workout;
    if w.timer_type == TimerType::Custom
        && let Some(text) = &w.text_definition
    {
        return Some(TimerConfig::Custom(CustomConfig {
            text: text.clone(),
            parsed: parse(text),
            metronome: Some(w.metronome.unwrap_or(defaults)),
        }));
    }
    let mut config = w.config.clone()?;
    if w.metronome.is_some() {
        config.set_metronome(w.metronome);
    }
    Some(config)
}

#[derive(Debug, Clone)]
pub struct LibraryStore {
    path: PathBuf,
}

impl LibraryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/wodtimer/library.json`
    pub fn default_path() -> Option<PathBuf> {
        data_path("library.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored order, newest first
    pub fn load(&self) -> Result<Vec<SavedWorkout>, StoreError> {
        read_list(&self.path)
    }

    /// Favorites first, newest first within each group
    pub fn list(&self) -> Result<Vec<SavedWorkout>, StoreError> {
        let mut workouts = self.load()?;
        workouts.sort_by_key(|w| !w.is_favorite);
        Ok(workouts)
    }

    pub fn get(&self, id: i64) -> Result<Option<SavedWorkout>, StoreError> {
        Ok(self.load()?.into_iter().find(|w| w.id == id))
    }

    /// Listing order, filtered by [`SavedWorkout::matches`]
    pub fn search(&self, query: &str) -> Result<Vec<SavedWorkout>, StoreError> {
        let mut workouts = self.list()?;
        workouts.retain(|w| w.matches(query));
        Ok(workouts)
    }

    pub fn add(
        &self,
        workout: NewWorkout,
        date: DateTime<Utc>,
    ) -> Result<SavedWorkout, StoreError> {
        let mut workouts = self.load()?;
        let stamp = date.to_rfc3339();
        let saved = SavedWorkout {
            id: next_id(date.timestamp_millis(), workouts.iter().map(|w| w.id)),
            workout,
            created_at: stamp.clone(),
            updated_at: stamp,
            last_used_at: None,
            use_count: 0,
            is_favorite: false,
        };
        workouts.insert(0, saved.clone());
        write_list(&self.path, &workouts)?;
        tracing::debug!(id = saved.id, name = %saved.workout.name, "Workout saved");
        Ok(saved)
    }

    /// Edit the user fields of a workout. `None` when the id is unknown.
    pub fn update(
        &self,
        id: i64,
        date: DateTime<Utc>,
        edit: impl FnOnce(&mut NewWorkout),
    ) -> Result<Option<SavedWorkout>, StoreError> {
        self.modify(id, |w| {
            edit(&mut w.workout);
            w.updated_at = date.to_rfc3339();
        })
    }

    /// Returns whether a workout was removed
    pub fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut workouts = self.load()?;
        let before = workouts.len();
        workouts.retain(|w| w.id != id);
        if workouts.len() == before {
            return Ok(false);
        }
        write_list(&self.path, &workouts)?;
        Ok(true)
    }

    pub fn mark_used(
        &self,
        id: i64,
        date: DateTime<Utc>,
    ) -> Result<Option<SavedWorkout>, StoreError> {
        self.modify(id, |w| {
            w.last_used_at = Some(date.to_rfc3339());
            w.use_count += 1;
        })
    }

    /// New favorite state; false for an unknown id
    pub fn toggle_favorite(&self, id: i64) -> Result<bool, StoreError> {
        let toggled = self.modify(id, |w| w.is_favorite = !w.is_favorite)?;
        Ok(toggled.is_some_and(|w| w.is_favorite))
    }

    /// Add [`default_workouts`] when the library is empty. Returns whether
    /// anything was added.
    pub fn seed_defaults(&self, date: DateTime<Utc>) -> Result<bool, StoreError> {
        if !self.load()?.is_empty() {
            return Ok(false);
        }
        for workout in default_workouts() {
            self.add(workout, date)?;
        }
        Ok(true)
    }

    fn modify(
        &self,
        id: i64,
        f: impl FnOnce(&mut SavedWorkout),
    ) -> Result<Option<SavedWorkout>, StoreError> {
        let mut workouts = self.load()?;
        let Some(workout) = workouts.iter_mut().find(|w| w.id == id) else {
            return Ok(None);
        };
        f(workout);
        let updated = workout.clone();
        write_list(&self.path, &workouts)?;
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use wodtimer_types::CountdownConfig;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 7, 30, 0).unwrap()
    }

    fn store() -> (tempfile::TempDir, LibraryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LibraryStore::new(dir.path().join("nested").join("library.json"));
        (dir, store)
    }

    fn countdown(name: &str, tags: &[&str]) -> NewWorkout {
        NewWorkout {
            name: name.to_string(),
            description: None,
            timer_type: TimerType::Countdown,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            text_definition: None,
            config: Some(TimerConfig::Countdown(CountdownConfig {
                duration: 300,
                metronome: None,
            })),
            metronome: None,
        }
    }

    fn names(workouts: &[SavedWorkout]) -> Vec<&str> {
        workouts.iter().map(|w| w.workout.name.as_str()).collect()
    }

    #[test]
    fn newest_first_with_unique_ids() {
        let (_dir, store) = store();
        let first = store.add(countdown("first", &[]), date()).unwrap();
        let second = store.add(countdown("second", &[]), date()).unwrap();

        assert_eq!(second.id, first.id + 1);
        assert_eq!(names(&store.load().unwrap()), vec!["second", "first"]);
        assert_eq!(first.created_at, "2026-03-01T07:30:00+00:00");
        assert_eq!(first.last_used_at, None);
    }

    #[test]
    fn favorites_are_listed_first() {
        let (_dir, store) = store();
        let a = store.add(countdown("a", &[]), date()).unwrap();
        store.add(countdown("b", &[]), date()).unwrap();
        let c = store.add(countdown("c", &[]), date()).unwrap();

        assert!(store.toggle_favorite(a.id).unwrap());
        assert_eq!(names(&store.list().unwrap()), vec!["a", "c", "b"]);

        assert!(store.toggle_favorite(c.id).unwrap());
        assert_eq!(names(&store.list().unwrap()), vec!["c", "a", "b"]);

        assert!(!store.toggle_favorite(a.id).unwrap());
        assert_eq!(names(&store.list().unwrap()), vec!["c", "b", "a"]);
        assert!(!store.toggle_favorite(12345).unwrap());
    }

    #[test]
    fn mark_used_counts_and_stamps() {
        let (_dir, store) = store();
        let saved = store.add(countdown("run", &[]), date()).unwrap();

        store.mark_used(saved.id, date()).unwrap();
        let later = date() + Duration::hours(2);
        let used = store.mark_used(saved.id, later).unwrap().unwrap();

        assert_eq!(used.use_count, 2);
        assert_eq!(used.last_used_at.as_deref(), Some("2026-03-01T09:30:00+00:00"));
        assert_eq!(used.updated_at, saved.updated_at);
        assert_eq!(store.get(saved.id).unwrap(), Some(used));
        assert_eq!(store.mark_used(999, date()).unwrap(), None);
    }

    #[test]
    fn search_matches_tags_case_insensitively() {
        let (_dir, store) = store();
        store.add(countdown("Morning Run", &["cardio"]), date()).unwrap();
        store.add(countdown("Squats", &["Legs", "Strength"]), date()).unwrap();
        let press = store.add(countdown("Press", &["strength"]), date()).unwrap();
        store.toggle_favorite(press.id).unwrap();

        assert_eq!(names(&store.search("STRENGTH").unwrap()), vec!["Press", "Squats"]);
        assert_eq!(names(&store.search("run").unwrap()), vec!["Morning Run"]);
        assert!(store.search("yoga").unwrap().is_empty());
    }

    #[test]
    fn update_and_delete() {
        let (_dir, store) = store();
        let saved = store.add(countdown("old", &[]), date()).unwrap();
        let later = date() + Duration::minutes(5);

        let updated = store
            .update(saved.id, later, |w| {
                w.name = "new".to_string();
                w.tags.push("edited".to_string());
            })
            .unwrap()
            .unwrap();
        assert_eq!(updated.workout.name, "new");
        assert_eq!(updated.created_at, saved.created_at);
        assert_ne!(updated.updated_at, saved.updated_at);

        assert!(store.delete(saved.id).unwrap());
        assert!(!store.delete(saved.id).unwrap());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn seeding_only_fills_an_empty_library() {
        let (_dir, store) = store();
        assert!(store.seed_defaults(date()).unwrap());
        assert_eq!(
            names(&store.load().unwrap()),
            vec!["Fortalecimento Fullbody DB", "Strength Tendons"]
        );
        assert!(!store.seed_defaults(date()).unwrap());
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn default_workouts_parse() {
        for workout in default_workouts() {
            let text = workout.text_definition.as_deref().unwrap();
            let parsed = parse(text);
            assert!(parsed.is_ok(), "{} failed: {:?}", workout.name, parsed.error);
        }
    }

    #[test]
    fn config_for_custom_and_stored_workouts() {
        let (_dir, store) = store();
        let defaults = MetronomeSettings::default().with_bpm(90);

        let seeded = {
            store.seed_defaults(date()).unwrap();
            store.search("tendons").unwrap().remove(0)
        };
        match workout_config(&seeded, defaults) {
            Some(TimerConfig::Custom(c)) => {
                assert!(c.parsed.is_ok());
                assert_eq!(c.metronome, Some(defaults));
            }
            other => panic!("expected custom config, got {other:?}"),
        }

        let timed = store.add(countdown("timed", &[]), date()).unwrap();
        let config = workout_config(&timed, defaults).unwrap();
        assert_eq!(config.timer_type(), TimerType::Countdown);
        assert_eq!(config.metronome(), None);

        let mut bare = timed.clone();
        bare.workout.config = None;
        assert_eq!(workout_config(&bare, defaults), None);
    }
}
