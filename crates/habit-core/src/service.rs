use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{info, warn};

use habit_db::models::HabitRow;
use habit_db::{Database, StorageError};
use habit_types::events::{MAX_NAME_LEN, MIN_NAME_LEN, ToggleDirection, ValidationError};
use habit_types::models::{CompletionEntry, Habit, HabitId, UserId};

#[derive(Debug, thiserror::Error)]
pub enum HabitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("habit {habit_id} does not belong to the requester")]
    NotOwner { habit_id: HabitId },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Marked {
        habit: Habit,
        snapshot: Vec<CompletionEntry>,
    },
    Unmarked {
        habit: Habit,
        snapshot: Vec<CompletionEntry>,
    },
    /// Nothing changed: the habit was already done (or not done) today.
    AlreadyInState { habit: Habit, done: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub habit: Habit,
    pub remaining: Vec<Habit>,
}

/// Trim a raw habit name and check its length in characters.
pub fn validate_name(raw: &str) -> Result<&str, ValidationError> {
    let name = raw.trim();
    let len = name.chars().count();

    if len < MIN_NAME_LEN {
        return Err(ValidationError::TooShort);
    }
    if len > MAX_NAME_LEN {
        return Err(ValidationError::TooLong);
    }
    Ok(name)
}

/// Business rules over the habit store. Ownership is checked here, never in the store.
#[derive(Clone)]
pub struct HabitService {
    db: Arc<Database>,
}

impl HabitService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn register_user(&self, user_id: UserId, display_name: &str) -> Result<(), HabitError> {
        self.db.upsert_user(user_id, display_name)?;
        Ok(())
    }

    pub fn add_habit(&self, user_id: UserId, raw_name: &str) -> Result<Habit, HabitError> {
        let name = validate_name(raw_name)?;

        let row = self.db.create_habit(user_id, name)?;

        info!("User {} added habit {} ({:?})", user_id, row.id, name);
        Ok(to_habit(row))
    }

    pub fn list_habits(&self, user_id: UserId) -> Result<Vec<Habit>, HabitError> {
        let rows = self.db.list_habits(user_id)?;
        Ok(rows.into_iter().map(to_habit).collect())
    }

    /// Every habit of the user with its done-today flag, in listing order.
    pub fn completion_snapshot(&self, user_id: UserId) -> Result<Vec<CompletionEntry>, HabitError> {
        let habits = self.list_habits(user_id)?;
        self.snapshot_of(&habits)
    }

    pub fn toggle_completion(
        &self,
        user_id: UserId,
        habit_id: HabitId,
        direction: ToggleDirection,
    ) -> Result<ToggleOutcome, HabitError> {
        let habits = self.list_habits(user_id)?;
        let habit = owned(&habits, habit_id)?.clone();

        let done = self.db.is_done_today(habit_id)?;
        let mark = match direction {
            ToggleDirection::Mark => true,
            ToggleDirection::Unmark => false,
            ToggleDirection::Flip => !done,
        };

        if mark == done {
            return Ok(ToggleOutcome::AlreadyInState { habit, done });
        }

        if mark {
            self.db.mark_done(habit_id)?;
        } else {
            self.db.mark_not_done(habit_id)?;
        }

        let snapshot = self.snapshot_of(&habits)?;
        Ok(if mark {
            ToggleOutcome::Marked { habit, snapshot }
        } else {
            ToggleOutcome::Unmarked { habit, snapshot }
        })
    }

    pub fn delete_habit(&self, user_id: UserId, habit_id: HabitId) -> Result<DeleteOutcome, HabitError> {
        let habits = self.list_habits(user_id)?;
        let habit = owned(&habits, habit_id)?.clone();

        if !self.db.delete_habit(habit_id, user_id)? {
            // Removed between the ownership check and the delete.
            return Err(HabitError::NotOwner { habit_id });
        }
        info!("User {} deleted habit {}", user_id, habit_id);

        let remaining = habits.into_iter().filter(|h| h.id != habit_id).collect();
        Ok(DeleteOutcome { habit, remaining })
    }

    fn snapshot_of(&self, habits: &[Habit]) -> Result<Vec<CompletionEntry>, HabitError> {
        let ids: Vec<HabitId> = habits.iter().map(|h| h.id).collect();
        let done = self.db.completed_today(&ids)?;

        Ok(habits
            .iter()
            .map(|h| CompletionEntry {
                habit_id: h.id,
                name: h.name.clone(),
                done_today: done.contains(&h.id),
            })
            .collect())
    }
}

fn owned(habits: &[Habit], habit_id: HabitId) -> Result<&Habit, HabitError> {
    habits
        .iter()
        .find(|h| h.id == habit_id)
        .ok_or(HabitError::NotOwner { habit_id })
}

fn to_habit(row: HabitRow) -> Habit {
    let created_at = parse_timestamp(&row.created_at).unwrap_or_else(|| {
        warn!("Corrupt created_at '{}' on habit {}", row.created_at, row.id);
        DateTime::default()
    });

    Habit {
        id: row.id,
        user_id: row.user_id,
        name: row.name,
        created_at,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().ok().or_else(|| {
        // SQLite-style "YYYY-MM-DD HH:MM:SS[.ffffff]" without timezone, stored as UTC.
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .map(|ndt| ndt.and_utc())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> HabitService {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let service = HabitService::new(db);
        service.register_user(42, "ann").unwrap();
        service.register_user(7, "bo").unwrap();
        service
    }

    #[test]
    fn registration_keeps_first_display_name() {
        let svc = service();
        svc.register_user(42, "ann-renamed").unwrap();

        let user = svc.db.get_user(42).unwrap().unwrap();
        assert_eq!(user.display_name, "ann");
        assert!(parse_timestamp(&user.created_at).is_some());
        assert!(svc.db.get_user(1000).unwrap().is_none());
    }

    #[test]
    fn name_length_boundaries() {
        assert_eq!(validate_name(""), Err(ValidationError::TooShort));
        assert_eq!(validate_name("   "), Err(ValidationError::TooShort));
        assert_eq!(validate_name(" a "), Err(ValidationError::TooShort));
        assert_eq!(validate_name(" ab "), Ok("ab"));
        assert_eq!(validate_name(&"x".repeat(100)).map(str::len), Ok(100));
        assert_eq!(validate_name(&"x".repeat(101)), Err(ValidationError::TooLong));
        // Counted in characters, not bytes
        assert!(validate_name(&"é".repeat(100)).is_ok());
        assert_eq!(validate_name("💧"), Err(ValidationError::TooShort));
    }

    #[test]
    fn rejected_names_persist_nothing() {
        let svc = service();
        let long = "y".repeat(101);
        for raw in ["", " a ", long.as_str()] {
            assert!(matches!(svc.add_habit(42, raw), Err(HabitError::Validation(_))));
        }
        assert!(svc.list_habits(42).unwrap().is_empty());
    }

    #[test]
    fn add_habit_trims_and_returns_habit() {
        let svc = service();
        let habit = svc.add_habit(42, "  Drink water \n").unwrap();

        assert_eq!(habit.name, "Drink water");
        assert_eq!(habit.user_id, 42);
        assert!(habit.created_at > DateTime::<Utc>::default());
        assert_eq!(svc.list_habits(42).unwrap(), vec![habit]);
    }

    #[test]
    fn toggle_directions() {
        let svc = service();
        let h = svc.add_habit(42, "Read").unwrap().id;

        assert!(matches!(
            svc.toggle_completion(42, h, ToggleDirection::Unmark).unwrap(),
            ToggleOutcome::AlreadyInState { done: false, .. }
        ));

        match svc.toggle_completion(42, h, ToggleDirection::Mark).unwrap() {
            ToggleOutcome::Marked { habit, snapshot } => {
                assert_eq!(habit.id, h);
                assert_eq!(snapshot.len(), 1);
                assert!(snapshot[0].done_today);
            }
            other => panic!("expected Marked, got {:?}", other),
        }

        assert!(matches!(
            svc.toggle_completion(42, h, ToggleDirection::Mark).unwrap(),
            ToggleOutcome::AlreadyInState { done: true, .. }
        ));

        assert!(matches!(
            svc.toggle_completion(42, h, ToggleDirection::Flip).unwrap(),
            ToggleOutcome::Unmarked { .. }
        ));
        assert!(matches!(
            svc.toggle_completion(42, h, ToggleDirection::Flip).unwrap(),
            ToggleOutcome::Marked { .. }
        ));
    }

    #[test]
    fn snapshot_follows_listing_order() {
        let svc = service();
        let a = svc.add_habit(42, "Alpha").unwrap().id;
        let b = svc.add_habit(42, "Beta").unwrap().id;
        svc.toggle_completion(42, b, ToggleDirection::Mark).unwrap();

        let snapshot = svc.completion_snapshot(42).unwrap();
        let flags: Vec<(HabitId, bool)> = snapshot.iter().map(|e| (e.habit_id, e.done_today)).collect();
        assert_eq!(flags, vec![(a, false), (b, true)]);
    }

    #[test]
    fn foreign_habits_are_rejected_without_mutation() {
        let svc = service();
        let h = svc.add_habit(42, "Mine").unwrap().id;

        for direction in [ToggleDirection::Mark, ToggleDirection::Unmark, ToggleDirection::Flip] {
            assert!(matches!(
                svc.toggle_completion(7, h, direction),
                Err(HabitError::NotOwner { habit_id }) if habit_id == h
            ));
        }
        assert!(matches!(svc.delete_habit(7, h), Err(HabitError::NotOwner { .. })));

        assert_eq!(svc.list_habits(42).unwrap().len(), 1);
        assert!(svc.completion_snapshot(42).unwrap().iter().all(|e| !e.done_today));
    }

    #[test]
    fn missing_habit_is_an_ownership_error() {
        let svc = service();
        assert!(matches!(
            svc.toggle_completion(42, 999, ToggleDirection::Mark),
            Err(HabitError::NotOwner { habit_id: 999 })
        ));
        assert!(matches!(svc.delete_habit(42, 999), Err(HabitError::NotOwner { .. })));
    }

    #[test]
    fn delete_reports_remaining() {
        let svc = service();
        let a = svc.add_habit(42, "Alpha").unwrap();
        let b = svc.add_habit(42, "Beta").unwrap();

        let outcome = svc.delete_habit(42, a.id).unwrap();
        assert_eq!(outcome.habit, a);
        assert_eq!(outcome.remaining, vec![b.clone()]);

        let outcome = svc.delete_habit(42, b.id).unwrap();
        assert!(outcome.remaining.is_empty());
        assert!(svc.list_habits(42).unwrap().is_empty());
    }

    #[test]
    fn parses_stored_timestamps() {
        let ts = parse_timestamp("2026-03-01 08:15:00.123456").unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-03-01T08:15:00.123456+00:00");
        assert!(parse_timestamp("2026-03-01 08:15:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
