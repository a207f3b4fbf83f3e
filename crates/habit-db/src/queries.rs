use std::collections::HashSet;

use chrono::{Local, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::debug;

use crate::models::{HabitRow, UserRow};
use crate::{Database, Result};

/// Calendar date of the process-local clock. Completions are keyed by this.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

impl Database {
    // -- Users --

    /// Insert the user if unseen. An existing row keeps its stored name.
    pub fn upsert_user(&self, user_id: i64, display_name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users (user_id, display_name) VALUES (?1, ?2)",
                params![user_id, display_name],
            )?;
            Ok(())
        })
    }

    pub fn get_user(&self, user_id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT user_id, display_name, created_at FROM users WHERE user_id = ?1",
                    [user_id],
                    |row| {
                        Ok(UserRow {
                            user_id: row.get(0)?,
                            display_name: row.get(1)?,
                            created_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Habits --

    /// Store a new habit and return the row as written. `name` is stored as given.
    pub fn create_habit(&self, user_id: i64, name: &str) -> Result<HabitRow> {
        let created_at = Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO habits (user_id, name, created_at) VALUES (?1, ?2, ?3)",
                params![user_id, name, created_at],
            )?;
            let id = conn.last_insert_rowid();
            debug!("Created habit {} for user {}", id, user_id);

            Ok(HabitRow {
                id,
                user_id,
                name: name.to_string(),
                created_at,
            })
        })
    }

    /// All habits of one user, oldest first.
    pub fn list_habits(&self, user_id: i64) -> Result<Vec<HabitRow>> {
        self.with_conn(|conn| query_habits(conn, user_id))
    }

    pub fn get_habit(&self, habit_id: i64) -> Result<Option<HabitRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, user_id, name, created_at FROM habits WHERE id = ?1",
                    [habit_id],
                    habit_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Delete a habit and its completions, but only if `user_id` owns it.
    /// Returns whether a habit was removed.
    pub fn delete_habit(&self, habit_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let owned: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM habits WHERE id = ?1 AND user_id = ?2)",
                params![habit_id, user_id],
                |row| row.get(0),
            )?;
            if !owned {
                return Ok(false);
            }

            tx.execute("DELETE FROM completions WHERE habit_id = ?1", [habit_id])?;
            tx.execute(
                "DELETE FROM habits WHERE id = ?1 AND user_id = ?2",
                params![habit_id, user_id],
            )?;
            tx.commit()?;

            debug!("Deleted habit {} of user {}", habit_id, user_id);
            Ok(true)
        })
    }

    // -- Completions --

    pub fn is_done_today(&self, habit_id: i64) -> Result<bool> {
        self.is_done_on(habit_id, today())
    }

    pub fn is_done_on(&self, habit_id: i64, day: NaiveDate) -> Result<bool> {
        self.with_conn(|conn| {
            let done = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM completions WHERE habit_id = ?1 AND completed_at = ?2)",
                params![habit_id, day_key(day)],
                |row| row.get(0),
            )?;
            Ok(done)
        })
    }

    /// Record today's completion. Marking twice keeps a single row.
    pub fn mark_done(&self, habit_id: i64) -> Result<()> {
        self.mark_done_on(habit_id, today())
    }

    pub fn mark_done_on(&self, habit_id: i64, day: NaiveDate) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO completions (habit_id, completed_at) VALUES (?1, ?2)",
                params![habit_id, day_key(day)],
            )?;
            Ok(())
        })
    }

    /// Drop today's completion, if any.
    pub fn mark_not_done(&self, habit_id: i64) -> Result<()> {
        self.mark_not_done_on(habit_id, today())
    }

    pub fn mark_not_done_on(&self, habit_id: i64, day: NaiveDate) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM completions WHERE habit_id = ?1 AND completed_at = ?2",
                params![habit_id, day_key(day)],
            )?;
            Ok(())
        })
    }

    /// Which of `habit_ids` are done today, in a single query.
    pub fn completed_today(&self, habit_ids: &[i64]) -> Result<HashSet<i64>> {
        if habit_ids.is_empty() {
            return Ok(HashSet::new());
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (2..=habit_ids.len() + 1).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT habit_id FROM completions WHERE completed_at = ?1 AND habit_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let day = day_key(today());
            let params = std::iter::once(&day as &dyn rusqlite::ToSql)
                .chain(habit_ids.iter().map(|id| id as &dyn rusqlite::ToSql));

            let done = stmt
                .query_map(params_from_iter(params), |row| row.get(0))?
                .collect::<std::result::Result<HashSet<i64>, _>>()?;

            Ok(done)
        })
    }

    /// Completion rows held for a habit across all days.
    pub fn count_completions(&self, habit_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM completions WHERE habit_id = ?1",
                [habit_id],
                |row| row.get(0),
            )?;
            Ok(n)
        })
    }
}

fn habit_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HabitRow> {
    Ok(HabitRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn query_habits(conn: &Connection, user_id: i64) -> Result<Vec<HabitRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, created_at
         FROM habits
         WHERE user_id = ?1
         ORDER BY created_at ASC, id ASC",
    )?;

    let rows = stmt
        .query_map([user_id], habit_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn db_with_user(user_id: i64) -> Database {
        let db = Database::open_in_memory().unwrap();
        db.upsert_user(user_id, "tester").unwrap();
        db
    }

    #[test]
    fn upsert_user_keeps_first_name() {
        let db = db_with_user(42);
        db.upsert_user(42, "renamed").unwrap();

        let user = db.get_user(42).unwrap().unwrap();
        assert_eq!(user.user_id, 42);
        assert_eq!(user.display_name, "tester");
        assert!(!user.created_at.is_empty());
        assert!(db.get_user(43).unwrap().is_none());
    }

    #[test]
    fn create_habit_stores_name_verbatim() {
        let db = db_with_user(1);
        let long = "x".repeat(250);
        let created = db.create_habit(1, &long).unwrap();
        assert_eq!(created.name.len(), 250);

        let row = db.get_habit(created.id).unwrap().unwrap();
        assert_eq!(row, created);
    }

    #[test]
    fn create_habit_requires_known_user() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_habit(99, "Orphan").is_err());
    }

    #[test]
    fn list_is_per_user_and_in_creation_order() {
        let db = db_with_user(1);
        db.upsert_user(2, "other").unwrap();

        let a = db.create_habit(1, "Read").unwrap().id;
        let _ = db.create_habit(2, "Swim").unwrap().id;
        let b = db.create_habit(1, "Stretch").unwrap().id;
        db.delete_habit(a, 1).unwrap();
        let c = db.create_habit(1, "Read again").unwrap().id;

        let ids: Vec<i64> = db.list_habits(1).unwrap().iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![b, c]);
        assert!(c > a, "ids are never reused");

        assert!(db.list_habits(3).unwrap().is_empty());
    }

    #[test]
    fn mark_done_is_idempotent() {
        let db = db_with_user(1);
        let h = db.create_habit(1, "Walk").unwrap().id;

        db.mark_done(h).unwrap();
        db.mark_done(h).unwrap();

        assert!(db.is_done_today(h).unwrap());
        assert_eq!(db.count_completions(h).unwrap(), 1);
    }

    #[test]
    fn mark_then_unmark_leaves_no_row() {
        let db = db_with_user(1);
        let h = db.create_habit(1, "Walk").unwrap().id;

        db.mark_done(h).unwrap();
        db.mark_not_done(h).unwrap();

        assert!(!db.is_done_today(h).unwrap());
        assert_eq!(db.count_completions(h).unwrap(), 0);

        // Unmarking again is a no-op
        db.mark_not_done(h).unwrap();
    }

    #[test]
    fn completions_are_per_day() {
        let db = db_with_user(1);
        let h = db.create_habit(1, "Walk").unwrap().id;
        let yesterday = today().pred_opt().unwrap();

        db.mark_done_on(h, yesterday).unwrap();
        assert!(db.is_done_on(h, yesterday).unwrap());
        assert!(!db.is_done_today(h).unwrap());

        db.mark_done(h).unwrap();
        assert_eq!(db.count_completions(h).unwrap(), 2);

        db.mark_not_done_on(h, yesterday).unwrap();
        assert!(db.is_done_today(h).unwrap());
        assert_eq!(db.count_completions(h).unwrap(), 1);
    }

    #[test]
    fn completed_today_batches_lookup() {
        let db = db_with_user(1);
        let a = db.create_habit(1, "A habit").unwrap().id;
        let b = db.create_habit(1, "B habit").unwrap().id;
        let c = db.create_habit(1, "C habit").unwrap().id;
        db.mark_done(a).unwrap();
        db.mark_done(c).unwrap();
        db.mark_done_on(b, today().pred_opt().unwrap()).unwrap();

        let done = db.completed_today(&[a, b, c]).unwrap();
        assert_eq!(done, HashSet::from([a, c]));
        assert!(db.completed_today(&[]).unwrap().is_empty());
    }

    #[test]
    fn delete_cascades_completions() {
        let db = db_with_user(1);
        let h = db.create_habit(1, "Walk").unwrap().id;
        db.mark_done(h).unwrap();
        db.mark_done_on(h, today().pred_opt().unwrap()).unwrap();

        assert!(db.delete_habit(h, 1).unwrap());

        assert!(db.get_habit(h).unwrap().is_none());
        assert_eq!(db.count_completions(h).unwrap(), 0);
    }

    #[test]
    fn delete_ignores_foreign_and_missing_habits() {
        let db = db_with_user(1);
        db.upsert_user(2, "intruder").unwrap();
        let h = db.create_habit(1, "Walk").unwrap().id;
        db.mark_done(h).unwrap();

        assert!(!db.delete_habit(h, 2).unwrap());
        assert!(!db.delete_habit(h + 100, 1).unwrap());

        assert!(db.get_habit(h).unwrap().is_some());
        assert_eq!(db.count_completions(h).unwrap(), 1);
    }

    #[test]
    fn concurrent_marks_leave_one_row() {
        let db = Arc::new(db_with_user(1));
        let h = db.create_habit(1, "Walk").unwrap().id;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                thread::spawn(move || db.mark_done(h))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(db.count_completions(h).unwrap(), 1);
    }
}
