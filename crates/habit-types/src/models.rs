use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat platform user id. Stable across sessions.
pub type UserId = i64;

/// Store-assigned habit id. Never reused after deletion.
pub type HabitId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub user_id: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// One line of the "what did I do today" view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEntry {
    pub habit_id: HabitId,
    pub name: String,
    pub done_today: bool,
}
