//! Database row types. These map directly to SQLite rows and stay distinct
//! from the habit-types models so the store does not parse timestamps.

pub struct UserRow {
    pub user_id: i64,
    pub display_name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: String,
}
