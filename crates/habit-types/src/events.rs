use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{CompletionEntry, Habit, HabitId, UserId};

/// Shortest accepted habit name, in characters, after trimming.
pub const MIN_NAME_LEN: usize = 2;

/// Longest accepted habit name, in characters, after trimming.
pub const MAX_NAME_LEN: usize = 100;

/// One inbound interaction from the chat transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub user_id: UserId,
    pub display_name: String,
    #[serde(flatten)]
    pub payload: Payload,
}

/// What the user sent: typed text or a structured button token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Text(String),
    Token(String),
}

/// Which way a completion toggle should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleDirection {
    Mark,
    Unmark,
    /// Mark if not done today, unmark otherwise.
    Flip,
}

/// Structured commands recognised by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Add,
    List,
    Check,
    /// Show the delete picker.
    DeleteMenu,
    Help,
    Cancel,
    Toggle {
        habit_id: HabitId,
        direction: ToggleDirection,
    },
    Delete {
        habit_id: HabitId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseCommandError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("invalid habit id in {0}")]
    InvalidHabitId(String),
}

impl FromStr for Command {
    type Err = ParseCommandError;

    /// Accepts `add|list|check|delete|help|cancel|start` (with or without a
    /// leading `/`) and `toggle:<id>`, `mark:<id>`, `unmark:<id>`, `delete:<id>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        let token = token.strip_prefix('/').unwrap_or(token);

        if let Some((verb, arg)) = token.split_once(':') {
            let habit_id: HabitId = arg
                .trim()
                .parse()
                .map_err(|_| ParseCommandError::InvalidHabitId(token.to_string()))?;

            let direction = match verb {
                "toggle" => ToggleDirection::Flip,
                "mark" | "check" => ToggleDirection::Mark,
                "unmark" | "uncheck" => ToggleDirection::Unmark,
                "delete" => return Ok(Command::Delete { habit_id }),
                _ => return Err(ParseCommandError::Unknown(token.to_string())),
            };
            return Ok(Command::Toggle {
                habit_id,
                direction,
            });
        }

        match token {
            "start" => Ok(Command::Start),
            "add" => Ok(Command::Add),
            "list" => Ok(Command::List),
            "check" => Ok(Command::Check),
            "delete" => Ok(Command::DeleteMenu),
            "help" => Ok(Command::Help),
            "cancel" => Ok(Command::Cancel),
            _ => Err(ParseCommandError::Unknown(token.to_string())),
        }
    }
}

/// Why a habit name was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum ValidationError {
    #[error("habit name is too short (at least 2 characters)")]
    TooShort,
    #[error("habit name is too long (at most 100 characters)")]
    TooLong,
}

/// Result of handling one action, handed back to the transport for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Reply {
    /// First contact greeting
    Welcome { display_name: String },

    Help,

    /// Ask for the name of a new habit
    PromptHabitName,

    HabitCreated { habit: Habit },

    /// Name rejected; the user is still expected to send a name
    ValidationError { error: ValidationError },

    Cancelled,

    HabitList { habits: Vec<Habit> },

    /// The user has no habits
    EmptyState,

    /// Today's completion state for every habit, in listing order
    CompletionSnapshot { entries: Vec<CompletionEntry> },

    Marked {
        habit: Habit,
        entries: Vec<CompletionEntry>,
    },

    Unmarked {
        habit: Habit,
        entries: Vec<CompletionEntry>,
    },

    /// Toggle requested a state the habit is already in
    AlreadyInState { habit: Habit, done: bool },

    /// Pick a habit to delete
    DeletePicker { habits: Vec<Habit> },

    HabitDeleted {
        habit: Habit,
        remaining: Vec<Habit>,
    },

    /// The habit does not belong to the requester (or does not exist)
    OwnershipError { habit_id: HabitId },

    /// Storage failed; nothing was changed
    Failure,
}
