use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use habit_types::events::Reply;
use habit_types::models::{Habit, UserId};

use crate::service::{HabitError, HabitService};

/// Where a user is in the "add habit" dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingHabitName,
}

/// Per-user conversation state, keyed by user id.
///
/// Entries appear on first contact and live as long as the process. Values are
/// `Copy`, so a poisoned lock still holds a consistent map and is recovered.
#[derive(Default)]
pub struct Conversations {
    states: Mutex<HashMap<UserId, ConversationState>>,
}

impl Conversations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, user_id: UserId) -> ConversationState {
        *self.lock().entry(user_id).or_default()
    }

    fn set(&self, user_id: UserId, state: ConversationState) {
        let previous = self.lock().insert(user_id, state);
        if previous != Some(state) {
            debug!("User {} conversation {:?} -> {:?}", user_id, previous.unwrap_or_default(), state);
        }
    }

    /// `Idle -> AwaitingHabitName`. Asking again while already waiting just re-prompts.
    pub fn begin_add(&self, user_id: UserId) -> Reply {
        self.set(user_id, ConversationState::AwaitingHabitName);
        Reply::PromptHabitName
    }

    /// Back to `Idle`, discarding whatever was pending.
    pub fn cancel(&self, user_id: UserId) -> Reply {
        self.set(user_id, ConversationState::Idle);
        Reply::Cancelled
    }

    /// Try to finish the pending habit with `text` as its name.
    ///
    /// Returns `Ok(None)` when the user is not waiting to name a habit. On any
    /// error the state stays `AwaitingHabitName` so the user can send another name.
    pub fn submit_name(
        &self,
        service: &HabitService,
        user_id: UserId,
        text: &str,
    ) -> Result<Option<Habit>, HabitError> {
        if self.state(user_id) != ConversationState::AwaitingHabitName {
            return Ok(None);
        }

        let habit = service.add_habit(user_id, text)?;
        self.set(user_id, ConversationState::Idle);
        Ok(Some(habit))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, ConversationState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
