use tracing::{debug, error, warn};

use habit_types::events::{Action, Command, Payload, Reply};
use habit_types::models::UserId;

use crate::conversation::Conversations;
use crate::service::{HabitError, HabitService, ToggleOutcome};

/// Typed words that abort a pending "add habit".
const CANCEL_KEYWORDS: &[&str] = &["cancel", "/cancel"];

/// Entry point for inbound actions: one action in, one reply out.
pub struct Router {
    service: HabitService,
    conversations: Conversations,
}

impl Router {
    pub fn new(service: HabitService) -> Self {
        Self {
            service,
            conversations: Conversations::new(),
        }
    }

    pub fn conversations(&self) -> &Conversations {
        &self.conversations
    }

    /// Handle one action to completion. Storage failures are logged and
    /// reported as `Reply::Failure`; they never escape to the caller.
    pub fn dispatch(&self, action: &Action) -> Reply {
        debug!("Action from {}: {:?}", action.user_id, action.payload);

        match self.try_dispatch(action) {
            Ok(reply) => reply,
            Err(HabitError::Validation(error)) => Reply::ValidationError { error },
            Err(HabitError::NotOwner { habit_id }) => {
                warn!("User {} touched habit {} they do not own", action.user_id, habit_id);
                Reply::OwnershipError { habit_id }
            }
            Err(HabitError::Storage(e)) => {
                error!("Storage failure handling action from {}: {}", action.user_id, e);
                Reply::Failure
            }
        }
    }

    fn try_dispatch(&self, action: &Action) -> Result<Reply, HabitError> {
        let user_id = action.user_id;
        self.service.register_user(user_id, &action.display_name)?;

        match &action.payload {
            Payload::Token(token) => match token.parse::<Command>() {
                Ok(command) => self.run(user_id, &action.display_name, command),
                Err(e) => {
                    warn!("Bad token from {}: {}", user_id, e);
                    Ok(Reply::Help)
                }
            },
            Payload::Text(text) => {
                if is_cancel(text) {
                    return Ok(self.conversations.cancel(user_id));
                }

                if let Some(habit) = self.conversations.submit_name(&self.service, user_id, text)? {
                    return Ok(Reply::HabitCreated { habit });
                }

                // Idle: typed slash commands still work, anything else gets help.
                match text.parse::<Command>() {
                    Ok(command) if text.trim_start().starts_with('/') => {
                        self.run(user_id, &action.display_name, command)
                    }
                    _ => Ok(Reply::Help),
                }
            }
        }
    }

    fn run(&self, user_id: UserId, display_name: &str, command: Command) -> Result<Reply, HabitError> {
        let reply = match command {
            Command::Start => Reply::Welcome {
                display_name: display_name.to_string(),
            },
            Command::Help => Reply::Help,
            Command::Add => self.conversations.begin_add(user_id),
            Command::Cancel => self.conversations.cancel(user_id),
            Command::List => {
                let habits = self.service.list_habits(user_id)?;
                if habits.is_empty() {
                    Reply::EmptyState
                } else {
                    Reply::HabitList { habits }
                }
            }
            Command::Check => {
                let entries = self.service.completion_snapshot(user_id)?;
                if entries.is_empty() {
                    Reply::EmptyState
                } else {
                    Reply::CompletionSnapshot { entries }
                }
            }
            Command::DeleteMenu => {
                let habits = self.service.list_habits(user_id)?;
                if habits.is_empty() {
                    Reply::EmptyState
                } else {
                    Reply::DeletePicker { habits }
                }
            }
            Command::Toggle {
                habit_id,
                direction,
            } => match self.service.toggle_completion(user_id, habit_id, direction)? {
                ToggleOutcome::Marked { habit, snapshot } => Reply::Marked {
                    habit,
                    entries: snapshot,
                },
                ToggleOutcome::Unmarked { habit, snapshot } => Reply::Unmarked {
                    habit,
                    entries: snapshot,
                },
                ToggleOutcome::AlreadyInState { habit, done } => Reply::AlreadyInState { habit, done },
            },
            Command::Delete { habit_id } => {
                let outcome = self.service.delete_habit(user_id, habit_id)?;
                Reply::HabitDeleted {
                    habit: outcome.habit,
                    remaining: outcome.remaining,
                }
            }
        };
        Ok(reply)
    }
}

fn is_cancel(text: &str) -> bool {
    let text = text.trim();
    CANCEL_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(text))
}
