//! Habit tracking core: the domain service over the store, the per-user
//! "add habit" conversation, and the router that turns one inbound action
//! into one reply.

pub mod conversation;
pub mod router;
pub mod service;

pub use conversation::{ConversationState, Conversations};
pub use router::Router;
pub use service::{DeleteOutcome, HabitError, HabitService, ToggleOutcome};
