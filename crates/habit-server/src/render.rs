//! Presentation: turns domain replies into text and keyboards for the chat client.

use habit_types::api::{Button, Keyboard, RenderedReply};
use habit_types::events::{Reply, ValidationError};
use habit_types::models::{CompletionEntry, Habit};

pub const LABEL_ADD: &str = "➕ Add habit";
pub const LABEL_DELETE: &str = "❌ Delete habit";
pub const LABEL_LIST: &str = "📋 My habits";
pub const LABEL_CHECK: &str = "✅ Mark done";
pub const LABEL_HELP: &str = "❓ Help";
pub const LABEL_CANCEL: &str = "❌ Cancel";

const EMPTY_TEXT: &str = "📋 You have no habits yet.\nAdd your first one with the '➕ Add habit' button.";

/// Menu buttons arrive back as plain text; map them to command tokens.
pub fn label_to_token(text: &str) -> Option<&'static str> {
    match text.trim() {
        LABEL_ADD => Some("add"),
        LABEL_DELETE => Some("delete"),
        LABEL_LIST => Some("list"),
        LABEL_CHECK => Some("check"),
        LABEL_HELP => Some("help"),
        LABEL_CANCEL => Some("cancel"),
        _ => None,
    }
}

pub fn main_menu() -> Keyboard {
    Keyboard::Menu(vec![
        vec![LABEL_ADD.into(), LABEL_DELETE.into(), LABEL_LIST.into()],
        vec![LABEL_CHECK.into(), LABEL_HELP.into()],
    ])
}

pub fn cancel_menu() -> Keyboard {
    Keyboard::Menu(vec![vec![LABEL_CANCEL.into()]])
}

fn delete_picker(habits: &[Habit]) -> Keyboard {
    Keyboard::Inline(
        habits
            .iter()
            .map(|h| {
                vec![Button {
                    text: h.name.clone(),
                    token: format!("delete:{}", h.id),
                }]
            })
            .collect(),
    )
}

fn check_list(entries: &[CompletionEntry]) -> Keyboard {
    Keyboard::Inline(
        entries
            .iter()
            .map(|e| {
                let (mark, verb) = if e.done_today { ("✅", "unmark") } else { ("⭕", "mark") };
                vec![Button {
                    text: format!("{} {}", mark, e.name),
                    token: format!("{}:{}", verb, e.habit_id),
                }]
            })
            .collect(),
    )
}

fn message(text: impl Into<String>, keyboard: Option<Keyboard>) -> RenderedReply {
    RenderedReply {
        text: text.into(),
        keyboard,
        alert: false,
    }
}

fn alert(text: impl Into<String>, keyboard: Option<Keyboard>) -> RenderedReply {
    RenderedReply {
        text: text.into(),
        keyboard,
        alert: true,
    }
}

pub fn render(reply: &Reply) -> RenderedReply {
    match reply {
        Reply::Welcome { display_name } => message(
            format!(
                "👋 Hi, {}!\n\nI'll help you keep track of your habits.\n\nUse the buttons below:",
                display_name
            ),
            Some(main_menu()),
        ),
        Reply::Help => message(
            format!(
                "📖 How to use the bot:\n\n\
                 {LABEL_ADD} - create a new habit\n\
                 {LABEL_LIST} - see all your habits\n\
                 {LABEL_CHECK} - mark what you did today\n\
                 {LABEL_DELETE} - remove a habit\n\
                 {LABEL_HELP} - show this help\n\n\
                 💡 Tip: mark your habits every day so you don't lose track!"
            ),
            Some(main_menu()),
        ),
        Reply::PromptHabitName => message(
            "📝 Send the name of your new habit:\n\nFor example: Drink water, Morning exercise, Read a book",
            Some(cancel_menu()),
        ),
        Reply::HabitCreated { habit } => message(
            format!("✅ Habit '{}' added!", habit.name),
            Some(main_menu()),
        ),
        Reply::ValidationError { error } => {
            let why = match error {
                ValidationError::TooShort => "❌ The name is too short (at least 2 characters).",
                ValidationError::TooLong => "❌ The name is too long (at most 100 characters).",
            };
            message(format!("{}\nTry again:", why), None)
        }
        Reply::Cancelled => message("❌ Cancelled", Some(main_menu())),
        Reply::HabitList { habits } => {
            let mut text = String::from("📋 Your habits:\n\n");
            for (idx, habit) in habits.iter().enumerate() {
                text.push_str(&format!("{}. {}\n", idx + 1, habit.name));
            }
            message(text, Some(main_menu()))
        }
        Reply::EmptyState => message(EMPTY_TEXT, Some(main_menu())),
        Reply::CompletionSnapshot { entries } => message(
            "✅ Mark the habits you did today:\n\n⭕ - not done\n✅ - done",
            Some(check_list(entries)),
        ),
        Reply::Marked { habit, entries } => alert(
            format!("🎉 Great! '{}' done!", habit.name),
            Some(check_list(entries)),
        ),
        Reply::Unmarked { habit, entries } => alert(
            format!("↩️ Unmarked '{}'", habit.name),
            Some(check_list(entries)),
        ),
        Reply::AlreadyInState { habit, done } => {
            let text = if *done {
                format!("ℹ️ '{}' is already marked for today", habit.name)
            } else {
                format!("ℹ️ '{}' was not marked today", habit.name)
            };
            alert(text, None)
        }
        Reply::DeletePicker { habits } => message(
            "❌ Pick the habit you want to delete:",
            Some(delete_picker(habits)),
        ),
        Reply::HabitDeleted { habit, remaining } => {
            if remaining.is_empty() {
                message(
                    format!("❌ Habit '{}' deleted\n\n{}", habit.name, EMPTY_TEXT),
                    Some(Keyboard::Remove),
                )
            } else {
                message(
                    format!("❌ Habit '{}' deleted", habit.name),
                    Some(delete_picker(remaining)),
                )
            }
        }
        Reply::OwnershipError { .. } => alert("❌ This habit does not belong to you", None),
        // Keep whatever keyboard the client shows; a pending name prompt stays open.
        Reply::Failure => message("⚠️ Something went wrong. Please try again.", None),
    }
}
