use serde::{Deserialize, Serialize};

// -- Rendered output --

/// A reply in the shape the chat transport draws: text plus an optional keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedReply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
    /// Show as a transient alert instead of a new message
    #[serde(default)]
    pub alert: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum Keyboard {
    /// Persistent reply keyboard; pressing a button sends its label as text
    Menu(Vec<Vec<String>>),
    /// Buttons attached to the message; pressing one sends its token
    Inline(Vec<Vec<Button>>),
    /// Remove any keyboard attached to the edited message
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub text: String,
    pub token: String,
}
