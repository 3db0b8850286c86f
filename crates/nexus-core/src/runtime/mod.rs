//! Session-aware agent runtime: content, events, and the [`Runner`] that
//! executes one conversational turn and reports it as an event stream.

pub mod runner;

use chrono::{DateTime, Utc};

pub use runner::Runner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    /// Model thinking output; never part of the response text.
    Reasoning(String),
}

impl Part {
    /// Text carried by this part, if it is a non-empty text part.
    pub fn text(&self) -> Option<&str> {
        match self {
            Part::Text(t) if !t.is_empty() => Some(t),
            _ => None,
        }
    }
}

/// A unit of conversation attributed to one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn model(parts: Vec<Part>) -> Self {
        Self {
            role: Role::Model,
            parts,
        }
    }

    /// All text parts concatenated in order.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::text).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The caller's message, recorded in the session.
    Input,
    /// Intermediate output (e.g. reasoning) observed during a turn.
    Progress,
    /// End of the turn's generation.
    FinalResponse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: String,
    pub author: String,
    pub kind: EventKind,
    pub content: Option<Content>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(author: impl Into<String>, kind: EventKind, content: Option<Content>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author: author.into(),
            kind,
            content,
            timestamp: Utc::now(),
        }
    }

    pub fn is_final_response(&self) -> bool {
        self.kind == EventKind::FinalResponse
    }
}
