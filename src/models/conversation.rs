use serde::{Deserialize, Serialize};

/// Speaker of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One typed part of a multi-part user message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum ContentPart {
    /// Raw text
    Text(String),
    /// Reference to external media (file path or URI)
    Media(String),
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text(text.into())
    }

    pub fn media(reference: impl Into<String>) -> Self {
        ContentPart::Media(reference.into())
    }
}

/// Message body: plain text, or an ordered list of parts (user messages only)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// All text in the content, parts joined by newlines. Media parts are skipped.
    pub fn all_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text(text) => Some(text.as_str()),
                    ContentPart::Media(_) => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A single immutable message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationMessage {
    role: Role,
    content: MessageContent,
}

impl ConversationMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// A user message made of typed parts (text and media references)
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &MessageContent {
        &self.content
    }
}

/// Ordered, append-only conversation history.
///
/// Appending never mutates an existing log; every retry round produces a
/// new value. Equality and hashing cover the full ordered content so a log
/// can key a response cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationLog {
    messages: Vec<ConversationMessage>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a new log with `message` appended
    #[must_use]
    pub fn append(&self, message: ConversationMessage) -> Self {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.extend_from_slice(&self.messages);
        messages.push(message);
        Self { messages }
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }

    /// Every media reference in the log, in message order
    pub fn media_references(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(|m| match &m.content {
                MessageContent::Parts(parts) => Some(parts),
                MessageContent::Text(_) => None,
            })
            .flatten()
            .filter_map(|p| match p {
                ContentPart::Media(reference) => Some(reference.as_str()),
                ContentPart::Text(_) => None,
            })
            .collect()
    }
}

impl FromIterator<ConversationMessage> for ConversationLog {
    fn from_iter<I: IntoIterator<Item = ConversationMessage>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use super::*;

    fn hash_of(log: &ConversationLog) -> u64 {
        let mut hasher = DefaultHasher::new();
        log.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_append_leaves_original_untouched() {
        let base = ConversationLog::new().append(ConversationMessage::user("lyrics"));
        let extended = base.append(ConversationMessage::assistant("reply"));

        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);
        assert_eq!(extended.messages()[0], base.messages()[0]);
        assert_eq!(extended.last().map(|m| m.role()), Some(Role::Assistant));
    }

    #[test]
    fn test_equal_logs_hash_equal() {
        let build = || {
            ConversationLog::new()
                .append(ConversationMessage::user("task"))
                .append(ConversationMessage::user_parts(vec![ContentPart::media(
                    "song.mp3",
                )]))
        };

        assert_eq!(build(), build());
        assert_eq!(hash_of(&build()), hash_of(&build()));

        let other = build().append(ConversationMessage::user("feedback"));
        assert_ne!(build(), other);
    }

    #[test]
    fn test_order_matters_for_equality() {
        let a: ConversationLog = vec![
            ConversationMessage::user("one"),
            ConversationMessage::user("two"),
        ]
        .into_iter()
        .collect();
        let b: ConversationLog = vec![
            ConversationMessage::user("two"),
            ConversationMessage::user("one"),
        ]
        .into_iter()
        .collect();

        assert_ne!(a, b);
    }

    #[test]
    fn test_media_references_and_text() {
        let log = ConversationLog::new()
            .append(ConversationMessage::system("rules"))
            .append(ConversationMessage::user_parts(vec![
                ContentPart::text("listen to this"),
                ContentPart::media("a.wav"),
                ContentPart::media("b.wav"),
            ]));

        assert_eq!(log.media_references(), vec!["a.wav", "b.wav"]);
        assert_eq!(log.messages()[1].content().all_text(), "listen to this");
    }
}
