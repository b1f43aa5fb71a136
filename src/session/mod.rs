use std::fmt;
use uuid::Uuid;

pub mod image;
pub mod machine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Tutor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Image,
}

/// One transcript entry. For `MessageKind::Image` the content is a
/// `data:` URI; for text it is plain or Markdown text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub kind: MessageKind,
    pub content: String,
    pub is_pending: bool,
}

impl Message {
    pub fn image(data_uri: String) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::Student,
            kind: MessageKind::Image,
            content: data_uri,
            is_pending: false,
        }
    }

    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            kind: MessageKind::Text,
            content: content.into(),
            is_pending: false,
        }
    }

    /// Tutor placeholder reserved before the reply text is known.
    pub fn pending_tutor() -> Self {
        Self {
            is_pending: true,
            ..Self::text(Role::Tutor, String::new())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranscriptError {
    #[error("no message with id {0} in transcript")]
    UnknownMessage(MessageId),
}

/// Append-only, chronologically ordered chat log. Entries are only ever
/// mutated through [`Transcript::update`] and only removed by [`Transcript::clear`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[cfg(test)]
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.messages.iter().filter(|message| message.is_pending).count()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    pub fn update(
        &mut self,
        id: MessageId,
        content: impl Into<String>,
        is_pending: bool,
    ) -> Result<(), TranscriptError> {
        let message = self
            .messages
            .iter_mut()
            .find(|message| message.id == id)
            .ok_or(TranscriptError::UnknownMessage(id))?;
        message.content = content.into();
        message.is_pending = is_pending;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
