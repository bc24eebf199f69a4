//! The normalized chat message passed between adapters and handlers.
//!
//! Adapters translate their wire format into a [`Message`] on the way in and
//! out of one on the way back. The routing fields (`to`, `from`, `channel`)
//! are opaque strings whose meaning belongs to the adapter.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::store::Storer;

// ============================================================================
// Attachments
// ============================================================================

/// A single labelled field rendered inside an [`Attachment`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
    /// Whether the field is short enough to be laid out side by side.
    #[serde(default)]
    pub short: bool,
}

/// Rich content attached to a message.
///
/// Text-only adapters render [`Attachment::fallback`] (or the text fields)
/// instead of the structured layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attachment {
    pub title: String,
    pub title_link: String,
    pub pretext: String,
    pub text: String,
    pub fallback: String,
    pub color: String,
    pub image_url: String,
    pub thumb_url: String,
    pub author_name: String,
    pub author_link: String,
    pub author_icon: String,
    pub fields: Vec<AttachmentField>,
    /// Names of the fields that may contain markdown.
    pub markdown_in: Vec<String>,
}

impl Attachment {
    /// Renders the attachment as plain text for adapters without rich content.
    pub fn plain_text(&self) -> String {
        if !self.fallback.is_empty() {
            return self.fallback.clone();
        }

        let mut lines: Vec<String> = [&self.pretext, &self.title, &self.text]
            .into_iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect();
        for field in &self.fields {
            lines.push(format!("{}: {}", field.title, field.value));
        }
        lines.join("\n")
    }
}

// ============================================================================
// Message
// ============================================================================

/// One chat message, inbound or outbound.
///
/// Messages are treated as values: [`Message::reply`] and [`Message::copy`]
/// return new messages and never touch the original.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    pub to: String,
    pub from: String,
    pub channel: String,
    /// Identity verified by the adapter, if it offers one.
    pub user_id: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
    pub private: bool,
    /// Set by the adapter when the message was addressed to the bot.
    pub to_bot: bool,
    /// Property backend scoped to the handler currently processing the message.
    #[serde(skip)]
    pub store: Option<Arc<dyn Storer>>,
}

impl Message {
    /// Creates a message carrying only `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Creates a message addressed to the bot.
    pub fn to_bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            to_bot: true,
            ..Default::default()
        }
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = to.into();
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn Storer>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds a reply: sender and recipient are swapped and the text replaced.
    ///
    /// Channel, privacy, attachments and the store handle are carried over.
    /// Use `m.reply(format!(...))` for formatted replies.
    pub fn reply(&self, text: impl Into<String>) -> Self {
        Self {
            to: self.from.clone(),
            from: self.to.clone(),
            text: text.into(),
            ..self.clone()
        }
    }

    /// Returns an independent copy of this message.
    pub fn copy(&self) -> Self {
        self.clone()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("to", &self.to)
            .field("from", &self.from)
            .field("channel", &self.channel)
            .field("user_id", &self.user_id)
            .field("text", &self.text)
            .field("attachments", &self.attachments.len())
            .field("private", &self.private)
            .field("to_bot", &self.to_bot)
            .field("store", &self.store.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_swaps_from_and_to() {
        let m = Message::to_bot("ping")
            .with_from("alice")
            .with_to("bot")
            .with_channel("#general");

        let r = m.reply("PONG!");
        assert_eq!(r.to, "alice");
        assert_eq!(r.from, "bot");
        assert_eq!(r.channel, "#general");
        assert_eq!(r.text, "PONG!");

        // The original is untouched.
        assert_eq!(m.text, "ping");
        assert_eq!(m.from, "alice");
    }

    #[test]
    fn test_reply_keeps_attachments() {
        let m = Message::new("hi").with_attachment(Attachment {
            title: "card".into(),
            ..Default::default()
        });
        let mut r = m.reply("there");
        r.attachments[0].title = "changed".into();

        assert_eq!(m.attachments[0].title, "card");
        assert_eq!(r.attachments.len(), 1);
    }

    #[test]
    fn test_attachment_plain_text() {
        let a = Attachment {
            title: "Build".into(),
            text: "passed".into(),
            fields: vec![AttachmentField {
                title: "branch".into(),
                value: "main".into(),
                short: true,
            }],
            ..Default::default()
        };
        assert_eq!(a.plain_text(), "Build\npassed\nbranch: main");

        let a = Attachment {
            fallback: "Build passed".into(),
            ..a
        };
        assert_eq!(a.plain_text(), "Build passed");
    }

    #[test]
    fn test_serde_skips_store() {
        let m = Message::to_bot("hello").with_from("bob");
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["text"], "hello");
        assert_eq!(json["to_bot"], true);
        assert!(json.get("store").is_none());

        let back: Message = serde_json::from_str(r#"{"text":"hi","from":"carol"}"#).unwrap();
        assert_eq!(back.from, "carol");
        assert!(!back.to_bot);
        assert!(back.store.is_none());
    }
}
