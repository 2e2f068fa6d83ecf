//! Wire event types for the alumchat messaging protocol.
//!
//! Every frame exchanged with the messaging endpoint is one [`WireEvent`],
//! serialized as JSON and discriminated by its `type` field. The same
//! shapes are used outbound and inbound; fields that only one direction
//! carries (`userId` on inbound frames, `receiverId` on outbound typing
//! frames) are optional and omitted from the JSON when absent.

use serde::{Deserialize, Serialize};

/// Profile fields attached to message events.
///
/// Carried on every chat message so the receiving client can create a
/// roster entry for a sender it has never exchanged messages with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Stable identity of the user within the network.
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Avatar URL; receivers fall back to a placeholder when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserProfile {
    /// Creates a profile with only the identity field set.
    #[must_use]
    pub fn from_email(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            first_name: None,
            last_name: None,
            avatar: None,
        }
    }

    /// Human-readable name: "First Last", either half alone, or the email
    /// when no name fields are present.
    #[must_use]
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => self.email.clone(),
        }
    }
}

/// Whether a chat message carries plain text or an encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
}

/// Payload of a chat message event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    /// Who sent the message.
    pub sender: UserProfile,
    /// Email of the intended recipient.
    pub receiver: String,
    /// Message text; empty for image-only messages.
    #[serde(default)]
    pub text: String,
    /// ISO-8601 timestamp assigned by the sending client.
    pub timestamp: String,
    /// Text or image. The event envelope already uses `type` for the
    /// event kind, so this discriminator travels as `messageType`.
    #[serde(rename = "messageType")]
    pub kind: MessageKind,
    /// Encoded image payload, present only when `kind` is [`MessageKind::Image`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// A single frame on the wire, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireEvent {
    /// Online/offline announcement.
    ///
    /// Outbound frames omit `userId` (the endpoint stamps the connection's
    /// own identity); inbound frames carry the affected user's id.
    #[serde(rename_all = "camelCase")]
    Status {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        is_online: bool,
    },
    /// Typing indicator. Outbound frames carry `receiverId`, inbound
    /// frames carry `userId`.
    #[serde(rename_all = "camelCase")]
    Typing {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        receiver_id: Option<String>,
        is_typing: bool,
    },
    /// A chat message between two users.
    Message(WireMessage),
}

impl WireEvent {
    /// Outbound announcement that this client is online.
    #[must_use]
    pub const fn online() -> Self {
        Self::Status {
            user_id: None,
            is_online: true,
        }
    }

    /// Outbound announcement that this client is going offline.
    #[must_use]
    pub const fn offline() -> Self {
        Self::Status {
            user_id: None,
            is_online: false,
        }
    }

    /// Outbound typing indicator addressed to `receiver_id`.
    #[must_use]
    pub fn typing_to(receiver_id: impl Into<String>, is_typing: bool) -> Self {
        Self::Typing {
            user_id: None,
            receiver_id: Some(receiver_id.into()),
            is_typing,
        }
    }
}
