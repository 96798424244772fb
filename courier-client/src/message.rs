//! Core data model of a send: ids, flags, options, captions.

use std::ops::{BitOr, BitOrAssign};

use crate::entities::EntityInText;

/// Conversation target id (user, group or broadcast channel).
pub type PeerId = i64;

/// Message id within a conversation.
///
/// Server-assigned ids are small; locally allocated ids start at
/// [`crate::storage::FIRST_LOCAL_ID`] so the two ranges never collide.
pub type MsgId = i32;

/// A message id qualified by its conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FullMsgId {
    pub peer: PeerId,
    pub msg:  MsgId,
}

// ─── MessageFlags ─────────────────────────────────────────────────────────────

/// Local render flags of a history item.
///
/// These drive how the message is displayed (badge, counters, author line)
/// and are computed once, identically for every payload kind, before the
/// optimistic insert.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MessageFlags(pub u32);

impl MessageFlags {
    /// Optimistically rendered, server acknowledgement still pending.
    pub const BEING_SENT:          Self = Self(1 << 0);
    /// Sent by this client as the user (not as an anonymous channel identity).
    pub const OUTGOING:            Self = Self(1 << 1);
    pub const HAS_FROM_ID:         Self = Self(1 << 2);
    pub const HAS_REPLY_INFO:      Self = Self(1 << 3);
    pub const POST:                Self = Self(1 << 4);
    pub const HAS_VIEWS:           Self = Self(1 << 5);
    pub const HAS_POST_AUTHOR:     Self = Self(1 << 6);
    pub const SILENT:              Self = Self(1 << 7);
    pub const IS_OR_WAS_SCHEDULED: Self = Self(1 << 8);
    pub const SHORTCUT_MESSAGE:    Self = Self(1 << 9);
    pub const MEDIA_IS_UNREAD:     Self = Self(1 << 10);
    /// Suppress the "edited" badge (scheduled and shortcut messages).
    pub const HIDE_EDITED:         Self = Self(1 << 11);

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for MessageFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for MessageFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// ─── Send options / actions ───────────────────────────────────────────────────

/// Reply target of a send.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplyTo {
    pub message_id:    MsgId,
    /// Forum topic root the reply lives under, if any.
    pub topic_root_id: Option<MsgId>,
}

/// Immutable per-send options chosen in the compose UI.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SendOptions {
    pub silent:      bool,
    /// Unix timestamp for a scheduled send; `None` sends immediately.
    pub scheduled:   Option<i32>,
    /// Alternate identity to post as (channel / group persona).
    pub send_as:     Option<PeerId>,
    /// Quick-reply template the message was created from.
    pub shortcut_id: Option<i32>,
    /// Self-destruct timer for voice messages.
    pub ttl_seconds: Option<i32>,
}

/// One user send gesture. Created per gesture, consumed once by the pipeline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SendAction {
    pub peer:             PeerId,
    pub reply_to:         Option<ReplyTo>,
    pub options:          SendOptions,
    pub clear_draft:      bool,
    pub generate_local:   bool,
    /// Message whose media this send replaces (editing), if any.
    pub replace_media_of: Option<MsgId>,
}

impl SendAction {
    pub fn new(peer: PeerId, options: SendOptions) -> Self {
        Self { peer, options, ..Default::default() }
    }
}

// ─── Captions ─────────────────────────────────────────────────────────────────

/// Plain text plus its formatting annotations (UTF-16 based offsets).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextWithEntities {
    pub text:     String,
    pub entities: Vec<EntityInText>,
}

impl TextWithEntities {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), entities: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.entities.is_empty()
    }
}

/// A compose action moved into the pipeline and consumed by it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageToSend {
    pub action:             SendAction,
    pub text_with_entities: TextWithEntities,
}

impl MessageToSend {
    pub fn new(action: SendAction) -> Self {
        Self { action, text_with_entities: TextWithEntities::default() }
    }

    pub fn with_text(action: SendAction, text: TextWithEntities) -> Self {
        Self { action, text_with_entities: text }
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Date stamped on the optimistic local message: the scheduled timestamp,
/// or now for an immediate send.
pub fn new_message_date(options: &SendOptions) -> i32 {
    options
        .scheduled
        .unwrap_or_else(|| chrono::Utc::now().timestamp() as i32)
}

/// Strip leading/trailing whitespace from `text`, remapping entity offsets
/// (UTF-16 units) into the trimmed range. Entities that end up empty are
/// dropped.
pub fn trim(text: &mut TextWithEntities) {
    let trimmed = text.text.trim();
    if trimmed.len() == text.text.len() {
        return;
    }
    let leading = {
        let start = text.text.len() - text.text.trim_start().len();
        text.text[..start].encode_utf16().count() as i32
    };
    let kept: i32 = trimmed.encode_utf16().count() as i32;

    text.text = trimmed.to_string();
    text.entities.retain_mut(|entity| {
        entity.offset -= leading;
        if entity.offset < 0 {
            entity.length += entity.offset;
            entity.offset = 0;
        }
        if entity.offset + entity.length > kept {
            entity.length = kept - entity.offset;
        }
        entity.length > 0 && entity.offset < kept
    });
}
