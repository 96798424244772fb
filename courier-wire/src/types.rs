//! Concrete (bare) constructors as plain `struct`s.
//!
//! Field order and naming mirror the server schema; `offset` / `length`
//! are UTF-16 code units.

use crate::enums;

// ─── Message entities ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityUnknown {
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityMention {
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityHashtag {
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityBotCommand {
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityUrl {
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityEmail {
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityBold {
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityItalic {
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityCode {
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityPre {
    pub offset:   i32,
    pub length:   i32,
    pub language: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityTextUrl {
    pub offset: i32,
    pub length: i32,
    pub url:    String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityMentionName {
    pub offset:  i32,
    pub length:  i32,
    pub user_id: i64,
}

/// Client-to-server variant of a name mention: carries the full
/// [`enums::InputUser`] instead of a bare id.
#[derive(Clone, Debug, PartialEq)]
pub struct InputMessageEntityMentionName {
    pub offset:  i32,
    pub length:  i32,
    pub user_id: enums::InputUser,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityPhone {
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityCashtag {
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityUnderline {
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityStrike {
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityBankCard {
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntitySpoiler {
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityCustomEmoji {
    pub offset:      i32,
    pub length:      i32,
    pub document_id: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MessageEntityBlockquote {
    pub offset: i32,
    pub length: i32,
}

// ─── Input users / peers ──────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct InputUser {
    pub user_id:     i64,
    pub access_hash: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputPeerUser {
    pub user_id:     i64,
    pub access_hash: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputPeerChat {
    pub chat_id: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputPeerChannel {
    pub channel_id:  i64,
    pub access_hash: i64,
}

// ─── Input media ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct InputPhoto {
    pub id:             i64,
    pub access_hash:    i64,
    pub file_reference: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputDocument {
    pub id:             i64,
    pub access_hash:    i64,
    pub file_reference: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputMediaPhoto {
    pub id:          InputPhoto,
    pub ttl_seconds: Option<i32>,
    pub spoiler:     bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputMediaDocument {
    pub id:          InputDocument,
    pub ttl_seconds: Option<i32>,
    pub query:       Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputMediaDocumentExternal {
    pub url:         String,
    pub ttl_seconds: Option<i32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputMediaDice {
    pub emoticon: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputGeoPoint {
    pub lat:             f64,
    pub long:            f64,
    pub accuracy_radius: Option<i32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputMediaGeoPoint {
    pub geo_point: InputGeoPoint,
}

// ─── Reply targets / shortcuts ────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct InputReplyToMessage {
    pub reply_to_msg_id: i32,
    pub top_msg_id:      Option<i32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputQuickReplyShortcutId {
    pub shortcut_id: i32,
}

// ─── Server updates ───────────────────────────────────────────────────────────

/// `updateMessageID` — joins an optimistic local message (by its random
/// correlation id) with the server-assigned message id.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateMessageId {
    pub id:        i32,
    pub random_id: i64,
}

/// Container of updates returned by a send request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Updates {
    pub updates: Vec<crate::enums::Update>,
}
