//! Entity codec: wire formatting annotations ↔ in-memory annotation list.
//!
//! Offsets and lengths are UTF-16 code units throughout (server contract).
//! Decoding drops kinds the client does not model (phones, bank cards) as
//! a deliberate policy, not an error. Encoding under
//! [`ConvertOption::SkipLocal`] keeps only the subset that is meaningful
//! server-side; mentions, hashtags and the like are inferred by the server
//! from the text itself.

use courier_wire as wire;
use wire::enums::MessageEntity;

// ─── Annotation model ─────────────────────────────────────────────────────────

/// Kind of an in-memory formatting annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityType {
    Mention,
    Hashtag,
    BotCommand,
    Url,
    Email,
    Bold,
    Italic,
    Code,
    Pre,
    CustomUrl,
    MentionName,
    Cashtag,
    Underline,
    StrikeOut,
    Spoiler,
    CustomEmoji,
    Blockquote,
}

/// A single annotation over a span of text.
///
/// `data` carries the auxiliary payload: the language for `Pre`, the url
/// for `CustomUrl`, and the serialized user reference for `MentionName` /
/// the serialized document id for `CustomEmoji`. The serialized forms are
/// persisted by draft storage and must round-trip exactly.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityInText {
    pub kind:   EntityType,
    pub offset: i32,
    pub length: i32,
    pub data:   String,
}

impl EntityInText {
    pub fn new(kind: EntityType, offset: i32, length: i32) -> Self {
        Self { kind, offset, length, data: String::new() }
    }

    pub fn with_data(kind: EntityType, offset: i32, length: i32, data: impl Into<String>) -> Self {
        Self { kind, offset, length, data: data.into() }
    }
}

/// Encoding policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvertOption {
    /// Emit every annotation kind.
    WithLocal,
    /// Emit only the server-meaningful subset.
    SkipLocal,
}

// ─── Session lookup ───────────────────────────────────────────────────────────

/// Local identity context needed to resolve name mentions.
///
/// Decoding without one drops mention-by-id entities, mirroring contexts
/// (e.g. service previews) where no session is available.
pub trait UserLookup {
    fn self_user_id(&self) -> i64;
    fn self_access_hash(&self) -> i64;
    /// Access hash of a locally known user, if loaded.
    fn user_access_hash(&self, user_id: i64) -> Option<i64>;
}

// ─── Mention-name payload format ──────────────────────────────────────────────

/// Parsed fields of a serialized name mention.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MentionNameFields {
    pub self_id:     i64,
    pub user_id:     i64,
    pub access_hash: i64,
}

/// Serialize mention fields to the persisted `"user[.hash][:self]"` form.
///
/// This exact string is stored by drafts, so the format is frozen.
pub fn mention_name_data_from_fields(fields: MentionNameFields) -> String {
    let mut result = fields.user_id.to_string();
    if fields.access_hash != 0 {
        result.push('.');
        result.push_str(&fields.access_hash.to_string());
    }
    if fields.self_id != 0 {
        result.push(':');
        result.push_str(&fields.self_id.to_string());
    }
    result
}

/// Parse the persisted mention form back into its fields.
pub fn mention_name_data_to_fields(data: &str) -> Option<MentionNameFields> {
    let (head, self_id) = match data.split_once(':') {
        Some((head, tail)) => (head, tail.parse::<i64>().ok()?),
        None               => (data, 0),
    };
    let (user_id, access_hash) = match head.split_once('.') {
        Some((user, hash)) => (user.parse::<i64>().ok()?, hash.parse::<i64>().ok()?),
        None               => (head.parse::<i64>().ok()?, 0),
    };
    Some(MentionNameFields { self_id, user_id, access_hash })
}

/// Serialized custom-emoji payload: the decimal document id.
pub fn serialize_custom_emoji_id(document_id: i64) -> String {
    document_id.to_string()
}

pub fn parse_custom_emoji_data(data: &str) -> Option<i64> {
    match data.parse::<i64>() {
        Ok(id) if id != 0 => Some(id),
        _                 => None,
    }
}

// ─── Decoding ─────────────────────────────────────────────────────────────────

/// Convert a wire entity list into the in-memory annotation list.
pub fn entities_from_wire(
    session:  Option<&dyn UserLookup>,
    entities: &[MessageEntity],
) -> Vec<EntityInText> {
    let mut result = Vec::with_capacity(entities.len());
    for entity in entities {
        match entity {
            MessageEntity::Unknown(_) => {}
            MessageEntity::Mention(d) => {
                result.push(EntityInText::new(EntityType::Mention, d.offset, d.length));
            }
            MessageEntity::Hashtag(d) => {
                result.push(EntityInText::new(EntityType::Hashtag, d.offset, d.length));
            }
            MessageEntity::BotCommand(d) => {
                result.push(EntityInText::new(EntityType::BotCommand, d.offset, d.length));
            }
            MessageEntity::Url(d) => {
                result.push(EntityInText::new(EntityType::Url, d.offset, d.length));
            }
            MessageEntity::Email(d) => {
                result.push(EntityInText::new(EntityType::Email, d.offset, d.length));
            }
            MessageEntity::Bold(d) => {
                result.push(EntityInText::new(EntityType::Bold, d.offset, d.length));
            }
            MessageEntity::Italic(d) => {
                result.push(EntityInText::new(EntityType::Italic, d.offset, d.length));
            }
            MessageEntity::Code(d) => {
                result.push(EntityInText::new(EntityType::Code, d.offset, d.length));
            }
            MessageEntity::Pre(d) => {
                result.push(EntityInText::with_data(
                    EntityType::Pre,
                    d.offset,
                    d.length,
                    d.language.clone(),
                ));
            }
            MessageEntity::TextUrl(d) => {
                result.push(EntityInText::with_data(
                    EntityType::CustomUrl,
                    d.offset,
                    d.length,
                    d.url.clone(),
                ));
            }
            MessageEntity::MentionName(d) => {
                let Some(session) = session else { continue };
                let data = mention_name_data_from_fields(MentionNameFields {
                    self_id:     session.self_user_id(),
                    user_id:     d.user_id,
                    access_hash: session.user_access_hash(d.user_id).unwrap_or(0),
                });
                result.push(EntityInText::with_data(
                    EntityType::MentionName,
                    d.offset,
                    d.length,
                    data,
                ));
            }
            MessageEntity::InputMentionName(d) => {
                let Some(session) = session else { continue };
                let fields = match &d.user_id {
                    wire::enums::InputUser::UserSelf => Some(MentionNameFields {
                        self_id:     session.self_user_id(),
                        user_id:     session.self_user_id(),
                        access_hash: session.self_access_hash(),
                    }),
                    wire::enums::InputUser::User(user) => Some(MentionNameFields {
                        self_id:     session.self_user_id(),
                        user_id:     user.user_id,
                        access_hash: user.access_hash,
                    }),
                    wire::enums::InputUser::Empty => None,
                };
                if let Some(fields) = fields {
                    result.push(EntityInText::with_data(
                        EntityType::MentionName,
                        d.offset,
                        d.length,
                        mention_name_data_from_fields(fields),
                    ));
                }
            }
            // Skipping phones.
            MessageEntity::Phone(_) => {}
            MessageEntity::Cashtag(d) => {
                result.push(EntityInText::new(EntityType::Cashtag, d.offset, d.length));
            }
            MessageEntity::Underline(d) => {
                result.push(EntityInText::new(EntityType::Underline, d.offset, d.length));
            }
            MessageEntity::Strike(d) => {
                result.push(EntityInText::new(EntityType::StrikeOut, d.offset, d.length));
            }
            // Skipping cards.
            MessageEntity::BankCard(_) => {}
            MessageEntity::Spoiler(d) => {
                result.push(EntityInText::new(EntityType::Spoiler, d.offset, d.length));
            }
            MessageEntity::CustomEmoji(d) => {
                result.push(EntityInText::with_data(
                    EntityType::CustomEmoji,
                    d.offset,
                    d.length,
                    serialize_custom_emoji_id(d.document_id),
                ));
            }
            MessageEntity::Blockquote(d) => {
                result.push(EntityInText::new(EntityType::Blockquote, d.offset, d.length));
            }
        }
    }
    result
}

// ─── Encoding ─────────────────────────────────────────────────────────────────

fn custom_emoji_entity(offset: i32, length: i32, data: &str) -> Option<MessageEntity> {
    let document_id = parse_custom_emoji_data(data)?;
    Some(MessageEntity::CustomEmoji(wire::types::MessageEntityCustomEmoji {
        offset,
        length,
        document_id,
    }))
}

fn mention_name_entity(
    session: Option<&dyn UserLookup>,
    offset:  i32,
    length:  i32,
    data:    &str,
) -> Option<MessageEntity> {
    let session = session?;
    let parsed = mention_name_data_to_fields(data)?;
    if parsed.user_id == 0 || parsed.self_id != session.self_user_id() {
        return None;
    }
    let user_id = if parsed.user_id == parsed.self_id {
        wire::enums::InputUser::UserSelf
    } else {
        wire::enums::InputUser::User(wire::types::InputUser {
            user_id:     parsed.user_id,
            access_hash: parsed.access_hash,
        })
    };
    Some(MessageEntity::InputMentionName(wire::types::InputMessageEntityMentionName {
        offset,
        length,
        user_id,
    }))
}

/// Resolve a `tg://user?id=N` url against the local identity.
fn custom_url_input_user(
    session: Option<&dyn UserLookup>,
    url:     &str,
) -> wire::enums::InputUser {
    const SCHEME: &str = "tg://user?";
    let trimmed = url.trim();
    if trimmed.len() < SCHEME.len() || !trimmed[..SCHEME.len()].eq_ignore_ascii_case(SCHEME) {
        return wire::enums::InputUser::Empty;
    }
    let id_param = trimmed[SCHEME.len()..]
        .split('&')
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.eq_ignore_ascii_case("id"))
        .map(|(_, value)| value);
    let Some(Ok(user_id)) = id_param.map(str::parse::<i64>) else {
        return wire::enums::InputUser::Empty;
    };
    let Some(session) = session else {
        return wire::enums::InputUser::Empty;
    };
    if user_id == session.self_user_id() {
        wire::enums::InputUser::UserSelf
    } else if let Some(access_hash) = session.user_access_hash(user_id) {
        wire::enums::InputUser::User(wire::types::InputUser { user_id, access_hash })
    } else {
        wire::enums::InputUser::Empty
    }
}

/// Convert the in-memory annotation list to wire entities.
///
/// Zero/negative-length annotations are never emitted. Custom urls in the
/// internal `tg://user?id=…` scheme re-encode as name mentions when the
/// target resolves locally; this substitution takes priority over the
/// literal text-url encoding.
pub fn entities_to_wire(
    session:  Option<&dyn UserLookup>,
    entities: &[EntityInText],
    option:   ConvertOption,
) -> Vec<MessageEntity> {
    let mut result = Vec::with_capacity(entities.len());
    for entity in entities {
        if entity.length <= 0 {
            continue;
        }
        if option == ConvertOption::SkipLocal
            && !matches!(
                entity.kind,
                EntityType::Bold
                    | EntityType::Italic
                    | EntityType::Underline
                    | EntityType::StrikeOut
                    | EntityType::Code
                    | EntityType::Pre
                    | EntityType::Blockquote
                    | EntityType::Spoiler
                    | EntityType::MentionName
                    | EntityType::CustomUrl
                    | EntityType::CustomEmoji
            )
        {
            continue;
        }

        let offset = entity.offset;
        let length = entity.length;
        match entity.kind {
            EntityType::Url => {
                result.push(MessageEntity::Url(wire::types::MessageEntityUrl { offset, length }));
            }
            EntityType::CustomUrl => {
                let input_user = custom_url_input_user(session, &entity.data);
                if input_user != wire::enums::InputUser::Empty {
                    result.push(MessageEntity::InputMentionName(
                        wire::types::InputMessageEntityMentionName {
                            offset,
                            length,
                            user_id: input_user,
                        },
                    ));
                } else {
                    result.push(MessageEntity::TextUrl(wire::types::MessageEntityTextUrl {
                        offset,
                        length,
                        url: entity.data.clone(),
                    }));
                }
            }
            EntityType::Email => {
                result.push(MessageEntity::Email(wire::types::MessageEntityEmail { offset, length }));
            }
            EntityType::Hashtag => {
                result.push(MessageEntity::Hashtag(wire::types::MessageEntityHashtag {
                    offset,
                    length,
                }));
            }
            EntityType::Cashtag => {
                result.push(MessageEntity::Cashtag(wire::types::MessageEntityCashtag {
                    offset,
                    length,
                }));
            }
            EntityType::Mention => {
                result.push(MessageEntity::Mention(wire::types::MessageEntityMention {
                    offset,
                    length,
                }));
            }
            EntityType::MentionName => {
                if let Some(valid) = mention_name_entity(session, offset, length, &entity.data) {
                    result.push(valid);
                }
            }
            EntityType::BotCommand => {
                result.push(MessageEntity::BotCommand(wire::types::MessageEntityBotCommand {
                    offset,
                    length,
                }));
            }
            EntityType::Bold => {
                result.push(MessageEntity::Bold(wire::types::MessageEntityBold { offset, length }));
            }
            EntityType::Italic => {
                result.push(MessageEntity::Italic(wire::types::MessageEntityItalic {
                    offset,
                    length,
                }));
            }
            EntityType::Underline => {
                result.push(MessageEntity::Underline(wire::types::MessageEntityUnderline {
                    offset,
                    length,
                }));
            }
            EntityType::StrikeOut => {
                result.push(MessageEntity::Strike(wire::types::MessageEntityStrike {
                    offset,
                    length,
                }));
            }
            EntityType::Code => {
                result.push(MessageEntity::Code(wire::types::MessageEntityCode { offset, length }));
            }
            EntityType::Pre => {
                result.push(MessageEntity::Pre(wire::types::MessageEntityPre {
                    offset,
                    length,
                    language: entity.data.clone(),
                }));
            }
            EntityType::Blockquote => {
                result.push(MessageEntity::Blockquote(wire::types::MessageEntityBlockquote {
                    offset,
                    length,
                }));
            }
            EntityType::Spoiler => {
                result.push(MessageEntity::Spoiler(wire::types::MessageEntitySpoiler {
                    offset,
                    length,
                }));
            }
            EntityType::CustomEmoji => {
                if let Some(valid) = custom_emoji_entity(offset, length, &entity.data) {
                    result.push(valid);
                }
            }
        }
    }
    result
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSession;

    impl UserLookup for FakeSession {
        fn self_user_id(&self) -> i64 { 777 }
        fn self_access_hash(&self) -> i64 { 0xCAFE }
        fn user_access_hash(&self, user_id: i64) -> Option<i64> {
            (user_id == 12345).then_some(0xBEEF)
        }
    }

    fn styled(kind: EntityType) -> EntityInText {
        EntityInText::new(kind, 0, 4)
    }

    #[test]
    fn mention_data_round_trips() {
        let fields = MentionNameFields { self_id: 777, user_id: 12345, access_hash: 0xBEEF };
        let data = mention_name_data_from_fields(fields);
        assert_eq!(data, format!("12345.{}:777", 0xBEEF));
        assert_eq!(mention_name_data_to_fields(&data), Some(fields));

        // Fields that are zero are omitted from the serialized form.
        let bare = MentionNameFields { self_id: 0, user_id: 5, access_hash: 0 };
        let data = mention_name_data_from_fields(bare);
        assert_eq!(data, "5");
        assert_eq!(mention_name_data_to_fields(&data), Some(bare));
    }

    #[test]
    fn skip_local_round_trip_preserves_server_subset() {
        let all = vec![
            styled(EntityType::Bold),
            styled(EntityType::Italic),
            styled(EntityType::Underline),
            styled(EntityType::StrikeOut),
            styled(EntityType::Code),
            EntityInText::with_data(EntityType::Pre, 0, 4, "rust"),
            styled(EntityType::Blockquote),
            styled(EntityType::Spoiler),
            EntityInText::with_data(EntityType::CustomEmoji, 0, 2, "424242"),
            EntityInText::with_data(EntityType::CustomUrl, 0, 4, "https://example.com"),
            EntityInText::with_data(
                EntityType::MentionName,
                0,
                4,
                mention_name_data_from_fields(MentionNameFields {
                    self_id:     777,
                    user_id:     12345,
                    access_hash: 0xBEEF,
                }),
            ),
            // Local kinds: must vanish under SkipLocal.
            styled(EntityType::Mention),
            styled(EntityType::Hashtag),
            styled(EntityType::BotCommand),
            styled(EntityType::Url),
            styled(EntityType::Email),
            styled(EntityType::Cashtag),
        ];
        let session = FakeSession;
        let wire = entities_to_wire(Some(&session), &all, ConvertOption::SkipLocal);
        let back = entities_from_wire(Some(&session), &wire);

        assert_eq!(back.len(), 11);
        for (entity, original) in back.iter().zip(&all[..11]) {
            assert_eq!(entity.kind, original.kind);
            assert_eq!(entity.offset, original.offset);
            assert_eq!(entity.length, original.length);
        }
        // Idempotent drop: a second pass changes nothing.
        let again = entities_to_wire(Some(&session), &back, ConvertOption::SkipLocal);
        assert_eq!(again, wire);
    }

    #[test]
    fn zero_and_negative_lengths_are_never_emitted() {
        let input = vec![
            EntityInText::new(EntityType::Bold, 0, 0),
            EntityInText::new(EntityType::Italic, 3, -2),
            EntityInText::new(EntityType::Spoiler, 1, 1),
        ];
        let wire = entities_to_wire(None, &input, ConvertOption::WithLocal);
        assert_eq!(wire.len(), 1);
        assert!(matches!(wire[0], MessageEntity::Spoiler(_)));
    }

    #[test]
    fn custom_url_to_known_user_becomes_mention() {
        let entity =
            EntityInText::with_data(EntityType::CustomUrl, 2, 6, "tg://user?id=12345");
        let session = FakeSession;
        let encoded = entities_to_wire(Some(&session), &[entity], ConvertOption::SkipLocal);
        match &encoded[0] {
            MessageEntity::InputMentionName(d) => {
                assert_eq!(d.offset, 2);
                assert_eq!(d.length, 6);
                assert_eq!(
                    d.user_id,
                    wire::enums::InputUser::User(wire::types::InputUser {
                        user_id:     12345,
                        access_hash: 0xBEEF,
                    })
                );
            }
            other => panic!("expected mention, got {other:?}"),
        }
    }

    #[test]
    fn custom_url_to_self_uses_self_marker() {
        let entity = EntityInText::with_data(EntityType::CustomUrl, 0, 1, "TG://USER?id=777");
        let session = FakeSession;
        let encoded = entities_to_wire(Some(&session), &[entity], ConvertOption::SkipLocal);
        match &encoded[0] {
            MessageEntity::InputMentionName(d) => {
                assert_eq!(d.user_id, wire::enums::InputUser::UserSelf);
            }
            other => panic!("expected self mention, got {other:?}"),
        }
    }

    #[test]
    fn unresolvable_custom_url_stays_a_text_url() {
        let session = FakeSession;
        for url in ["tg://user?id=999", "tg://user?id=abc", "https://example.com"] {
            let entity = EntityInText::with_data(EntityType::CustomUrl, 0, 3, url);
            let wire = entities_to_wire(Some(&session), &[entity], ConvertOption::SkipLocal);
            match &wire[0] {
                MessageEntity::TextUrl(d) => assert_eq!(d.url, url),
                other => panic!("expected text url for {url}, got {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_payloads_are_dropped_not_emitted() {
        let input = vec![
            EntityInText::with_data(EntityType::CustomEmoji, 0, 2, "not-a-number"),
            EntityInText::with_data(EntityType::MentionName, 0, 2, "garbage"),
            // Mention serialized under a different self id must not leak.
            EntityInText::with_data(
                EntityType::MentionName,
                0,
                2,
                mention_name_data_from_fields(MentionNameFields {
                    self_id:     1,
                    user_id:     12345,
                    access_hash: 0xBEEF,
                }),
            ),
        ];
        let session = FakeSession;
        assert!(entities_to_wire(Some(&session), &input, ConvertOption::SkipLocal).is_empty());
    }

    #[test]
    fn decode_without_session_drops_name_mentions() {
        let wire_entities = vec![
            MessageEntity::MentionName(wire::types::MessageEntityMentionName {
                offset:  0,
                length:  2,
                user_id: 12345,
            }),
            MessageEntity::Bold(wire::types::MessageEntityBold { offset: 0, length: 2 }),
        ];
        let decoded = entities_from_wire(None, &wire_entities);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].kind, EntityType::Bold);
    }

    #[test]
    fn decode_drops_phone_and_bank_card() {
        let wire_entities = vec![
            MessageEntity::Phone(wire::types::MessageEntityPhone { offset: 0, length: 2 }),
            MessageEntity::BankCard(wire::types::MessageEntityBankCard { offset: 0, length: 2 }),
        ];
        assert!(entities_from_wire(Some(&FakeSession), &wire_entities).is_empty());
    }

    #[test]
    fn mention_decodes_with_serialized_identity() {
        let wire_entities = vec![MessageEntity::MentionName(
            wire::types::MessageEntityMentionName { offset: 1, length: 3, user_id: 12345 },
        )];
        let decoded = entities_from_wire(Some(&FakeSession), &wire_entities);
        assert_eq!(
            decoded[0].data,
            mention_name_data_from_fields(MentionNameFields {
                self_id:     777,
                user_id:     12345,
                access_hash: 0xBEEF,
            })
        );
    }
}
