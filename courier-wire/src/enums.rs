//! Boxed types as `enum`s over their concrete constructors.

use crate::types;

/// A formatting annotation over a span of message text.
///
/// The server infers `Mention` / `Hashtag` / `Url` / … from the text itself,
/// so clients only *send* the styling subset; the rest appears in received
/// messages. Decoding is an exhaustive match with an explicit drop arm for
/// kinds the client does not model (phones, bank cards).
#[derive(Clone, Debug, PartialEq)]
pub enum MessageEntity {
    Unknown(types::MessageEntityUnknown),
    Mention(types::MessageEntityMention),
    Hashtag(types::MessageEntityHashtag),
    BotCommand(types::MessageEntityBotCommand),
    Url(types::MessageEntityUrl),
    Email(types::MessageEntityEmail),
    Bold(types::MessageEntityBold),
    Italic(types::MessageEntityItalic),
    Code(types::MessageEntityCode),
    Pre(types::MessageEntityPre),
    TextUrl(types::MessageEntityTextUrl),
    MentionName(types::MessageEntityMentionName),
    InputMentionName(types::InputMessageEntityMentionName),
    Phone(types::MessageEntityPhone),
    Cashtag(types::MessageEntityCashtag),
    Underline(types::MessageEntityUnderline),
    Strike(types::MessageEntityStrike),
    BankCard(types::MessageEntityBankCard),
    Spoiler(types::MessageEntitySpoiler),
    CustomEmoji(types::MessageEntityCustomEmoji),
    Blockquote(types::MessageEntityBlockquote),
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputUser {
    Empty,
    UserSelf,
    User(types::InputUser),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum InputPeer {
    #[default]
    Empty,
    PeerSelf,
    User(types::InputPeerUser),
    Chat(types::InputPeerChat),
    Channel(types::InputPeerChannel),
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputMedia {
    Photo(types::InputMediaPhoto),
    Document(types::InputMediaDocument),
    DocumentExternal(types::InputMediaDocumentExternal),
    Dice(types::InputMediaDice),
    GeoPoint(types::InputMediaGeoPoint),
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputReplyTo {
    Message(types::InputReplyToMessage),
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputQuickReplyShortcut {
    Id(types::InputQuickReplyShortcutId),
}

/// Updates the pipeline consumes through the generic apply path.
#[derive(Clone, Debug, PartialEq)]
pub enum Update {
    MessageId(types::UpdateMessageId),
}
