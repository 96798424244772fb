//! Conversation targets and their wire representation.

use courier_wire as wire;

use crate::message::PeerId;

/// What kind of conversation a [`Peer`] is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerKind {
    User,
    /// Small (legacy) group chat.
    Chat,
    /// Supergroup or broadcast channel.
    Channel {
        /// `true` for a megagroup, `false` for a broadcast channel.
        megagroup:  bool,
        /// Broadcast channels may append the author's signature to posts.
        signatures: bool,
    },
}

/// A resolved conversation target.
///
/// Read-only from the pipeline's perspective; the only conversation state
/// the pipeline mutates lives in [`crate::storage::Storage`].
#[derive(Clone, Debug, PartialEq)]
pub struct Peer {
    pub id:           PeerId,
    pub access_hash:  i64,
    pub kind:         PeerKind,
    /// Posting on behalf of the channel/group identity rather than the user.
    pub am_anonymous: bool,
    /// Notify setting: posts to this peer default to silent.
    pub silent_posts: bool,
}

impl Peer {
    pub fn user(id: PeerId, access_hash: i64) -> Self {
        Self { id, access_hash, kind: PeerKind::User, am_anonymous: false, silent_posts: false }
    }

    pub fn chat(id: PeerId) -> Self {
        Self { id, access_hash: 0, kind: PeerKind::Chat, am_anonymous: false, silent_posts: false }
    }

    pub fn channel(id: PeerId, access_hash: i64, megagroup: bool) -> Self {
        Self {
            id,
            access_hash,
            kind: PeerKind::Channel { megagroup, signatures: false },
            am_anonymous: false,
            silent_posts: false,
        }
    }

    pub fn is_channel(&self) -> bool {
        matches!(self.kind, PeerKind::Channel { .. })
    }

    pub fn is_megagroup(&self) -> bool {
        matches!(self.kind, PeerKind::Channel { megagroup: true, .. })
    }

    pub fn is_broadcast(&self) -> bool {
        matches!(self.kind, PeerKind::Channel { megagroup: false, .. })
    }

    /// Whether posts in this channel carry the author's signature.
    pub fn adds_signature(&self) -> bool {
        matches!(self.kind, PeerKind::Channel { megagroup: false, signatures: true })
    }

    /// Wire representation carrying the access hash.
    pub fn input(&self) -> wire::enums::InputPeer {
        match self.kind {
            PeerKind::User => wire::enums::InputPeer::User(wire::types::InputPeerUser {
                user_id:     self.id,
                access_hash: self.access_hash,
            }),
            PeerKind::Chat => wire::enums::InputPeer::Chat(wire::types::InputPeerChat {
                chat_id: self.id,
            }),
            PeerKind::Channel { .. } => {
                wire::enums::InputPeer::Channel(wire::types::InputPeerChannel {
                    channel_id:  self.id,
                    access_hash: self.access_hash,
                })
            }
        }
    }
}
