//! Outbound message composition and dispatch pipeline.
//!
//! The crate turns a compose gesture into a `messages.sendMedia` call:
//! it resolves post flags, encodes formatting entities, inserts the
//! optimistic local message, dispatches over a [`Transport`], survives a
//! stale file reference with a single refresh-and-retry, and reconciles
//! the server acknowledgement back onto the local item.
//!
//! | module      | contents                                            |
//! |-------------|-----------------------------------------------------|
//! | `entities`  | wire ↔ in-memory formatting annotation codec        |
//! | `errors`    | RPC and invocation error types                      |
//! | `flags`     | post-flag resolution cascade                        |
//! | `media`     | photos, documents, dice, geo points                 |
//! | `message`   | send actions, options, captions, message flags      |
//! | `peers`     | conversation targets                                |
//! | `sending`   | dispatch pipeline entry points                      |
//! | `storage`   | histories, random-id registry, change notifications |
//! | `transport` | the network seam                                    |
//! | `upload`    | confirmed-upload dispatch (new message or edit)     |

#![deny(unsafe_code)]

pub mod entities;
pub mod errors;
pub mod flags;
pub mod media;
pub mod message;
pub mod peers;
pub mod sending;
pub mod storage;
pub mod transport;
pub mod upload;

pub use errors::{InvocationError, RpcError};
pub use message::{FullMsgId, MessageToSend, MsgId, PeerId, SendAction, SendOptions};
pub use sending::Sender;
pub use storage::Storage;
pub use transport::Transport;

use std::collections::HashMap;

// ─── Session identity ─────────────────────────────────────────────────────────

/// The authorized user this pipeline sends on behalf of.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionInfo {
    pub user_id:     i64,
    pub access_hash: i64,
    /// Display name, stamped as the post author in signing channels.
    pub name:        String,
}

// ─── Server app config ────────────────────────────────────────────────────────

/// Interactive-emoji allow-list used when the server config carries none.
const DEFAULT_DICE_EMOJI: [&str; 6] = ["🎲", "🎯", "🎰", "⚽", "⚽️", "🏀"];

/// Server-pushed application configuration, keyed dictionary of lists.
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    string_lists: HashMap<String, Vec<String>>,
}

impl AppConfig {
    pub fn set_string_list(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.string_lists.insert(key.into(), values);
    }

    pub fn get_strings(&self, key: &str) -> Option<&[String]> {
        self.string_lists.get(key).map(Vec::as_slice)
    }

    /// Emoji that dispatch as a server-rolled interactive dice.
    pub fn dice_emoji(&self) -> Vec<String> {
        match self.get_strings("emojies_send_dice") {
            Some(list) => list.to_vec(),
            None       => DEFAULT_DICE_EMOJI.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ─── Randomness ───────────────────────────────────────────────────────────────

/// Generate a random correlation id for an outgoing message.
pub fn random_i64() -> i64 {
    let mut buffer = [0u8; 8];
    getrandom::getrandom(&mut buffer).expect("getrandom");
    i64::from_le_bytes(buffer)
}
