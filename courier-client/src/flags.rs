//! Post-flag resolution.
//!
//! Every payload kind (existing media, external document, dice, confirmed
//! upload, location) must resolve its flags through the same functions —
//! the server enforces matching semantics, so divergence between entry
//! points is a correctness bug, not a style issue.

use crate::message::{MessageFlags, SendOptions};
use crate::peers::Peer;

/// Whether this send goes out without a notification sound.
///
/// Explicitly requested silence wins; otherwise broadcast channels honour
/// the per-peer "silent posts" notify setting.
pub fn should_send_silent(peer: &Peer, options: &SendOptions) -> bool {
    options.silent || (peer.is_broadcast() && peer.silent_posts)
}

/// Base flags of any freshly composed outgoing message.
pub fn new_message_flags(peer: &Peer) -> MessageFlags {
    let mut flags = MessageFlags::BEING_SENT;
    if !peer.am_anonymous {
        flags |= MessageFlags::OUTGOING;
    }
    flags
}

/// Resolve the post-related flag bits for a send to `peer`.
///
/// The cascade is ordered; the first matching branch decides:
/// 1. silence heuristics may set [`MessageFlags::SILENT`] regardless;
/// 2. a non-anonymous post (or an explicit send-as identity) is an
///    ordinary message — it carries a sender id and nothing else;
/// 3. an anonymous post in a megagroup gets no post flags at all;
/// 4. anything left is a channel post; scheduled posts stop here —
///    a not-yet-delivered post shows no view counter or author badge;
/// 5. delivered posts count views, and signing channels stamp the author.
pub fn fill_message_post_flags(options: &SendOptions, peer: &Peer, flags: &mut MessageFlags) {
    let anonymous_post = peer.am_anonymous;
    if should_send_silent(peer, options) {
        *flags |= MessageFlags::SILENT;
    }
    if !anonymous_post || options.send_as.is_some() {
        *flags |= MessageFlags::HAS_FROM_ID;
        return;
    } else if peer.is_megagroup() {
        return;
    }
    *flags |= MessageFlags::POST;
    if options.scheduled.is_some() {
        return;
    }
    *flags |= MessageFlags::HAS_VIEWS;
    if peer.adds_signature() {
        *flags |= MessageFlags::HAS_POST_AUTHOR;
    }
}
