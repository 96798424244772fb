//! In-memory conversation storage: history items, the random-id registry,
//! per-conversation send slots and change notifications.
//!
//! The random-id registry is the join key between an optimistic local
//! insert and the eventual server acknowledgement. It is owned here — an
//! explicit object with a defined lifecycle ([`Storage::clear`] on session
//! teardown) — never a hidden global.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::media::{Document, FileReference, MessageMedia, Photo};
use crate::message::{FullMsgId, MessageFlags, MsgId, PeerId, ReplyTo, TextWithEntities};
use crate::peers::Peer;

/// First id handed out for locally rendered (not yet acknowledged)
/// messages. Server ids are far below this, so the ranges never collide.
pub const FIRST_LOCAL_ID: MsgId = 0x4000_0000;

// ─── History items ────────────────────────────────────────────────────────────

/// Delivery state of a history item, as rendered by the UI.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SendState {
    /// Optimistically rendered; the request is still in flight.
    #[default]
    Pending,
    /// Acknowledged by the server.
    Sent,
    /// Terminal send failure; the item stays visible with a retry affordance.
    Failed(String),
}

/// Inline keyboard attached to a message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplyMarkup {
    pub rows: Vec<Vec<String>>,
}

/// A locally rendered message.
///
/// Edits mutate the item in place (see [`Edition`]) instead of replacing
/// it, so view/forward/reaction counters survive a media swap.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryItem {
    pub id:             MsgId,
    pub flags:          MessageFlags,
    /// Sender id; zero when posting as the channel itself.
    pub from:           PeerId,
    pub reply_to:       Option<ReplyTo>,
    pub date:           i32,
    pub shortcut_id:    Option<i32>,
    pub post_author:    Option<String>,
    pub grouped_id:     Option<u64>,
    pub media:          Option<MessageMedia>,
    pub caption:        TextWithEntities,
    pub state:          SendState,
    pub views:          Option<i32>,
    pub forwards:       Option<i32>,
    pub reactions:      Vec<(String, i32)>,
    pub reply_markup:   Option<ReplyMarkup>,
    pub replies:        Vec<MsgId>,
    pub edit_date:      Option<i32>,
    pub previous_media: Option<MessageMedia>,
}

/// Construction parameters for a new local message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewMessageDescriptor {
    pub id:          MsgId,
    pub flags:       MessageFlags,
    pub from:        PeerId,
    pub reply_to:    Option<ReplyTo>,
    pub date:        i32,
    pub shortcut_id: Option<i32>,
    pub post_author: Option<String>,
    pub grouped_id:  Option<u64>,
}

/// In-place mutation descriptor for replacing a message's media and
/// caption without touching its identity or counters.
#[derive(Clone, Debug, PartialEq)]
pub struct Edition {
    pub hide_edit_badge:     bool,
    pub edit_date:           i32,
    pub media:               Option<MessageMedia>,
    pub caption:             TextWithEntities,
    pub use_same_views:      bool,
    pub use_same_forwards:   bool,
    pub use_same_markup:     bool,
    pub use_same_replies:    bool,
    pub use_same_reactions:  bool,
    pub save_previous_media: bool,
}

impl HistoryItem {
    fn from_descriptor(
        descriptor: NewMessageDescriptor,
        media:      Option<MessageMedia>,
        caption:    TextWithEntities,
    ) -> Self {
        Self {
            id:             descriptor.id,
            flags:          descriptor.flags,
            from:           descriptor.from,
            reply_to:       descriptor.reply_to,
            date:           descriptor.date,
            shortcut_id:    descriptor.shortcut_id,
            post_author:    descriptor.post_author,
            grouped_id:     descriptor.grouped_id,
            media,
            caption,
            state:          SendState::Pending,
            views:          None,
            forwards:       None,
            reactions:      Vec::new(),
            reply_markup:   None,
            replies:        Vec::new(),
            edit_date:      None,
            previous_media: None,
        }
    }

    /// Apply an edition patch in place.
    pub fn apply_edition(&mut self, edition: Edition) {
        if edition.save_previous_media {
            self.previous_media = self.media.take();
        }
        self.media = edition.media;
        self.caption = edition.caption;
        if !edition.use_same_views {
            self.views = None;
        }
        if !edition.use_same_forwards {
            self.forwards = None;
        }
        if !edition.use_same_markup {
            self.reply_markup = None;
        }
        if !edition.use_same_replies {
            self.replies.clear();
        }
        if !edition.use_same_reactions {
            self.reactions.clear();
        }
        if edition.hide_edit_badge {
            self.flags |= MessageFlags::HIDE_EDITED;
        } else if edition.edit_date != 0 {
            self.edit_date = Some(edition.edit_date);
        }
    }
}

// ─── History ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct History {
    messages:        BTreeMap<MsgId, HistoryItem>,
    /// Topic-root remapping: a reply pointing at a generic topic root may
    /// need redirecting to the conversation's actual root.
    topic_redirects: HashMap<MsgId, MsgId>,
    /// Keyed by topic root id; `0` is the main thread.
    local_drafts:    HashMap<MsgId, String>,
    cloud_drafts:    HashMap<MsgId, String>,
    forward_draft:   Vec<FullMsgId>,
}

// ─── Change notifications ─────────────────────────────────────────────────────

/// Session-level history notifications fanned out to subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryUpdate {
    MessageSent { peer: PeerId },
    ScheduledSent { peer: PeerId },
    ForwardsFinished { peer: PeerId },
}

#[derive(Default)]
struct Changes {
    senders: Mutex<Vec<mpsc::UnboundedSender<HistoryUpdate>>>,
}

impl Changes {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<HistoryUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().push(tx);
        rx
    }

    fn notify(&self, update: HistoryUpdate) {
        self.senders
            .lock()
            .unwrap()
            .retain(|tx| tx.send(update.clone()).is_ok());
    }
}

// ─── Send slots ───────────────────────────────────────────────────────────────

/// Per-conversation request slot: at most one tracked low-level request
/// per conversation, for ordering and replacement purposes.
#[derive(Debug, Default)]
pub struct SendSlot {
    pub last_request_id: u64,
}

/// Hand-off record for the upload subsystem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedUpload {
    pub id:      FullMsgId,
    pub task_id: u64,
}

// ─── Storage ──────────────────────────────────────────────────────────────────

/// Owns all conversation-local state the pipeline mutates.
///
/// Interior mutability with short-lived `std::sync::Mutex` guards; no lock
/// is ever held across an await point.
#[derive(Default)]
pub struct Storage {
    histories:       Mutex<HashMap<PeerId, History>>,
    peers:           Mutex<HashMap<PeerId, Peer>>,
    photos:          Mutex<HashMap<i64, Photo>>,
    documents:       Mutex<HashMap<i64, Document>>,
    random_ids:      Mutex<HashMap<i64, FullMsgId>>,
    next_local_id:   AtomicI32,
    sticker_recency: Mutex<HashMap<i64, u32>>,
    uploads:         Mutex<Vec<QueuedUpload>>,
    send_slots:      Mutex<HashMap<PeerId, Arc<tokio::sync::Mutex<SendSlot>>>>,
    changes:         Changes,
}

impl Storage {
    pub fn new() -> Self {
        Self {
            next_local_id: AtomicI32::new(FIRST_LOCAL_ID),
            ..Default::default()
        }
    }

    // ── Peers ──────────────────────────────────────────────────────────

    pub fn add_peer(&self, peer: Peer) {
        self.peers.lock().unwrap().insert(peer.id, peer);
    }

    pub fn peer(&self, id: PeerId) -> Option<Peer> {
        self.peers.lock().unwrap().get(&id).cloned()
    }

    /// Access hash of a locally known user, if any.
    pub fn user_access_hash(&self, user_id: i64) -> Option<i64> {
        self.peers
            .lock()
            .unwrap()
            .get(&user_id)
            .filter(|p| matches!(p.kind, crate::peers::PeerKind::User))
            .map(|p| p.access_hash)
    }

    // ── Media ──────────────────────────────────────────────────────────

    pub fn add_photo(&self, photo: Photo) {
        self.photos.lock().unwrap().insert(photo.id, photo);
    }

    pub fn photo(&self, id: i64) -> Option<Photo> {
        self.photos.lock().unwrap().get(&id).cloned()
    }

    pub fn update_photo_reference(&self, id: i64, reference: FileReference) {
        if let Some(photo) = self.photos.lock().unwrap().get_mut(&id) {
            photo.file_reference = reference;
        }
    }

    pub fn add_document(&self, document: Document) {
        self.documents.lock().unwrap().insert(document.id, document);
    }

    pub fn document(&self, id: i64) -> Option<Document> {
        self.documents.lock().unwrap().get(&id).cloned()
    }

    pub fn update_document_reference(&self, id: i64, reference: FileReference) {
        if let Some(document) = self.documents.lock().unwrap().get_mut(&id) {
            document.file_reference = reference;
        }
    }

    /// Bump the recent-usage counter of a sticker.
    pub fn increment_sticker(&self, document_id: i64) {
        *self.sticker_recency.lock().unwrap().entry(document_id).or_insert(0) += 1;
    }

    pub fn sticker_uses(&self, document_id: i64) -> u32 {
        self.sticker_recency.lock().unwrap().get(&document_id).copied().unwrap_or(0)
    }

    // ── Local message ids ──────────────────────────────────────────────

    /// Allocate the next process-local message id.
    pub fn next_local_message_id(&self) -> MsgId {
        self.next_local_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register the random correlation id of an outgoing message.
    ///
    /// Panics if the id is already outstanding — reuse indicates an
    /// internal bookkeeping bug, not an environmental condition.
    pub fn register_message_random_id(&self, random_id: i64, id: FullMsgId) {
        let previous = self.random_ids.lock().unwrap().insert(random_id, id);
        assert!(previous.is_none(), "random id {random_id} reused while outstanding");
    }

    /// Resolve and remove an outstanding random id.
    pub fn take_message_random_id(&self, random_id: i64) -> Option<FullMsgId> {
        self.random_ids.lock().unwrap().remove(&random_id)
    }

    pub fn outstanding_random_ids(&self) -> usize {
        self.random_ids.lock().unwrap().len()
    }

    // ── History items ──────────────────────────────────────────────────

    /// Insert an optimistic local message into its conversation.
    pub fn add_new_local_message(
        &self,
        peer:       PeerId,
        descriptor: NewMessageDescriptor,
        media:      Option<MessageMedia>,
        caption:    TextWithEntities,
    ) {
        let item = HistoryItem::from_descriptor(descriptor, media, caption);
        self.histories
            .lock()
            .unwrap()
            .entry(peer)
            .or_default()
            .messages
            .insert(item.id, item);
    }

    /// Run `f` against the message, if it exists.
    pub fn with_message<R>(
        &self,
        id: FullMsgId,
        f:  impl FnOnce(&mut HistoryItem) -> R,
    ) -> Option<R> {
        self.histories
            .lock()
            .unwrap()
            .get_mut(&id.peer)
            .and_then(|history| history.messages.get_mut(&id.msg))
            .map(f)
    }

    pub fn message(&self, id: FullMsgId) -> Option<HistoryItem> {
        self.with_message(id, |item| item.clone())
    }

    /// Apply an edition patch to an existing message.
    pub fn apply_edition(&self, id: FullMsgId, edition: Edition) -> bool {
        self.with_message(id, |item| item.apply_edition(edition)).is_some()
    }

    /// Reconcile an optimistic message with its server acknowledgement:
    /// re-key it to the server-assigned id and mark it sent.
    pub fn process_sent_message(&self, random_id: i64, server_id: MsgId) -> Option<FullMsgId> {
        let local = self.take_message_random_id(random_id)?;
        let mut histories = self.histories.lock().unwrap();
        let history = histories.get_mut(&local.peer)?;
        let mut item = history.messages.remove(&local.msg)?;
        item.id = server_id;
        item.state = SendState::Sent;
        item.flags.remove(MessageFlags::BEING_SENT);
        history.messages.insert(server_id, item);
        Some(FullMsgId { peer: local.peer, msg: server_id })
    }

    /// Surface a terminal send failure on the optimistic message.
    pub fn send_message_fail(&self, error: &dyn std::fmt::Display, random_id: i64, id: FullMsgId) {
        self.take_message_random_id(random_id);
        let marked = self.with_message(id, |item| {
            item.state = SendState::Failed(error.to_string());
        });
        if marked.is_none() {
            tracing::warn!("[storage] send failure for unknown message {id:?}: {error}");
        }
    }

    // ── Topic redirection ──────────────────────────────────────────────

    pub fn set_topic_redirect(&self, peer: PeerId, from: MsgId, to: MsgId) {
        self.histories
            .lock()
            .unwrap()
            .entry(peer)
            .or_default()
            .topic_redirects
            .insert(from, to);
    }

    /// Remap both ids of a reply target through the conversation's topic
    /// redirects: the replied-to message and the topic root it lives under.
    pub fn convert_topic_reply(&self, peer: PeerId, mut reply: ReplyTo) -> ReplyTo {
        reply.message_id = self.convert_topic_reply_to_id(peer, reply.message_id);
        reply.topic_root_id = reply
            .topic_root_id
            .map(|root| self.convert_topic_reply_to_id(peer, root));
        reply
    }

    /// Remap a reply target pointing at a generic topic root to the
    /// conversation's actual root. Ids without a redirect pass through.
    pub fn convert_topic_reply_to_id(&self, peer: PeerId, id: MsgId) -> MsgId {
        self.histories
            .lock()
            .unwrap()
            .get(&peer)
            .and_then(|history| history.topic_redirects.get(&id).copied())
            .unwrap_or(id)
    }

    // ── Drafts / forwarding ────────────────────────────────────────────

    pub fn set_local_draft(&self, peer: PeerId, topic_root: MsgId, draft: impl Into<String>) {
        self.histories
            .lock()
            .unwrap()
            .entry(peer)
            .or_default()
            .local_drafts
            .insert(topic_root, draft.into());
    }

    pub fn set_cloud_draft(&self, peer: PeerId, topic_root: MsgId, draft: impl Into<String>) {
        self.histories
            .lock()
            .unwrap()
            .entry(peer)
            .or_default()
            .cloud_drafts
            .insert(topic_root, draft.into());
    }

    pub fn local_draft(&self, peer: PeerId, topic_root: MsgId) -> Option<String> {
        self.histories
            .lock()
            .unwrap()
            .get(&peer)
            .and_then(|h| h.local_drafts.get(&topic_root).cloned())
    }

    pub fn cloud_draft(&self, peer: PeerId, topic_root: MsgId) -> Option<String> {
        self.histories
            .lock()
            .unwrap()
            .get(&peer)
            .and_then(|h| h.cloud_drafts.get(&topic_root).cloned())
    }

    pub fn clear_local_draft(&self, peer: PeerId, topic_root: MsgId) {
        if let Some(history) = self.histories.lock().unwrap().get_mut(&peer) {
            history.local_drafts.remove(&topic_root);
        }
    }

    pub fn clear_cloud_draft(&self, peer: PeerId, topic_root: MsgId) {
        if let Some(history) = self.histories.lock().unwrap().get_mut(&peer) {
            history.cloud_drafts.remove(&topic_root);
        }
    }

    pub fn set_forward_draft(&self, peer: PeerId, items: Vec<FullMsgId>) {
        self.histories
            .lock()
            .unwrap()
            .entry(peer)
            .or_default()
            .forward_draft = items;
    }

    pub fn take_forward_draft(&self, peer: PeerId) -> Vec<FullMsgId> {
        self.histories
            .lock()
            .unwrap()
            .get_mut(&peer)
            .map(|h| std::mem::take(&mut h.forward_draft))
            .unwrap_or_default()
    }

    // ── Uploads ────────────────────────────────────────────────────────

    /// Hand a confirmed file over to the upload subsystem.
    pub fn queue_upload(&self, id: FullMsgId, task_id: u64) {
        self.uploads.lock().unwrap().push(QueuedUpload { id, task_id });
    }

    pub fn queued_uploads(&self) -> Vec<QueuedUpload> {
        self.uploads.lock().unwrap().clone()
    }

    // ── Send slots / changes ───────────────────────────────────────────

    /// The conversation's request slot; created on first use.
    pub fn send_slot(&self, peer: PeerId) -> Arc<tokio::sync::Mutex<SendSlot>> {
        self.send_slots
            .lock()
            .unwrap()
            .entry(peer)
            .or_default()
            .clone()
    }

    pub fn subscribe_changes(&self) -> mpsc::UnboundedReceiver<HistoryUpdate> {
        self.changes.subscribe()
    }

    pub fn history_updated(&self, update: HistoryUpdate) {
        self.changes.notify(update);
    }

    /// Drop all transient send state. Called when the owning session
    /// tears down; outstanding random ids do not survive it.
    pub fn clear(&self) {
        self.random_ids.lock().unwrap().clear();
        self.send_slots.lock().unwrap().clear();
        self.uploads.lock().unwrap().clear();
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RpcError;

    fn item_at(storage: &Storage, peer: PeerId, msg: MsgId) -> HistoryItem {
        storage.message(FullMsgId { peer, msg }).expect("message exists")
    }

    #[test]
    fn local_ids_are_monotonic_and_out_of_server_range() {
        let storage = Storage::new();
        let a = storage.next_local_message_id();
        let b = storage.next_local_message_id();
        assert!(a >= FIRST_LOCAL_ID);
        assert!(b > a);
    }

    #[test]
    #[should_panic(expected = "reused while outstanding")]
    fn random_id_reuse_is_fatal() {
        let storage = Storage::new();
        let id = FullMsgId { peer: 1, msg: FIRST_LOCAL_ID };
        storage.register_message_random_id(42, id);
        storage.register_message_random_id(42, id);
    }

    #[test]
    fn random_id_can_be_reused_after_resolution() {
        let storage = Storage::new();
        let id = FullMsgId { peer: 1, msg: FIRST_LOCAL_ID };
        storage.register_message_random_id(42, id);
        assert_eq!(storage.take_message_random_id(42), Some(id));
        storage.register_message_random_id(42, id);
        assert_eq!(storage.outstanding_random_ids(), 1);
    }

    #[test]
    fn sent_message_is_rekeyed_to_server_id() {
        let storage = Storage::new();
        let local = storage.next_local_message_id();
        let full = FullMsgId { peer: 7, msg: local };
        storage.register_message_random_id(99, full);
        storage.add_new_local_message(
            7,
            NewMessageDescriptor { id: local, ..Default::default() },
            None,
            TextWithEntities::plain("hi"),
        );

        let sent = storage.process_sent_message(99, 1234).expect("reconciled");
        assert_eq!(sent.msg, 1234);
        assert!(storage.message(full).is_none());
        let item = item_at(&storage, 7, 1234);
        assert_eq!(item.state, SendState::Sent);
        assert!(!item.flags.contains(MessageFlags::BEING_SENT));
        assert_eq!(storage.outstanding_random_ids(), 0);
    }

    #[test]
    fn failed_message_stays_visible() {
        let storage = Storage::new();
        let local = storage.next_local_message_id();
        let full = FullMsgId { peer: 7, msg: local };
        storage.register_message_random_id(99, full);
        storage.add_new_local_message(
            7,
            NewMessageDescriptor { id: local, ..Default::default() },
            None,
            TextWithEntities::plain("hi"),
        );

        let error = RpcError::from_server(400, "PEER_ID_INVALID");
        storage.send_message_fail(&error, 99, full);
        let item = item_at(&storage, 7, local);
        assert!(matches!(item.state, SendState::Failed(_)));
        assert_eq!(storage.outstanding_random_ids(), 0);
    }

    #[test]
    fn edition_preserves_counters_and_swaps_media() {
        let storage = Storage::new();
        let full = FullMsgId { peer: 7, msg: 10 };
        storage.add_new_local_message(
            7,
            NewMessageDescriptor { id: 10, ..Default::default() },
            Some(MessageMedia::Photo { photo: 1, spoiler: false }),
            TextWithEntities::plain("before"),
        );
        storage.with_message(full, |item| {
            item.views = Some(250);
            item.forwards = Some(3);
            item.reactions = vec![("👍".into(), 7)];
        });

        let applied = storage.apply_edition(full, Edition {
            hide_edit_badge:     true,
            edit_date:           0,
            media:               Some(MessageMedia::Photo { photo: 2, spoiler: true }),
            caption:             TextWithEntities::plain("after"),
            use_same_views:      true,
            use_same_forwards:   true,
            use_same_markup:     true,
            use_same_replies:    true,
            use_same_reactions:  true,
            save_previous_media: true,
        });
        assert!(applied);

        let item = item_at(&storage, 7, 10);
        assert_eq!(item.caption.text, "after");
        assert_eq!(item.media, Some(MessageMedia::Photo { photo: 2, spoiler: true }));
        assert_eq!(item.previous_media, Some(MessageMedia::Photo { photo: 1, spoiler: false }));
        assert_eq!(item.views, Some(250));
        assert_eq!(item.forwards, Some(3));
        assert_eq!(item.reactions, vec![("👍".to_string(), 7)]);
        assert!(item.flags.contains(MessageFlags::HIDE_EDITED));
        assert_eq!(item.edit_date, None);
    }

    #[test]
    fn topic_redirects_pass_unknown_ids_through() {
        let storage = Storage::new();
        storage.set_topic_redirect(7, 100, 5);
        assert_eq!(storage.convert_topic_reply_to_id(7, 100), 5);
        assert_eq!(storage.convert_topic_reply_to_id(7, 101), 101);
        assert_eq!(storage.convert_topic_reply_to_id(8, 100), 100);
    }

    #[test]
    fn reply_conversion_remaps_target_and_topic_root() {
        let storage = Storage::new();
        storage.set_topic_redirect(7, 100, 5);

        let reply = ReplyTo { message_id: 100, topic_root_id: Some(100) };
        let converted = storage.convert_topic_reply(7, reply);
        assert_eq!(converted.message_id, 5);
        assert_eq!(converted.topic_root_id, Some(5));

        let plain = ReplyTo { message_id: 101, topic_root_id: None };
        assert_eq!(storage.convert_topic_reply(7, plain), plain);
    }

    #[test]
    fn change_subscribers_receive_notifications() {
        let storage = Storage::new();
        let mut rx = storage.subscribe_changes();
        storage.history_updated(HistoryUpdate::MessageSent { peer: 7 });
        assert_eq!(rx.try_recv().unwrap(), HistoryUpdate::MessageSent { peer: 7 });
    }
}
