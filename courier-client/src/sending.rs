//! Dispatch pipeline: compose gesture in, `messages.sendMedia` out.
//!
//! Every entry point follows the same shape: emit the typing-style
//! progress signal, allocate ids, register the random correlation id,
//! insert the optimistic local message, then dispatch. A stale file
//! reference (`FILE_REFERENCE_…`, code 400) earns exactly one refresh
//! and retry; if the server hands back the same reference, the failure
//! is terminal.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use courier_wire as wire;
use wire::functions::messages::{SendMedia, SendMediaFlags};

use crate::entities::{ConvertOption, UserLookup, entities_to_wire};
use crate::errors::InvocationError;
use crate::flags::{fill_message_post_flags, new_message_flags, should_send_silent};
use crate::media::{FileOrigin, FileReference, LocationPoint, MessageMedia};
use crate::message::{
    self, FullMsgId, MessageFlags, MessageToSend, PeerId, SendAction, TextWithEntities,
};
use crate::peers::Peer;
use crate::storage::{HistoryUpdate, NewMessageDescriptor, Storage};
use crate::transport::{SendProgress, Transport};
use crate::{AppConfig, SessionInfo};

// ─── Session lookup ───────────────────────────────────────────────────────────

/// [`UserLookup`] over the sender's identity plus storage-known users.
pub(crate) struct SessionLookup<'a> {
    session: &'a SessionInfo,
    storage: &'a Storage,
}

impl UserLookup for SessionLookup<'_> {
    fn self_user_id(&self) -> i64 {
        self.session.user_id
    }

    fn self_access_hash(&self) -> i64 {
        self.session.access_hash
    }

    fn user_access_hash(&self, user_id: i64) -> Option<i64> {
        self.storage.user_access_hash(user_id)
    }
}

// ─── Media payloads ───────────────────────────────────────────────────────────

/// A storage-resident media object referenced by a send. Its input form is
/// rebuilt from storage on every attempt so a refreshed file reference is
/// picked up by the retry.
enum RemoteMedia {
    Photo(i64),
    Document(i64),
    /// Sent by url; carries no file reference.
    WebDocument(i64),
}

impl RemoteMedia {
    fn origin(&self) -> FileOrigin {
        match self {
            Self::Photo(id)    => FileOrigin::Photo(*id),
            Self::Document(id) => FileOrigin::Document(*id),
            Self::WebDocument(_) => FileOrigin::None,
        }
    }

    /// Build the wire input and capture the file reference it embeds.
    fn input(&self, storage: &Storage) -> Result<(wire::enums::InputMedia, FileReference), InvocationError> {
        match self {
            Self::Photo(id) => {
                let photo = storage.photo(*id).ok_or(InvocationError::UnknownMedia(*id))?;
                Ok((photo.input_media(), photo.file_reference))
            }
            Self::Document(id) => {
                let document = storage.document(*id).ok_or(InvocationError::UnknownMedia(*id))?;
                let input = document.input_media();
                Ok((input, document.file_reference))
            }
            Self::WebDocument(id) => {
                let document = storage.document(*id).ok_or(InvocationError::UnknownMedia(*id))?;
                let input = document
                    .input_media_external()
                    .ok_or(InvocationError::UnknownMedia(*id))?;
                Ok((input, FileReference::new()))
            }
        }
    }

    fn store_fresh_reference(&self, storage: &Storage, reference: FileReference) {
        match self {
            Self::Photo(id)      => storage.update_photo_reference(*id, reference),
            Self::Document(id)   => storage.update_document_reference(*id, reference),
            Self::WebDocument(_) => {}
        }
    }
}

fn is_stale_reference(error: &InvocationError) -> bool {
    matches!(error, InvocationError::Rpc(rpc) if rpc.is_file_reference())
}

// ─── Sender ───────────────────────────────────────────────────────────────────

/// The dispatch pipeline, generic over its network seam.
pub struct Sender<T: Transport> {
    pub(crate) transport: T,
    pub(crate) storage:   Arc<Storage>,
    pub(crate) session:   SessionInfo,
    pub(crate) config:    AppConfig,
    next_request_id:      AtomicU64,
}

impl<T: Transport> Sender<T> {
    pub fn new(transport: T, storage: Arc<Storage>, session: SessionInfo, config: AppConfig) -> Self {
        Self {
            transport,
            storage,
            session,
            config,
            next_request_id: AtomicU64::new(0),
        }
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    pub(crate) fn lookup(&self) -> SessionLookup<'_> {
        SessionLookup { session: &self.session, storage: &self.storage }
    }

    // ── Entry points ───────────────────────────────────────────────────

    /// Send a previously uploaded photo, with an optional caption.
    pub async fn send_existing_photo(
        &self,
        message:  MessageToSend,
        photo_id: i64,
        forwarding: bool,
    ) -> Result<(), InvocationError> {
        self.send_media_message(
            message,
            MediaPayload::Remote(RemoteMedia::Photo(photo_id)),
            MessageMedia::Photo { photo: photo_id, spoiler: false },
            SendProgress::UploadingPhoto,
            SendMediaFlags::empty(),
            forwarding,
        )
        .await
    }

    /// Send a previously uploaded document, with an optional caption.
    ///
    /// Stickers additionally bump the local recency counter and ask the
    /// server to update sticker sets in the response.
    pub async fn send_existing_document(
        &self,
        message:     MessageToSend,
        document_id: i64,
        forwarding:  bool,
    ) -> Result<(), InvocationError> {
        let document = self
            .storage
            .document(document_id)
            .ok_or(InvocationError::UnknownMedia(document_id))?;
        let mut extra = SendMediaFlags::empty();
        if document.is_sticker {
            self.storage.increment_sticker(document_id);
            extra |= SendMediaFlags::UPDATE_STICKERSETS;
        }
        self.send_media_message(
            message,
            MediaPayload::Remote(RemoteMedia::Document(document_id)),
            MessageMedia::Document {
                document:    document_id,
                voice:       document.is_voice,
                ttl_seconds: None,
                spoiler:     false,
            },
            SendProgress::UploadingFile,
            extra,
            forwarding,
        )
        .await
    }

    /// Send an external (web) document by its url.
    pub async fn send_web_document(
        &self,
        message:     MessageToSend,
        document_id: i64,
        forwarding:  bool,
    ) -> Result<(), InvocationError> {
        self.send_media_message(
            message,
            MediaPayload::Remote(RemoteMedia::WebDocument(document_id)),
            MessageMedia::Document {
                document:    document_id,
                voice:       false,
                ttl_seconds: None,
                spoiler:     false,
            },
            SendProgress::UploadingFile,
            SendMediaFlags::empty(),
            forwarding,
        )
        .await
    }

    /// Dispatch an interactive dice if the composed text is exactly one
    /// allow-listed emoji (after trimming) with no formatting.
    ///
    /// Returns `Ok(false)` without touching any state when the text does
    /// not qualify; the caller falls back to a plain text send.
    pub async fn send_dice(
        &self,
        mut message: MessageToSend,
        forwarding:  bool,
    ) -> Result<bool, InvocationError> {
        message::trim(&mut message.text_with_entities);
        let emoticon = message.text_with_entities.text.clone();
        if !message.text_with_entities.entities.is_empty()
            || !self.config.dice_emoji().iter().any(|e| *e == emoticon)
        {
            return Ok(false);
        }
        message.text_with_entities = TextWithEntities::default();
        self.send_media_message(
            message,
            MediaPayload::Inline(wire::enums::InputMedia::Dice(wire::types::InputMediaDice {
                emoticon: emoticon.clone(),
            })),
            MessageMedia::Dice { value: 0, emoticon },
            SendProgress::ChoosingSticker,
            SendMediaFlags::empty(),
            forwarding,
        )
        .await?;
        Ok(true)
    }

    /// Send a geographic point.
    ///
    /// No optimistic local message is rendered for locations; the item
    /// appears when the server's updates deliver it.
    pub async fn send_location_point(
        &self,
        action: SendAction,
        point:  LocationPoint,
    ) -> Result<(), InvocationError> {
        let peer = self
            .storage
            .peer(action.peer)
            .ok_or(InvocationError::UnknownPeer(action.peer))?;

        self.transport.send_action(peer.id, SendProgress::ChoosingLocation);
        self.clear_drafts(peer.id, &action);

        let random_id = crate::random_i64();
        let request = self.base_request(
            &peer,
            &action,
            point.input_media(),
            String::new(),
            Vec::new(),
            random_id,
        );
        let updates = self.dispatch(&peer, request, None).await?;
        self.apply_updates(&updates);
        Ok(())
    }

    // ── Core pipeline ──────────────────────────────────────────────────

    async fn send_media_message(
        &self,
        mut message: MessageToSend,
        payload:     MediaPayload,
        local_media: MessageMedia,
        progress:    SendProgress,
        extra_flags: SendMediaFlags,
        forwarding:  bool,
    ) -> Result<(), InvocationError> {
        let mut action = message.action.clone();
        // Draft clearing belongs to the text box; a media send composed
        // alongside it leaves the draft alone. Locations are the one
        // payload sent *from* the draft and handle it themselves.
        action.clear_draft = false;
        let options = &action.options;
        let peer = self
            .storage
            .peer(action.peer)
            .ok_or(InvocationError::UnknownPeer(action.peer))?;

        self.transport.send_action(peer.id, progress);

        // Resolve the input media up front so an unknown object fails
        // before any local state is touched.
        let input_media = match &payload {
            MediaPayload::Remote(remote) => remote.input(&self.storage)?.0,
            MediaPayload::Inline(input)  => input.clone(),
        };

        let local_id = self.storage.next_local_message_id();
        let full_id = FullMsgId { peer: peer.id, msg: local_id };
        let random_id = crate::random_i64();
        self.storage.register_message_random_id(random_id, full_id);

        let mut flags = new_message_flags(&peer);
        if action.reply_to.is_some() {
            flags |= MessageFlags::HAS_REPLY_INFO;
        }
        fill_message_post_flags(options, &peer, &mut flags);
        if options.scheduled.is_some() {
            flags |= MessageFlags::IS_OR_WAS_SCHEDULED;
        }
        if options.shortcut_id.is_some() {
            flags |= MessageFlags::SHORTCUT_MESSAGE;
        }
        let from = if flags.contains(MessageFlags::HAS_FROM_ID) {
            options.send_as.unwrap_or(self.session.user_id)
        } else {
            0
        };
        // Stored for any channel post; HAS_POST_AUTHOR gates display.
        let post_author = peer.is_broadcast().then(|| self.session.name.clone());

        message::trim(&mut message.text_with_entities);
        let lookup = self.lookup();
        let entities = entities_to_wire(
            Some(&lookup),
            &message.text_with_entities.entities,
            ConvertOption::SkipLocal,
        );

        let reply_to = action
            .reply_to
            .map(|reply| self.storage.convert_topic_reply(peer.id, reply));
        self.storage.add_new_local_message(
            peer.id,
            NewMessageDescriptor {
                id: local_id,
                flags,
                from,
                reply_to,
                date: message::new_message_date(options),
                shortcut_id: options.shortcut_id,
                post_author,
                grouped_id: None,
            },
            Some(local_media),
            message.text_with_entities.clone(),
        );
        if !forwarding {
            self.finish_forwarding(peer.id);
        }

        let mut request = self.base_request(
            &peer,
            &action,
            input_media,
            message.text_with_entities.text,
            entities,
            random_id,
        );
        request.flags |= extra_flags;

        let retry = match &payload {
            MediaPayload::Remote(remote) => Some(remote),
            MediaPayload::Inline(_)      => None,
        };
        match self.dispatch(&peer, request, retry).await {
            Ok(updates) => {
                self.apply_updates(&updates);
                let update = if options.scheduled.is_some() {
                    HistoryUpdate::ScheduledSent { peer: peer.id }
                } else {
                    HistoryUpdate::MessageSent { peer: peer.id }
                };
                self.storage.history_updated(update);
                Ok(())
            }
            Err(error) => {
                tracing::warn!("[sending] send to {} failed: {error}", peer.id);
                self.storage.send_message_fail(&error, random_id, full_id);
                Err(error)
            }
        }
    }

    /// Build the `messages.sendMedia` request shared by every entry point.
    fn base_request(
        &self,
        peer:      &Peer,
        action:    &SendAction,
        media:     wire::enums::InputMedia,
        text:      String,
        entities:  Vec<wire::enums::MessageEntity>,
        random_id: i64,
    ) -> SendMedia {
        let options = &action.options;
        let mut flags = SendMediaFlags::empty();

        let reply_to = action.reply_to.map(|reply| {
            let reply = self.storage.convert_topic_reply(peer.id, reply);
            wire::enums::InputReplyTo::Message(wire::types::InputReplyToMessage {
                reply_to_msg_id: reply.message_id,
                top_msg_id:      reply.topic_root_id,
            })
        });
        if reply_to.is_some() {
            flags |= SendMediaFlags::REPLY_TO;
        }
        if !entities.is_empty() {
            flags |= SendMediaFlags::ENTITIES;
        }
        if should_send_silent(peer, options) {
            flags |= SendMediaFlags::SILENT;
        }
        if action.clear_draft {
            flags |= SendMediaFlags::CLEAR_DRAFT;
        }
        if options.scheduled.is_some() {
            flags |= SendMediaFlags::SCHEDULE_DATE;
        }
        let send_as = match options.send_as {
            Some(id) => {
                flags |= SendMediaFlags::SEND_AS;
                self.storage
                    .peer(id)
                    .map(|p| p.input())
                    .unwrap_or(wire::enums::InputPeer::Empty)
            }
            None => wire::enums::InputPeer::Empty,
        };
        let quick_reply_shortcut = options.shortcut_id.map(|shortcut_id| {
            flags |= SendMediaFlags::QUICK_REPLY_SHORTCUT;
            wire::enums::InputQuickReplyShortcut::Id(wire::types::InputQuickReplyShortcutId {
                shortcut_id,
            })
        });

        SendMedia {
            flags,
            peer: peer.input(),
            reply_to,
            media,
            message: text,
            random_id,
            entities,
            schedule_date: options.scheduled.unwrap_or(0),
            send_as,
            quick_reply_shortcut,
        }
    }

    /// Execute the request, retrying once after a file reference refresh
    /// when the stale-reference error class comes back and the server
    /// actually issued a new reference.
    ///
    /// The conversation's send slot only tracks the latest request id for
    /// replacement purposes; it is never held across a transport call, so
    /// sends to the same peer stay concurrent.
    async fn dispatch(
        &self,
        peer:    &Peer,
        mut request: SendMedia,
        retry:   Option<&RemoteMedia>,
    ) -> Result<wire::types::Updates, InvocationError> {
        let slot = self.storage.send_slot(peer.id);
        let mut used_reference = match retry {
            Some(remote) => remote.input(&self.storage)?.1,
            None         => FileReference::new(),
        };
        let mut refreshed = false;
        loop {
            let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed) + 1;
            slot.lock().await.last_request_id = request_id;
            let error = match self.transport.send_media(request.clone()).await {
                Ok(updates) => return Ok(updates),
                Err(error)  => error,
            };
            let retriable = !refreshed && is_stale_reference(&error);
            let Some(remote) = retry.filter(|_| retriable) else {
                return Err(error);
            };
            refreshed = true;

            tracing::debug!("[sending] refreshing file reference for {}", peer.id);
            match self.transport.refresh_file_reference(remote.origin()).await? {
                Some(reference) if reference != used_reference => {
                    remote.store_fresh_reference(&self.storage, reference);
                    let (input, reference) = remote.input(&self.storage)?;
                    request.media = input;
                    used_reference = reference;
                }
                _ => return Err(error),
            }
        }
    }

    /// Fold the server's update batch back into storage.
    pub fn apply_updates(&self, updates: &wire::types::Updates) {
        for update in &updates.updates {
            match update {
                wire::enums::Update::MessageId(u) => {
                    if self.storage.process_sent_message(u.random_id, u.id).is_none() {
                        tracing::debug!(
                            "[sending] message id update for unknown random id {}",
                            u.random_id
                        );
                    }
                }
            }
        }
    }

    fn clear_drafts(&self, peer: PeerId, action: &SendAction) {
        if !action.clear_draft {
            return;
        }
        let topic_root = action
            .reply_to
            .and_then(|reply| reply.topic_root_id)
            .unwrap_or(0);
        self.storage.clear_local_draft(peer, topic_root);
        self.storage.clear_cloud_draft(peer, topic_root);
    }

    /// Flush any pending forward draft so a normal send never jumps the
    /// queue ahead of forwards the user lined up first.
    pub(crate) fn finish_forwarding(&self, peer: PeerId) {
        let pending = self.storage.take_forward_draft(peer);
        if !pending.is_empty() {
            tracing::debug!("[sending] finishing {} pending forwards to {}", pending.len(), peer);
            self.storage.history_updated(HistoryUpdate::ForwardsFinished { peer });
        }
    }
}

/// How a send carries its media: a storage-resident object (retriable on a
/// stale file reference) or a request-inline value (dice, geo points).
enum MediaPayload {
    Remote(RemoteMedia),
    Inline(wire::enums::InputMedia),
}
