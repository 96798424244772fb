//! Confirmed-upload dispatch.
//!
//! Once a file's bytes are confirmed (prepared and hashed), the message
//! shell is created immediately: either a fresh optimistic local message
//! or, when replacing the media of an existing message, an in-place
//! edition. The uploader delivers the bytes afterwards, addressed by the
//! id assigned here.

use std::sync::{Arc, Mutex};

use crate::flags::{fill_message_post_flags, new_message_flags};
use crate::media::MessageMedia;
use crate::message::{self, FullMsgId, MessageFlags, MsgId, ReplyTo, SendOptions, TextWithEntities};
use crate::sending::Sender;
use crate::storage::{Edition, HistoryUpdate, NewMessageDescriptor};
use crate::transport::{SendProgress, Transport};

/// What kind of payload a prepared file is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendMediaType {
    Photo,
    File,
    Audio,
}

/// Destination of a prepared file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileTo {
    pub peer:             message::PeerId,
    pub options:          SendOptions,
    pub reply_to:         Option<ReplyTo>,
    /// Message whose media this file replaces; zero/none means a new send.
    pub replace_media_of: Option<MsgId>,
}

/// One item of an album under assembly; `msg_id` is stamped when the
/// item's message shell is created.
#[derive(Clone, Debug, PartialEq)]
pub struct AlbumItem {
    pub task_id: u64,
    pub msg_id:  Option<FullMsgId>,
}

/// Shared state of a multi-file album send.
#[derive(Debug, Default)]
pub struct SendingAlbum {
    pub group_id: u64,
    pub items:    Vec<AlbumItem>,
}

/// A file whose bytes are prepared and ready for upload.
#[derive(Clone)]
pub struct FilePrepareResult {
    pub task_id:   u64,
    pub to:        FileTo,
    pub file_type: SendMediaType,
    /// Media object id pre-registered in storage for this file.
    pub media_id:  i64,
    pub caption:   TextWithEntities,
    pub spoiler:   bool,
    pub album:     Option<Arc<Mutex<SendingAlbum>>>,
}

impl<T: Transport> Sender<T> {
    /// Create the message shell for a confirmed file and hand the bytes
    /// to the uploader.
    ///
    /// Replacing the media of an existing message is an edit — except for
    /// audio, which always sends as a new message. Edits patch the item
    /// in place, keeping its views, forwards, markup, replies and
    /// reactions.
    ///
    /// Panics if the file belongs to an album that has no item for its
    /// task id; the album and its tasks are created together, so a
    /// missing item is an internal bookkeeping bug.
    pub fn send_confirmed_file(&self, mut file: FilePrepareResult) {
        let is_editing =
            file.file_type != SendMediaType::Audio && file.to.replace_media_of.is_some();
        let peer_id = file.to.peer;
        let Some(peer) = self.storage.peer(peer_id) else {
            tracing::warn!("[upload] confirmed file for unknown peer {peer_id}");
            return;
        };

        // An edit addresses the existing message; anything else (including
        // an edit whose target vanished while the file was preparing) gets
        // a fresh local id, never an id in server space.
        let edit_target = file
            .to
            .replace_media_of
            .filter(|_| is_editing)
            .map(|msg| FullMsgId { peer: peer_id, msg })
            .filter(|id| self.storage.message(*id).is_some());
        if is_editing && edit_target.is_none() {
            tracing::warn!(
                "[upload] edit target {:?} in {peer_id} is gone, sending as new",
                file.to.replace_media_of,
            );
        }
        let new_id = edit_target.unwrap_or_else(|| FullMsgId {
            peer: peer_id,
            msg:  self.storage.next_local_message_id(),
        });
        let is_editing = edit_target.is_some();

        let group_id = if let Some(album) = &file.album {
            let mut album = album.lock().unwrap();
            let group_id = album.group_id;
            let item = album
                .items
                .iter_mut()
                .find(|item| item.task_id == file.task_id)
                .expect("album item for confirmed file");
            item.msg_id = Some(new_id);
            Some(group_id)
        } else {
            None
        };

        self.storage.queue_upload(new_id, file.task_id);
        self.transport.send_action(
            peer_id,
            match file.file_type {
                SendMediaType::Photo => SendProgress::UploadingPhoto,
                _                    => SendProgress::UploadingFile,
            },
        );

        message::trim(&mut file.caption);
        let options = &file.to.options;
        let media = match file.file_type {
            SendMediaType::Photo => MessageMedia::Photo {
                photo:   file.media_id,
                spoiler: file.spoiler,
            },
            SendMediaType::File | SendMediaType::Audio => MessageMedia::Document {
                document:    file.media_id,
                voice:       file.file_type == SendMediaType::Audio,
                ttl_seconds: options.ttl_seconds,
                spoiler:     file.spoiler,
            },
        };

        if is_editing {
            let edition = Edition {
                hide_edit_badge:     options.scheduled.is_some() || options.shortcut_id.is_some(),
                edit_date:           0,
                media:               Some(media.clone()),
                caption:             file.caption.clone(),
                use_same_views:      true,
                use_same_forwards:   true,
                use_same_markup:     true,
                use_same_replies:    true,
                use_same_reactions:  true,
                save_previous_media: true,
            };
            self.storage.apply_edition(new_id, edition);
            return;
        }

        let mut flags = new_message_flags(&peer);
        if file.to.reply_to.is_some() {
            flags |= MessageFlags::HAS_REPLY_INFO;
        }
        fill_message_post_flags(options, &peer, &mut flags);
        if options.scheduled.is_some() {
            // Scheduled messages never show the "edited" badge.
            flags |= MessageFlags::IS_OR_WAS_SCHEDULED | MessageFlags::HIDE_EDITED;
        } else if options.shortcut_id.is_some() {
            flags |= MessageFlags::SHORTCUT_MESSAGE | MessageFlags::HIDE_EDITED;
        }
        if file.file_type == SendMediaType::Audio && !peer.is_broadcast() {
            flags |= MessageFlags::MEDIA_IS_UNREAD;
        }

        let from = if flags.contains(MessageFlags::HAS_FROM_ID) {
            options.send_as.unwrap_or(self.session.user_id)
        } else {
            0
        };
        // Stored for any channel post; HAS_POST_AUTHOR gates display.
        let post_author = peer.is_broadcast().then(|| self.session.name.clone());
        let reply_to = file
            .to
            .reply_to
            .map(|reply| self.storage.convert_topic_reply(peer_id, reply));

        self.storage.add_new_local_message(
            peer_id,
            NewMessageDescriptor {
                id: new_id.msg,
                flags,
                from,
                reply_to,
                date: message::new_message_date(options),
                shortcut_id: options.shortcut_id,
                post_author,
                grouped_id: group_id,
            },
            Some(media),
            file.caption,
        );
        self.storage.history_updated(if options.scheduled.is_some() {
            HistoryUpdate::ScheduledSent { peer: peer_id }
        } else {
            HistoryUpdate::MessageSent { peer: peer_id }
        });
    }
}
